//! The subscriber handle: a socket, a topic prefix filter, and a delivery
//! callback running on a dedicated background thread.

use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use instrumentkit_types::BroadcastBody;

use crate::framing;

const STOP_GRACE_PERIOD: Duration = Duration::from_secs(2);

/// `subscribe("")` receives every event; `subscribe("dmm.")` receives every
/// parameter of the instrument named `dmm`.
pub struct SubscriberHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    stream: TcpStream,
}

impl SubscriberHandle {
    /// Connect and start reading immediately; `on_event` is invoked on the
    /// background thread for every event whose topic starts with `prefix`.
    pub fn start(
        addr: impl ToSocketAddrs,
        prefix: impl Into<String>,
        mut on_event: impl FnMut(&str, &BroadcastBody) + Send + 'static,
    ) -> io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        let reader_stream = stream.try_clone()?;
        let prefix = prefix.into();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();

        let thread = thread::spawn(move || {
            let mut reader = reader_stream;
            reader
                .set_read_timeout(Some(Duration::from_millis(250)))
                .expect("setting read timeout on a connected socket cannot fail");
            while !stop_flag.load(Ordering::Relaxed) {
                match framing::read_message::<_, String>(&mut reader) {
                    Ok(topic) => match framing::read_message::<_, BroadcastBody>(&mut reader) {
                        Ok(body) => {
                            if topic.starts_with(&prefix) {
                                on_event(&topic, &body);
                            }
                        }
                        Err(_) => break,
                    },
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut => continue,
                    Err(_) => break,
                }
            }
        });

        Ok(SubscriberHandle { stop, thread: Some(thread), stream })
    }

    /// Close the socket and join the background thread, within a grace
    /// period, after which the thread is abandoned (it will still observe
    /// `stop` and exit on its next read timeout).
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        let _ = self.stream.shutdown(std::net::Shutdown::Both);
        if let Some(thread) = self.thread.take() {
            let (tx, rx) = std::sync::mpsc::channel();
            thread::spawn(move || {
                let _ = thread.join();
                let _ = tx.send(());
            });
            let _ = rx.recv_timeout(STOP_GRACE_PERIOD);
        }
    }
}
