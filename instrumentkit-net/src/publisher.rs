//! The broadcast publisher: a second `TcpListener` fanning out
//! parameter-changed events to any number of passive subscribers.
//!
//! Topic filtering is applied client-side by [`crate::subscriber`] rather
//! than negotiated per connection — every subscriber receives every event
//! and discards what it didn't ask for, which keeps this socket a pure
//! broadcaster with no per-client subscribe handshake.

use std::io;
use std::net::{TcpListener, TcpStream, ToSocketAddrs};
use std::sync::{Arc, Mutex};
use std::thread;

use instrumentkit_core::BroadcastSink;
use instrumentkit_types::BroadcastBody;

use crate::framing;

const OUTBOX_CAPACITY: usize = 256;

struct SubscriberSlot {
    sender: crossbeam_channel::Sender<(String, BroadcastBody)>,
}

pub struct Publisher {
    listener: TcpListener,
    subscribers: Arc<Mutex<Vec<SubscriberSlot>>>,
}

impl Publisher {
    pub fn bind(addr: impl ToSocketAddrs) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        Ok(Publisher { listener, subscribers: Arc::new(Mutex::new(Vec::new())) })
    }

    pub fn local_addr(&self) -> io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept subscriber connections forever, handing each its own outbox
    /// and writer thread.
    pub fn serve(self) -> io::Result<()> {
        for stream in self.listener.incoming() {
            let stream = stream?;
            let (sender, receiver) = crossbeam_channel::bounded(OUTBOX_CAPACITY);
            self.subscribers.lock().expect("poisoned").push(SubscriberSlot { sender });
            thread::spawn(move || {
                if let Err(e) = writer_thread(stream, receiver) {
                    log::debug!("subscriber connection closed: {e}");
                }
            });
        }
        Ok(())
    }

    /// A [`BroadcastSink`] handle that can be registered on a
    /// [`instrumentkit_core::BroadcastBus`] alongside the publisher's
    /// `serve` loop.
    pub fn sink(&self) -> PublisherSink {
        PublisherSink { subscribers: self.subscribers.clone() }
    }
}

fn writer_thread(mut stream: TcpStream, receiver: crossbeam_channel::Receiver<(String, BroadcastBody)>) -> io::Result<()> {
    while let Ok((topic, body)) = receiver.recv() {
        framing::write_message(&mut stream, &topic)?;
        framing::write_message(&mut stream, &body)?;
    }
    Ok(())
}

pub struct PublisherSink {
    subscribers: Arc<Mutex<Vec<SubscriberSlot>>>,
}

impl BroadcastSink for PublisherSink {
    fn publish(&self, topic: &str, body: &BroadcastBody) {
        let mut subs = self.subscribers.lock().expect("poisoned");
        subs.retain(|slot| {
            match slot.sender.try_send((topic.to_string(), body.clone())) {
                Ok(()) => true,
                Err(crossbeam_channel::TrySendError::Full(_)) => true,
                Err(crossbeam_channel::TrySendError::Disconnected(_)) => false,
            }
        });
    }
}
