//! The request router: a `TcpListener` accepting one persistent connection
//! per client.
//!
//! The wire protocol is strict request/reply, so a client never has more
//! than one outstanding instruction per connection — each connection gets
//! one reader/writer thread that reads a frame, submits it to the shared
//! worker pool, blocks for the reply, and writes it back before reading the
//! next frame. Concurrency across clients comes entirely from the pool's
//! bounded thread count, not from per-connection pipelining.

use std::io;
use std::net::{TcpListener, TcpStream, ToSocketAddrs};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use instrumentkit_core::{WorkItem, WorkerPool};
use instrumentkit_types::{ErrorKind, Instruction, Response};

use crate::framing;

pub struct Router {
    listener: TcpListener,
}

impl Router {
    pub fn bind(addr: impl ToSocketAddrs) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        Ok(Router { listener })
    }

    pub fn local_addr(&self) -> io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections forever, handing each its own thread. Returns only
    /// on a listener-level I/O error.
    pub fn serve(self, pool: Arc<WorkerPool>) -> io::Result<()> {
        for stream in self.listener.incoming() {
            let stream = stream?;
            let pool = pool.clone();
            thread::spawn(move || {
                if let Err(e) = handle_connection(stream.try_clone().expect("tcp clone"), stream, pool) {
                    log::debug!("connection closed: {e}");
                }
            });
        }
        Ok(())
    }
}

fn handle_connection(mut reader: TcpStream, mut writer: TcpStream, pool: Arc<WorkerPool>) -> io::Result<()> {
    loop {
        let instruction: Instruction = match framing::read_message(&mut reader) {
            Ok(instr) => instr,
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                let response = Response::err(ErrorKind::ProtocolError, e.to_string());
                framing::write_message(&mut writer, &response)?;
                continue;
            }
            Err(e) => return Err(e),
        };

        let (tx, rx) = mpsc::channel();
        let submitted = pool.submit(WorkItem {
            instruction,
            respond: Box::new(move |response| {
                let _ = tx.send(response);
            }),
        });
        if submitted.is_err() {
            let response = Response::err(ErrorKind::Internal, "worker pool is no longer accepting work");
            framing::write_message(&mut writer, &response)?;
            return Ok(());
        }

        let response = rx.recv().map_err(|_| io::Error::new(io::ErrorKind::Other, "worker dropped reply channel"))?;
        framing::write_message(&mut writer, &response)?;
    }
}
