//! Shared test harness: spin up a real router against `127.0.0.1:0` and talk
//! to it with a raw framed client, mirroring how an actual `Client` does it
//! but without the retry/backoff envelope, so test failures are immediate.

use std::net::TcpStream;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use instrumentkit_core::{BroadcastBus, Dispatcher, Registry, WorkerPool};
use instrumentkit_net::framing;
use instrumentkit_net::{Publisher, Router};
use instrumentkit_types::{Instruction, Response};

pub struct TestServer {
    pub addr: std::net::SocketAddr,
}

pub fn spawn_server() -> TestServer {
    let registry = Arc::new(Registry::with_builtins());
    let bus = Arc::new(BroadcastBus::new());
    let dispatcher = Arc::new(Dispatcher::new(registry, bus));
    let pool = Arc::new(WorkerPool::new(4, dispatcher));

    let router = Router::bind("127.0.0.1:0").expect("bind router");
    let addr = router.local_addr().expect("local addr");
    thread::spawn(move || {
        let _ = router.serve(pool);
    });

    TestServer { addr }
}

pub struct BroadcastingServer {
    pub addr: std::net::SocketAddr,
    pub broadcast_addr: std::net::SocketAddr,
}

/// Same as [`spawn_server`] but with the publisher wired up as a broadcast
/// sink, for scenarios that need to observe parameter-change events.
pub fn spawn_server_with_broadcast() -> BroadcastingServer {
    let registry = Arc::new(Registry::with_builtins());
    let bus = Arc::new(BroadcastBus::new());

    let publisher = Publisher::bind("127.0.0.1:0").expect("bind publisher");
    let broadcast_addr = publisher.local_addr().expect("local addr");
    bus.register(Arc::new(publisher.sink()));
    thread::spawn(move || {
        let _ = publisher.serve();
    });

    let dispatcher = Arc::new(Dispatcher::new(registry, bus));
    let pool = Arc::new(WorkerPool::new(4, dispatcher));

    let router = Router::bind("127.0.0.1:0").expect("bind router");
    let addr = router.local_addr().expect("local addr");
    thread::spawn(move || {
        let _ = router.serve(pool);
    });

    BroadcastingServer { addr, broadcast_addr }
}

pub struct RawClient {
    stream: TcpStream,
}

impl RawClient {
    pub fn connect(addr: std::net::SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).expect("connect");
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        RawClient { stream }
    }

    pub fn ask(&mut self, instruction: Instruction) -> Response {
        framing::write_message(&mut self.stream, &instruction).expect("write instruction");
        framing::read_message(&mut self.stream).expect("read response")
    }
}
