//! A bounded worker pool that decodes, locks, handles, and replies to
//! instructions one at a time per worker.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use instrumentkit_types::{Instruction, Response};

use crate::dispatcher::Dispatcher;

pub const DEFAULT_WORKERS: usize = 5;

/// One decoded instruction plus the means to deliver its reply back to the
/// originating client, handed to the pool by the transport layer.
pub struct WorkItem {
    pub instruction: Instruction,
    pub respond: Box<dyn FnOnce(Response) + Send>,
}

/// `crossbeam-channel` bounded MPMC queue feeding `workers` threads, each
/// running decode-already-done -> lock -> handle -> encode -> reply.
pub struct WorkerPool {
    sender: crossbeam_channel::Sender<WorkItem>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(workers: usize, dispatcher: Arc<Dispatcher>) -> Self {
        let workers = workers.max(1);
        let (sender, receiver) = crossbeam_channel::bounded(workers * 4);
        let mut handles = Vec::with_capacity(workers);
        for i in 0..workers {
            let receiver = receiver.clone();
            let dispatcher = dispatcher.clone();
            let handle = thread::Builder::new()
                .name(format!("instrumentkit-worker-{i}"))
                .spawn(move || {
                    while let Ok(item) = receiver.recv() {
                        let response = dispatcher.dispatch(&item.instruction);
                        (item.respond)(response);
                    }
                })
                .expect("failed to spawn worker thread");
            handles.push(handle);
        }
        WorkerPool { sender, handles }
    }

    pub fn submit(&self, item: WorkItem) -> Result<(), crossbeam_channel::SendError<WorkItem>> {
        self.sender.send(item)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        let (dummy_sender, _) = crossbeam_channel::bounded::<WorkItem>(1);
        let sender = std::mem::replace(&mut self.sender, dummy_sender);
        drop(sender);
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}
