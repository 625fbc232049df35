//! In-process fan-out for parameter-changed events.
//!
//! The TCP publisher (in `instrumentkit-net`) registers itself as one
//! [`BroadcastSink`] among possibly several — e.g. a test harness asserting
//! on received events alongside the socket publisher.

use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use instrumentkit_types::{BroadcastBody, ParamValue};

pub trait BroadcastSink: Send + Sync {
    fn publish(&self, topic: &str, body: &BroadcastBody);
}

#[derive(Default)]
pub struct BroadcastBus {
    sinks: Mutex<Vec<Arc<dyn BroadcastSink>>>,
}

impl BroadcastBus {
    pub fn new() -> Self {
        BroadcastBus::default()
    }

    pub fn register(&self, sink: Arc<dyn BroadcastSink>) {
        self.sinks.lock().expect("poisoned").push(sink);
    }

    /// Publish a parameter-changed event. Best-effort: a sink that drops the
    /// event (e.g. a backpressured socket) does not affect the others or the
    /// caller; publication is non-blocking and best-effort.
    pub fn publish(&self, topic: &str, value: ParamValue, unit: &str) {
        let body = BroadcastBody {
            value,
            unit: unit.to_string(),
            ts: now_epoch_seconds(),
        };
        let sinks = self.sinks.lock().expect("poisoned");
        for sink in sinks.iter() {
            sink.publish(topic, &body);
        }
    }
}

fn now_epoch_seconds() -> f64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    struct RecordingSink {
        received: StdMutex<Vec<(String, BroadcastBody)>>,
    }

    impl BroadcastSink for RecordingSink {
        fn publish(&self, topic: &str, body: &BroadcastBody) {
            self.received.lock().unwrap().push((topic.to_string(), body.clone()));
        }
    }

    #[test]
    fn publish_reaches_every_registered_sink() {
        let bus = BroadcastBus::new();
        let sink = Arc::new(RecordingSink { received: StdMutex::new(vec![]) });
        bus.register(sink.clone());
        bus.publish("dmm.voltage", ParamValue::Float(1.25), "V");
        let received = sink.received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].0, "dmm.voltage");
        assert_eq!(received[0].1.value, ParamValue::Float(1.25));
    }
}
