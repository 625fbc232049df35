//! Registry, dispatcher, worker pool, and built-in instruments for
//! instrumentkit.
//!
//! This crate has no transport of its own — `instrumentkit-net` drives it by
//! decoding instructions off the wire and submitting [`pool::WorkItem`]s.

pub mod broadcast;
pub mod config;
pub mod dispatcher;
pub mod dummy;
pub mod error;
pub mod factory;
pub mod init_script;
pub mod instrument;
pub mod node;
pub mod paramgr;
pub mod pool;
pub mod predicate;
pub mod profile;
pub mod registry;

pub use broadcast::{BroadcastBus, BroadcastSink};
pub use config::StartupConfig;
pub use dispatcher::Dispatcher;
pub use error::CoreError;
pub use factory::Factory;
pub use instrument::{HandlerError, Instrument};
pub use pool::{WorkItem, WorkerPool};
pub use predicate::PredicateRegistry;
pub use registry::Registry;
