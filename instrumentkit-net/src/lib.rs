//! TCP transport for instrumentkit: the request router, the dealer client,
//! and the broadcast publisher/subscriber pair.

pub mod client;
pub mod dealer;
pub mod error;
pub mod framing;
pub mod proxy;
pub mod publisher;
pub mod router;
pub mod subscriber;

pub use client::Client;
pub use dealer::Dealer;
pub use error::ClientError;
pub use proxy::InstrumentProxy;
pub use publisher::{Publisher, PublisherSink};
pub use router::Router;
pub use subscriber::SubscriberHandle;
