//! In-process publish/subscribe transport.
//!
//! A [`Bus`] routes messages of a single type `M` between named topics.
//! Delivery is synchronous on the publisher's thread: whoever calls
//! [`Publisher::publish`] runs every subscriber callback, so callers decide
//! which execution context a message lands on. Subscriber tables are locked
//! only long enough to copy the callback list; callbacks themselves run
//! unlocked and may publish or subscribe re-entrantly.

mod bus;
mod error;
mod metrics;

pub use bus::{Bus, Publisher, Subscription};
pub use error::{TransportError, TransportResult};
pub use metrics::TopicMetricsSnapshot;
