//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The core domain
//! depends only on these traits, not on concrete implementations.

mod notification_sink;
mod sales_store;

pub use notification_sink::NotificationSink;
pub use sales_store::{ReplaceResult, SalesStore, INSERT_CHUNK_SIZE};
