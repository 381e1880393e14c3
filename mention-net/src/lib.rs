//! Mention network layer
//!
//! Provides the outbound side of the protocol:
//! - HTTP client with a bounded timeout
//! - `Fetcher` capability for source and photo retrieval
//! - Link discovery over HTML documents
//! - `Notifier` capability for endpoint discovery and delivery

pub mod client;
pub mod endpoint;
pub mod fetch;
pub mod links;

pub use client::*;
pub use endpoint::*;
pub use fetch::*;
pub use links::*;
