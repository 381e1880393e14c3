//! Mention Core - data model and persistence for webmentions
//!
//! This crate provides the foundational primitives:
//! - `Mention`, `SentRecord`, `Thumbnail` records and their content-hash keys
//! - The error taxonomy shared by every other crate
//! - Configuration with serde defaults
//! - The `Store` trait and an in-memory store with JSON snapshots

pub mod config;
pub mod error;
pub mod model;
pub mod store;

pub use config::*;
pub use error::*;
pub use model::*;
pub use store::*;

/// Host every accepted target must live on
pub const DEFAULT_ALLOWED_HOST: &str = "bitworking.org";

/// Scheme every accepted target must use
pub const DEFAULT_REQUIRED_SCHEME: &str = "https";

/// Longer side of a derived thumbnail, in pixels
pub const THUMBNAIL_SIZE: u32 = 32;

/// Slack applied when comparing a feed entry's update time to its sent record
pub const SENT_SLACK_SECS: i64 = 1;
