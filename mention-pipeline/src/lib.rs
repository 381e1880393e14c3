//! Mention Pipeline
//!
//! Stages for sending and receiving webmentions:
//! - **Feed**: turns an Atom/RSS document into sources and their outbound links
//! - **Dispatch**: discovers endpoints and notifies targets, deduplicated by sent records
//! - **Validate**: structural (no I/O) and semantic (fetch and confirm) checks
//! - **Microformats**: parses HTML into a typed item tree
//! - **Extract**: pulls title, author and publish time out of the item tree
//! - **Thumbnail**: derives content-addressed author thumbnails

pub mod dispatch;
pub mod extract;
pub mod feed;
pub mod microformats;
pub mod thumbnail;
pub mod validate;

pub use dispatch::*;
pub use extract::*;
pub use feed::*;
pub use microformats::{Document, Item, PropertyValue};
pub use thumbnail::*;
pub use validate::*;
