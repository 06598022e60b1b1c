//! Reforma: durable text highlights and comments for web pages.
//!
//! Highlights are stored as plain text per normalized page URL and
//! re-anchored into the page on every load by searching for that text.

pub mod anchor;
pub mod config;
pub mod dom;
pub mod engine;
pub mod error;
pub mod messaging;
pub mod page;
pub mod protocol;
pub mod session;
pub mod store;

pub use anchor::Anchor;
pub use error::{ReformaError, Result};
pub use session::PageSession;
pub use store::{AnchorStore, BucketStore, FileStore, MemoryStore};
