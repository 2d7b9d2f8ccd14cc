//! Core domain entities.
//!
//! - [`UrlEntry`] - A stored code → URL mapping with owner and soft-delete flag
//! - [`UserUrl`] - A live `(code, url)` pair returned by owner listings

pub mod url_entry;

pub use url_entry::{UrlEntry, UserUrl};
