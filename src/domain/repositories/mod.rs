//! Repository trait definitions for the domain layer.
//!
//! The storage contract is defined here and implemented by the backends in
//! `crate::infrastructure::persistence`. Services receive an implementation by
//! injection and never construct a concrete backend themselves.
//!
//! # Testing
//!
//! A mock implementation is generated via `mockall` for unit tests.

pub mod url_repository;

pub use url_repository::UrlRepository;

#[cfg(test)]
pub use url_repository::MockUrlRepository;
