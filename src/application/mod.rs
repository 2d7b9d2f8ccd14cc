//! Application layer services.
//!
//! Services consume the repository trait and the code generator, and are the
//! only entry point callers (the CLI, an HTTP layer) should use.
//!
//! # Available Services
//!
//! - [`services::url_service::UrlService`] - Short URL creation, lookup and deletion

pub mod services;
