//! Repository implementations.
//!
//! All three backends satisfy [`crate::domain::repositories::UrlRepository`]
//! identically and are interchangeable.
//!
//! # Repositories
//!
//! - [`InMemoryUrlRepository`] - Mutex-guarded map, lost on restart
//! - [`FileUrlRepository`] - In-memory map persisted to an append-only JSON-lines file
//! - [`PgUrlRepository`] - PostgreSQL `urls` table

pub mod file_url_repository;
pub mod memory_url_repository;
pub mod pg_url_repository;

pub use file_url_repository::FileUrlRepository;
pub use memory_url_repository::InMemoryUrlRepository;
pub use pg_url_repository::PgUrlRepository;
