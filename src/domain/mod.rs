//! Domain layer: entities, the storage contract and the delete pipeline.
//!
//! Nothing in here knows which backend is in use; adapters live in
//! [`crate::infrastructure`].
//!
//! # Deletion Flow
//!
//! 1. [`crate::application::services::UrlService::delete_urls`] submits codes to a
//!    [`delete_worker::DeleteQueue`]
//! 2. [`delete_worker::run_delete_worker`] picks the task up in the background
//! 3. Ownership of every code is checked concurrently by [`ownership::OwnershipValidator`]
//! 4. Owned codes are soft-deleted with a single [`repositories::UrlRepository::delete_batch`] call

pub mod delete_worker;
pub mod entities;
pub mod ownership;
pub mod repositories;
