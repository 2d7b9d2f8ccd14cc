//! Repository trait for short URL storage.

use crate::domain::entities::UserUrl;
use crate::error::StorageError;
use async_trait::async_trait;

/// Storage contract shared by the memory, file and PostgreSQL backends.
///
/// Every backend must behave identically for the operations below. The only
/// primitive that has to be atomic is [`UrlRepository::create_or_get`].
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::InMemoryUrlRepository`] - mutex-guarded map
/// - [`crate::infrastructure::persistence::FileUrlRepository`] - in-memory map + JSON-lines log
/// - [`crate::infrastructure::persistence::PgUrlRepository`] - PostgreSQL table
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UrlRepository: Send + Sync {
    /// Reads the original URL for a code.
    ///
    /// # Errors
    ///
    /// - [`StorageError::NotFound`] if the code never existed
    /// - [`StorageError::UrlDeleted`] if the code was soft-deleted; the URL is withheld
    async fn read(&self, code: &str) -> Result<String, StorageError>;

    /// Inserts a new entry under `code`.
    ///
    /// The code is stored as given. [`UrlService::get_original_url`] only
    /// resolves codes of the generated shape (see
    /// [`is_well_formed`](crate::utils::code_generator::is_well_formed)), so an
    /// entry written under another code can be read here but not through the
    /// service.
    ///
    /// [`UrlService::get_original_url`]: crate::application::services::UrlService::get_original_url
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::CodeAlreadyExists`] if the code is taken.
    async fn write(&self, code: &str, url: &str, owner_id: &str) -> Result<(), StorageError>;

    /// Inserts `url` under `code` unless a live entry for `(url, owner_id)` exists.
    ///
    /// # Returns
    ///
    /// - `(existing_code, false)` if the owner already has a live entry for `url`;
    ///   the candidate `code` is discarded
    /// - `(code, true)` if a new entry was inserted
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::CodeAlreadyExists`] if the candidate code is occupied
    /// (the caller retries with a new candidate).
    async fn create_or_get(
        &self,
        code: &str,
        url: &str,
        owner_id: &str,
    ) -> Result<(String, bool), StorageError>;

    /// Inserts every `(code, url)` pair for `owner_id`, or none of them.
    ///
    /// No content deduplication is performed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::CodeAlreadyExists`] if any code is taken or
    /// repeated within the batch; nothing is persisted in that case.
    async fn write_batch(
        &self,
        entries: Vec<(String, String)>,
        owner_id: &str,
    ) -> Result<(), StorageError>;

    /// Returns true if no entry (live or deleted) uses `code`.
    async fn is_code_unique(&self, code: &str) -> Result<bool, StorageError>;

    /// Lists the live entries of `owner_id`.
    async fn find_by_owner(&self, owner_id: &str) -> Result<Vec<UserUrl>, StorageError>;

    /// Soft-deletes every code in `codes` owned by `owner_id`.
    ///
    /// Codes that are unknown, already deleted or owned by someone else are
    /// skipped silently, so the call is idempotent.
    async fn delete_batch(&self, codes: Vec<String>, owner_id: &str) -> Result<(), StorageError>;

    /// Returns true if `code` exists, is live and belongs to `owner_id`.
    async fn is_owned_by(&self, code: &str, owner_id: &str) -> Result<bool, StorageError>;

    /// Checks that the backend is reachable.
    async fn ping(&self) -> Result<(), StorageError>;
}
