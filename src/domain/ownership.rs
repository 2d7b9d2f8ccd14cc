//! Ownership checks shared by reads and the delete pipeline.

use std::sync::Arc;

use crate::domain::repositories::UrlRepository;

/// Answers "does this code belong to this owner and is it still live?".
///
/// Storage failures are logged and treated as "not owned" (fail-closed), so a
/// single failed check never aborts a batch.
pub struct OwnershipValidator<R: ?Sized> {
    repository: Arc<R>,
}

impl<R: ?Sized> Clone for OwnershipValidator<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<R: UrlRepository + ?Sized> OwnershipValidator<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Returns true only if storage positively confirms ownership.
    pub async fn is_owned(&self, code: &str, owner_id: &str) -> bool {
        match self.repository.is_owned_by(code, owner_id).await {
            Ok(owned) => owned,
            Err(e) => {
                tracing::warn!(code, owner_id, error = %e, "Ownership check failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::MockUrlRepository;
    use crate::error::StorageError;

    #[tokio::test]
    async fn test_owned() {
        let mut repo = MockUrlRepository::new();
        repo.expect_is_owned_by()
            .withf(|code, owner| code == "aaaaAAAA" && owner == "u1")
            .times(1)
            .returning(|_, _| Ok(true));

        let validator = OwnershipValidator::new(Arc::new(repo));

        assert!(validator.is_owned("aaaaAAAA", "u1").await);
    }

    #[tokio::test]
    async fn test_not_owned() {
        let mut repo = MockUrlRepository::new();
        repo.expect_is_owned_by().returning(|_, _| Ok(false));

        let validator = OwnershipValidator::new(Arc::new(repo));

        assert!(!validator.is_owned("aaaaAAAA", "u2").await);
    }

    #[tokio::test]
    async fn test_storage_error_fails_closed() {
        let mut repo = MockUrlRepository::new();
        repo.expect_is_owned_by()
            .returning(|_, _| Err(StorageError::Io(std::io::Error::other("timeout"))));

        let validator = OwnershipValidator::new(Arc::new(repo));

        assert!(!validator.is_owned("aaaaAAAA", "u1").await);
    }
}
