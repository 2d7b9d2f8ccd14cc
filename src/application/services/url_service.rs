//! Short URL creation, lookup and deletion.

use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::delete_worker::DeleteQueue;
use crate::domain::entities::UserUrl;
use crate::domain::ownership::OwnershipValidator;
use crate::domain::repositories::UrlRepository;
use crate::error::AppError;
use crate::utils::code_generator::{CodeGenerator, RandomCodeGenerator, is_well_formed};
use crate::utils::url_normalizer::{UrlValidationError, clean_url};

/// Default number of candidate codes tried before giving up.
pub const DEFAULT_MAX_ATTEMPTS: usize = 100;

/// Default prefix for rendered short URLs.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/";

/// Service behind every inbound short URL operation.
///
/// Combines a [`CodeGenerator`] with the storage's atomic create-or-get so
/// that resubmitting a URL as the same owner returns the existing code.
/// Deletions are handed to the background pipeline through a [`DeleteQueue`].
pub struct UrlService<R: UrlRepository + ?Sized, G: CodeGenerator = RandomCodeGenerator> {
    repository: Arc<R>,
    generator: Arc<G>,
    delete_queue: DeleteQueue,
    max_attempts: usize,
    base_url: String,
}

impl<R: UrlRepository + ?Sized, G: CodeGenerator> UrlService<R, G> {
    /// Creates a service with default attempt limit and base URL.
    pub fn new(repository: Arc<R>, generator: Arc<G>, delete_queue: DeleteQueue) -> Self {
        Self {
            repository,
            generator,
            delete_queue,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Sets how many candidate codes are tried per code. Values below 1 are raised to 1.
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Shortens `url` for `owner_id`, or returns the code it already has.
    ///
    /// Returns the code and whether a new entry was created. An empty
    /// `owner_id` stands for an anonymous user.
    ///
    /// # Retries
    ///
    /// Each attempt draws one candidate from the generator. Candidates that are
    /// already taken, or that lose an insert race, cost one attempt. At most
    /// `max_attempts` candidates are drawn.
    ///
    /// # Errors
    ///
    /// - [`AppError::EmptyUrl`] / [`AppError::InvalidUrl`] if the URL is rejected
    /// - [`AppError::MaxRetriesExceeded`] if every candidate collided
    /// - [`AppError::Storage`] on the first storage failure, without further attempts
    pub async fn create_short_url(
        &self,
        url: &str,
        owner_id: &str,
    ) -> Result<(String, bool), AppError> {
        let url = clean_url(url).map_err(|e| url_error(e, None))?;

        self.create_or_get(&url, owner_id).await.inspect_err(|e| {
            tracing::error!(url = %url, owner_id, error = %e, "Failed to create short URL");
        })
    }

    async fn create_or_get(&self, url: &str, owner_id: &str) -> Result<(String, bool), AppError> {
        for attempt in 1..=self.max_attempts {
            let candidate = self.generator.generate();

            if !self.repository.is_code_unique(&candidate).await? {
                tracing::debug!(code = %candidate, attempt, "Generated code is taken");
                continue;
            }

            match self
                .repository
                .create_or_get(&candidate, url, owner_id)
                .await
            {
                Ok((code, created)) => return Ok((code, created)),
                Err(e) if e.is_code_collision() => {
                    tracing::debug!(code = %candidate, attempt, "Lost insert race for code");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::MaxRetriesExceeded {
            attempts: self.max_attempts,
        })
    }

    /// Shortens every URL in `urls` for `owner_id` in one storage write.
    ///
    /// Codes are returned in input order. Every URL is validated before any
    /// code is generated; nothing is stored if one of them is rejected or the
    /// write fails. Unlike [`Self::create_short_url`], existing entries for the
    /// same URL are not reused: every URL gets a fresh code.
    ///
    /// # Errors
    ///
    /// - [`AppError::EmptyUrl`] / [`AppError::InvalidUrl`] carrying the index of the first rejected URL
    /// - [`AppError::MaxRetriesExceeded`] if no free code could be found for some entry,
    ///   or the batch kept losing insert races
    /// - [`AppError::Storage`] if the write fails
    pub async fn create_short_urls_batch(
        &self,
        urls: &[String],
        owner_id: &str,
    ) -> Result<Vec<String>, AppError> {
        if urls.is_empty() {
            return Ok(Vec::new());
        }

        let cleaned = urls
            .iter()
            .enumerate()
            .map(|(index, url)| clean_url(url).map_err(|e| url_error(e, Some(index))))
            .collect::<Result<Vec<_>, _>>()?;

        self.write_batch(cleaned, owner_id).await.inspect_err(|e| {
            tracing::error!(owner_id, count = urls.len(), error = %e, "Failed to create short URLs batch");
        })
    }

    async fn write_batch(&self, urls: Vec<String>, owner_id: &str) -> Result<Vec<String>, AppError> {
        for round in 1..=self.max_attempts {
            let codes = self.generate_batch_codes(urls.len()).await?;
            let entries: Vec<(String, String)> =
                codes.iter().cloned().zip(urls.iter().cloned()).collect();

            match self.repository.write_batch(entries, owner_id).await {
                Ok(()) => return Ok(codes),
                Err(e) if e.is_code_collision() => {
                    tracing::debug!(round, error = %e, "Batch lost insert race, regenerating codes");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::MaxRetriesExceeded {
            attempts: self.max_attempts,
        })
    }

    /// Draws `count` codes that are free in storage and distinct from each other.
    async fn generate_batch_codes(&self, count: usize) -> Result<Vec<String>, AppError> {
        let mut taken = HashSet::with_capacity(count);
        let mut codes = Vec::with_capacity(count);

        for _ in 0..count {
            let code = self.unique_candidate(&taken).await?;
            taken.insert(code.clone());
            codes.push(code);
        }

        Ok(codes)
    }

    async fn unique_candidate(&self, taken: &HashSet<String>) -> Result<String, AppError> {
        for _ in 0..self.max_attempts {
            let candidate = self.generator.generate();

            if taken.contains(&candidate) {
                continue;
            }

            if self.repository.is_code_unique(&candidate).await? {
                return Ok(candidate);
            }
        }

        Err(AppError::MaxRetriesExceeded {
            attempts: self.max_attempts,
        })
    }

    /// Resolves a code to its original URL.
    ///
    /// Strings that cannot be a generated code are reported as not found
    /// without querying storage. This includes entries stored directly through
    /// [`UrlRepository::write`] under a code of another shape.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] if the code was never issued
    /// - [`AppError::UrlDeleted`] if it was issued and later deleted
    /// - [`AppError::Storage`] on storage failure
    pub async fn get_original_url(&self, code: &str) -> Result<String, AppError> {
        if !is_well_formed(code) {
            return Err(AppError::NotFound(code.to_string()));
        }

        self.repository.read(code).await.map_err(|e| {
            let e = AppError::from(e);
            if e.is_server_error() {
                tracing::error!(code, error = %e, "Failed to read short URL");
            }
            e
        })
    }

    /// Lists the live URLs of `owner_id`.
    pub async fn get_user_urls(&self, owner_id: &str) -> Result<Vec<UserUrl>, AppError> {
        Ok(self.repository.find_by_owner(owner_id).await?)
    }

    /// Queues `codes` for deletion on behalf of `owner_id`.
    ///
    /// Returns once the request is accepted. Codes the owner does not hold are
    /// skipped by the pipeline, and storage failures there are only logged.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::DeletionUnavailable`] if the pipeline has stopped.
    pub async fn delete_urls(&self, codes: Vec<String>, owner_id: &str) -> Result<(), AppError> {
        self.delete_queue.submit(codes, owner_id).await
    }

    /// Returns true if `code` is live and belongs to `owner_id`.
    pub async fn is_url_owned_by(&self, code: &str, owner_id: &str) -> bool {
        OwnershipValidator::new(Arc::clone(&self.repository))
            .is_owned(code, owner_id)
            .await
    }

    /// Renders the public short URL for `code`.
    pub fn short_url(&self, code: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), code)
    }

    /// Checks that the storage backend is reachable.
    pub async fn ping(&self) -> Result<(), AppError> {
        Ok(self.repository.ping().await?)
    }
}

fn url_error(e: UrlValidationError, index: Option<usize>) -> AppError {
    match e {
        UrlValidationError::Empty => AppError::EmptyUrl { index },
        other => AppError::InvalidUrl {
            index,
            reason: other.to_string(),
        },
    }
}
