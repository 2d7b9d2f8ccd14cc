//! PostgreSQL implementation of the URL repository.

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::UserUrl;
use crate::domain::repositories::UrlRepository;
use crate::error::{StorageError, is_unique_violation_on_code};

/// Checks for a live entry of the owner and inserts only when there is none.
///
/// Returns exactly one row: the existing code with `created = false`, or the
/// inserted code with `created = true`.
const CREATE_OR_GET_SQL: &str = r#"
    WITH existing AS (
        SELECT code
        FROM urls
        WHERE original_url = $2 AND user_id = $3 AND NOT is_deleted
        LIMIT 1
    ),
    inserted AS (
        INSERT INTO urls (code, original_url, user_id)
        SELECT $1, $2, $3
        WHERE NOT EXISTS (SELECT 1 FROM existing)
        RETURNING code
    )
    SELECT code, FALSE AS created FROM existing
    UNION ALL
    SELECT code, TRUE AS created FROM inserted
"#;

/// PostgreSQL repository over the `urls` table.
///
/// Takes the pool directly; the relational backend is never unwrapped from a
/// type-erased database handle. Concurrency control is left to PostgreSQL:
/// the primary key guards codes, and a transaction-scoped advisory lock keyed
/// on `(owner, url)` serializes concurrent `create_or_get` calls for the same
/// content.
pub struct PgUrlRepository {
    pool: Arc<PgPool>,
}

impl PgUrlRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Applies the embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Database`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), StorageError> {
        sqlx::migrate!("./migrations")
            .run(self.pool.as_ref())
            .await
            .map_err(sqlx::Error::from)?;
        Ok(())
    }
}

fn map_insert_error(code: &str, e: sqlx::Error) -> StorageError {
    if is_unique_violation_on_code(&e) {
        StorageError::CodeAlreadyExists(code.to_string())
    } else {
        StorageError::Database(e)
    }
}

#[async_trait]
impl UrlRepository for PgUrlRepository {
    async fn read(&self, code: &str) -> Result<String, StorageError> {
        let row: Option<(String, bool)> =
            sqlx::query_as("SELECT original_url, is_deleted FROM urls WHERE code = $1")
                .bind(code)
                .fetch_optional(self.pool.as_ref())
                .await?;

        match row {
            None => Err(StorageError::NotFound(code.to_string())),
            Some((_, true)) => Err(StorageError::UrlDeleted(code.to_string())),
            Some((url, false)) => Ok(url),
        }
    }

    async fn write(&self, code: &str, url: &str, owner_id: &str) -> Result<(), StorageError> {
        sqlx::query("INSERT INTO urls (code, original_url, user_id) VALUES ($1, $2, $3)")
            .bind(code)
            .bind(url)
            .bind(owner_id)
            .execute(self.pool.as_ref())
            .await
            .map_err(|e| map_insert_error(code, e))?;

        Ok(())
    }

    async fn create_or_get(
        &self,
        code: &str,
        url: &str,
        owner_id: &str,
    ) -> Result<(String, bool), StorageError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(format!("{owner_id} {url}"))
            .execute(&mut *tx)
            .await?;

        let (final_code, created): (String, bool) = sqlx::query_as(CREATE_OR_GET_SQL)
            .bind(code)
            .bind(url)
            .bind(owner_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_insert_error(code, e))?;

        tx.commit().await?;

        Ok((final_code, created))
    }

    async fn write_batch(
        &self,
        entries: Vec<(String, String)>,
        owner_id: &str,
    ) -> Result<(), StorageError> {
        if entries.is_empty() {
            return Ok(());
        }

        let (codes, urls): (Vec<String>, Vec<String>) = entries.into_iter().unzip();

        sqlx::query(
            r#"
            INSERT INTO urls (code, original_url, user_id)
            SELECT code, url, $3
            FROM UNNEST($1::text[], $2::text[]) AS t(code, url)
            "#,
        )
        .bind(&codes)
        .bind(&urls)
        .bind(owner_id)
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| map_insert_error(&codes.join(","), e))?;

        Ok(())
    }

    async fn is_code_unique(&self, code: &str) -> Result<bool, StorageError> {
        let unique: bool =
            sqlx::query_scalar("SELECT NOT EXISTS (SELECT 1 FROM urls WHERE code = $1)")
                .bind(code)
                .fetch_one(self.pool.as_ref())
                .await?;

        Ok(unique)
    }

    async fn find_by_owner(&self, owner_id: &str) -> Result<Vec<UserUrl>, StorageError> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT code, original_url
            FROM urls
            WHERE user_id = $1 AND NOT is_deleted
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows
            .into_iter()
            .map(|(code, original_url)| UserUrl { code, original_url })
            .collect())
    }

    async fn delete_batch(&self, codes: Vec<String>, owner_id: &str) -> Result<(), StorageError> {
        if codes.is_empty() {
            return Ok(());
        }

        let result = sqlx::query(
            r#"
            UPDATE urls
            SET is_deleted = TRUE
            WHERE code = ANY($1) AND user_id = $2 AND NOT is_deleted
            "#,
        )
        .bind(&codes)
        .bind(owner_id)
        .execute(self.pool.as_ref())
        .await?;

        tracing::debug!(
            owner_id,
            requested = codes.len(),
            updated = result.rows_affected(),
            "Soft-deleted URLs"
        );

        Ok(())
    }

    async fn is_owned_by(&self, code: &str, owner_id: &str) -> Result<bool, StorageError> {
        let owned: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM urls
                WHERE code = $1 AND user_id = $2 AND NOT is_deleted
            )
            "#,
        )
        .bind(code)
        .bind(owner_id)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(owned)
    }

    async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1").execute(self.pool.as_ref()).await?;
        Ok(())
    }
}
