//! Runtime bootstrap: logging, storage backend and the delete pipeline.

use crate::application::services::UrlService;
use crate::config::{Config, StorageBackend};
use crate::domain::delete_worker::spawn_delete_worker;
use crate::domain::repositories::UrlRepository;
use crate::infrastructure::persistence::{
    FileUrlRepository, InMemoryUrlRepository, PgUrlRepository,
};
use crate::utils::code_generator::RandomCodeGenerator;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

/// Service type wired by [`build`].
pub type DefaultUrlService = UrlService<dyn UrlRepository, RandomCodeGenerator>;

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` wins over the configured level when both are present.
pub fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if config.log_format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Opens the configured storage backend.
///
/// PostgreSQL is migrated before use and the file backend is replayed.
///
/// # Errors
///
/// Returns an error if the database is unreachable, a migration fails, or the
/// storage file cannot be read.
pub async fn build_repository(config: &Config) -> Result<Arc<dyn UrlRepository>> {
    match &config.backend {
        StorageBackend::Postgres { url } => {
            let pool = PgPoolOptions::new()
                .max_connections(config.db_max_connections)
                .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
                .connect(url)
                .await
                .context("Failed to connect to database")?;
            tracing::info!("Connected to database");

            let repository = PgUrlRepository::new(Arc::new(pool));
            repository
                .migrate()
                .await
                .context("Failed to run migrations")?;
            tracing::info!(backend = "postgres", "Storage ready");

            Ok(Arc::new(repository))
        }
        StorageBackend::File { path } => {
            let repository = FileUrlRepository::open(path)
                .await
                .with_context(|| format!("Failed to open storage file {}", path.display()))?;
            tracing::info!(backend = "file", path = %path.display(), "Storage ready");

            Ok(Arc::new(repository))
        }
        StorageBackend::Memory => {
            tracing::info!(backend = "memory", "Storage ready");
            Ok(Arc::new(InMemoryUrlRepository::new()))
        }
    }
}

/// Builds the service and starts the delete worker.
///
/// The returned handle completes once the service (and with it the last queue
/// handle) is dropped and every accepted delete request has been processed.
pub async fn build(config: &Config) -> Result<(DefaultUrlService, JoinHandle<()>)> {
    let repository = build_repository(config).await?;
    let (delete_queue, worker) =
        spawn_delete_worker(Arc::clone(&repository), config.delete_settings());

    let service = UrlService::new(repository, Arc::new(RandomCodeGenerator::new()), delete_queue)
        .with_max_attempts(config.code_max_attempts)
        .with_base_url(config.base_url.clone());

    Ok((service, worker))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(backend: StorageBackend) -> Config {
        Config {
            backend,
            base_url: "https://s.example.com/".to_string(),
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            code_max_attempts: 10,
            delete_workers: 2,
            delete_queue_capacity: 8,
            delete_task_concurrency: 2,
            db_max_connections: 1,
            db_connect_timeout: 1,
        }
    }

    #[tokio::test]
    async fn test_build_memory_backend() {
        let (service, worker) = build(&config(StorageBackend::Memory)).await.unwrap();

        let (code, created) = service
            .create_short_url("https://example.com", "u1")
            .await
            .unwrap();

        assert!(created);
        assert_eq!(service.short_url(&code), format!("https://s.example.com/{code}"));
        assert!(service.ping().await.is_ok());

        drop(service);
        worker.await.unwrap();
    }

    #[tokio::test]
    async fn test_build_file_backend_survives_restart() {
        let dir = TempDir::new().unwrap();
        let backend = StorageBackend::File {
            path: dir.path().join("urls.jsonl"),
        };

        let (service, worker) = build(&config(backend.clone())).await.unwrap();
        let (code, _) = service
            .create_short_url("https://example.com", "u1")
            .await
            .unwrap();
        drop(service);
        worker.await.unwrap();

        let (service, _worker) = build(&config(backend)).await.unwrap();

        assert_eq!(
            service.get_original_url(&code).await.unwrap(),
            "https://example.com"
        );
    }
}
