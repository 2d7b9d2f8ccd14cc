#![allow(dead_code)]

use std::sync::Arc;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use url_shortener_core::application::services::UrlService;
use url_shortener_core::domain::delete_worker::{DeleteSettings, spawn_delete_worker};
use url_shortener_core::domain::repositories::UrlRepository;
use url_shortener_core::infrastructure::persistence::{FileUrlRepository, InMemoryUrlRepository};
use url_shortener_core::utils::code_generator::RandomCodeGenerator;

pub type TestService = UrlService<dyn UrlRepository, RandomCodeGenerator>;

/// A service wired to a backend, plus what is needed to inspect it afterwards.
pub struct TestApp {
    pub service: TestService,
    pub repository: Arc<dyn UrlRepository>,
    pub worker: JoinHandle<()>,
    /// Keeps the file backend's directory alive.
    pub dir: Option<TempDir>,
}

impl TestApp {
    /// Drops the service and waits until every queued deletion was processed.
    pub async fn drain(self) -> (Arc<dyn UrlRepository>, Option<TempDir>) {
        drop(self.service);
        self.worker.await.unwrap();
        (self.repository, self.dir)
    }
}

pub fn build(repository: Arc<dyn UrlRepository>, dir: Option<TempDir>) -> TestApp {
    let (queue, worker) = spawn_delete_worker(Arc::clone(&repository), DeleteSettings::default());
    let service = UrlService::new(
        Arc::clone(&repository),
        Arc::new(RandomCodeGenerator::new()),
        queue,
    );

    TestApp {
        service,
        repository,
        worker,
        dir,
    }
}

pub fn memory_app() -> TestApp {
    build(Arc::new(InMemoryUrlRepository::new()), None)
}

pub async fn file_app() -> TestApp {
    let dir = TempDir::new().unwrap();
    let repository = FileUrlRepository::open(dir.path().join("urls.jsonl"))
        .await
        .unwrap();
    build(Arc::new(repository), Some(dir))
}

/// Both backends that need no external service.
pub async fn local_apps() -> Vec<(&'static str, TestApp)> {
    vec![("memory", memory_app()), ("file", file_app().await)]
}
