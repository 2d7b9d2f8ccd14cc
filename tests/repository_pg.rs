//! PostgreSQL repository tests. Run with `cargo test --features postgres-tests`
//! and `DATABASE_URL` pointing at a server the tests may create databases on.
#![cfg(feature = "postgres-tests")]

use sqlx::PgPool;
use std::sync::Arc;
use url_shortener_core::domain::repositories::UrlRepository;
use url_shortener_core::error::StorageError;
use url_shortener_core::infrastructure::persistence::PgUrlRepository;

async fn insert_url(pool: &PgPool, code: &str, url: &str, user_id: &str, deleted: bool) {
    sqlx::query("INSERT INTO urls (code, original_url, user_id, is_deleted) VALUES ($1, $2, $3, $4)")
        .bind(code)
        .bind(url)
        .bind(user_id)
        .bind(deleted)
        .execute(pool)
        .await
        .unwrap();
}

async fn is_deleted(pool: &PgPool, code: &str) -> bool {
    sqlx::query_scalar("SELECT is_deleted FROM urls WHERE code = $1")
        .bind(code)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[sqlx::test(migrations = "./migrations")]
async fn test_write_and_read(pool: PgPool) {
    let repo = PgUrlRepository::new(Arc::new(pool));

    repo.write("abcdEFGH", "https://example.com", "u1")
        .await
        .unwrap();

    assert_eq!(repo.read("abcdEFGH").await.unwrap(), "https://example.com");
    assert!(matches!(
        repo.read("missingX").await,
        Err(StorageError::NotFound(_))
    ));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_write_existing_code_is_collision(pool: PgPool) {
    insert_url(&pool, "abcdEFGH", "https://a.com", "u1", false).await;
    let repo = PgUrlRepository::new(Arc::new(pool));

    let err = repo
        .write("abcdEFGH", "https://b.com", "u2")
        .await
        .unwrap_err();

    assert!(err.is_code_collision());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_read_deleted(pool: PgPool) {
    insert_url(&pool, "abcdEFGH", "https://example.com", "u1", true).await;
    let repo = PgUrlRepository::new(Arc::new(pool));

    assert!(matches!(
        repo.read("abcdEFGH").await,
        Err(StorageError::UrlDeleted(_))
    ));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_create_or_get(pool: PgPool) {
    let repo = PgUrlRepository::new(Arc::new(pool));

    let first = repo
        .create_or_get("codeAAAA", "https://example.com", "u1")
        .await
        .unwrap();
    let second = repo
        .create_or_get("codeBBBB", "https://example.com", "u1")
        .await
        .unwrap();
    let other_owner = repo
        .create_or_get("codeCCCC", "https://example.com", "u2")
        .await
        .unwrap();

    assert_eq!(first, ("codeAAAA".to_string(), true));
    assert_eq!(second, ("codeAAAA".to_string(), false));
    assert_eq!(other_owner, ("codeCCCC".to_string(), true));
    assert!(!repo.is_code_unique("codeAAAA").await.unwrap());
    assert!(repo.is_code_unique("codeBBBB").await.unwrap());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_create_or_get_taken_code(pool: PgPool) {
    insert_url(&pool, "codeAAAA", "https://other.com", "u9", false).await;
    let repo = PgUrlRepository::new(Arc::new(pool));

    let err = repo
        .create_or_get("codeAAAA", "https://example.com", "u1")
        .await
        .unwrap_err();

    assert!(err.is_code_collision());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_create_or_get_skips_deleted_entry(pool: PgPool) {
    insert_url(&pool, "codeAAAA", "https://example.com", "u1", true).await;
    let repo = PgUrlRepository::new(Arc::new(pool));

    let (code, created) = repo
        .create_or_get("codeBBBB", "https://example.com", "u1")
        .await
        .unwrap();

    assert_eq!(code, "codeBBBB");
    assert!(created);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_concurrent_create_or_get_single_winner(pool: PgPool) {
    let repo = Arc::new(PgUrlRepository::new(Arc::new(pool)));
    let mut tasks = tokio::task::JoinSet::new();

    for i in 0..8 {
        let repo = Arc::clone(&repo);
        tasks.spawn(async move {
            repo.create_or_get(&format!("code{i:04}"), "https://same.com", "u1")
                .await
                .unwrap()
        });
    }

    let mut codes = std::collections::HashSet::new();
    let mut created = 0;
    while let Some(result) = tasks.join_next().await {
        let (code, was_created) = result.unwrap();
        codes.insert(code);
        created += usize::from(was_created);
    }

    assert_eq!(codes.len(), 1);
    assert_eq!(created, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_write_batch_is_atomic(pool: PgPool) {
    insert_url(&pool, "takenAAA", "https://existing.com", "u9", false).await;
    let repo = PgUrlRepository::new(Arc::new(pool));

    let err = repo
        .write_batch(
            vec![
                ("freshAAA".to_string(), "https://a.com".to_string()),
                ("takenAAA".to_string(), "https://b.com".to_string()),
            ],
            "u1",
        )
        .await
        .unwrap_err();

    assert!(err.is_code_collision());
    assert!(repo.is_code_unique("freshAAA").await.unwrap());

    repo.write_batch(
        vec![
            ("freshAAA".to_string(), "https://a.com".to_string()),
            ("freshBBB".to_string(), "https://b.com".to_string()),
        ],
        "u1",
    )
    .await
    .unwrap();

    assert_eq!(repo.find_by_owner("u1").await.unwrap().len(), 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_delete_batch_respects_ownership(pool: PgPool) {
    insert_url(&pool, "codeAAAA", "https://a.com", "u1", false).await;
    insert_url(&pool, "codeBBBB", "https://b.com", "u2", false).await;
    let repo = PgUrlRepository::new(Arc::new(pool.clone()));

    repo.delete_batch(
        vec![
            "codeAAAA".to_string(),
            "codeBBBB".to_string(),
            "missingX".to_string(),
        ],
        "u1",
    )
    .await
    .unwrap();
    repo.delete_batch(vec!["codeAAAA".to_string()], "u1")
        .await
        .unwrap();

    assert!(is_deleted(&pool, "codeAAAA").await);
    assert!(!is_deleted(&pool, "codeBBBB").await);
    assert!(!repo.is_owned_by("codeAAAA", "u1").await.unwrap());
    assert!(repo.is_owned_by("codeBBBB", "u2").await.unwrap());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_find_by_owner_excludes_deleted(pool: PgPool) {
    insert_url(&pool, "codeAAAA", "https://a.com", "u1", false).await;
    insert_url(&pool, "codeBBBB", "https://b.com", "u1", true).await;
    insert_url(&pool, "codeCCCC", "https://c.com", "u2", false).await;
    let repo = PgUrlRepository::new(Arc::new(pool));

    let urls = repo.find_by_owner("u1").await.unwrap();

    assert_eq!(urls.len(), 1);
    assert_eq!(urls[0].code, "codeAAAA");
    assert_eq!(urls[0].original_url, "https://a.com");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_ping(pool: PgPool) {
    let repo = PgUrlRepository::new(Arc::new(pool));

    assert!(repo.ping().await.is_ok());
}
