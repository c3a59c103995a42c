use super::{ImageStore, QueryResult, StoreError};
use crate::model::DedupRecord;
use anyhow::Result;
use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::instrument;

pub type Pool = SqlitePool;

/// Open the dedup database in WAL mode with full fsync on commit.
pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let pool = SqlitePool::connect(&normalized).await?;
    sqlx::query("PRAGMA journal_mode=WAL;")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous=FULL;")
        .execute(&pool)
        .await?;
    Ok(pool)
}

/// Normalise a dedup database URL to `sqlite://<path>?...&mode=rwc`.
///
/// `~/` resolves against `HOME` and the parent directory is created, so a
/// fresh checkout can point at `./data/images.db` directly. Non-file URLs
/// pass through.
fn prepare_sqlite_url(url: &str) -> String {
    if !url.starts_with("sqlite:") || url.starts_with("sqlite::memory") {
        return url.to_string();
    }

    let rest = &url["sqlite:".len()..];
    let path_with_query = rest.strip_prefix("//").unwrap_or(rest);

    let (path_part, query_part) = match path_with_query.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path_with_query, None),
    };

    if path_part.is_empty() {
        return url.to_string();
    }

    let expanded_path = match (path_part.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(rest), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), rest),
        _ => path_part.to_string(),
    };

    if let Some(parent) = std::path::Path::new(&expanded_path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    let mut rebuilt = format!("sqlite://{expanded_path}");
    match query_part {
        Some(q) if q.contains("mode=") => {
            rebuilt.push('?');
            rebuilt.push_str(q);
        }
        Some(q) => {
            rebuilt.push('?');
            rebuilt.push_str(q);
            rebuilt.push_str("&mode=rwc");
        }
        None => rebuilt.push_str("?mode=rwc"),
    }
    rebuilt
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// SQLite-backed dedup table, for local runs and tests.
#[derive(Debug, Clone)]
pub struct SqliteImageStore {
    pool: Pool,
}

impl SqliteImageStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Open (and migrate) the database at `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = init_pool(database_url).await?;
        run_migrations(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}

#[async_trait]
impl ImageStore for SqliteImageStore {
    #[instrument(skip_all)]
    async fn query(&self, image_url: &str) -> Result<QueryResult, StoreError> {
        let items: Vec<DedupRecord> = sqlx::query_as(
            "SELECT image_url, filename, expire_at FROM images WHERE image_url = ?",
        )
        .bind(image_url)
        .fetch_all(&self.pool)
        .await?;
        Ok(QueryResult {
            count: items.len(),
            items,
        })
    }

    #[instrument(skip_all)]
    async fn put(&self, record: &DedupRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO images (image_url, filename, expire_at) VALUES (?, ?, ?) \
             ON CONFLICT(image_url) DO UPDATE SET filename = excluded.filename, expire_at = excluded.expire_at",
        )
        .bind(&record.image_url)
        .bind(&record.label)
        .bind(record.expire_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
