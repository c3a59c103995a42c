//! Dedup store: backends and the fail-open gateway in front of them.
//!
//! - `dynamodb`: production table keyed by image URL.
//! - `sqlite`: local development store with the same upsert semantics.
//! - `gateway`: the `lookup`/`record` policy the orchestrator talks to.

pub mod dynamodb;
pub mod gateway;
pub mod sqlite;

use crate::model::DedupRecord;
use async_trait::async_trait;
use thiserror::Error;

pub use dynamodb::DynamoImageStore;
pub use gateway::{expire_at, DedupGateway, Lookup};
pub use sqlite::SqliteImageStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),
    #[error("sqlite error: {0}")]
    Sqlite(#[from] sqlx::Error),
}

/// Raw result of an exact-key query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResult {
    pub items: Vec<DedupRecord>,
    pub count: usize,
}

/// Durable key-value table holding one record per dispatched image URL.
///
/// Implementations must give single-key reads and single-key upserts; no
/// other atomicity is assumed.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn query(&self, image_url: &str) -> Result<QueryResult, StoreError>;

    /// Insert or overwrite the record keyed by `record.image_url`.
    async fn put(&self, record: &DedupRecord) -> Result<(), StoreError>;
}
