use std::sync::Arc;
use tweet_image_parser::model::DedupRecord;
use tweet_image_parser::store::{sqlite, DedupGateway, ImageStore, SqliteImageStore};

async fn setup_store() -> SqliteImageStore {
    // A single connection keeps every query on the same in-memory database.
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlite::run_migrations(&pool).await.unwrap();
    SqliteImageStore::new(pool)
}

fn record(url: &str, label: &str, expire_at: i64) -> DedupRecord {
    DedupRecord {
        image_url: url.into(),
        label: label.into(),
        expire_at,
    }
}

#[tokio::test]
async fn query_on_empty_table() {
    let store = setup_store().await;
    let res = store.query("https://pbs.twimg.com/media/a.jpg").await.unwrap();
    assert_eq!(res.count, 0);
    assert!(res.items.is_empty());
}

#[tokio::test]
async fn put_twice_keeps_one_record_with_latest_expiry() {
    let store = setup_store().await;
    store.put(&record("u1", "a.csv", 1_000)).await.unwrap();
    store.put(&record("u1", "b.csv", 2_000)).await.unwrap();

    let res = store.query("u1").await.unwrap();
    assert_eq!(res.count, 1);
    assert_eq!(res.items, vec![record("u1", "b.csv", 2_000)]);

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM images")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn query_is_exact_match() {
    let store = setup_store().await;
    store.put(&record("https://x/a.jpg", "1.csv", 1)).await.unwrap();

    assert_eq!(store.query("https://x/a.jpg").await.unwrap().count, 1);
    assert_eq!(store.query("https://x/a.jpg?name=small").await.unwrap().count, 0);
    assert_eq!(store.query("https://x/").await.unwrap().count, 0);
}

#[tokio::test]
async fn expired_records_still_count_as_seen() {
    let store = setup_store().await;
    store.put(&record("u1", "old.csv", 1)).await.unwrap();

    let gw = DedupGateway::new(Arc::new(store), 15);
    let lookup = gw.lookup("u1").await;
    assert!(lookup.seen);
    assert_eq!(lookup.raw.items[0].expire_at, 1);
}

#[tokio::test]
async fn gateway_record_writes_label_and_expiry() {
    let store = Arc::new(setup_store().await);
    let gw = DedupGateway::new(store.clone(), 15);
    let before = chrono::Utc::now();

    assert!(!gw.lookup("u9").await.seen);
    gw.record("u9", "id9.csv").await;
    assert!(gw.lookup("u9").await.seen);

    let res = store.query("u9").await.unwrap();
    let stored = &res.items[0];
    assert_eq!(stored.label, "id9.csv");
    let min = (before + chrono::Duration::days(15)).timestamp_millis();
    let max = (chrono::Utc::now() + chrono::Duration::days(15)).timestamp_millis();
    assert!(stored.expire_at >= min && stored.expire_at <= max);
}

#[tokio::test]
async fn file_backed_store_persists_across_connections() {
    let td = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}/data/images.db", td.path().display());

    let store = SqliteImageStore::connect(&url).await.unwrap();
    store.put(&record("u1", "id1.csv", 42)).await.unwrap();
    store.pool().close().await;

    let reopened = SqliteImageStore::connect(&url).await.unwrap();
    assert_eq!(reopened.query("u1").await.unwrap().count, 1);
}
