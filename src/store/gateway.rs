use super::{ImageStore, QueryResult};
use crate::model::DedupRecord;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, error, instrument};

/// Answer to "has this image URL been dispatched before?".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lookup {
    pub seen: bool,
    pub count: usize,
    pub raw: QueryResult,
}

/// Applies the dedup policy on top of an [`ImageStore`].
///
/// Read failures fail open (the URL counts as unseen), write failures are
/// logged and swallowed. Both keep the pipeline at-least-once: a store
/// outage can cause a duplicate dispatch, never a dropped image.
///
/// `expire_at` is metadata for store-side TTL eviction only; lookups do not
/// filter on it.
#[derive(Clone)]
pub struct DedupGateway {
    store: Arc<dyn ImageStore>,
    retention: Duration,
}

impl DedupGateway {
    pub fn new(store: Arc<dyn ImageStore>, retention_days: u32) -> Self {
        Self {
            store,
            retention: Duration::days(i64::from(retention_days)),
        }
    }

    #[instrument(skip_all)]
    pub async fn lookup(&self, image_url: &str) -> Lookup {
        match self.store.query(image_url).await {
            Ok(raw) => {
                debug!(image_url, count = raw.count, "dedup lookup");
                Lookup {
                    seen: raw.count > 0,
                    count: raw.count,
                    raw,
                }
            }
            Err(err) => {
                error!(%err, image_url, "dedup lookup failed; treating image as unseen");
                Lookup::default()
            }
        }
    }

    #[instrument(skip_all)]
    pub async fn record(&self, image_url: &str, label: &str) {
        let record = DedupRecord {
            image_url: image_url.to_string(),
            label: label.to_string(),
            expire_at: expire_at(Utc::now(), self.retention),
        };
        if let Err(err) = self.store.put(&record).await {
            error!(%err, image_url, label, "dedup write failed; image may be dispatched again");
        }
    }
}

/// Expiry timestamp in epoch milliseconds.
pub fn expire_at(now: DateTime<Utc>, retention: Duration) -> i64 {
    (now + retention).timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FlakyStore {
        fail: bool,
        puts: Mutex<Vec<DedupRecord>>,
    }

    #[async_trait]
    impl ImageStore for FlakyStore {
        async fn query(&self, image_url: &str) -> Result<QueryResult, StoreError> {
            if self.fail {
                return Err(StoreError::Backend("ProvisionedThroughputExceeded".into()));
            }
            let items: Vec<_> = self
                .puts
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.image_url == image_url)
                .cloned()
                .collect();
            Ok(QueryResult {
                count: items.len(),
                items,
            })
        }

        async fn put(&self, record: &DedupRecord) -> Result<(), StoreError> {
            if self.fail {
                return Err(StoreError::Backend("ResourceNotFound".into()));
            }
            self.puts.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    #[test]
    fn expire_at_is_fifteen_days_out_in_millis() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let ms = expire_at(now, Duration::days(15));
        assert_eq!(ms, now.timestamp_millis() + 15 * 24 * 60 * 60 * 1000);
    }

    #[tokio::test]
    async fn lookup_fails_open() {
        let gw = DedupGateway::new(
            Arc::new(FlakyStore {
                fail: true,
                ..Default::default()
            }),
            15,
        );
        let res = gw.lookup("u1").await;
        assert!(!res.seen);
        assert_eq!(res.count, 0);
        assert!(res.raw.items.is_empty());
    }

    #[tokio::test]
    async fn record_swallows_write_errors() {
        let store = Arc::new(FlakyStore {
            fail: true,
            ..Default::default()
        });
        let gw = DedupGateway::new(store.clone(), 15);
        gw.record("u1", "id1.csv").await;
        assert!(store.puts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn record_then_lookup_is_seen() {
        let store = Arc::new(FlakyStore::default());
        let gw = DedupGateway::new(store.clone(), 15);
        let before = Utc::now().timestamp_millis();
        gw.record("u1", "id1.csv").await;

        let res = gw.lookup("u1").await;
        assert!(res.seen);
        assert_eq!(res.count, 1);

        let stored = &store.puts.lock().unwrap()[0];
        assert_eq!(stored.label, "id1.csv");
        assert!(stored.expire_at >= before + Duration::days(15).num_milliseconds());
    }
}
