use super::{ImageStore, QueryResult, StoreError};
use crate::model::DedupRecord;
use async_trait::async_trait;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use std::collections::HashMap;
use tracing::instrument;

const ATTR_FILENAME: &str = "filename";
const ATTR_EXPIRE_AT: &str = "expire_at";

/// DynamoDB table with the image URL as partition key.
///
/// `expire_at` is written as a number so it can back the table's TTL
/// setting.
#[derive(Debug, Clone)]
pub struct DynamoImageStore {
    client: Client,
    table_name: String,
    key_attribute: String,
}

impl DynamoImageStore {
    pub fn new(
        client: Client,
        table_name: impl Into<String>,
        key_attribute: impl Into<String>,
    ) -> Self {
        Self {
            client,
            table_name: table_name.into(),
            key_attribute: key_attribute.into(),
        }
    }
}

#[async_trait]
impl ImageStore for DynamoImageStore {
    #[instrument(skip_all, fields(table = %self.table_name))]
    async fn query(&self, image_url: &str) -> Result<QueryResult, StoreError> {
        let result = self
            .client
            .query()
            .table_name(&self.table_name)
            .key_condition_expression("#url = :url")
            .expression_attribute_names("#url", &self.key_attribute)
            .expression_attribute_values(":url", AttributeValue::S(image_url.to_owned()))
            .send()
            .await
            .map_err(|e| StoreError::Backend(DisplayErrorContext(&e).to_string()))?;

        let items: Vec<DedupRecord> = result
            .items()
            .iter()
            .filter_map(|item| item_to_record(item, &self.key_attribute))
            .collect();
        let count = usize::try_from(result.count()).unwrap_or(items.len());
        Ok(QueryResult { items, count })
    }

    #[instrument(skip_all, fields(table = %self.table_name))]
    async fn put(&self, record: &DedupRecord) -> Result<(), StoreError> {
        let mut put = self.client.put_item().table_name(&self.table_name);
        for (k, v) in record_to_item(record, &self.key_attribute) {
            put = put.item(k, v);
        }
        put.send()
            .await
            .map_err(|e| StoreError::Backend(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }
}

fn record_to_item(record: &DedupRecord, key_attribute: &str) -> HashMap<String, AttributeValue> {
    HashMap::from([
        (
            key_attribute.to_owned(),
            AttributeValue::S(record.image_url.clone()),
        ),
        (
            ATTR_FILENAME.to_owned(),
            AttributeValue::S(record.label.clone()),
        ),
        (
            ATTR_EXPIRE_AT.to_owned(),
            AttributeValue::N(record.expire_at.to_string()),
        ),
    ])
}

/// Items written by other tools may lack `filename` or `expire_at`; they
/// still count as seen, so only the key is required.
fn item_to_record(
    item: &HashMap<String, AttributeValue>,
    key_attribute: &str,
) -> Option<DedupRecord> {
    let image_url = item.get(key_attribute)?.as_s().ok()?.clone();
    let label = item
        .get(ATTR_FILENAME)
        .and_then(|v| v.as_s().ok())
        .cloned()
        .unwrap_or_default();
    let expire_at = item
        .get(ATTR_EXPIRE_AT)
        .and_then(|v| v.as_n().ok())
        .and_then(|n| n.parse::<i64>().ok())
        .unwrap_or_default();
    Some(DedupRecord {
        image_url,
        label,
        expire_at,
    })
}
