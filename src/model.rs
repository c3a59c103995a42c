use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One tweet from the input batch.
///
/// Kept as raw JSON: the fields we care about are optional and may be
/// malformed, and a bad shape must never fail the whole batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct InputRecord(pub Value);

impl InputRecord {
    pub fn full_text(&self) -> &str {
        self.0
            .get("full_text")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }
}

impl From<Value> for InputRecord {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// An eligible photo attachment, ready for the dedup check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub image_url: String,
    pub identifier: String,
    pub text: String,
}

impl Candidate {
    pub fn into_request(self) -> DispatchRequest {
        DispatchRequest {
            identifier: self.identifier,
            text: self.text,
            image_url: self.image_url,
        }
    }
}

/// Payload handed to the workflow engine.
///
/// Field names on the wire match what the recognition state machine reads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DispatchRequest {
    #[serde(rename = "guidstr")]
    pub identifier: String,
    #[serde(rename = "full_text")]
    pub text: String,
    pub image_url: String,
}

impl DispatchRequest {
    /// Label stored alongside the dedup record.
    pub fn label(&self) -> String {
        format!("{}.csv", self.identifier)
    }
}

/// Persisted marker meaning "this image URL was already dispatched".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct DedupRecord {
    pub image_url: String,
    #[serde(rename = "filename")]
    #[sqlx(rename = "filename")]
    pub label: String,
    /// Milliseconds since the Unix epoch.
    pub expire_at: i64,
}

/// Per-invocation counters, emitted once at the end of a batch.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchCounters {
    pub total: u64,
    pub processed: u64,
    pub skipped: u64,
    pub no_image: u64,
}

/// Identity of one invocation, as handed over by the invoking runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationContext {
    pub request_id: String,
    pub function_name: String,
}

impl InvocationContext {
    pub fn new(request_id: impl Into<String>, function_name: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            function_name: function_name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dispatch_payload_uses_wire_names() {
        let req = DispatchRequest {
            identifier: "id1".into(),
            text: "look at this".into(),
            image_url: "https://pbs.twimg.com/media/a.jpg".into(),
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(
            v,
            json!({
                "guidstr": "id1",
                "full_text": "look at this",
                "image_url": "https://pbs.twimg.com/media/a.jpg"
            })
        );
        assert_eq!(req.label(), "id1.csv");
    }

    #[test]
    fn full_text_defaults_to_empty() {
        assert_eq!(InputRecord(json!({})).full_text(), "");
        assert_eq!(InputRecord(json!({"full_text": 12})).full_text(), "");
        assert_eq!(InputRecord(json!({"full_text": "hi"})).full_text(), "hi");
    }
}
