//! Per-invocation metrics in CloudWatch embedded metric format (EMF).
//!
//! One JSON document per line; the log pipeline turns it into the
//! `TweetsProcessed` and `ImagesIdentified` metrics.
use crate::model::{BatchCounters, InvocationContext};
use chrono::Utc;
use serde_json::{json, Value};
use std::io::Write;
use std::sync::Mutex;
use tracing::warn;

pub const METRIC_TWEETS: &str = "TweetsProcessed";
pub const METRIC_IMAGES: &str = "ImagesIdentified";
const DIMENSION_STEP: &str = "step";

/// Receives the counters of a finished batch. Emission is best effort.
pub trait MetricsSink: Send + Sync {
    fn emit(&self, ctx: &InvocationContext, counters: &BatchCounters);
}

pub struct EmfSink<W> {
    namespace: String,
    step: String,
    out: Mutex<W>,
}

impl EmfSink<std::io::Stdout> {
    pub fn stdout(namespace: impl Into<String>, step: impl Into<String>) -> Self {
        Self::new(namespace, step, std::io::stdout())
    }
}

impl<W: Write + Send> EmfSink<W> {
    pub fn new(namespace: impl Into<String>, step: impl Into<String>, out: W) -> Self {
        Self {
            namespace: namespace.into(),
            step: step.into(),
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn document(
        &self,
        ctx: &InvocationContext,
        counters: &BatchCounters,
        timestamp_ms: i64,
    ) -> Value {
        json!({
            "_aws": {
                "Timestamp": timestamp_ms,
                "CloudWatchMetrics": [{
                    "Namespace": self.namespace,
                    "Dimensions": [[DIMENSION_STEP]],
                    "Metrics": [
                        {"Name": METRIC_TWEETS, "Unit": "Count"},
                        {"Name": METRIC_IMAGES, "Unit": "Count"},
                    ],
                }],
            },
            DIMENSION_STEP: self.step,
            METRIC_TWEETS: counters.total,
            METRIC_IMAGES: counters.processed,
            "RequestId": ctx.request_id,
            "LambdaName": ctx.function_name,
            "payload": {
                // Dashboards read this property as a string.
                "tweets": counters.total.to_string(),
                "processed": counters.processed,
                "skipped": counters.skipped,
                "no_image": counters.no_image,
            },
        })
    }
}

impl<W: Write + Send> MetricsSink for EmfSink<W> {
    fn emit(&self, ctx: &InvocationContext, counters: &BatchCounters) {
        let doc = self.document(ctx, counters, Utc::now().timestamp_millis());
        let mut out = match self.out.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let written = serde_json::to_writer(&mut *out, &doc)
            .map_err(std::io::Error::from)
            .and_then(|_| out.write_all(b"\n"))
            .and_then(|_| out.flush());
        if let Err(err) = written {
            warn!(%err, request_id = %ctx.request_id, "failed to emit metrics");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> InvocationContext {
        InvocationContext::new("req-1", "parser-fn")
    }

    #[test]
    fn document_shape() {
        let sink = EmfSink::new("TwitterRekognition", "Parser", Vec::new());
        let counters = BatchCounters {
            total: 5,
            processed: 2,
            skipped: 1,
            no_image: 2,
        };
        let doc = sink.document(&ctx(), &counters, 1_700_000_000_000);

        assert_eq!(doc["_aws"]["Timestamp"], 1_700_000_000_000_i64);
        let directive = &doc["_aws"]["CloudWatchMetrics"][0];
        assert_eq!(directive["Namespace"], "TwitterRekognition");
        assert_eq!(directive["Dimensions"], json!([["step"]]));
        assert_eq!(directive["Metrics"][0]["Name"], "TweetsProcessed");
        assert_eq!(directive["Metrics"][1]["Name"], "ImagesIdentified");

        assert_eq!(doc["step"], "Parser");
        assert_eq!(doc["TweetsProcessed"], 5);
        assert_eq!(doc["ImagesIdentified"], 2);
        assert_eq!(doc["RequestId"], "req-1");
        assert_eq!(doc["LambdaName"], "parser-fn");
        assert_eq!(
            doc["payload"],
            json!({"tweets": "5", "processed": 2, "skipped": 1, "no_image": 2})
        );
    }

    #[test]
    fn emit_writes_one_line() {
        let sink = EmfSink::new("ns", "Parser", Vec::new());
        sink.emit(&ctx(), &BatchCounters::default());
        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(out.lines().count(), 1);
        let doc: Value = serde_json::from_str(out.trim_end()).unwrap();
        assert_eq!(doc["payload"]["tweets"], "0");
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn emit_failure_is_not_fatal() {
        let sink = EmfSink::new("ns", "Parser", BrokenPipe);
        sink.emit(&ctx(), &BatchCounters::default());
    }
}
