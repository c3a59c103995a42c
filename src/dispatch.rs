use crate::model::DispatchRequest;
use crate::store::DedupGateway;
use crate::workflow::{ExecutionHandle, WorkflowEngine, WorkflowError};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Starts a recognition run for a new image and marks the image seen.
#[derive(Clone)]
pub struct Dispatcher {
    workflow: Arc<dyn WorkflowEngine>,
    dedup: DedupGateway,
}

impl Dispatcher {
    pub fn new(workflow: Arc<dyn WorkflowEngine>, dedup: DedupGateway) -> Self {
        Self { workflow, dedup }
    }

    /// One execution start, then one dedup write once the start succeeded.
    /// No retry.
    ///
    /// A start error (including a name conflict) is returned without
    /// touching the dedup store, so a rerun of the batch dispatches the
    /// image again.
    #[instrument(skip_all, fields(identifier = %request.identifier))]
    pub async fn dispatch(
        &self,
        request: &DispatchRequest,
    ) -> Result<ExecutionHandle, WorkflowError> {
        let input = serde_json::to_string(request)?;
        let handle = self
            .workflow
            .start_execution(&request.identifier, &input)
            .await
            .inspect_err(|err| {
                warn!(%err, image_url = %request.image_url, "workflow start failed");
            })?;
        info!(
            image_url = %request.image_url,
            execution_arn = %handle.execution_arn,
            "workflow started"
        );

        self.dedup
            .record(&request.image_url, &request.label())
            .await;
        Ok(handle)
    }
}
