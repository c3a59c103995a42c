//! Workflow engine: starts one recognition run per new image.
use async_trait::async_trait;
use aws_sdk_sfn::error::DisplayErrorContext;
use aws_sdk_sfn::Client;
use std::fmt;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The execution name was already used for this workflow.
    #[error("execution {name} already exists")]
    ExecutionAlreadyExists { name: String },
    #[error("workflow service error: {0}")]
    Service(String),
    #[error("payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Handle returned by a successful start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionHandle {
    pub execution_arn: String,
}

#[async_trait]
pub trait WorkflowEngine: Send + Sync {
    /// Start an execution named `name` with the JSON document `input`.
    /// Names are unique per workflow; reuse yields
    /// [`WorkflowError::ExecutionAlreadyExists`].
    async fn start_execution(&self, name: &str, input: &str)
        -> Result<ExecutionHandle, WorkflowError>;
}

/// AWS Step Functions state machine.
#[derive(Clone)]
pub struct StepFunctionsEngine {
    client: Client,
    state_machine_arn: String,
}

impl fmt::Debug for StepFunctionsEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepFunctionsEngine")
            .field("state_machine_arn", &self.state_machine_arn)
            .finish_non_exhaustive()
    }
}

impl StepFunctionsEngine {
    pub fn new(client: Client, state_machine_arn: impl Into<String>) -> Self {
        Self {
            client,
            state_machine_arn: state_machine_arn.into(),
        }
    }
}

#[async_trait]
impl WorkflowEngine for StepFunctionsEngine {
    #[instrument(skip_all, fields(name = %name))]
    async fn start_execution(
        &self,
        name: &str,
        input: &str,
    ) -> Result<ExecutionHandle, WorkflowError> {
        debug!(state_machine = %self.state_machine_arn, "starting execution");
        let output = self
            .client
            .start_execution()
            .state_machine_arn(&self.state_machine_arn)
            .name(name)
            .input(input)
            .send()
            .await
            .map_err(|err| {
                let conflict = err
                    .as_service_error()
                    .is_some_and(|e| e.is_execution_already_exists());
                if conflict {
                    WorkflowError::ExecutionAlreadyExists {
                        name: name.to_string(),
                    }
                } else {
                    WorkflowError::Service(DisplayErrorContext(&err).to_string())
                }
            })?;
        Ok(ExecutionHandle {
            execution_arn: output.execution_arn().to_string(),
        })
    }
}
