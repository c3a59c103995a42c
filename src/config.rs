//! Configuration loader and validator for the tweet image parser.
//!
//! Settings come from an optional YAML file and are then overridden by the
//! environment variables a deployed function is configured with
//! (`DdbImageTable`, `StateMachineArn`, ...). Resolution happens once at
//! process start.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const ENV_TABLE: &str = "DdbImageTable";
pub const ENV_STATE_MACHINE: &str = "StateMachineArn";
pub const ENV_REGION: &str = "AWS_REGION";
pub const ENV_ENDPOINT: &str = "AWS_ENDPOINT_URL";
pub const ENV_FUNCTION_NAME: &str = "FUNCTION_NAME";
pub const ENV_LAMBDA_FUNCTION_NAME: &str = "AWS_LAMBDA_FUNCTION_NAME";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub app: App,
    pub store: Store,
    pub workflow: Workflow,
    pub aws: Aws,
    pub telemetry: Telemetry,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct App {
    /// Name reported as `LambdaName` in the metrics document.
    pub function_name: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            function_name: "tweet-image-parser".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Dynamodb,
    Sqlite,
}

/// Dedup store settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Store {
    pub backend: StoreBackend,
    /// DynamoDB table name (`DdbImageTable`).
    pub table: String,
    /// Partition key attribute holding the image URL.
    pub key_attribute: String,
    /// Days until a dedup record's `expire_at`.
    pub retention_days: u32,
    pub sqlite_url: String,
}

impl Default for Store {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Dynamodb,
            table: String::new(),
            key_attribute: "img_url".into(),
            retention_days: 15,
            sqlite_url: "sqlite://./data/images.db".into(),
        }
    }
}

/// Workflow engine settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Workflow {
    /// Step Functions state machine ARN (`StateMachineArn`).
    pub state_machine_arn: String,
}

/// Shared AWS client settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Aws {
    pub region: String,
    /// Endpoint override for local stacks.
    pub endpoint_url: Option<String>,
}

impl Default for Aws {
    fn default() -> Self {
        Self {
            region: "us-east-1".into(),
            endpoint_url: None,
        }
    }
}

/// Metrics document settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Telemetry {
    pub namespace: String,
    /// Value of the `step` dimension.
    pub step: String,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self {
            namespace: "TwitterRekognition".into(),
            step: "Parser".into(),
        }
    }
}

impl Config {
    /// Apply overrides from `lookup` (normally the process environment).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(table) = non_empty(ENV_TABLE) {
            self.store.table = table;
        }
        if let Some(arn) = non_empty(ENV_STATE_MACHINE) {
            self.workflow.state_machine_arn = arn;
        }
        if let Some(region) = non_empty(ENV_REGION) {
            self.aws.region = region;
        }
        if let Some(endpoint) = non_empty(ENV_ENDPOINT) {
            self.aws.endpoint_url = Some(endpoint);
        }
        let function_name =
            non_empty(ENV_FUNCTION_NAME).or_else(|| non_empty(ENV_LAMBDA_FUNCTION_NAME));
        if let Some(name) = function_name {
            self.app.function_name = name;
        }
    }
}

/// Load configuration from a YAML file, apply environment overrides and validate.
/// - If `path` is None, uses `config.yaml` in the current working directory
///   when it exists, otherwise starts from defaults.
/// - An explicitly given path must exist.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    load_with(path, |key| std::env::var(key).ok())
}

/// Same as [`load`] with an injectable environment.
pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut cfg = match path {
        Some(p) => parse(&fs::read_to_string(p)?)?,
        None => {
            let default_path = Path::new("config.yaml");
            if default_path.exists() {
                parse(&fs::read_to_string(default_path)?)?
            } else {
                Config::default()
            }
        }
    };
    cfg.apply_env(lookup);
    validate(&cfg)?;
    Ok(cfg)
}

fn parse(content: &str) -> Result<Config, ConfigError> {
    // An empty file deserializes to `null`; treat it as all defaults.
    if content.trim().is_empty() {
        return Ok(Config::default());
    }
    Ok(serde_yaml::from_str(content)?)
}

/// Validate a configuration instance.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.function_name.trim().is_empty() {
        return Err(ConfigError::Invalid("app.function_name must be non-empty"));
    }

    match cfg.store.backend {
        StoreBackend::Dynamodb => {
            if cfg.store.table.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "store.table (DdbImageTable) must be non-empty",
                ));
            }
        }
        StoreBackend::Sqlite => {
            if cfg.store.sqlite_url.trim().is_empty() {
                return Err(ConfigError::Invalid("store.sqlite_url must be non-empty"));
            }
        }
    }
    if cfg.store.key_attribute.trim().is_empty() {
        return Err(ConfigError::Invalid("store.key_attribute must be non-empty"));
    }
    if cfg.store.retention_days == 0 {
        return Err(ConfigError::Invalid("store.retention_days must be > 0"));
    }

    if cfg.aws.region.trim().is_empty() {
        return Err(ConfigError::Invalid("aws.region must be non-empty"));
    }

    if cfg.workflow.state_machine_arn.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "workflow.state_machine_arn (StateMachineArn) must be non-empty",
        ));
    }

    if cfg.telemetry.namespace.trim().is_empty() {
        return Err(ConfigError::Invalid("telemetry.namespace must be non-empty"));
    }
    if cfg.telemetry.step.trim().is_empty() {
        return Err(ConfigError::Invalid("telemetry.step must be non-empty"));
    }

    Ok(())
}

/// Returns a sample YAML configuration.
pub fn example() -> &'static str {
    r#"app:
  function_name: "tweet-image-parser"

store:
  # dynamodb | sqlite
  backend: dynamodb
  table: "TwitterImageTable"
  key_attribute: "img_url"
  retention_days: 15
  sqlite_url: "sqlite://./data/images.db"

workflow:
  state_machine_arn: "arn:aws:states:us-east-1:123456789012:stateMachine:ImageRecognition"

aws:
  region: "us-east-1"

telemetry:
  namespace: "TwitterRekognition"
  step: "Parser"
"#
}
