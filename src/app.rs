//! Wires configured collaborators into a [`BatchHandler`].
use crate::aws::build_sdk_config;
use crate::config::{Config, StoreBackend};
use crate::handler::BatchHandler;
use crate::store::{DedupGateway, DynamoImageStore, ImageStore, SqliteImageStore};
use crate::telemetry::EmfSink;
use crate::workflow::StepFunctionsEngine;
use anyhow::{Context, Result};
use aws_config::SdkConfig;
use std::sync::Arc;
use tracing::info;

pub async fn build_store(cfg: &Config, sdk: &SdkConfig) -> Result<Arc<dyn ImageStore>> {
    let store: Arc<dyn ImageStore> = match cfg.store.backend {
        StoreBackend::Dynamodb => {
            info!(table = %cfg.store.table, "using DynamoDB dedup store");
            Arc::new(DynamoImageStore::new(
                aws_sdk_dynamodb::Client::new(sdk),
                cfg.store.table.clone(),
                cfg.store.key_attribute.clone(),
            ))
        }
        StoreBackend::Sqlite => {
            info!(url = %cfg.store.sqlite_url, "using SQLite dedup store");
            let store = SqliteImageStore::connect(&cfg.store.sqlite_url)
                .await
                .context("failed to open SQLite dedup store")?;
            Arc::new(store)
        }
    };
    Ok(store)
}

/// Build the production handler: configured store, Step Functions and
/// EMF metrics on stdout.
pub async fn build_handler(cfg: &Config) -> Result<BatchHandler> {
    let sdk = build_sdk_config(&cfg.aws).await;
    let store = build_store(cfg, &sdk).await?;
    let dedup = DedupGateway::new(store, cfg.store.retention_days);

    let workflow = Arc::new(StepFunctionsEngine::new(
        aws_sdk_sfn::Client::new(&sdk),
        cfg.workflow.state_machine_arn.clone(),
    ));
    let metrics = Arc::new(EmfSink::stdout(
        cfg.telemetry.namespace.clone(),
        cfg.telemetry.step.clone(),
    ));

    Ok(BatchHandler::new(dedup, workflow, metrics))
}
