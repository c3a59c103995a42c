use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::Value;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;
use tracing::info;
use uuid::Uuid;

use tweet_image_parser::app;
use tweet_image_parser::config;
use tweet_image_parser::model::{InputRecord, InvocationContext};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Dedup a batch of tweets and start image recognition for new photos"
)]
struct Args {
    /// Path to YAML config file (defaults to ./config.yaml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON file holding the batch (an array of tweets); reads stdin when omitted or "-"
    #[arg(long)]
    input: Option<PathBuf>,

    /// Invocation id reported with the metrics; a random UUID when omitted
    #[arg(long)]
    request_id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(args.config.as_deref())?;

    let raw = match args.input.as_deref() {
        Some(p) if p.as_os_str() != "-" => tokio::fs::read_to_string(p)
            .await
            .with_context(|| format!("failed to read {}", p.display()))?,
        _ => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("failed to read batch from stdin")?;
            buf
        }
    };
    let records = parse_batch(&raw)?;

    let ctx = InvocationContext::new(
        args.request_id
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        cfg.app.function_name.clone(),
    );
    info!(request_id = %ctx.request_id, tweets = records.len(), "invoking parser");

    let handler = app::build_handler(&cfg).await?;
    let ok = handler.invoke(&records, &ctx).await?;
    println!("{ok}");
    Ok(())
}

fn parse_batch(raw: &str) -> Result<Vec<InputRecord>> {
    let value: Value = serde_json::from_str(raw).context("batch is not valid JSON")?;
    let Value::Array(items) = value else {
        bail!("batch must be a JSON array of tweets");
    };
    Ok(items.into_iter().map(InputRecord).collect())
}
