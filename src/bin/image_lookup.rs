use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use serde_json::json;
use tweet_image_parser::app;
use tweet_image_parser::aws::build_sdk_config;
use tweet_image_parser::config;
use tweet_image_parser::store::DedupGateway;

#[derive(Parser, Debug)]
#[command(about = "Inspect (or seed) the dedup record for an image URL")]
struct Args {
    /// Path to YAML config (defaults to ./config.yaml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Image URL to look up
    #[arg(long)]
    url: String,

    /// Mark the URL as seen with this identifier before looking it up
    #[arg(long)]
    mark: Option<String>,
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
    let sdk = build_sdk_config(&cfg.aws).await;
    let store = app::build_store(&cfg, &sdk).await?;
    let gateway = DedupGateway::new(store, cfg.store.retention_days);

    if let Some(identifier) = &args.mark {
        gateway.record(&args.url, &format!("{identifier}.csv")).await;
    }

    let lookup = gateway.lookup(&args.url).await;
    let out = json!({
        "image_url": args.url,
        "seen": lookup.seen,
        "count": lookup.count,
        "items": lookup.raw.items,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
