//! Spark Ingest - CSV to search index loader

use anyhow::{Context, Result};
use clap::Parser;
use spark_common::logging::{init_logging, LogConfig, LogLevel};
use spark_common::retry::retry;
use spark_common::store::{connect, StoreConfig};
use spark_ingest::pipeline::{
    IngestPipeline, PipelineOptions, RowPolicy, DEFAULT_BATCH_SIZE, DEFAULT_ID_FIELD,
    DEFAULT_INDEX, DEFAULT_SAMPLE_SIZE,
};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "spark-ingest")]
#[command(author, version, about = "Load a CSV file into a search index")]
struct Cli {
    /// CSV file with a header row
    #[arg(short, long, env = "INGEST_INPUT")]
    input: PathBuf,

    /// Destination index, recreated on every run
    #[arg(long, env = "INGEST_INDEX", default_value = DEFAULT_INDEX)]
    index: String,

    /// Column whose value becomes the document id
    #[arg(long, env = "INGEST_ID_FIELD", default_value = DEFAULT_ID_FIELD)]
    id_field: String,

    /// Reject the whole input if any row is malformed
    #[arg(long)]
    strict: bool,

    /// Documents fetched after loading as a sanity check
    #[arg(long, default_value_t = DEFAULT_SAMPLE_SIZE)]
    sample_size: usize,

    /// Operations per bulk request
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Stop between steps once this many seconds have passed
    #[arg(long, env = "INGEST_DEADLINE_SECS")]
    deadline_secs: Option<u64>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence over these defaults
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("spark-ingest")
        .build()
        .merge_env()?;

    let _guard = init_logging(&log_config)?;

    let store_config = StoreConfig::from_env()?;
    let store = connect(&store_config)?;

    // Bounded wait for the store to come up
    let probe = store.as_ref();
    let index = cli.index.as_str();
    retry(&store_config.retry_policy(), "wait_for_store", move || probe.index_exists(index))
        .await
        .context("Document store is unreachable")?;
    info!("Document store reachable");

    let cancel = CancellationToken::new();

    if let Some(secs) = cli.deadline_secs {
        let token = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            warn!(deadline_secs = secs, "Deadline reached, stopping at next step");
            token.cancel();
        });
    }

    {
        let token = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Received Ctrl+C, stopping at next step");
                token.cancel();
            }
        });
    }

    let options = PipelineOptions {
        index: cli.index.clone(),
        id_field: cli.id_field.clone(),
        policy: if cli.strict {
            RowPolicy::Strict
        } else {
            RowPolicy::Lenient
        },
        batch_size: cli.batch_size,
        sample_size: cli.sample_size,
        ..PipelineOptions::default()
    };

    info!(
        input = %cli.input.display(),
        index = %options.index,
        policy = ?options.policy,
        "Starting ingestion"
    );

    let pipeline = IngestPipeline::new(store, options).with_cancellation(cancel);
    let report = pipeline.ingest_path(&cli.input).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);

    if report.bulk_failures > 0 {
        anyhow::bail!("{} document(s) were rejected by the store", report.bulk_failures);
    }

    info!("Ingestion complete");
    Ok(())
}
