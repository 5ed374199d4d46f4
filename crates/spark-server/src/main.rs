//! Spark Job Server - Main entry point

use anyhow::Result;
use spark_common::logging::{init_logging, LogConfig};
use std::sync::Arc;
use tracing::info;

use spark_server::{
    api,
    config::Config,
    features::{jobs::RandomIdGenerator, JobsContext},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Environment variables take precedence over these defaults
    let log_config = LogConfig::builder()
        .log_file_prefix("spark-server")
        .filter_directives("spark_server=debug,spark_common=info,tower_http=debug")
        .build()
        .merge_env()?;

    let _guard = init_logging(&log_config)?;

    info!("Starting Spark job server");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    let store = spark_common::store::connect(&config.store)?;

    let ctx = JobsContext::new(store, config.jobs.index.clone())
        .with_ids(Arc::new(RandomIdGenerator::new()))
        .with_settings(config.jobs.index_settings())
        .with_retry(config.store.retry_policy());

    info!(index = %ctx.index, "Jobs are recorded in index");

    api::serve(config, ctx).await
}
