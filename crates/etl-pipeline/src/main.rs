//! ETL Pipeline - extract and load entry point

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use etl_common::logging::{init_logging, LogConfig, LogLevel};
use etl_pipeline::{
    config::{PipelineConfig, DEFAULT_CONFIG_PATH},
    extract::{Dumper, UrlDownloader},
    load::{PostgresSink, Processor, TableMapper},
    storage,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "etl-pipeline")]
#[command(author, version, about = "Batch extract/load pipeline")]
struct Cli {
    /// Stage to run
    #[command(subcommand)]
    stage: Stage,

    /// Config file (TOML, YAML or JSON)
    #[arg(short, long, env = "ETL_CONFIG", default_value = DEFAULT_CONFIG_PATH, global = true)]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Stage {
    /// Stream records from the configured URL into batched artifacts
    Extract,

    /// Route every stored artifact to its table and insert it
    Load,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let prefix = match cli.stage {
        Stage::Extract => "etl-extract",
        Stage::Load => "etl-load",
    };

    // Environment variables take precedence over the flags
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix(prefix)
        .filter_directives("sqlx=warn,aws_config=warn,aws_smithy_runtime=warn,hyper=info")
        .build()
        .merge_env()?;

    let _log_guard = init_logging(&log_config)?;

    let config = PipelineConfig::from_file(&cli.config)?;
    info!(config = %cli.config.display(), "Configuration loaded");

    let sink = storage::from_config(&config.storage)
        .await
        .context("could not create storage sink")?;

    let outcome = match cli.stage {
        Stage::Extract => run_extract(&config, sink).await,
        Stage::Load => run_load(&config, sink).await,
    };

    if let Err(ref e) = outcome {
        error!(error = %e, "Execution failed");
    }
    outcome
}

async fn run_extract(config: &PipelineConfig, sink: Arc<dyn storage::Sink>) -> Result<()> {
    let extract = config.extract_config()?;

    let downloader = UrlDownloader::new(extract.downloader.clone())?;
    let shutdown = CancellationToken::new();
    let dumper = Dumper::new(&shutdown, extract.dumper, Arc::new(downloader), sink);

    let run = dumper.run();
    tokio::pin!(run);

    tokio::select! {
        result = &mut run => result?,
        _ = signal::ctrl_c() => {
            info!("Received Ctrl+C, stopping dumper");
            dumper.stop();
            // run() returns once the final flush has been attempted
            run.await?;
        },
    }

    info!("Extract complete");
    Ok(())
}

async fn run_load(config: &PipelineConfig, sink: Arc<dyn storage::Sink>) -> Result<()> {
    let load = config.load_config()?;

    let mapper = TableMapper::new(load.tables.clone())?;
    let db = PostgresSink::connect(&load.database, sink.clone()).await?;
    let processor = Processor::new(sink, Arc::new(db), mapper);

    let loaded = processor.process_files().await?;

    info!(artifacts = loaded, "Load complete");
    Ok(())
}
