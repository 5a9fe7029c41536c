//! CLI entry point for paperfetch.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use paperfetch_core::config::load_file_config;
use paperfetch_core::{CommandSink, Pipeline, PipelineConfig, UploadStatus};
use tracing::{debug, error, info, warn};

mod cli;

use cli::Args;

/// PDF placed, upload succeeded or skipped.
const EXIT_OK: u8 = 0;
/// The pipeline failed; nothing was placed.
const EXIT_FAILED: u8 = 1;
/// PDF placed but the uploader failed.
const EXIT_UPLOAD_FAILED: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(args.default_log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    match run(&args).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{e:#}");
            ExitCode::from(EXIT_FAILED)
        }
    }
}

async fn run(args: &Args) -> Result<u8> {
    let mut config = PipelineConfig::default();
    if let Some(file) = load_file_config(args.config.as_deref()).context("loading config file")? {
        config.apply_file(&file);
    }
    args.apply_to(&mut config);

    let sink = Arc::new(CommandSink::from_config(&config.upload));
    let pipeline = Pipeline::new(config)?.with_sink(sink);

    info!(reference = %args.reference, "paperfetch starting");
    let outcome = pipeline
        .run(&args.reference)
        .await
        .with_context(|| format!("could not fetch '{}'", args.reference))?;

    println!("{}", outcome.path.display());
    info!(
        provider = %outcome.provider,
        bytes = outcome.byte_size,
        sha256 = %outcome.content_hash,
        "Done"
    );

    match outcome.upload {
        UploadStatus::Delivered | UploadStatus::Skipped => Ok(EXIT_OK),
        UploadStatus::Failed(reason) => {
            warn!(path = %outcome.path.display(), "PDF kept locally; upload failed: {reason}");
            Ok(EXIT_UPLOAD_FAILED)
        }
    }
}
