use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use bilidown::cli::Args;
use bilidown::config::AppConfig;
use bilidown::downloader::{
    DownloadOptions, DownloadOutcome, Downloader, FfmpegMuxer, OverwritePolicy,
};
use bilidown::logging::init_logging;
use bilidown::progress::{ProgressReporter, SilentProgress, TerminalProgress};
use clap::Parser;
use mesio::{ResumableFetcher, create_client};
use platforms_parser::extractor::client_with_timeout;
use platforms_parser::{Bilibili, ContentIdentifier};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Command line overrides. These apply to this run only and are never saved.
fn apply_overrides(config: &mut AppConfig, args: &Args) {
    if let Some(dir) = &args.output_dir {
        config.base_download_dir = dir.clone();
    }
    if let Some(sessdata) = &args.sessdata {
        config.sessdata = Some(sessdata.clone());
    }
    if args.overwrite {
        config.overwrite_strategy = OverwritePolicy {
            overwrite_existing: true,
            higher_quality_replace: false,
        };
    }
    if args.no_quality_replace {
        config.overwrite_strategy.higher_quality_replace = false;
    }
    if args.concurrent {
        config.concurrent_dash = true;
    }
    if let Some(timeout) = args.timeout {
        config.network.timeout_secs = timeout;
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    init_logging(args.verbose, args.quiet)?;

    let id = ContentIdentifier::extract(&args.input)?;
    info!(%id, "Extracted video id");

    let config_path = args.config.clone().unwrap_or_else(AppConfig::default_path);
    let mut config = AppConfig::load(&config_path)
        .await
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    let configured_ffmpeg = args.ffmpeg.clone().or_else(|| config.ffmpeg.path.clone());
    let ffmpeg = FfmpegMuxer::locate(configured_ffmpeg.as_deref())?;
    info!(path = %ffmpeg.program.display(), version = %ffmpeg.version, "Using ffmpeg");
    if ffmpeg.auto_configured && args.ffmpeg.is_none() {
        config.ffmpeg.path = Some(ffmpeg.program.clone());
        match config.save().await {
            Ok(()) => info!(path = %ffmpeg.program.display(), "Saved ffmpeg location to config"),
            Err(e) => warn!(error = %e, "Failed to save ffmpeg location"),
        }
    }

    apply_overrides(&mut config, &args);

    let mut bilibili = Bilibili::new(
        client_with_timeout(config.network.timeout())?,
        config.session().map(str::to_string),
    )
    .with_catalog(config.quality_catalog());
    if let Some(user_agent) = &config.network.user_agent {
        bilibili = bilibili.with_user_agent(user_agent);
    }
    if !bilibili.has_session() {
        info!("No SESSDATA configured, high qualities may be unavailable");
    }
    let metadata = bilibili.metadata_resolver();

    let downloader_config = config.downloader_config();
    let fetcher = ResumableFetcher::new(create_client(&downloader_config)?, downloader_config);

    let progress: Arc<dyn ProgressReporter> = if args.no_progress || args.quiet {
        Arc::new(SilentProgress)
    } else {
        Arc::new(TerminalProgress::new())
    };

    let downloader = Downloader::new(
        Arc::new(bilibili),
        Arc::new(metadata),
        fetcher,
        Arc::new(FfmpegMuxer::new(ffmpeg.program)),
        progress,
        DownloadOptions {
            base_dir: config.base_download_dir.clone(),
            policy: config.overwrite_strategy,
            concurrent_dash: config.concurrent_dash,
        },
    );

    match downloader.run(&id).await {
        Some(DownloadOutcome::Downloaded { output, .. }) => {
            println!("{}", output.display());
            Ok(ExitCode::SUCCESS)
        }
        Some(DownloadOutcome::Skipped { existing, .. }) => {
            println!("{}", existing.path.display());
            Ok(ExitCode::SUCCESS)
        }
        None => Ok(ExitCode::FAILURE),
    }
}
