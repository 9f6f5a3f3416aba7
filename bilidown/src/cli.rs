//! Command line arguments.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "bilidown",
    version,
    about = "Download Bilibili videos in the best available quality",
    long_about = "Resolves a Bilibili video link or id (av/BV), downloads the best quality the \
                  session can access and muxes DASH streams with ffmpeg. Interrupted downloads \
                  resume from their .part files."
)]
pub struct Args {
    /// Video link or id, e.g. `https://www.bilibili.com/video/BV1xx411c7mD` or `av170001`
    pub input: String,

    /// Configuration file [default: <config dir>/bilidown/config.toml]
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Base download directory, overrides `base_download_dir`
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// SESSDATA cookie (or a full cookie string) for member-only qualities
    #[arg(long, env = "BILIDOWN_SESSDATA", hide_env_values = true)]
    pub sessdata: Option<String>,

    /// Replace an existing download regardless of its quality
    #[arg(long)]
    pub overwrite: bool,

    /// Do not replace an existing download with a better quality
    #[arg(long)]
    pub no_quality_replace: bool,

    /// Download DASH video and audio concurrently
    #[arg(long)]
    pub concurrent: bool,

    /// ffmpeg executable or the directory containing it
    #[arg(long, value_name = "PATH")]
    pub ffmpeg: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Enable debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable progress bars
    #[arg(long)]
    pub no_progress: bool,
}
