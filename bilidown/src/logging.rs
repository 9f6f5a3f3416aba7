//! Logging setup for the command line.

use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use crate::{Error, Result};

/// Filter used when neither a verbosity flag nor `RUST_LOG` is given.
pub const DEFAULT_LOG_FILTER: &str = "bilidown=info,mesio_engine=info,platforms_parser=info";

fn build_filter(verbose: bool, quiet: bool) -> EnvFilter {
    if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug,hyper_util=info,reqwest=info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    }
}

/// Install the global subscriber, writing to stderr.
pub fn init_logging(verbose: bool, quiet: bool) -> Result<()> {
    tracing_subscriber::registry()
        .with(build_filter(verbose, quiet))
        .with(
            fmt::layer()
                .with_target(verbose)
                .with_writer(std::io::stderr),
        )
        .try_init()
        .map_err(|e| Error::config(format!("failed to initialize logging: {e}")))
}
