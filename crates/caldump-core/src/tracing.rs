//! Tracing setup for caldump.
//!
//! Logs always go to stderr; stdout is reserved for command output so the
//! TSV report can be redirected to a file untouched.
//!
//! ```ignore
//! use caldump_core::tracing::{init_tracing, TracingConfig};
//!
//! init_tracing(TracingConfig::cli())?;
//! ```

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Errors that can occur during tracing initialization
#[derive(Debug, Error)]
pub enum TracingError {
    /// Failed to set global subscriber
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    /// `RUST_LOG` held a directive that does not parse
    #[error("failed to parse env filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),
}

/// Targets that log at the configured level; everything else stays quiet.
const CRATE_TARGETS: [&str; 4] = ["caldump", "caldump_core", "caldump_providers", "caldump_client"];

/// How chatty the CLI is on stderr.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// Level for caldump's own crates when `RUST_LOG` is not set.
    pub level: Level,
    /// Prefix lines with the module path and source location.
    pub verbose: bool,
}

impl TracingConfig {
    /// Warnings and errors only, bare messages.
    #[must_use]
    pub fn cli() -> Self {
        Self {
            level: Level::WARN,
            verbose: false,
        }
    }

    /// `--debug`: everything from caldump, with file/line locations.
    #[must_use]
    pub fn cli_debug() -> Self {
        Self {
            level: Level::DEBUG,
            verbose: true,
        }
    }

    /// The filter directive in effect, given the value of `RUST_LOG`.
    ///
    /// A non-empty `RUST_LOG` wins over the configured level.
    pub fn directive(&self, rust_log: Option<&str>) -> String {
        match rust_log.map(str::trim) {
            Some(from_env) if !from_env.is_empty() => from_env.to_string(),
            _ => CRATE_TARGETS
                .iter()
                .map(|target| format!("{target}={}", self.level))
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

/// Installs the global subscriber. Call once, before any command runs.
///
/// # Errors
///
/// Fails if a subscriber is already installed or `RUST_LOG` is malformed.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = EnvFilter::try_new(config.directive(rust_log.as_deref()))?;

    let layer = fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .without_time()
        .with_file(config.verbose)
        .with_line_number(config.verbose)
        .with_target(config.verbose);

    tracing::subscriber::set_global_default(tracing_subscriber::registry().with(filter).with(layer))?;
    Ok(())
}
