//! Tracing setup shared by both binaries

use crate::cli::LogFormat;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Crates whose events follow `-v`/`-q`; everything else logs warnings only
const LOG_TARGETS: &[&str] = &[
    "minio_provision",
    "provision_core",
    "provision_secrets",
    "provision_minio",
];

/// Filter directives for the given verbosity
pub fn directives(verbose: u8, quiet: bool) -> String {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    LOG_TARGETS
        .iter()
        .map(|target| format!("{}={}", target, level))
        .chain(std::iter::once("warn".to_string()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Initialize tracing with appropriate verbosity. `RUST_LOG` overrides the
/// flags.
pub fn init_tracing(verbose: u8, quiet: bool, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directives(verbose, quiet)));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}
