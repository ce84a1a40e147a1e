// SPDX-FileCopyrightText: 2026 Larder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Larder - nutrition catalog cache with hardened food image retrieval.
//!
//! This is the binary entry point. Reports are written to stdout as JSON;
//! logs go to stderr.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod catalog;
mod doctor;
mod fetch;
mod input;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use larder_config::LarderConfig;

/// Larder - nutrition catalog cache with hardened food image retrieval.
#[derive(Parser, Debug)]
#[command(name = "larder", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Upsert catalog entries from a JSON file (`-` for stdin) and refresh stale images.
    Ingest {
        /// JSON object or array of objects.
        input: String,
    },
    /// Report whether a cached entry matches upstream's current hashes.
    Check {
        /// JSON object with `external_id`, `content_hash` and optional `image_signature`.
        input: String,
    },
    /// Re-fetch the images of a stored entry.
    Refresh {
        barcode: String,
        /// Refresh even when the stored images are healthy.
        #[arg(long)]
        force: bool,
    },
    /// Fetch one image through the SSRF-hardened fetcher.
    Fetch {
        url: String,
        /// Write the image bytes to this file.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Run diagnostic checks against the local environment.
    Doctor {
        /// Also run integrity, memory and DNS checks.
        #[arg(long)]
        deep: bool,
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
}

fn load_config(
    path: Option<&std::path::Path>,
) -> Result<LarderConfig, Vec<larder_config::ConfigError>> {
    match path {
        Some(path) => larder_config::load_and_validate_path(path),
        None => larder_config::load_and_validate(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(errors) => {
            larder_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.log.level);

    let result = match cli.command {
        Commands::Ingest { input } => catalog::run_ingest(&config, &input).await,
        Commands::Check { input } => catalog::run_check(&config, &input).await,
        Commands::Refresh { barcode, force } => {
            catalog::run_refresh(&config, &barcode, force).await
        }
        Commands::Fetch { url, output } => {
            fetch::run_fetch(&config, &url, output.as_deref()).await
        }
        Commands::Doctor { deep, plain } => {
            doctor::run_doctor(&config, cli.config.as_deref(), deep, plain).await
        }
    };

    if let Err(e) = result {
        eprintln!("larder: {e}");
        std::process::exit(1);
    }
}

const LOG_TARGETS: &[&str] = &[
    "larder",
    "larder_catalog",
    "larder_images",
    "larder_security",
    "larder_storage",
];

/// Initialize the tracing subscriber. `RUST_LOG` wins over the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let directives = LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={log_level}"))
        .collect::<Vec<_>>()
        .join(",");
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{directives},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_refresh_with_force() {
        let cli = Cli::try_parse_from(["larder", "refresh", "3017620422003", "--force"]).unwrap();
        match cli.command {
            Commands::Refresh { barcode, force } => {
                assert_eq!(barcode, "3017620422003");
                assert!(force);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from(["larder", "ingest", "-", "--config", "/tmp/larder.toml"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/larder.toml")));
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = larder_config::load_and_validate_str("").expect("defaults should be valid");
        assert_eq!(config.media.namespace, "foods");
        assert_eq!(config.fetch.max_redirects, 5);
    }
}
