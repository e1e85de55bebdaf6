// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! dlbd: the DICOM load balancer daemon.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use dlb_core::{Configuration, CoreConfig};
use dlb_daemon::Supervisor;

/// DICOM load balancer: accepts C-STORE associations and fans instances
/// out over configured destinations with per-patient affinity.
#[derive(Debug, Parser)]
#[command(version)]
struct App {
    /// Path to a configuration file, or a directory of configuration files
    #[arg(long = "config-file-path", default_value = "./config.json")]
    config_file_path: PathBuf,
}

fn main() -> ExitCode {
    let app = App::parse();

    let config = match Configuration::load(&app.config_file_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let _guard = init_logging(&config.core);
    run(config)
}

#[tokio::main]
async fn run(config: Configuration) -> ExitCode {
    info!(version = env!("CARGO_PKG_VERSION"), "starting dicom load balancer");

    let supervisor = match Supervisor::start(&config).await {
        Ok(supervisor) => supervisor,
        Err(e) => {
            error!("startup failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received shutdown signal"),
        Err(e) => error!("failed to wait for shutdown signal: {}", e),
    }

    supervisor.shutdown().await;
    ExitCode::SUCCESS
}

/// Install the tracing subscriber: env-filtered, to stdout and to a daily
/// rolling file under the configured log directory. `log-format = "json"`
/// selects JSON lines; anything else is compact text.
fn init_logging(core: &CoreConfig) -> tracing_appender::non_blocking::WorkerGuard {
    let _ = std::fs::create_dir_all(&core.log_dir_path);
    let file_appender = tracing_appender::rolling::daily(&core.log_dir_path, "dlbd.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    if core.log_format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(file_writer),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().compact())
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_ansi(false)
                    .with_writer(file_writer),
            )
            .init();
    }
    guard
}
