// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Autonomous File-Driven Task Orchestrator daemon (`fte-orchestrator`).
//!
//! Watches a vault's `Needs_Action` and `Approvals` directories and drives
//! every task it finds there through the state machine until it lands in
//! `Done` or `Rejected`. Typically started under a process supervisor and
//! stopped by dropping a stop-hook file in the vault root rather than by
//! signal, but SIGTERM/SIGINT are also honored for a clean lock release.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::path::PathBuf;

use fte_daemon::{lifecycle, LifecycleError, Scheduler, SchedulerConfig};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("fte-orchestrator {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" => {
                print_usage();
                return Ok(());
            }
            _ => {}
        }
    }

    let config_path = config_path_from_env_or_args();
    let config = SchedulerConfig::from_yaml(&config_path)?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!(vault = %config.vault_path.display(), "starting orchestrator");

    let handle = match lifecycle::startup(&config.vault_path) {
        Ok(handle) => handle,
        Err(LifecycleError::LockFailed(_)) => {
            let pid_path = config.vault_path.join(".fte").join("scheduler.pid");
            let pid = std::fs::read_to_string(&pid_path).unwrap_or_default();
            eprintln!("fte-orchestrator is already running on this vault");
            if !pid.trim().is_empty() {
                eprintln!("  pid: {}", pid.trim());
            }
            std::process::exit(1);
        }
        Err(e) => {
            error!(error = %e, "failed to start orchestrator");
            return Err(e.into());
        }
    };

    let scheduler = Scheduler::new(handle.layout.clone(), &config);

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        result = scheduler.run() => {
            if let Err(e) = result {
                error!(error = %e, "scheduler loop exited with an error");
                return Err(e.into());
            }
        }
        _ = sigterm.recv() => {
            info!("received SIGTERM, shutting down");
        }
        _ = sigint.recv() => {
            info!("received SIGINT, shutting down");
        }
    }

    info!("orchestrator stopped");
    Ok(())
}

/// `FTE_CONFIG`, then a positional argument, then `fte-orchestrator.yaml`
/// in the current directory.
fn config_path_from_env_or_args() -> PathBuf {
    if let Ok(path) = std::env::var("FTE_CONFIG") {
        return PathBuf::from(path);
    }
    std::env::args().nth(1).map(PathBuf::from).unwrap_or_else(|| PathBuf::from("fte-orchestrator.yaml"))
}

fn print_usage() {
    println!("fte-orchestrator {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("USAGE:");
    println!("    fte-orchestrator [CONFIG_PATH]");
    println!();
    println!("Loads its configuration from CONFIG_PATH, or $FTE_CONFIG, or");
    println!("./fte-orchestrator.yaml, falling back to defaults if none is found.");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help       Print help information");
    println!("    -V, --version    Print version information");
}
