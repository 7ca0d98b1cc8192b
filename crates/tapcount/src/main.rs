// SPDX-FileCopyrightText: 2026 Tapcount Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tapcount - keeps live counter messages fresh under Telegram's edit limits.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;
mod shutdown;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

/// Tapcount - live counter message updater.
#[derive(Parser, Debug)]
#[command(name = "tapcount", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the scheduler, the gateway and the Telegram transport.
    Serve,
    /// Validate configuration and exit.
    CheckConfig,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => tapcount_config::load_and_validate_path(path),
        None => tapcount_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            tapcount_config::render_errors(&errors);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Some(Commands::Serve) => match serve::run_serve(config).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("tapcount: {e}");
                ExitCode::FAILURE
            }
        },
        Some(Commands::CheckConfig) => {
            println!(
                "tapcount: configuration OK (worker.concurrency={}, worker.rate_limit_per_second={})",
                config.worker.concurrency, config.worker.rate_limit_per_second
            );
            ExitCode::SUCCESS
        }
        None => {
            println!("tapcount: use --help for available commands");
            ExitCode::SUCCESS
        }
    }
}
