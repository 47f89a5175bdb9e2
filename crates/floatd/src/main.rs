// SPDX-FileCopyrightText: 2026 Floatd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Binary entry point for the floatd service.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::error;

use floatd::gc::DetachedFactory;
use floatd::serve;
use floatd_config::{load_config_from_path, validate_config};

/// floatd - Counter-Strike inspect-link resolution service.
#[derive(Parser, Debug)]
#[command(name = "floatd", version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short = 'c', long, default_value = "./floatd.toml")]
    config: PathBuf,

    /// Directory for driver session material; overrides
    /// bot_settings.data_directory.
    #[arg(short = 's', long = "steam-data")]
    steam_data: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match load_config_from_path(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: failed to load {}: {e}", cli.config.display());
            return ExitCode::from(1);
        }
    };
    if let Some(dir) = cli.steam_data {
        config.bot_settings.data_directory = Some(dir);
    }

    serve::init_tracing(&config.log_level);

    if let Err(errors) = validate_config(&config) {
        for message in &errors {
            eprintln!("error: {message}");
        }
        return ExitCode::from(1);
    }

    match serve::run(config, Arc::new(DetachedFactory)).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "fatal");
            eprintln!("error: {e}");
            ExitCode::from(1)
        }
    }
}
