//! tunnelwatch - VPN connection lifecycle monitor
//!
//! Follows the status lines of a tunnel daemon, classifies its faults and
//! drives automatic reconnection with a visible retry countdown.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tunnelwatch_core::{error::TunnelwatchError, init_logging};

mod cli;

#[derive(Parser)]
#[command(name = "tunnelwatch")]
#[command(about = "VPN connection lifecycle monitor with automatic reconnection")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow tunnel status lines on stdin and report connection status
    Monitor {
        /// Configuration file (defaults to ~/.config/tunnelwatch/config.toml)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Emit one JSON object per line instead of text
        #[arg(long)]
        json: bool,
    },
    /// Show how a raw fault code is classified
    Classify {
        /// Raw fault code, e.g. LOOKUP_FAILED
        code: String,

        /// Optional fault description
        description: Vec<String>,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Show the effective configuration
    Status {
        /// Configuration file (defaults to ~/.config/tunnelwatch/config.toml)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() {
    // Initialize logging
    if let Err(e) = init_logging() {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(2);
    }

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Monitor { config, json } => cli::monitor::run_monitor(config, json),
        Commands::Classify {
            code,
            description,
            json,
        } => cli::classify::run_classify(&code, &description.join(" "), json),
        Commands::Status { config } => cli::status::run_status(config),
    };

    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            let exit_code = match e {
                // Configuration errors (exit code 2)
                TunnelwatchError::Config(_)
                | TunnelwatchError::Toml(_)
                | TunnelwatchError::TomlSerialize(_) => 2,
                // Runtime errors (exit code 1)
                TunnelwatchError::Tunnel(_)
                | TunnelwatchError::Connect(_)
                | TunnelwatchError::Io(_) => 1,
            };

            eprintln!("{}", e);
            std::process::exit(exit_code);
        }
    }
}
