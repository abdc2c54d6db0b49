//! SessionStone CLI - demo server and store maintenance.
//!
//! ```bash
//! sessionstone serve --port 3000
//! curl -c jar -b jar http://127.0.0.1:3000/
//! ```
//!
//! See `sessionstone --help` for all available commands and options.

mod app;
mod server;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sessionstone_core::config::{SessionStoneConfig, DEFAULT_CONFIG_FILE};
use sessionstone_core::session::Store;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sessionstone", about = "SessionStone session demo server", version)]
struct Cli {
    /// Configuration file
    #[arg(long, short, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the demo application
    Serve {
        /// Listen address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Listen port
        #[arg(long, short, default_value_t = 3000)]
        port: u16,
    },

    /// Remove expired sessions from the configured store once
    Gc,

    /// Validate and print the resolved configuration
    CheckConfig,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = SessionStoneConfig::load_from(&cli.config)?;

    env_logger::Builder::new()
        .filter_level(config.logging.level_filter())
        .parse_default_env()
        .init();

    config.validate()?;

    match cli.command {
        Commands::Serve { host, port } => {
            let addr = format!("{}:{}", host, port)
                .parse()
                .with_context(|| format!("Invalid listen address {}:{}", host, port))?;
            server::serve(addr, &config).await
        }
        Commands::Gc => {
            let store = server::open_store(&config.store)?;
            let removed = store.gc().await?;
            println!("Removed {} expired sessions", removed);
            Ok(())
        }
        Commands::CheckConfig => {
            println!("{:#?}", redacted(config));
            Ok(())
        }
    }
}

/// Configuration as it was resolved, with the secret masked
fn redacted(mut config: SessionStoneConfig) -> SessionStoneConfig {
    if !config.sessions.secret.is_empty() {
        config.sessions.secret = "<redacted>".to_string();
    }
    config
}
