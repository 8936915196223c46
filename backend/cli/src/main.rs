mod api;
mod chat_cmd;
mod config;
mod properties_cmd;
mod serve_cmd;
mod status_cmd;
mod terminal_output;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use atlas_config::{validate, AtlasConfig};
use atlas_logging::init_logger;

use chat_cmd::ChatOptions;

#[derive(Parser)]
#[command(name = "atlas")]
#[command(about = "Atlas: streaming AI chat for San Francisco property listings")]
#[command(version)]
struct Cli {
    /// Config file (defaults to $ATLAS_CONFIG or ~/.atlas/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the chat gateway
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
        /// Address to bind the HTTP server to
        #[arg(long)]
        bind: Option<String>,
    },
    /// Chat with the assistant in this terminal
    Chat {
        /// Property id to focus on first
        #[arg(short, long)]
        property: Option<String>,
        /// Gateway base URL
        #[arg(long)]
        server: Option<String>,
        /// Prior messages sent with each turn
        #[arg(long)]
        history_window: Option<usize>,
    },
    /// List the property catalog
    Properties {
        /// Gateway base URL
        #[arg(long)]
        server: Option<String>,
        /// Skip the gateway and print the built-in catalog
        #[arg(long)]
        offline: bool,
    },
    /// Check whether a gateway is running
    Status {
        /// Gateway base URL
        #[arg(long)]
        server: Option<String>,
    },
    /// Print the effective configuration with secrets masked
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (path, mut config) = config::load(cli.config.as_deref()).await?;

    // Keep the chat screen clear of routine logs unless RUST_LOG asks for them.
    let level = match cli.command {
        Commands::Chat { .. } => "warn",
        _ => config.logging.level.as_str(),
    };
    init_logger(level, config.logging.dir.as_deref().map(Path::new));
    report_config(&path, &config);

    match cli.command {
        Commands::Serve { port, bind } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(bind) = bind {
                config.server.bind_address = bind;
            }
            serve_cmd::run(&config).await?;
        }
        Commands::Chat {
            property,
            server,
            history_window,
        } => {
            chat_cmd::run(ChatOptions {
                server_url: server.unwrap_or(config.chat.server_url),
                history_window: history_window.unwrap_or(config.chat.history_window),
                property,
            })
            .await?;
        }
        Commands::Properties { server, offline } => {
            properties_cmd::run(&server.unwrap_or(config.chat.server_url), offline).await?;
        }
        Commands::Status { server } => {
            status_cmd::run(&server.unwrap_or(config.chat.server_url)).await?;
        }
        Commands::Config => {
            println!("# {}", path.display());
            println!(
                "{}",
                serde_json::to_string_pretty(&config::redacted_view(&config)?)?
            );
        }
    }

    Ok(())
}

/// Config warnings surface once the subscriber is installed.
fn report_config(path: &Path, config: &AtlasConfig) {
    info!(path = %path.display(), "Configuration loaded");
    for warning in validate(config).warnings {
        warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
}
