//! FlashWire - A RESP Server Core
//!
//! This is the main entry point for the FlashWire server.
//! It parses the command line, builds the handler chain and serves it.

use clap::Parser;
use flashwire::commands::{HandlerChain, ServerCommands};
use flashwire::server::{Server, ServerConfig};
use std::time::Duration;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "flashwire", version, about = "A RESP server core")]
struct Args {
    /// Host to bind to
    #[arg(short = 'H', long, env = "FLASHWIRE_HOST", default_value = flashwire::DEFAULT_HOST)]
    host: String,

    /// Port to listen on
    #[arg(short, long, env = "FLASHWIRE_PORT", default_value_t = flashwire::DEFAULT_PORT)]
    port: u16,

    /// Close sessions idle for this many seconds
    #[arg(long)]
    idle_timeout_secs: Option<u64>,

    /// Largest frame accepted from a client, in bytes
    #[arg(long)]
    max_frame_size: Option<usize>,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        let defaults = ServerConfig::default();
        ServerConfig {
            host: self.host,
            port: self.port,
            idle_timeout: self.idle_timeout_secs.map(Duration::from_secs),
            max_frame_size: self.max_frame_size.unwrap_or(defaults.max_frame_size),
            ..defaults
        }
    }
}

fn print_banner(config: &ServerConfig) {
    println!(
        r#"
FlashWire v{} - RESP Server Core
──────────────────────────────────────────────────────────────
Server started on {}
Ready to accept connections.

Use Ctrl+C to shutdown gracefully.
"#,
        flashwire::VERSION,
        config.bind_address()
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Args::parse().into_config();

    // Set up logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    print_banner(&config);

    let chain = HandlerChain::new().with(ServerCommands::new().into_table());
    info!(providers = ?chain.provider_names(), "Handler chain ready");

    let server = Server::new(config, chain);
    let listener = server.bind().await?;

    // Set up graceful shutdown
    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    server.run_until(listener, shutdown).await;

    info!("Server shutdown complete");
    Ok(())
}
