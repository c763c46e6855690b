//! TCP Server
//!
//! [`Server`] owns the listening socket. The accept loop runs on its own
//! task and spawns one task per accepted connection; a failed accept is
//! logged and the loop keeps going.
//!
//! The handler chain must be complete before serving starts. It is frozen
//! behind an `Arc` and shared read-only by every session.

use crate::commands::HandlerChain;
use crate::connection::{handle_connection, ConnectionStats};
use crate::protocol::reader::DEFAULT_MAX_FRAME_SIZE;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Close sessions that send nothing for this long
    pub idle_timeout: Option<Duration>,
    /// Largest frame a session will buffer
    pub max_frame_size: usize,
    /// Command that ends a session without reaching the chain
    pub disconnect_command: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: crate::DEFAULT_HOST.to_string(),
            port: crate::DEFAULT_PORT,
            idle_timeout: None,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            disconnect_command: "QUIT".to_string(),
        }
    }
}

impl ServerConfig {
    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// A RESP server.
///
/// # Example
///
/// ```no_run
/// use flashwire::commands::{HandlerChain, ServerCommands};
/// use flashwire::server::{Server, ServerConfig};
///
/// # async fn run() -> std::io::Result<()> {
/// let chain = HandlerChain::new().with(ServerCommands::new().into_table());
/// let server = Server::new(ServerConfig::default(), chain);
///
/// let listener = server.bind().await?;
/// server.run_until(listener, tokio::signal::ctrl_c()).await;
/// # Ok(())
/// # }
/// ```
pub struct Server {
    config: Arc<ServerConfig>,
    chain: Arc<HandlerChain>,
    stats: Arc<ConnectionStats>,
}

impl Server {
    /// Creates a server. The chain is frozen from here on.
    pub fn new(config: ServerConfig, chain: HandlerChain) -> Self {
        Self {
            config: Arc::new(config),
            chain: Arc::new(chain),
            stats: Arc::new(ConnectionStats::new()),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Shared connection statistics.
    pub fn stats(&self) -> Arc<ConnectionStats> {
        Arc::clone(&self.stats)
    }

    /// Binds the configured address.
    pub async fn bind(&self) -> std::io::Result<TcpListener> {
        let listener = TcpListener::bind(self.config.bind_address()).await?;
        info!(address = %listener.local_addr()?, "Listening");
        Ok(listener)
    }

    /// Accepts connections forever.
    pub async fn serve(&self, listener: TcpListener) {
        info!(
            providers = self.chain.len(),
            order = ?self.chain.order(),
            "Accepting connections"
        );

        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    let chain = Arc::clone(&self.chain);
                    let config = Arc::clone(&self.config);
                    let stats = Arc::clone(&self.stats);

                    // Spawn a task to handle this connection
                    tokio::spawn(async move {
                        handle_connection(stream, addr, chain, config, stats).await;
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            }
        }
    }

    /// Accepts connections until `shutdown` completes. Sessions already
    /// running are left to finish on their own.
    pub async fn run_until<F: Future>(&self, listener: TcpListener, shutdown: F) {
        tokio::select! {
            _ = self.serve(listener) => {}
            _ = shutdown => {
                info!("Shutdown signal received, no longer accepting connections");
            }
        }
    }
}
