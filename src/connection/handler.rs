//! Connection Handler Module
//!
//! This module handles individual client sessions. Each client gets its own
//! task that runs in a loop, reading frames and sending replies.
//!
//! ## Session Lifecycle
//!
//! ```text
//! 1. Client connects (TCP handshake)
//!        │
//!        ▼
//! 2. Session spawned inside its own tracing span
//!        │
//!        ▼
//! 3. ┌──────────────────────────────┐
//!    │      Main Loop               │
//!    │                              │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Read one frame          │ │  decode error / EOF -> close
//!    │  └───────────┬─────────────┘ │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Resolve in the chain    │ │  unknown -> -ERR reply
//!    │  └───────────┬─────────────┘ │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Write + flush reply     │ │  handler error -> close
//!    │  └───────────┬─────────────┘ │
//!    │              ▼               │
//!    │         [Loop back]          │
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 4. Socket closed, task ends
//! ```
//!
//! Requests on one session are handled strictly in order: the reply to a
//! command is flushed before the next frame is read.

use crate::commands::{DispatchError, HandlerChain, HandlerError};
use crate::protocol::{Flag, FrameError, FrameReader, Message, Part};
use crate::server::ServerConfig;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tracing::{debug, info_span, trace, warn, Instrument};

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total commands processed
    pub commands_processed: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a new connection and returns its sequence number.
    pub fn connection_opened(&self) -> u64 {
        self.active_connections.fetch_add(1, Ordering::Relaxed);
        self.connections_accepted.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: u64) {
        self.bytes_read.fetch_add(count, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Errors that end a session abnormally.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error while writing
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The incoming frame could not be read
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// A handler failed
    #[error("handler error: {0}")]
    Handler(#[from] HandlerError),

    /// No frame arrived within the idle timeout
    #[error("idle for more than {0:?}")]
    IdleTimeout(Duration),
}

/// State owned by one client session.
///
/// The stream is generic so sessions can run over anything that reads and
/// writes bytes, not only TCP.
pub struct Session<S> {
    /// Reads frames; the wrapped writer carries replies
    reader: FrameReader<BufWriter<S>>,

    /// The handler chain (shared, read-only)
    chain: Arc<HandlerChain>,

    /// Server settings (shared)
    config: Arc<ServerConfig>,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> Session<S> {
    /// Creates a new session over `stream`.
    pub fn new(
        stream: S,
        chain: Arc<HandlerChain>,
        config: Arc<ServerConfig>,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        Self {
            reader: FrameReader::with_max_frame_size(BufWriter::new(stream), config.max_frame_size)
                .with_read_timeout(config.idle_timeout),
            chain,
            config,
            stats,
        }
    }

    /// Runs the session until the client leaves or an error occurs.
    ///
    /// A clean close and an explicit disconnect both return `Ok(())`.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        debug!("Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => debug!("Client disconnected"),
            Err(ConnectionError::IoError(io_err))
                if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
            {
                debug!("Connection reset by client")
            }
            Err(e) => warn!(error = %e, "Session ended with error"),
        }

        result
    }

    /// The main read-execute-respond loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            let message = match self.read_message().await {
                Ok(message) => message,
                Err(ConnectionError::Frame(FrameError::Closed)) => return Ok(()),
                Err(e) => return Err(e),
            };

            if message.parts.is_empty() {
                trace!("Frame carries no command, skipping");
                continue;
            }

            self.stats.command_processed();

            match self.execute(message.parts) {
                Ok(Some(reply)) => self.send_response(&reply).await?,
                Ok(None) => {}
                Err(err) => {
                    if let Some(reply) = err.reply() {
                        self.send_response(reply).await?;
                    }
                    if err.is_disconnect() {
                        debug!("Client requested disconnect");
                        return Ok(());
                    }
                    return Err(err.into());
                }
            }
        }
    }

    /// Reads one frame. The idle timeout applies to each wait for bytes.
    async fn read_message(&mut self) -> Result<Message, ConnectionError> {
        let before = self.reader.bytes_read();
        let result = self.reader.read_message().await;
        self.stats.bytes_read(self.reader.bytes_read() - before);

        match result {
            Ok(message) => Ok(message),
            Err(FrameError::Idle(limit)) => Err(ConnectionError::IdleTimeout(limit)),
            Err(e) => Err(e.into()),
        }
    }

    /// Resolves and runs one command. `parts` holds the command name
    /// followed by its arguments.
    fn execute(&self, mut parts: Vec<Part>) -> Result<Option<Message>, HandlerError> {
        let name_part = parts.remove(0);
        let name = name_part.text().to_uppercase();
        trace!(command = %name, args = parts.len(), "Executing command");

        if name.eq_ignore_ascii_case(&self.config.disconnect_command) {
            return Err(HandlerError::disconnect());
        }

        match self.chain.dispatch(&name, &parts) {
            Ok(reply) => Ok(reply),
            Err(DispatchError::UnknownCommand(_)) => {
                debug!(command = %name, "Unknown command");
                Ok(Some(unknown_command(name_part.flag, &name)))
            }
            Err(DispatchError::Handler(err)) => Err(err),
        }
    }

    /// Writes and flushes a reply.
    async fn send_response(&mut self, response: &Message) -> Result<(), ConnectionError> {
        let bytes = response.serialize();
        let writer = self.reader.get_mut();
        writer.write_all(&bytes).await?;
        writer.flush().await?;
        self.stats.bytes_written(bytes.len());
        trace!(bytes = bytes.len(), "Sent response");
        Ok(())
    }
}

/// Builds the reply for a command no provider knows. Status, error and
/// integer markers are kept in front of the name.
fn unknown_command(flag: Flag, name: &str) -> Message {
    match flag {
        Flag::Integer | Flag::Status | Flag::Error => {
            Message::err(format!("unknown command '{}{}'", flag, name))
        }
        _ => Message::err(format!("unknown command '{}'", name)),
    }
}

/// Handles a client connection.
///
/// This is a convenience function that runs a [`Session`] to completion
/// inside a `session` span carrying the client address, and keeps the
/// shared statistics up to date.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    chain: Arc<HandlerChain>,
    config: Arc<ServerConfig>,
    stats: Arc<ConnectionStats>,
) {
    let id = stats.connection_opened();
    let span = info_span!("session", id, client = %addr);

    let session = Session::new(stream, chain, config, Arc::clone(&stats));
    // Errors are already logged inside the session span
    let _ = session.run().instrument(span).await;

    stats.connection_closed();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{CommandTable, ServerCommands};
    use tokio::io::{duplex, AsyncReadExt, DuplexStream};

    fn spawn_session(chain: HandlerChain, config: ServerConfig) -> (DuplexStream, Arc<ConnectionStats>) {
        let (client, server) = duplex(64 * 1024);
        let stats = Arc::new(ConnectionStats::new());
        let session = Session::new(
            server,
            Arc::new(chain),
            Arc::new(config),
            Arc::clone(&stats),
        );
        tokio::spawn(session.run());
        (client, stats)
    }

    async fn roundtrip(client: &mut DuplexStream, request: &[u8]) -> Vec<u8> {
        client.write_all(request).await.unwrap();
        let mut buf = vec![0u8; 256];
        let n = client.read(&mut buf).await.unwrap();
        buf.truncate(n);
        buf
    }

    #[test]
    fn test_unknown_command_message() {
        assert_eq!(
            unknown_command(Flag::Bulk, "PING").message,
            "ERR unknown command 'PING'"
        );
        assert_eq!(
            unknown_command(Flag::Integer, "12").message,
            "ERR unknown command ':12'"
        );
        assert_eq!(
            unknown_command(Flag::Inline, "HELLO").message,
            "ERR unknown command 'HELLO'"
        );
    }

    #[tokio::test]
    async fn test_ping_pong() {
        let chain = HandlerChain::new().with(ServerCommands::new().into_table());
        let (mut client, stats) = spawn_session(chain, ServerConfig::default());

        let reply = roundtrip(&mut client, b"*1\r\n$4\r\nPING\r\n").await;
        assert_eq!(reply, b"+PONG\r\n");
        assert_eq!(stats.commands_processed.load(Ordering::Relaxed), 1);
        assert!(stats.bytes_written.load(Ordering::Relaxed) > 0);
    }

    #[tokio::test]
    async fn test_command_name_is_case_insensitive() {
        let chain = HandlerChain::new().with(ServerCommands::new().into_table());
        let (mut client, _) = spawn_session(chain, ServerConfig::default());

        let reply = roundtrip(&mut client, b"*2\r\n$4\r\necho\r\n$2\r\nhi\r\n").await;
        assert_eq!(reply, b"*1\r\n$2\r\nhi\r\n");
    }

    #[tokio::test]
    async fn test_empty_array_is_skipped() {
        let chain = HandlerChain::new().with(ServerCommands::new().into_table());
        let (mut client, _) = spawn_session(chain, ServerConfig::default());

        let reply = roundtrip(&mut client, b"*0\r\n+OK\r\n*1\r\n$4\r\nPING\r\n").await;
        assert_eq!(reply, b"+PONG\r\n");
    }

    #[tokio::test]
    async fn test_unknown_integer_command_keeps_marker() {
        let (mut client, _) = spawn_session(HandlerChain::new(), ServerConfig::default());

        let reply = roundtrip(&mut client, b"*1\r\n:42\r\n").await;
        assert_eq!(reply, b"-ERR unknown command ':42'\r\n");
    }

    #[tokio::test]
    async fn test_no_reply_when_handler_returns_none() {
        let chain = HandlerChain::new()
            .with(CommandTable::single("noop", |_| Ok(None)))
            .with(ServerCommands::new().into_table());
        let (mut client, _) = spawn_session(chain, ServerConfig::default());

        let reply = roundtrip(&mut client, b"*1\r\n$4\r\nNOOP\r\n*1\r\n$4\r\nPING\r\n").await;
        assert_eq!(reply, b"+PONG\r\n");
    }

    #[tokio::test]
    async fn test_handler_error_flushes_reply_then_closes() {
        let chain = HandlerChain::new().with(CommandTable::single("crash", |_| {
            Err(HandlerError::failed("crashed").with_reply(Message::err("crashed")))
        }));
        let (mut client, _) = spawn_session(chain, ServerConfig::default());

        client.write_all(b"*1\r\n$5\r\nCRASH\r\n").await.unwrap();
        let mut received = Vec::new();
        client.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"-ERR crashed\r\n");
    }

    #[tokio::test]
    async fn test_disconnect_command_closes_without_reply() {
        let (mut client, _) = spawn_session(HandlerChain::new(), ServerConfig::default());

        client.write_all(b"*1\r\n$4\r\nquit\r\n").await.unwrap();
        let mut received = Vec::new();
        client.read_to_end(&mut received).await.unwrap();
        assert!(received.is_empty());
    }

    #[tokio::test]
    async fn test_decode_error_closes_session() {
        let chain = HandlerChain::new().with(ServerCommands::new().into_table());
        let (mut client, _) = spawn_session(chain, ServerConfig::default());

        client.write_all(b"*x\r\n").await.unwrap();
        let mut received = Vec::new();
        client.read_to_end(&mut received).await.unwrap();
        assert!(received.is_empty());
    }

    #[tokio::test]
    async fn test_idle_timeout_closes_session() {
        let config = ServerConfig {
            idle_timeout: Some(Duration::from_millis(50)),
            ..ServerConfig::default()
        };
        let (mut client, _) = spawn_session(HandlerChain::new(), config);

        let mut received = Vec::new();
        let read = tokio::time::timeout(
            Duration::from_secs(2),
            client.read_to_end(&mut received),
        )
        .await;
        assert!(matches!(read, Ok(Ok(0))));
    }

    #[tokio::test]
    async fn test_idle_timeout_spares_slow_sender() {
        let chain = HandlerChain::new().with(ServerCommands::new().into_table());
        let config = ServerConfig {
            idle_timeout: Some(Duration::from_millis(100)),
            ..ServerConfig::default()
        };
        let (mut client, _) = spawn_session(chain, config);

        // Slower than the timeout overall, but never silent that long
        for chunk in b"*2\r\n$4\r\nECHO\r\n$6\r\nhello!\r\n".chunks(4) {
            client.write_all(chunk).await.unwrap();
            tokio::time::sleep(Duration::from_millis(30)).await;
        }

        let mut buf = vec![0u8; 64];
        let n = tokio::time::timeout(Duration::from_secs(2), client.read(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&buf[..n], b"*1\r\n$6\r\nhello!\r\n");
    }

    #[tokio::test]
    async fn test_idle_timeout_counts_partial_frame_bytes() {
        let config = ServerConfig {
            idle_timeout: Some(Duration::from_millis(50)),
            ..ServerConfig::default()
        };
        let (mut client, stats) = spawn_session(HandlerChain::new(), config);

        client.write_all(b"*1\r\n").await.unwrap();
        let mut received = Vec::new();
        client.read_to_end(&mut received).await.unwrap();

        assert!(received.is_empty());
        assert_eq!(stats.bytes_read.load(Ordering::Relaxed), 4);
    }
}
