//! # FlashWire - A RESP Server Core
//!
//! FlashWire is the networking core of a Redis-compatible server written in
//! Rust: a byte-exact RESP codec, a streaming frame reader, and a chain of
//! independent command providers, served one async task per connection.
//!
//! ## Features
//!
//! - **Redis-Compatible Wire Format**: Arrays, bulk strings, integers, statuses and errors
//! - **Composable Commands**: Independent providers chained with first-match-wins lookup
//! - **No Reflection**: Methods are bound to command names at compile time with [`bind_methods!`]
//! - **Async I/O**: Built on Tokio for handling thousands of concurrent connections
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              FlashWire                                  │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ TCP Server  │───>│  Session    │───>│  Handler    │                  │
//! │  │ (Listener)  │    │ (per conn)  │    │  Chain      │                  │
//! │  └─────────────┘    └──────┬──────┘    └──────┬──────┘                  │
//! │                            │                  │                         │
//! │                            ▼                  ▼                         │
//! │                     ┌─────────────┐    ┌──────────────────────────────┐ │
//! │                     │ FrameReader │    │ Provider  Provider  Provider │ │
//! │                     │ RESP codec  │    │ (newest)            (oldest) │ │
//! │                     └─────────────┘    └──────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Data flow: socket bytes → [`FrameReader`](protocol::FrameReader) →
//! command name + argument parts → [`HandlerChain`] → handler → reply
//! [`Message`](protocol::Message) → encoder → socket bytes.
//!
//! ## Quick Start
//!
//! ```no_run
//! use flashwire::commands::{CommandTable, HandlerChain, ServerCommands};
//! use flashwire::protocol::Message;
//! use flashwire::server::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let mut chain = HandlerChain::new();
//!     chain.push(ServerCommands::new().into_table());
//!     chain.push(CommandTable::new("app").register("set", |_args| Ok(Some(Message::ok()))));
//!
//!     let server = Server::new(ServerConfig::default(), chain);
//!     let listener = server.bind().await?;
//!     server.serve(listener).await;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`protocol`]: RESP types, encoder, parser and frame reader
//! - [`commands`]: Handler types, providers and the handler chain
//! - [`connection`]: Per-client sessions and a minimal client
//! - [`server`]: Configuration and the accept loop
//!
//! ## Error Handling
//!
//! Unknown commands and non-bulk arguments are answered with an `-ERR` reply
//! and the session continues. Decode errors, transport errors and handler
//! errors end the session; the listener keeps accepting other clients.

pub mod commands;
pub mod connection;
pub mod protocol;
pub mod server;

// Re-export commonly used types for convenience
pub use commands::{CommandTable, Handler, HandlerChain, HandlerError, Provider};
pub use connection::{handle_connection, Client, ConnectionStats};
pub use protocol::{FrameReader, Message, ParseError, Part, Request};
pub use server::{Server, ServerConfig};

/// The default port FlashWire listens on (same as Redis)
pub const DEFAULT_PORT: u16 = 6379;

/// The default host FlashWire binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of FlashWire
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
