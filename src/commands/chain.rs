//! Handler Chain
//!
//! The chain is an ordered list of providers. Resolving a command walks the
//! providers in priority order and the first one that knows the command
//! wins. With the default [`ChainOrder::NewestFirst`] a provider pushed later
//! shadows commands of the same name pushed earlier.
//!
//! ```text
//!   dispatch("GET", args)
//!          │
//!          ▼
//!   ┌────────────┐  miss  ┌────────────┐  miss  ┌────────────┐
//!   │ provider 3 │──────> │ provider 2 │──────> │ provider 1 │──> unknown command
//!   └─────┬──────┘        └─────┬──────┘        └─────┬──────┘
//!         │ hit                 │ hit                 │ hit
//!         ▼                     ▼                     ▼
//!                   check arguments are bulk strings
//!                               │
//!                               ▼
//!                         call handler
//! ```

use crate::commands::handler::{Handler, HandlerError};
use crate::commands::table::Provider;
use crate::protocol::{Flag, Message, Part};
use thiserror::Error;
use tracing::trace;

/// Order in which providers are consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChainOrder {
    /// The most recently pushed provider is tried first
    #[default]
    NewestFirst,
    /// Providers are tried in the order they were pushed
    OldestFirst,
}

/// Errors from dispatching a command.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No provider knows the command
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    /// The handler returned an error
    #[error(transparent)]
    Handler(#[from] HandlerError),
}

/// An ordered set of providers.
///
/// # Example
///
/// ```
/// use flashwire::commands::{CommandTable, HandlerChain};
/// use flashwire::protocol::Message;
///
/// let mut chain = HandlerChain::new();
/// chain.push(CommandTable::single("ping", |_| Ok(Some(Message::status("PONG")))));
///
/// let reply = chain.dispatch("PING", &[]).unwrap().unwrap();
/// assert_eq!(reply.message, "PONG");
/// assert!(chain.dispatch("GET", &[]).is_err());
/// ```
#[derive(Default)]
pub struct HandlerChain {
    /// Kept in push order
    providers: Vec<Box<dyn Provider>>,
    order: ChainOrder,
}

impl HandlerChain {
    /// Creates an empty chain where newer providers take priority.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty chain with the given priority order.
    pub fn with_order(order: ChainOrder) -> Self {
        Self {
            providers: Vec::new(),
            order,
        }
    }

    /// Adds a provider.
    pub fn push<P: Provider + 'static>(&mut self, provider: P) -> &mut Self {
        trace!(provider = %provider.name(), "Added provider to chain");
        self.providers.push(Box::new(provider));
        self
    }

    /// Adds a provider, builder style.
    pub fn with<P: Provider + 'static>(mut self, provider: P) -> Self {
        self.push(provider);
        self
    }

    pub fn order(&self) -> ChainOrder {
        self.order
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Provider names in priority order.
    pub fn provider_names(&self) -> Vec<&str> {
        self.iter().map(|p| p.name()).collect()
    }

    /// Finds the handler for an upper-cased command name.
    pub fn resolve(&self, command: &str) -> Option<&Handler> {
        self.iter().find_map(|provider| {
            let handler = provider.lookup(command)?;
            trace!(provider = %provider.name(), command = %command, "Resolved command");
            Some(handler)
        })
    }

    /// Resolves and runs a command.
    ///
    /// Every argument must be a bulk string; otherwise the handler is not
    /// called and a protocol error reply is returned instead.
    pub fn dispatch(&self, command: &str, args: &[Part]) -> Result<Option<Message>, DispatchError> {
        let handler = self
            .resolve(command)
            .ok_or_else(|| DispatchError::UnknownCommand(command.to_string()))?;

        if let Some(bad) = args.iter().find(|part| part.flag != Flag::Bulk) {
            return Ok(Some(Message::err(format!(
                "Protocol error: expected '$', got '{}'",
                bad.flag
            ))));
        }

        Ok(handler.call(args)?)
    }

    fn iter(&self) -> Box<dyn Iterator<Item = &Box<dyn Provider>> + '_> {
        match self.order {
            ChainOrder::NewestFirst => Box::new(self.providers.iter().rev()),
            ChainOrder::OldestFirst => Box::new(self.providers.iter()),
        }
    }
}
