//! Command Providers
//!
//! A [`Provider`] maps an upper-cased command name to a [`Handler`]. The
//! usual provider is a [`CommandTable`], filled once at startup either one
//! command at a time, from a declarative list of `(name, handler)` pairs, or
//! by binding the methods of an object with [`bind_methods!`](crate::bind_methods).
//!
//! Tables are frozen once the server starts serving; registration takes
//! `&mut self` and the chain is shared behind an `Arc`.

use crate::commands::handler::{Handler, HandlerResult};
use crate::protocol::Part;
use std::collections::HashMap;
use tracing::trace;

/// A source of command handlers in the chain.
pub trait Provider: Send + Sync {
    /// Returns the handler for an upper-cased command name.
    fn lookup(&self, command: &str) -> Option<&Handler>;

    /// A short name used in logs.
    fn name(&self) -> &str {
        "anonymous"
    }
}

/// A name → handler mapping.
///
/// # Example
///
/// ```
/// use flashwire::commands::{CommandTable, Provider};
/// use flashwire::protocol::Message;
///
/// let table = CommandTable::new("strings")
///     .register("get", |_args| Ok(Some(Message::array([None::<&str>]))))
///     .register("set", |_args| Ok(Some(Message::ok())));
///
/// assert!(table.lookup("GET").is_some());
/// assert!(table.lookup("get").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CommandTable {
    name: String,
    handlers: HashMap<String, Handler>,
}

impl CommandTable {
    /// Creates an empty table.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handlers: HashMap::new(),
        }
    }

    /// A one-entry table wrapping a single function.
    pub fn single<F>(command: &str, f: F) -> Self
    where
        F: Fn(&[Part]) -> HandlerResult + Send + Sync + 'static,
    {
        Self::new(command.to_uppercase()).register(command, f)
    }

    /// Registers a handler, builder style. The name is upper-cased.
    pub fn register<F>(mut self, command: &str, f: F) -> Self
    where
        F: Fn(&[Part]) -> HandlerResult + Send + Sync + 'static,
    {
        self.insert(command, f);
        self
    }

    /// Registers a handler in place, replacing any previous one with the
    /// same name.
    pub fn insert<F>(&mut self, command: &str, f: F)
    where
        F: Fn(&[Part]) -> HandlerResult + Send + Sync + 'static,
    {
        self.insert_handler(command, Handler::new(f));
    }

    /// Registers an already wrapped handler.
    pub fn insert_handler(&mut self, command: &str, handler: Handler) {
        let command = command.to_uppercase();
        trace!(provider = %self.name, command = %command, "Registered command");
        self.handlers.insert(command, handler);
    }

    /// Removes a command, returning its handler.
    pub fn remove(&mut self, command: &str) -> Option<Handler> {
        self.handlers.remove(&command.to_uppercase())
    }

    /// Registered command names, sorted.
    pub fn commands(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Provider for CommandTable {
    fn lookup(&self, command: &str) -> Option<&Handler> {
        self.handlers.get(command)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<N: AsRef<str>> FromIterator<(N, Handler)> for CommandTable {
    fn from_iter<I: IntoIterator<Item = (N, Handler)>>(iter: I) -> Self {
        let mut table = CommandTable::new("table");
        for (command, handler) in iter {
            table.insert_handler(command.as_ref(), handler);
        }
        table
    }
}

/// Binds methods of a shared object as commands named after each method.
///
/// Every listed method must have the signature
/// `fn(&self, &[Part]) -> HandlerResult`. The object is given as an `Arc`
/// and shared by all bound handlers.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use flashwire::bind_methods;
/// use flashwire::commands::{CommandTable, HandlerResult, Provider};
/// use flashwire::protocol::{Message, Part};
///
/// struct Greeter;
///
/// impl Greeter {
///     fn hello(&self, _args: &[Part]) -> HandlerResult {
///         Ok(Some(Message::status("world")))
///     }
/// }
///
/// let table = bind_methods!(CommandTable::new("greeter"), Arc::new(Greeter); hello);
/// assert!(table.lookup("HELLO").is_some());
/// ```
#[macro_export]
macro_rules! bind_methods {
    ($table:expr, $target:expr; $($method:ident),+ $(,)?) => {{
        let target = $target;
        let mut table: $crate::commands::CommandTable = $table;
        $(
            let bound = ::std::sync::Arc::clone(&target);
            table.insert(
                stringify!($method),
                move |args: &[$crate::protocol::Part]| bound.$method(args),
            );
        )+
        table
    }};
}
