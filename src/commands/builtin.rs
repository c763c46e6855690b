//! Connection-level commands every server answers.
//!
//! These are bound with [`bind_methods!`](crate::bind_methods) and are
//! normally pushed first so that application providers can shadow them.

use crate::commands::handler::HandlerResult;
use crate::commands::table::CommandTable;
use crate::protocol::{Message, Part};
use std::sync::Arc;

/// `PING [message]` and `ECHO message`.
#[derive(Debug, Default)]
pub struct ServerCommands;

impl ServerCommands {
    pub fn new() -> Self {
        Self
    }

    /// Builds a provider exposing these commands.
    pub fn into_table(self) -> CommandTable {
        crate::bind_methods!(CommandTable::new("server"), Arc::new(self); ping, echo)
    }

    pub fn ping(&self, args: &[Part]) -> HandlerResult {
        let reply = match args {
            [] => Message::status("PONG"),
            [message] => Message::from_parts(vec![message.clone()]),
            _ => wrong_arity("ping"),
        };
        Ok(Some(reply))
    }

    pub fn echo(&self, args: &[Part]) -> HandlerResult {
        let reply = match args {
            [message] => Message::from_parts(vec![message.clone()]),
            _ => wrong_arity("echo"),
        };
        Ok(Some(reply))
    }
}

fn wrong_arity(command: &str) -> Message {
    Message::err(format!("wrong number of arguments for '{}' command", command))
}
