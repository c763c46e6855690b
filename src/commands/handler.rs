//! Command Handler Types
//!
//! A handler is a plain function from the argument parts of a request
//! (command name excluded) to an optional reply. Returning `Ok(None)` sends
//! nothing back. Returning an error ends the session, after any reply the
//! error carries has been flushed.

use crate::protocol::{Message, Part};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// What a handler produces.
pub type HandlerResult = Result<Option<Message>, HandlerError>;

/// Signature shared by every command handler.
pub type HandlerFn = dyn Fn(&[Part]) -> HandlerResult + Send + Sync;

/// Errors returned by command handlers. Both variants are fatal for the
/// session that issued the command.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The client asked to end the session
    #[error("client requested disconnect")]
    Disconnect { reply: Option<Message> },

    /// The handler failed
    #[error("{reason}")]
    Failed {
        reason: String,
        reply: Option<Message>,
    },
}

impl HandlerError {
    /// A disconnect request with no reply.
    pub fn disconnect() -> Self {
        HandlerError::Disconnect { reply: None }
    }

    /// A handler failure with no reply.
    pub fn failed(reason: impl Into<String>) -> Self {
        HandlerError::Failed {
            reason: reason.into(),
            reply: None,
        }
    }

    /// Attaches a reply to be written before the session closes.
    pub fn with_reply(self, reply: Message) -> Self {
        match self {
            HandlerError::Disconnect { .. } => HandlerError::Disconnect { reply: Some(reply) },
            HandlerError::Failed { reason, .. } => HandlerError::Failed {
                reason,
                reply: Some(reply),
            },
        }
    }

    /// The reply to flush before closing, if any.
    pub fn reply(&self) -> Option<&Message> {
        match self {
            HandlerError::Disconnect { reply } | HandlerError::Failed { reply, .. } => {
                reply.as_ref()
            }
        }
    }

    /// Consumes the error and returns its reply.
    pub fn into_reply(self) -> Option<Message> {
        match self {
            HandlerError::Disconnect { reply } | HandlerError::Failed { reply, .. } => reply,
        }
    }

    /// Returns true if the client asked to disconnect.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, HandlerError::Disconnect { .. })
    }
}

/// A shareable command handler.
#[derive(Clone)]
pub struct Handler(Arc<HandlerFn>);

impl Handler {
    /// Wraps a function as a handler.
    ///
    /// # Example
    /// ```
    /// use flashwire::commands::Handler;
    /// use flashwire::protocol::Message;
    ///
    /// let ping = Handler::new(|_args| Ok(Some(Message::status("PONG"))));
    /// let reply = ping.call(&[]).unwrap().unwrap();
    /// assert_eq!(reply.message, "PONG");
    /// ```
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Part]) -> HandlerResult + Send + Sync + 'static,
    {
        Handler(Arc::new(f))
    }

    /// Invokes the handler.
    pub fn call(&self, args: &[Part]) -> HandlerResult {
        (self.0)(args)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Handler(..)")
    }
}
