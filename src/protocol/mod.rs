//! RESP Protocol Implementation
//!
//! This module provides the Redis Serialization Protocol (RESP) codec used on
//! both sides of a connection.
//!
//! ## Overview
//!
//! RESP is a simple, binary-safe protocol used by Redis for client-server communication.
//! Requests travel as arrays of bulk strings; replies may be statuses, errors,
//! integers, bulk strings or arrays.
//!
//! ## Modules
//!
//! - `types`: Defines `Part`, `Message`, `Request` and their encoders
//! - `parser`: Incremental parser for buffered RESP data
//! - `reader`: Async frame reader bound to a byte stream
//!
//! ## Example
//!
//! ```
//! use flashwire::protocol::{parse_message, Message, Request};
//!
//! // Encoding a command
//! let bytes = Request::new("GET").arg("name").encode();
//!
//! // Decoding it again
//! let (message, consumed) = parse_message(&bytes).unwrap().unwrap();
//! assert_eq!(consumed, bytes.len());
//! assert_eq!(message.parts.len(), 2);
//!
//! // Creating replies
//! assert_eq!(Message::ok().serialize(), b"+OK\r\n");
//! ```

pub mod parser;
pub mod reader;
pub mod types;

// Re-export commonly used types for convenience
pub use parser::{parse_message, ParseError, ParseResult, RespParser};
pub use reader::{FrameError, FrameReader};
pub use types::{encode_message, encode_request, Flag, Message, Part, Request, RequestError};
