//! RESP (Redis Serialization Protocol) Data Types
//!
//! This module defines the values exchanged over the wire and the encoder
//! that turns them into bytes. Nothing here performs I/O.
//!
//! ## Protocol Format
//!
//! Each RESP unit starts with a type prefix byte:
//! - `+` Simple String (status)
//! - `-` Error
//! - `:` Integer
//! - `$` Bulk String
//! - `*` Array
//!
//! All units are terminated with CRLF (`\r\n`).
//!
//! ## Examples
//!
//! Status: `+OK\r\n`
//! Error: `-ERR unknown command 'FOO'\r\n`
//! Integer: `:1000\r\n`
//! Bulk String: `$5\r\nhello\r\n`
//! Array: `*2\r\n$3\r\nGET\r\n$4\r\nname\r\n`
//! Null Bulk String: `$-1\r\n`
//!
//! ## Parts and Messages
//!
//! A [`Part`] is one decoded protocol unit. A [`Message`] is what callers see:
//! either a scalar status/error reply (`message`) or a flat sequence of parts
//! (`parts`). Nested arrays stay flat: an array part carries its element count
//! in `length` and is followed by exactly that many parts.

use bytes::Bytes;
use std::fmt;

/// The CRLF terminator used in RESP protocol
pub const CRLF: &[u8] = b"\r\n";

/// RESP protocol type prefixes
pub mod prefix {
    pub const SIMPLE_STRING: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// The type marker of a [`Part`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    /// `+` simple status
    Status,
    /// `-` simple error
    Error,
    /// `:` integer
    Integer,
    /// `$` bulk string
    Bulk,
    /// `*` array header
    Array,
    /// Any other leading byte: a raw inline line, no marker.
    Inline,
}

impl Flag {
    /// Maps a leading wire byte to its flag. Unknown bytes become `Inline`.
    pub fn from_marker(byte: u8) -> Self {
        match byte {
            prefix::SIMPLE_STRING => Flag::Status,
            prefix::ERROR => Flag::Error,
            prefix::INTEGER => Flag::Integer,
            prefix::BULK_STRING => Flag::Bulk,
            prefix::ARRAY => Flag::Array,
            _ => Flag::Inline,
        }
    }

    /// Returns the wire byte for this flag, `None` for inline data.
    pub fn marker(&self) -> Option<u8> {
        match self {
            Flag::Status => Some(prefix::SIMPLE_STRING),
            Flag::Error => Some(prefix::ERROR),
            Flag::Integer => Some(prefix::INTEGER),
            Flag::Bulk => Some(prefix::BULK_STRING),
            Flag::Array => Some(prefix::ARRAY),
            Flag::Inline => None,
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.marker() {
            Some(byte) => write!(f, "{}", byte as char),
            None => Ok(()),
        }
    }
}

/// One decoded protocol unit.
///
/// `data` is meaningful for status, error, bulk and inline parts; `length`
/// for integer and array parts. A null bulk string is a `Bulk` part with
/// `length == -1` and no data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub flag: Flag,
    pub data: Bytes,
    pub length: i64,
}

impl Part {
    /// Creates a status part.
    pub fn status(text: impl Into<String>) -> Self {
        Self {
            flag: Flag::Status,
            data: Bytes::from(text.into()),
            length: 0,
        }
    }

    /// Creates an error part.
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            flag: Flag::Error,
            data: Bytes::from(text.into()),
            length: 0,
        }
    }

    /// Creates an integer part.
    pub fn integer(n: i64) -> Self {
        Self {
            flag: Flag::Integer,
            data: Bytes::new(),
            length: n,
        }
    }

    /// Creates a bulk string part.
    ///
    /// # Example
    /// ```
    /// use flashwire::protocol::types::{Flag, Part};
    /// let part = Part::bulk("hello");
    /// assert_eq!(part.flag, Flag::Bulk);
    /// assert_eq!(part.length, 5);
    /// ```
    pub fn bulk(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let length = data.len() as i64;
        Self {
            flag: Flag::Bulk,
            data,
            length,
        }
    }

    /// Creates a null bulk string part (`$-1\r\n`).
    pub fn null_bulk() -> Self {
        Self {
            flag: Flag::Bulk,
            data: Bytes::new(),
            length: -1,
        }
    }

    /// Creates the header part of a nested array with `count` elements.
    pub fn array_header(count: i64) -> Self {
        Self {
            flag: Flag::Array,
            data: Bytes::new(),
            length: count,
        }
    }

    /// Creates an inline part holding a raw line.
    pub fn inline(data: impl Into<Bytes>) -> Self {
        Self {
            flag: Flag::Inline,
            data: data.into(),
            length: 0,
        }
    }

    /// Returns true if this is a null bulk string.
    pub fn is_null(&self) -> bool {
        self.flag == Flag::Bulk && self.length < 0
    }

    /// Returns the part's textual form: its data, or the decimal length for
    /// integer parts.
    pub fn text(&self) -> String {
        match self.flag {
            Flag::Integer => self.length.to_string(),
            _ => String::from_utf8_lossy(&self.data).into_owned(),
        }
    }

    /// Encodes this part into `buf`.
    ///
    /// Integer, bulk and array parts are encoded according to their flag.
    /// Any other part is a bulk string if it carries data and an integer
    /// otherwise.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        match self.flag {
            Flag::Integer => write_integer(buf, self.length),
            Flag::Bulk if self.is_null() => {
                buf.push(prefix::BULK_STRING);
                buf.extend_from_slice(b"-1");
                buf.extend_from_slice(CRLF);
            }
            Flag::Bulk => write_bulk(buf, &self.data),
            Flag::Array => {
                buf.push(prefix::ARRAY);
                buf.extend_from_slice(self.length.to_string().as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Flag::Status | Flag::Error | Flag::Inline => {
                if self.data.is_empty() {
                    write_integer(buf, self.length);
                } else {
                    write_bulk(buf, &self.data);
                }
            }
        }
    }
}

impl From<i64> for Part {
    fn from(n: i64) -> Self {
        Part::integer(n)
    }
}

impl From<Bytes> for Part {
    fn from(data: Bytes) -> Self {
        Part::bulk(data)
    }
}

impl From<Vec<u8>> for Part {
    fn from(data: Vec<u8>) -> Self {
        Part::bulk(data)
    }
}

impl From<&str> for Part {
    fn from(s: &str) -> Self {
        Part::bulk(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<String> for Part {
    fn from(s: String) -> Self {
        Part::bulk(s)
    }
}

impl<T: Into<Part>> From<Option<T>> for Part {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Part::null_bulk(),
        }
    }
}

/// A decoded reply or request as exposed to callers.
///
/// If `parts` is non-empty the message is an array and `message` is unused;
/// otherwise it is a scalar status (`success`) or error (`!success`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub success: bool,
    pub message: String,
    pub parts: Vec<Part>,
}

impl Message {
    /// Creates a status reply.
    ///
    /// # Example
    /// ```
    /// use flashwire::protocol::types::Message;
    /// assert_eq!(Message::status("PONG").serialize(), b"+PONG\r\n");
    /// ```
    pub fn status(text: impl Into<String>) -> Self {
        Self {
            success: true,
            message: text.into(),
            parts: Vec::new(),
        }
    }

    /// Common reply for successful operations
    pub fn ok() -> Self {
        Message::status("OK")
    }

    /// Creates an error reply with the message used verbatim.
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            success: false,
            message: text.into(),
            parts: Vec::new(),
        }
    }

    /// Creates a generic error reply, prefixing the text with `ERR `.
    ///
    /// # Example
    /// ```
    /// use flashwire::protocol::types::Message;
    /// let reply = Message::err("unknown command 'FOO'");
    /// assert_eq!(reply.message, "ERR unknown command 'FOO'");
    /// ```
    pub fn err(text: impl fmt::Display) -> Self {
        Message::error(format!("ERR {}", text))
    }

    /// Creates an array message from already built parts.
    pub fn from_parts(parts: Vec<Part>) -> Self {
        Self {
            success: true,
            message: String::new(),
            parts,
        }
    }

    /// Creates an array reply from anything convertible into parts.
    ///
    /// # Example
    /// ```
    /// use flashwire::protocol::types::Message;
    /// let reply = Message::array(["a", "bc"]);
    /// assert_eq!(reply.serialize(), b"*2\r\n$1\r\na\r\n$2\r\nbc\r\n");
    /// ```
    pub fn array<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Part>,
    {
        Message::from_parts(values.into_iter().map(Into::into).collect())
    }

    /// Returns true if this message carries an array of parts.
    pub fn is_array(&self) -> bool {
        !self.parts.is_empty()
    }

    /// Returns true if this is an error reply.
    pub fn is_error(&self) -> bool {
        !self.success && self.parts.is_empty()
    }

    /// Serializes the message to bytes for sending over the wire.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    /// Serializes the message into an existing buffer.
    ///
    /// An empty `parts` sequence never produces `*0\r\n`; such a message
    /// encodes as a status or error line.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        if !self.parts.is_empty() {
            buf.push(prefix::ARRAY);
            buf.extend_from_slice(self.parts.len().to_string().as_bytes());
            buf.extend_from_slice(CRLF);
            for part in &self.parts {
                part.serialize_into(buf);
            }
        } else if self.success {
            buf.push(prefix::SIMPLE_STRING);
            buf.extend_from_slice(self.message.as_bytes());
            buf.extend_from_slice(CRLF);
        } else {
            buf.push(prefix::ERROR);
            buf.extend_from_slice(self.message.as_bytes());
            buf.extend_from_slice(CRLF);
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.parts.is_empty() {
            return if self.success {
                write!(f, "\"{}\"", self.message)
            } else {
                write!(f, "(error) {}", self.message)
            };
        }
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            match part.flag {
                Flag::Integer => write!(f, "(integer) {}", part.length)?,
                _ if part.is_null() => write!(f, "(nil)")?,
                Flag::Array => write!(f, "(array {})", part.length)?,
                _ => write!(f, "\"{}\"", String::from_utf8_lossy(&part.data))?,
            }
        }
        Ok(())
    }
}

/// A client-to-server command: a name and its ordered arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub command: String,
    pub args: Vec<Bytes>,
}

impl Request {
    /// Creates a request with no arguments.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
        }
    }

    /// Appends an argument.
    pub fn arg(mut self, arg: impl Into<Bytes>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Encodes the request in multi-bulk form.
    ///
    /// # Example
    /// ```
    /// use flashwire::protocol::types::Request;
    /// let bytes = Request::new("GET").arg("name").encode();
    /// assert_eq!(bytes, b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n");
    /// ```
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode_into(&mut buf);
        buf
    }

    /// Encodes the request into an existing buffer.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.push(prefix::ARRAY);
        buf.extend_from_slice((self.args.len() + 1).to_string().as_bytes());
        buf.extend_from_slice(CRLF);
        write_bulk(buf, self.command.as_bytes());
        for arg in &self.args {
            write_bulk(buf, arg);
        }
    }
}

/// Error returned when a [`Message`] cannot be read as a [`Request`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("message carries no command")]
    Empty,

    #[error("Protocol error: expected '$', got '{0}'")]
    ProtocolError(Flag),
}

impl TryFrom<Message> for Request {
    type Error = RequestError;

    fn try_from(message: Message) -> Result<Self, Self::Error> {
        let mut parts = message.parts.into_iter();
        let name = parts.next().ok_or(RequestError::Empty)?;
        if name.flag != Flag::Bulk {
            return Err(RequestError::ProtocolError(name.flag));
        }

        let mut args = Vec::with_capacity(parts.len());
        for part in parts {
            if part.flag != Flag::Bulk {
                return Err(RequestError::ProtocolError(part.flag));
            }
            args.push(part.data);
        }

        Ok(Request {
            command: String::from_utf8_lossy(&name.data).into_owned(),
            args,
        })
    }
}

/// Encodes a request in multi-bulk form.
pub fn encode_request(request: &Request) -> Vec<u8> {
    request.encode()
}

/// Encodes a reply message.
pub fn encode_message(message: &Message) -> Vec<u8> {
    message.serialize()
}

fn write_bulk(buf: &mut Vec<u8>, data: &[u8]) {
    buf.push(prefix::BULK_STRING);
    buf.extend_from_slice(data.len().to_string().as_bytes());
    buf.extend_from_slice(CRLF);
    buf.extend_from_slice(data);
    buf.extend_from_slice(CRLF);
}

fn write_integer(buf: &mut Vec<u8>, n: i64) {
    buf.push(prefix::INTEGER);
    buf.extend_from_slice(n.to_string().as_bytes());
    buf.extend_from_slice(CRLF);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serialize() {
        assert_eq!(Message::status("OK").serialize(), b"+OK\r\n");
        assert_eq!(Message::ok().serialize(), b"+OK\r\n");
    }

    #[test]
    fn test_error_serialize() {
        let reply = Message::err("unknown command 'FOO'");
        assert_eq!(reply.serialize(), b"-ERR unknown command 'FOO'\r\n");
    }

    #[test]
    fn test_integer_part_serialize() {
        let reply = Message::array([1000i64, -42]);
        assert_eq!(reply.serialize(), b"*2\r\n:1000\r\n:-42\r\n");
    }

    #[test]
    fn test_bulk_part_serialize() {
        let reply = Message::array(["hello"]);
        assert_eq!(reply.serialize(), b"*1\r\n$5\r\nhello\r\n");
    }

    #[test]
    fn test_empty_and_null_bulk_serialize() {
        let reply = Message::array([Some(""), None]);
        assert_eq!(reply.serialize(), b"*2\r\n$0\r\n\r\n$-1\r\n");
    }

    #[test]
    fn test_untyped_part_follows_data_rule() {
        let with_data = Part::status("hi");
        let without_data = Part {
            flag: Flag::Inline,
            data: Bytes::new(),
            length: 7,
        };
        let reply = Message::from_parts(vec![with_data, without_data]);
        assert_eq!(reply.serialize(), b"*2\r\n$2\r\nhi\r\n:7\r\n");
    }

    #[test]
    fn test_nested_array_serialize() {
        let reply = Message::from_parts(vec![
            Part::integer(1),
            Part::array_header(2),
            Part::integer(2),
            Part::integer(3),
        ]);
        assert_eq!(reply.serialize(), b"*4\r\n:1\r\n*2\r\n:2\r\n:3\r\n");
    }

    #[test]
    fn test_empty_parts_never_encode_as_empty_array() {
        let ok = Message {
            success: true,
            message: "QUEUED".to_string(),
            parts: vec![],
        };
        assert_eq!(ok.serialize(), b"+QUEUED\r\n");

        let failed = Message {
            success: false,
            message: "ERR nope".to_string(),
            parts: vec![],
        };
        assert_eq!(failed.serialize(), b"-ERR nope\r\n");
    }

    #[test]
    fn test_request_encode() {
        let request = Request::new("set").arg("key").arg("val");
        assert_eq!(
            encode_request(&request),
            b"*3\r\n$3\r\nset\r\n$3\r\nkey\r\n$3\r\nval\r\n"
        );
    }

    #[test]
    fn test_request_encode_empty_argument() {
        let request = Request::new("PING").arg("");
        assert_eq!(request.encode(), b"*2\r\n$4\r\nPING\r\n$0\r\n\r\n");
    }

    #[test]
    fn test_bulk_length_matches_payload() {
        for n in [0usize, 1, 2, 10, 255, 4096] {
            let payload = vec![b'x'; n];
            let encoded = encode_message(&Message::array([payload.clone()]));
            let header = format!("*1\r\n${}\r\n", n);
            assert!(encoded.starts_with(header.as_bytes()));
            let body = &encoded[header.len()..];
            assert_eq!(&body[..n], &payload[..]);
            assert_eq!(&body[n..], CRLF);
        }
    }

    #[test]
    fn test_request_from_message_rejects_non_bulk() {
        let message = Message::from_parts(vec![Part::bulk("GET"), Part::integer(1)]);
        assert_eq!(
            Request::try_from(message),
            Err(RequestError::ProtocolError(Flag::Integer))
        );
        assert_eq!(
            Request::try_from(Message::ok()),
            Err(RequestError::Empty)
        );
    }

    #[test]
    fn test_flag_display() {
        assert_eq!(Flag::Bulk.to_string(), "$");
        assert_eq!(Flag::Integer.to_string(), ":");
        assert_eq!(Flag::Inline.to_string(), "");
        assert_eq!(Flag::from_marker(b'@'), Flag::Inline);
    }

    #[test]
    fn test_part_text() {
        assert_eq!(Part::integer(-5).text(), "-5");
        assert_eq!(Part::bulk("PING").text(), "PING");
    }
}
