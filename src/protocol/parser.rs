//! Incremental RESP Protocol Parser
//!
//! This module decodes exactly one RESP value from the front of a buffer.
//! TCP is a stream protocol, so a frame may arrive in pieces; the parser
//! never consumes anything until a whole frame is present.
//!
//! ## How the Parser Works
//!
//! The parser reads from a buffer and returns either:
//! - `Ok(Some((message, consumed)))` - Decoded a frame, `consumed` bytes were used
//! - `Ok(None)` - Need more data, the frame is incomplete
//! - `Err(ParseError)` - Invalid protocol data
//!
//! Per frame the parser walks a small state machine:
//!
//! 1. read the flag byte
//! 2. read the rest of the line up to `\n` (a trailing `\r` is stripped)
//! 3. for `:` and `*`, parse the line as a signed decimal
//! 4. for `$`, read the declared payload plus a two byte terminator
//! 5. for `*`, decode that many further parts
//!
//! The bulk terminator is consumed but its content is not checked.
//!
//! Arrays are not decoded recursively: a header part opens the array and
//! the parser counts down the elements it still expects. The parts decoded
//! so far survive an `Ok(None)`, so the next attempt resumes where the last
//! one stopped.

use crate::protocol::types::{Flag, Message, Part};
use bytes::Bytes;
use thiserror::Error;

/// Errors that can occur during RESP parsing.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    /// Invalid integer format
    #[error("invalid integer: {0}")]
    InvalidInteger(String),

    /// Bulk string length is negative (but not -1 for null)
    #[error("invalid bulk string length: {0}")]
    InvalidBulkLength(i64),

    /// Array length is negative (but not -1 for null)
    #[error("invalid array length: {0}")]
    InvalidArrayLength(i64),

    /// Protocol violation (nesting too deep, etc.)
    #[error("protocol error: {0}")]
    ProtocolError(String),

    /// The frame exceeds maximum allowed size
    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Maximum size for a single bulk string (512 MB, same as Redis)
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Maximum array nesting depth
pub const MAX_NESTING_DEPTH: usize = 32;

/// An incremental RESP protocol parser.
///
/// The parser keeps the parts of a frame in progress between calls, so a
/// frame that arrives over many reads is decoded once rather than from the
/// start on every attempt. After `Ok(None)` the next call must pass the same
/// bytes, possibly extended; call [`RespParser::reset`] to start over on a
/// different buffer.
///
/// # Example
///
/// ```
/// use flashwire::protocol::parser::RespParser;
///
/// let mut parser = RespParser::new();
/// let buffer = b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n";
///
/// assert!(parser.parse(&buffer[..12]).unwrap().is_none());
/// let (message, consumed) = parser.parse(buffer).unwrap().unwrap();
/// assert_eq!(consumed, buffer.len());
/// assert_eq!(message.parts.len(), 2);
/// ```
#[derive(Debug)]
pub struct RespParser {
    /// Parts decoded so far for the frame in progress
    parts: Vec<Part>,
    /// Offset of the first byte not yet decoded
    offset: usize,
    /// Elements still expected by each open array, innermost last
    open_arrays: Vec<i64>,
    /// Buffer length below which another attempt cannot make progress
    needed: usize,
    /// Largest accepted bulk string payload
    max_bulk_size: usize,
}

/// Outcome of decoding a single part.
enum Step {
    /// A part and the bytes it used
    Part(Part, usize),
    /// The part is incomplete; at least `needed` bytes are required
    Incomplete { needed: usize },
}

impl Default for RespParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RespParser {
    /// Creates a new parser instance.
    pub fn new() -> Self {
        Self::with_max_bulk_size(MAX_BULK_SIZE)
    }

    /// Creates a parser with a custom bulk string size limit.
    pub fn with_max_bulk_size(max_bulk_size: usize) -> Self {
        Self {
            parts: Vec::new(),
            offset: 0,
            open_arrays: Vec::new(),
            needed: 0,
            max_bulk_size,
        }
    }

    /// Drops any partially decoded frame.
    pub fn reset(&mut self) {
        self.parts.clear();
        self.offset = 0;
        self.open_arrays.clear();
        self.needed = 0;
    }

    /// Attempts to decode one top-level message from the buffer.
    ///
    /// - `-` yields a failed scalar message
    /// - `+` yields a successful scalar message
    /// - `*` yields the collected parts
    /// - anything else yields a single-part message holding that raw part
    ///
    /// On error the partial frame is discarded.
    pub fn parse(&mut self, buf: &[u8]) -> ParseResult<Option<(Message, usize)>> {
        let result = self.resume(buf);
        if result.is_err() {
            self.reset();
        }
        result
    }

    fn resume(&mut self, buf: &[u8]) -> ParseResult<Option<(Message, usize)>> {
        loop {
            if buf.len() < self.needed || buf.len() <= self.offset {
                return Ok(None);
            }

            if self.open_arrays.len() > MAX_NESTING_DEPTH {
                return Err(ParseError::ProtocolError(format!(
                    "maximum nesting depth exceeded: {}",
                    MAX_NESTING_DEPTH
                )));
            }

            let (part, used) = match self.parse_part(&buf[self.offset..])? {
                Step::Part(part, used) => (part, used),
                Step::Incomplete { needed } => {
                    self.needed = self.offset + needed;
                    return Ok(None);
                }
            };
            self.offset += used;

            let opens_array = part.flag == Flag::Array && part.length > 0;
            let count = part.length;
            self.parts.push(part);
            if opens_array {
                self.open_arrays.push(count);
                continue;
            }

            // A finished element may complete one or more enclosing arrays
            while let Some(remaining) = self.open_arrays.last_mut() {
                *remaining -= 1;
                if *remaining > 0 {
                    break;
                }
                self.open_arrays.pop();
            }

            if self.open_arrays.is_empty() {
                return Ok(Some(self.finish()));
            }
        }
    }

    /// Turns the collected parts into a message and readies the parser for
    /// the next frame.
    fn finish(&mut self) -> (Message, usize) {
        let consumed = self.offset;
        let mut parts = std::mem::take(&mut self.parts);
        self.reset();

        let message = match parts[0].flag {
            Flag::Status | Flag::Error => {
                // Scalars produce exactly one part
                let part = parts.remove(0);
                Message {
                    success: part.flag == Flag::Status,
                    message: String::from_utf8_lossy(&part.data).into_owned(),
                    parts: Vec::new(),
                }
            }
            Flag::Array => {
                // Drop the array's own header, keep its elements
                parts.remove(0);
                Message::from_parts(parts)
            }
            _ => Message::from_parts(parts),
        };

        (message, consumed)
    }

    /// Decodes one part. An array yields only its header; the elements
    /// follow as separate parts.
    fn parse_part(&self, buf: &[u8]) -> ParseResult<Step> {
        let flag = Flag::from_marker(buf[0]);
        match flag {
            Flag::Status | Flag::Error => parse_simple(flag, buf),
            Flag::Integer => parse_integer(buf),
            Flag::Bulk => self.parse_bulk_string(buf),
            Flag::Array => parse_array_header(buf),
            Flag::Inline => parse_inline(buf),
        }
    }

    /// Parses a bulk string: `$<length>\r\n<data>\r\n`
    fn parse_bulk_string(&self, buf: &[u8]) -> ParseResult<Step> {
        let (line, used) = match read_line(&buf[1..]) {
            Some(found) => found,
            None => return Ok(incomplete_line(buf)),
        };
        let length = parse_decimal(line)?;
        let data_start = 1 + used;

        // Handle null bulk string
        if length == -1 {
            return Ok(Step::Part(Part::null_bulk(), data_start));
        }

        if length < 0 {
            return Err(ParseError::InvalidBulkLength(length));
        }

        let length = length as usize;
        if length > self.max_bulk_size {
            return Err(ParseError::MessageTooLarge {
                size: length,
                max: self.max_bulk_size,
            });
        }

        // Payload plus the two terminator bytes
        let total_needed = data_start + length + 2;
        if buf.len() < total_needed {
            return Ok(Step::Incomplete {
                needed: total_needed,
            });
        }

        let data = Bytes::copy_from_slice(&buf[data_start..data_start + length]);
        Ok(Step::Part(Part::bulk(data), total_needed))
    }
}

/// Parses `+<text>\n` or `-<text>\n`
fn parse_simple(flag: Flag, buf: &[u8]) -> ParseResult<Step> {
    Ok(match read_line(&buf[1..]) {
        Some((line, used)) => Step::Part(
            Part {
                flag,
                data: Bytes::copy_from_slice(line),
                length: 0,
            },
            1 + used,
        ),
        None => incomplete_line(buf),
    })
}

/// Parses `:<integer>\n`
fn parse_integer(buf: &[u8]) -> ParseResult<Step> {
    match read_line(&buf[1..]) {
        Some((line, used)) => Ok(Step::Part(Part::integer(parse_decimal(line)?), 1 + used)),
        None => Ok(incomplete_line(buf)),
    }
}

/// Parses an array header: `*<count>\r\n`
fn parse_array_header(buf: &[u8]) -> ParseResult<Step> {
    let (line, used) = match read_line(&buf[1..]) {
        Some(found) => found,
        None => return Ok(incomplete_line(buf)),
    };
    let count = parse_decimal(line)?;

    // -1 is the null array
    if count < -1 {
        return Err(ParseError::InvalidArrayLength(count));
    }

    Ok(Step::Part(Part::array_header(count), 1 + used))
}

/// Parses a line with no recognised prefix as raw inline data.
fn parse_inline(buf: &[u8]) -> ParseResult<Step> {
    Ok(match read_line(buf) {
        Some((line, used)) => Step::Part(Part::inline(Bytes::copy_from_slice(line)), used),
        None => incomplete_line(buf),
    })
}

/// A line without its `\n` yet needs at least one more byte.
fn incomplete_line(buf: &[u8]) -> Step {
    Step::Incomplete {
        needed: buf.len() + 1,
    }
}

/// Finds the end of the line at the start of `buf`.
///
/// Returns the line without its terminator and the number of bytes used
/// including the `\n`, or `None` if no `\n` is present yet.
#[inline]
fn read_line(buf: &[u8]) -> Option<(&[u8], usize)> {
    let newline = buf.iter().position(|&b| b == b'\n')?;
    let line = match buf[..newline].last() {
        Some(b'\r') => &buf[..newline - 1],
        _ => &buf[..newline],
    };
    Some((line, newline + 1))
}

fn parse_decimal(line: &[u8]) -> ParseResult<i64> {
    std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| ParseError::InvalidInteger(String::from_utf8_lossy(line).into_owned()))
}

/// Helper function to decode a single RESP message from bytes.
///
/// This is a convenience function for simple use cases.
pub fn parse_message(buf: &[u8]) -> ParseResult<Option<(Message, usize)>> {
    RespParser::new().parse(buf)
}
