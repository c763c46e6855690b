//! Streaming Frame Reader
//!
//! [`FrameReader`] binds a [`RespParser`] to an async byte stream. Each call
//! to [`FrameReader::read_message`] suspends until one complete frame has
//! been buffered, then returns it. Bytes belonging to the next frame stay in
//! the buffer for the following call.
//!
//! A frame either decodes completely or fails: end of stream in the middle
//! of a frame (including a short bulk payload) is [`FrameError::UnexpectedEof`],
//! never a truncated message.
//!
//! An optional read timeout bounds each wait for bytes, not the whole
//! frame: a peer that keeps sending, however slowly, is never cut off.

use crate::protocol::parser::{ParseError, RespParser};
use crate::protocol::types::Message;
use bytes::{Buf, BytesMut};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::trace;

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Default ceiling on buffered, not yet decoded bytes.
pub const DEFAULT_MAX_FRAME_SIZE: usize = crate::protocol::parser::MAX_BULK_SIZE + 64 * 1024;

/// Errors raised while reading a frame from a stream.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The stream ended cleanly between frames
    #[error("stream closed")]
    Closed,

    /// The stream ended inside a frame
    #[error("unexpected end of stream")]
    UnexpectedEof,

    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed frame
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// More bytes buffered than a single frame may occupy
    #[error("frame exceeds {max} bytes")]
    FrameTooLarge { max: usize },

    /// No bytes arrived within the read timeout
    #[error("no data received for {0:?}")]
    Idle(Duration),
}

/// Reads RESP frames from an async stream.
///
/// # Example
///
/// ```
/// use flashwire::protocol::FrameReader;
///
/// # tokio_test::block_on(async {
/// let input: &[u8] = b"+OK\r\n";
/// let mut reader = FrameReader::new(input);
/// let message = reader.read_message().await.unwrap();
/// assert_eq!(message.message, "OK");
/// # });
/// ```
#[derive(Debug)]
pub struct FrameReader<S> {
    stream: S,
    buffer: BytesMut,
    parser: RespParser,
    max_frame_size: usize,
    read_timeout: Option<Duration>,
    bytes_read: u64,
}

impl<S: AsyncRead + Unpin> FrameReader<S> {
    /// Creates a reader with default limits.
    pub fn new(stream: S) -> Self {
        Self::with_max_frame_size(stream, DEFAULT_MAX_FRAME_SIZE)
    }

    /// Creates a reader that refuses to buffer more than `max_frame_size`
    /// bytes for one frame.
    pub fn with_max_frame_size(stream: S, max_frame_size: usize) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            parser: RespParser::with_max_bulk_size(max_frame_size),
            max_frame_size,
            read_timeout: None,
            bytes_read: 0,
        }
    }

    /// Fails a read with [`FrameError::Idle`] when the stream stays silent
    /// for `timeout`. The timer restarts whenever bytes arrive.
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Reads exactly one message, waiting for more bytes as needed.
    pub async fn read_message(&mut self) -> Result<Message, FrameError> {
        loop {
            if let Some(message) = self.try_parse()? {
                return Ok(message);
            }
            self.read_more_data().await?;
        }
    }

    /// Returns a reference to the underlying stream.
    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    /// Returns a mutable reference to the underlying stream, e.g. to write
    /// replies on the same connection.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Total bytes read from the stream so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Number of buffered bytes not yet decoded.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    fn try_parse(&mut self) -> Result<Option<Message>, FrameError> {
        if self.buffer.is_empty() {
            return Ok(None);
        }

        match self.parser.parse(&self.buffer)? {
            Some((message, consumed)) => {
                self.buffer.advance(consumed);
                trace!(
                    consumed = consumed,
                    remaining = self.buffer.len(),
                    "Decoded frame"
                );
                Ok(Some(message))
            }
            None => {
                trace!(buffered = self.buffer.len(), "Incomplete frame, need more data");
                Ok(None)
            }
        }
    }

    async fn read_more_data(&mut self) -> Result<(), FrameError> {
        if self.buffer.len() >= self.max_frame_size {
            return Err(FrameError::FrameTooLarge {
                max: self.max_frame_size,
            });
        }

        if self.buffer.capacity() - self.buffer.len() < 1024 {
            self.buffer.reserve(INITIAL_BUFFER_SIZE);
        }

        let n = match self.read_timeout {
            Some(limit) => tokio::time::timeout(limit, self.stream.read_buf(&mut self.buffer))
                .await
                .map_err(|_| FrameError::Idle(limit))??,
            None => self.stream.read_buf(&mut self.buffer).await?,
        };
        if n == 0 {
            return Err(if self.buffer.is_empty() {
                FrameError::Closed
            } else {
                FrameError::UnexpectedEof
            });
        }

        self.bytes_read += n as u64;
        trace!(bytes = n, "Read data");
        Ok(())
    }
}
