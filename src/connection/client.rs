//! Minimal RESP client.
//!
//! Sends one request at a time and waits for its reply, using the same
//! encoder and [`FrameReader`] as the server side.

use crate::protocol::{FrameError, FrameReader, Message, Request};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::trace;

/// A connection to a RESP server.
pub struct Client {
    reader: FrameReader<BufWriter<TcpStream>>,
}

impl Client {
    /// Connects to `addr`.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, FrameError> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self {
            reader: FrameReader::new(BufWriter::new(stream)),
        })
    }

    /// Sends a request and waits for its reply.
    pub async fn send(&mut self, request: &Request) -> Result<Message, FrameError> {
        trace!(command = %request.command, args = request.args.len(), "Sending request");
        self.send_raw(&request.encode()).await
    }

    /// Sends pre-encoded bytes and waits for one reply.
    pub async fn send_raw(&mut self, bytes: &[u8]) -> Result<Message, FrameError> {
        self.write(bytes).await?;
        self.read_reply().await
    }

    /// Writes bytes without waiting for a reply.
    pub async fn write(&mut self, bytes: &[u8]) -> Result<(), FrameError> {
        let writer = self.reader.get_mut();
        writer.write_all(bytes).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Reads the next reply.
    pub async fn read_reply(&mut self) -> Result<Message, FrameError> {
        self.reader.read_message().await
    }
}
