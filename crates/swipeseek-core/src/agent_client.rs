//! Framed async transport to the on-device automation agent.
//!
//! [`AgentClient`] sends [`Request`]s and reads [`Response`]s using the
//! protocol in [`crate::protocol`]. It connects over TCP, or wraps any
//! pre-connected async stream (used by tests with `tokio::io::duplex`).

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, debug_span, trace, Instrument};

use crate::protocol::{
    decode_response, encode_request, read_frame_length, ProtocolError, Request, Response,
};

/// Timeout for establishing a TCP connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for reading one response frame.
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// A bidirectional async byte stream the client can talk over.
pub trait AgentStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> AgentStream for T {}

/// Errors from the agent transport.
#[derive(Error, Debug)]
pub enum AgentClientError {
    /// No open stream.
    #[error("not connected to agent")]
    NotConnected,

    /// The TCP connection could not be established.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Stream I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The response frame could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The agent answered with an error response.
    #[error("agent error: {0}")]
    AgentError(String),

    /// Connect or read exceeded its deadline.
    #[error("operation timed out")]
    Timeout,
}

/// Single-connection client for the automation agent.
pub struct AgentClient {
    stream: Option<Box<dyn AgentStream>>,
    addr: Option<SocketAddr>,
}

impl AgentClient {
    /// Creates a client for `addr`. Nothing is opened until [`connect`](Self::connect).
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            stream: None,
            addr: Some(addr),
        }
    }

    /// Wraps an already-connected stream.
    pub fn from_stream(stream: impl AgentStream + 'static) -> Self {
        Self {
            stream: Some(Box::new(stream)),
            addr: None,
        }
    }

    /// Opens the TCP connection, giving up after five seconds.
    pub async fn connect(&mut self) -> Result<(), AgentClientError> {
        let addr = self
            .addr
            .ok_or_else(|| AgentClientError::ConnectionFailed("no address configured".into()))?;

        debug!(%addr, "connecting to agent");
        let stream = timeout(CONNECT_TIMEOUT, TcpStream::connect(addr))
            .await
            .map_err(|_| AgentClientError::Timeout)?
            .map_err(|e| AgentClientError::ConnectionFailed(e.to_string()))?;
        stream.set_nodelay(true)?;

        self.stream = Some(Box::new(stream));
        debug!("connected to agent");
        Ok(())
    }

    /// Drops the connection, if any.
    pub fn disconnect(&mut self) {
        self.stream.take();
    }

    /// Returns `true` while a stream is held.
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Sends `request` and waits for the matching response.
    ///
    /// [`Response::Error`] is turned into [`AgentClientError::AgentError`].
    pub async fn send(&mut self, request: &Request) -> Result<Response, AgentClientError> {
        let span = debug_span!("agent_send", opcode = request.opcode_name());
        async {
            self.write_frame(&encode_request(request)).await?;
            let payload = self.read_frame().await?;

            match decode_response(&payload)? {
                Response::Error { message } => Err(AgentClientError::AgentError(message)),
                other => Ok(other),
            }
        }
        .instrument(span)
        .await
    }

    /// Sends a heartbeat to check the agent is alive.
    pub async fn heartbeat(&mut self) -> Result<(), AgentClientError> {
        self.send(&Request::Heartbeat).await.map(|_| ())
    }

    async fn write_frame(&mut self, data: &[u8]) -> Result<(), AgentClientError> {
        let stream = self.stream.as_mut().ok_or(AgentClientError::NotConnected)?;
        trace!(frame_bytes = data.len(), "writing frame");
        let written = async {
            stream.write_all(data).await?;
            stream.flush().await
        }
        .await;

        if let Err(e) = written {
            self.stream.take();
            return Err(AgentClientError::Io(e));
        }
        Ok(())
    }

    async fn read_frame(&mut self) -> Result<Vec<u8>, AgentClientError> {
        let stream = self.stream.as_mut().ok_or(AgentClientError::NotConnected)?;

        let result = timeout(READ_TIMEOUT, async {
            let mut header = [0u8; 4];
            stream.read_exact(&mut header).await?;
            let len = read_frame_length(&header) as usize;
            let mut payload = vec![0u8; len];
            trace!(payload_bytes = len, "reading frame");
            stream.read_exact(&mut payload).await?;
            Ok::<_, std::io::Error>(payload)
        })
        .await;

        match result {
            Ok(Ok(payload)) => Ok(payload),
            Ok(Err(e)) => {
                self.stream.take();
                Err(AgentClientError::Io(e))
            }
            Err(_) => {
                // A late reply would desync the next request; drop the stream.
                self.stream.take();
                Err(AgentClientError::Timeout)
            }
        }
    }
}
