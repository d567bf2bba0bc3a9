//! A single upgraded WebSocket connection.

use std::future::poll_fn;
use std::io;
use std::pin::Pin;
use std::task::Poll;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, ReadBuf};

use super::endpoint::WsUrl;
use super::frame::{Frame, FrameHeader, Opcode, PayloadLength, apply_mask, encode_frame};
use super::handshake::handshake;
use super::state::ConnectionState;
use super::stream::{MaybeTlsStream, open_stream};
use crate::error::{NetworkError, Result};
use crate::tls::TlsConfig;

/// Configuration for opening WebSocket connections.
#[derive(Clone, Debug)]
pub struct WebSocketConfig {
    /// TLS configuration for secure connections (wss://).
    pub tls: TlsConfig,
    /// Mask outgoing frames with a fresh random key per frame.
    pub mask_frames: bool,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            tls: TlsConfig::default(),
            mask_frames: true,
        }
    }
}

impl WebSocketConfig {
    /// Create a configuration with masking enabled and default TLS.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set TLS configuration for secure connections.
    pub fn tls_config(mut self, config: TlsConfig) -> Self {
        self.tls = config;
        self
    }

    /// Enable or disable masking of outgoing frames.
    ///
    /// Unmasked client frames violate the protocol; only permissive servers
    /// accept them.
    pub fn mask_frames(mut self, enabled: bool) -> Self {
        self.mask_frames = enabled;
        self
    }
}

/// An upgraded WebSocket connection owning exactly one socket.
///
/// Reading is split in two: the 2-byte frame header is read without waiting
/// (see [`recv`](Self::recv)), while the rest of a frame whose header has
/// arrived is read to completion.
pub struct WebSocketConnection<S = MaybeTlsStream> {
    stream: BufReader<S>,
    state: ConnectionState,
    tls: bool,
    mask_frames: bool,
    // Header bytes received so far for the frame currently being decoded.
    header: [u8; 2],
    header_len: usize,
}

impl WebSocketConnection<MaybeTlsStream> {
    /// Resolve `url`, open a socket (TLS for `wss`), and perform the upgrade.
    ///
    /// Any failure releases the socket before returning.
    pub async fn connect(url: &str, config: &WebSocketConfig) -> Result<Self> {
        let endpoint = WsUrl::parse(url)?;
        let stream = open_stream(&endpoint, &config.tls).await?;
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(target: "ledbot_net::websocket", "failed to set TCP_NODELAY: {}", e);
        }

        let tls = stream.is_tls();
        let stream = handshake(stream, &endpoint).await?;

        tracing::info!(
            target: "ledbot_net::websocket",
            host = %endpoint.host,
            port = endpoint.port,
            tls,
            "connection upgraded"
        );

        Ok(Self::from_upgraded(stream, tls, config.mask_frames))
    }
}

impl<S> WebSocketConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap a stream that has already completed the upgrade handshake.
    pub fn from_upgraded(stream: BufReader<S>, tls: bool, mask_frames: bool) -> Self {
        Self {
            stream,
            state: ConnectionState::Open,
            tls,
            mask_frames,
            header: [0; 2],
            header_len: 0,
        }
    }

    /// Wrap a raw stream positioned at frame data.
    pub fn from_stream(stream: S, mask_frames: bool) -> Self {
        Self::from_upgraded(BufReader::new(stream), false, mask_frames)
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Check if the connection is open.
    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    /// Whether the socket is TLS-wrapped.
    pub fn is_tls(&self) -> bool {
        self.tls
    }

    /// Send one final frame.
    pub async fn send(&mut self, opcode: Opcode, payload: &[u8]) -> Result<()> {
        if !self.is_open() {
            return Err(NetworkError::Connection(format!(
                "cannot send on a {} connection",
                self.state
            )));
        }

        let mask = self.mask_frames.then(rand::random::<[u8; 4]>);
        let bytes = encode_frame(opcode, payload, mask)?;

        if let Err(e) = write_all_flush(&mut self.stream, &bytes).await {
            self.mark_closed("write failed");
            return Err(NetworkError::Connection(format!(
                "failed to send {:?} frame ({} bytes): {}",
                opcode,
                payload.len(),
                e
            )));
        }

        tracing::trace!(
            target: "ledbot_net::websocket",
            ?opcode,
            len = payload.len(),
            "frame sent"
        );
        Ok(())
    }

    /// Send a text frame.
    pub async fn send_text(&mut self, text: &str) -> Result<()> {
        self.send(Opcode::Text, text.as_bytes()).await
    }

    /// Receive the next frame if its header is already available.
    ///
    /// Returns `Ok(None)` when no header bytes are ready, when the peer has
    /// closed or reset the socket (the connection becomes
    /// [`ConnectionState::Closed`]), or when the connection is not open.
    /// Once a header is complete the remaining bytes of that frame are read
    /// to completion. A 64-bit length or a truncated frame closes the
    /// connection and returns the error.
    pub async fn recv(&mut self) -> Result<Option<Frame>> {
        if !self.is_open() {
            return Ok(None);
        }

        while self.header_len < self.header.len() {
            let filled = self.header_len;
            match read_ready(&mut self.stream, &mut self.header[filled..]).await {
                None => return Ok(None),
                Some(Ok(0)) => {
                    self.mark_closed("peer closed the connection");
                    return Ok(None);
                }
                Some(Ok(n)) => self.header_len += n,
                Some(Err(e)) => {
                    tracing::warn!(target: "ledbot_net::websocket", "read failed: {}", e);
                    self.mark_closed("read failed");
                    return Ok(None);
                }
            }
        }
        self.header_len = 0;

        let result = match FrameHeader::parse(self.header) {
            Ok(header) => self.read_body(header).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(frame) => {
                tracing::trace!(
                    target: "ledbot_net::websocket",
                    opcode = ?frame.opcode,
                    len = frame.payload.len(),
                    "frame received"
                );
                Ok(Some(frame))
            }
            Err(e) => {
                self.mark_closed("frame decode failed");
                Err(e)
            }
        }
    }

    /// Mark the connection closed without touching the socket.
    pub fn mark_closed(&mut self, reason: &str) {
        if self.state != ConnectionState::Closed {
            tracing::debug!(target: "ledbot_net::websocket", reason, "connection closed");
        }
        self.state = ConnectionState::Closed;
    }

    /// Shut down the write side and release the socket.
    pub async fn close(mut self) {
        self.mark_closed("closed locally");
        if let Err(e) = self.stream.get_mut().shutdown().await {
            tracing::debug!(target: "ledbot_net::websocket", "shutdown failed: {}", e);
        }
    }

    async fn read_body(&mut self, header: FrameHeader) -> Result<Frame> {
        let len = match header.length {
            PayloadLength::Direct(len) => len,
            PayloadLength::Extended16 => {
                let mut ext = [0u8; 2];
                self.stream.read_exact(&mut ext).await.map_err(|e| {
                    NetworkError::Connection(format!("truncated extended length: {e}"))
                })?;
                usize::from(u16::from_be_bytes(ext))
            }
        };

        let key = if header.masked {
            let mut key = [0u8; 4];
            self.stream.read_exact(&mut key).await.map_err(|e| {
                NetworkError::Connection(format!("truncated masking key: {e}"))
            })?;
            Some(key)
        } else {
            None
        };

        let mut payload = vec![0u8; len];
        self.stream.read_exact(&mut payload).await.map_err(|e| {
            NetworkError::Connection(format!("truncated {len}-byte payload: {e}"))
        })?;

        if let Some(key) = key {
            apply_mask(&mut payload, key);
        }

        Ok(Frame {
            opcode: header.opcode,
            payload,
        })
    }
}

impl<S> std::fmt::Debug for WebSocketConnection<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketConnection")
            .field("state", &self.state)
            .field("tls", &self.tls)
            .field("mask_frames", &self.mask_frames)
            .finish()
    }
}

/// Poll a single read without waiting.
///
/// `None` means nothing is ready right now.
async fn read_ready<R>(reader: &mut R, buf: &mut [u8]) -> Option<io::Result<usize>>
where
    R: AsyncRead + Unpin,
{
    poll_fn(|cx| {
        let mut read_buf = ReadBuf::new(&mut *buf);
        match Pin::new(&mut *reader).poll_read(cx, &mut read_buf) {
            Poll::Ready(Ok(())) => Poll::Ready(Some(Ok(read_buf.filled().len()))),
            Poll::Ready(Err(e)) => Poll::Ready(Some(Err(e))),
            Poll::Pending => Poll::Ready(None),
        }
    })
    .await
}

async fn write_all_flush<W>(writer: &mut W, bytes: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(bytes).await?;
    writer.flush().await
}
