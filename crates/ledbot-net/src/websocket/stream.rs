//! Plain or TLS-wrapped TCP socket.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpStream, lookup_host};
use tokio_rustls::TlsConnector;

use super::endpoint::WsUrl;
use crate::error::{NetworkError, Result};
use crate::tls::TlsConfig;

/// A stream that may or may not be TLS-encrypted.
pub enum MaybeTlsStream {
    /// Unencrypted TCP (`ws://`).
    Plain(TcpStream),
    /// TLS over TCP (`wss://`).
    Tls(Box<tokio_rustls::client::TlsStream<TcpStream>>),
}

impl MaybeTlsStream {
    /// Whether the stream is TLS-wrapped.
    pub fn is_tls(&self) -> bool {
        matches!(self, MaybeTlsStream::Tls(_))
    }

    /// Set TCP_NODELAY on the underlying socket.
    pub fn set_nodelay(&self, nodelay: bool) -> io::Result<()> {
        match self {
            MaybeTlsStream::Plain(stream) => stream.set_nodelay(nodelay),
            MaybeTlsStream::Tls(stream) => stream.get_ref().0.set_nodelay(nodelay),
        }
    }
}

impl std::fmt::Debug for MaybeTlsStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let peer = match self {
            MaybeTlsStream::Plain(stream) => stream.peer_addr().ok(),
            MaybeTlsStream::Tls(stream) => stream.get_ref().0.peer_addr().ok(),
        };
        f.debug_struct("MaybeTlsStream")
            .field("tls", &self.is_tls())
            .field("peer", &peer)
            .finish()
    }
}

impl AsyncRead for MaybeTlsStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(stream) => Pin::new(stream).poll_read(cx, buf),
            MaybeTlsStream::Tls(stream) => Pin::new(stream.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for MaybeTlsStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(stream) => Pin::new(stream).poll_write(cx, buf),
            MaybeTlsStream::Tls(stream) => Pin::new(stream.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(stream) => Pin::new(stream).poll_flush(cx),
            MaybeTlsStream::Tls(stream) => Pin::new(stream.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(stream) => Pin::new(stream).poll_shutdown(cx),
            MaybeTlsStream::Tls(stream) => Pin::new(stream.as_mut()).poll_shutdown(cx),
        }
    }
}

/// Resolve the endpoint, connect a TCP socket, and wrap it in TLS for `wss`.
///
/// Resolved addresses are tried in order; the first that accepts wins.
pub async fn open_stream(endpoint: &WsUrl, tls: &TlsConfig) -> Result<MaybeTlsStream> {
    let addrs = lookup_host((endpoint.host.as_str(), endpoint.port))
        .await
        .map_err(|e| {
            NetworkError::Connection(format!("failed to resolve '{}': {}", endpoint.host, e))
        })?;

    let mut last_error = None;
    let mut tcp_stream = None;
    for addr in addrs {
        tracing::debug!(target: "ledbot_net::websocket", %addr, "connecting");
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                tcp_stream = Some(stream);
                break;
            }
            Err(e) => last_error = Some(e),
        }
    }

    let tcp_stream = tcp_stream.ok_or_else(|| {
        NetworkError::Connection(match last_error {
            Some(e) => format!("failed to connect to {}: {}", endpoint.address(), e),
            None => format!("'{}' resolved to no addresses", endpoint.host),
        })
    })?;

    if !endpoint.tls {
        return Ok(MaybeTlsStream::Plain(tcp_stream));
    }

    let connector = TlsConnector::from(tls.client_config()?);
    let server_name = ServerName::try_from(endpoint.host.clone()).map_err(|e| {
        NetworkError::Connection(format!("Invalid server name '{}': {}", endpoint.host, e))
    })?;

    let tls_stream = connector
        .connect(server_name, tcp_stream)
        .await
        .map_err(|e| NetworkError::Connection(format!("TLS handshake failed: {e}")))?;

    Ok(MaybeTlsStream::Tls(Box::new(tls_stream)))
}
