//! HTTP/1.1 Upgrade handshake.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use super::endpoint::WsUrl;
use crate::error::{NetworkError, Result};

/// Status code of a successful upgrade.
pub const SWITCHING_PROTOCOLS: u16 = 101;

/// Longest status or header line accepted from the server, newline included.
pub const MAX_LINE_LEN: usize = 8192;

/// Generate a fresh `Sec-WebSocket-Key`: 16 random bytes, base64-encoded.
pub fn generate_key() -> String {
    let key: [u8; 16] = rand::random();
    STANDARD.encode(key)
}

/// Build the upgrade request for `endpoint`.
pub fn build_request(endpoint: &WsUrl, key: &str) -> String {
    format!(
        "GET {} HTTP/1.1\r\n\
         Host: {}\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Key: {}\r\n\
         Sec-WebSocket-Version: 13\r\n\
         \r\n",
        endpoint.resource,
        endpoint.host_header(),
        key
    )
}

/// Extract the numeric status from an HTTP status line.
pub fn parse_status_line(line: &[u8]) -> Result<u16> {
    let text = String::from_utf8_lossy(line);
    let mut parts = text.split_whitespace();

    match (parts.next(), parts.next()) {
        (Some(version), Some(code)) if version.starts_with("HTTP/") => {
            code.parse::<u16>().map_err(|_| {
                NetworkError::Protocol(format!("malformed status line: {:?}", text.trim_end()))
            })
        }
        _ => Err(NetworkError::Protocol(format!(
            "malformed status line: {:?}",
            text.trim_end()
        ))),
    }
}

/// Perform the upgrade handshake over an already connected stream.
///
/// On success the returned reader is positioned at the first frame byte; any
/// frame data the server sent along with the headers stays in its buffer. On
/// failure the stream is dropped, which releases the socket.
pub async fn handshake<S>(stream: S, endpoint: &WsUrl) -> Result<BufReader<S>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut stream = BufReader::new(stream);
    let request = build_request(endpoint, &generate_key());

    stream.write_all(request.as_bytes()).await?;
    stream.flush().await?;

    let mut line = Vec::new();
    if read_line(&mut stream, &mut line).await? == 0 {
        return Err(NetworkError::Connection(
            "connection closed before the upgrade response".to_string(),
        ));
    }

    let status = parse_status_line(&line)?;
    if status != SWITCHING_PROTOCOLS {
        tracing::warn!(
            target: "ledbot_net::websocket",
            status,
            host = %endpoint.host,
            "upgrade rejected"
        );
        return Err(NetworkError::Handshake { status });
    }

    loop {
        let n = read_line(&mut stream, &mut line).await?;
        if n == 0 || line == b"\r\n" || line == b"\n" {
            break;
        }
    }

    Ok(stream)
}

/// Read one line into `line` (cleared first), failing if it exceeds
/// [`MAX_LINE_LEN`] without a newline.
async fn read_line<S>(stream: &mut BufReader<S>, line: &mut Vec<u8>) -> Result<usize>
where
    S: AsyncRead + Unpin,
{
    line.clear();
    let n = (&mut *stream)
        .take(MAX_LINE_LEN as u64)
        .read_until(b'\n', line)
        .await?;
    if n == MAX_LINE_LEN && !line.ends_with(b"\n") {
        return Err(NetworkError::Protocol(format!(
            "upgrade response line longer than {MAX_LINE_LEN} bytes"
        )));
    }
    Ok(n)
}

#[cfg(test)]
mod tests {
    use tokio::io::duplex;

    use super::*;

    fn endpoint() -> WsUrl {
        WsUrl::parse("wss://wss-primary.slack.com/link/?ticket=t1").unwrap()
    }

    /// Read one HTTP request head from the server side of a duplex pipe.
    async fn read_request<S: AsyncRead + Unpin>(server: &mut S) -> String {
        let mut request = Vec::new();
        let mut byte = [0u8; 1];
        while !request.ends_with(b"\r\n\r\n") {
            server.read_exact(&mut byte).await.unwrap();
            request.push(byte[0]);
        }
        String::from_utf8(request).unwrap()
    }

    #[test]
    fn test_generated_key_is_16_bytes_base64() {
        let key = generate_key();
        assert_eq!(key.len(), 24);
        assert_eq!(STANDARD.decode(&key).unwrap().len(), 16);
        assert_ne!(generate_key(), key);
    }

    #[test]
    fn test_request_contains_upgrade_headers() {
        let request = build_request(&endpoint(), "dGhlIHNhbXBsZSBub25jZQ==");
        assert!(request.starts_with("GET /link/?ticket=t1 HTTP/1.1\r\n"));
        assert!(request.contains("Host: wss-primary.slack.com\r\n"));
        assert!(request.contains("Upgrade: websocket\r\n"));
        assert!(request.contains("Connection: Upgrade\r\n"));
        assert!(request.contains("Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n"));
        assert!(request.contains("Sec-WebSocket-Version: 13\r\n"));
        assert!(request.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_parse_status_line() {
        assert_eq!(
            parse_status_line(b"HTTP/1.1 101 Switching Protocols\r\n").unwrap(),
            101
        );
        assert_eq!(parse_status_line(b"HTTP/1.1 404 Not Found\r\n").unwrap(), 404);
        assert!(matches!(
            parse_status_line(b"garbage\r\n"),
            Err(NetworkError::Protocol(_))
        ));
        assert!(matches!(
            parse_status_line(b"HTTP/1.1 abc\r\n"),
            Err(NetworkError::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn test_handshake_success_leaves_frame_bytes_readable() {
        let (client, mut server) = duplex(4096);

        let server_task = tokio::spawn(async move {
            let request = read_request(&mut server).await;
            server
                .write_all(
                    b"HTTP/1.1 101 Switching Protocols\r\n\
                      Upgrade: websocket\r\n\
                      Connection: Upgrade\r\n\
                      \r\n\x81\x02hi",
                )
                .await
                .unwrap();
            (request, server)
        });

        let mut reader = handshake(client, &endpoint()).await.unwrap();
        let mut frame = [0u8; 4];
        reader.read_exact(&mut frame).await.unwrap();
        assert_eq!(&frame, b"\x81\x02hi");

        let (request, _server) = server_task.await.unwrap();
        assert!(request.contains("Sec-WebSocket-Version: 13"));
    }

    #[tokio::test]
    async fn test_handshake_404_fails_and_releases_stream() {
        let (client, mut server) = duplex(4096);

        let server_task = tokio::spawn(async move {
            read_request(&mut server).await;
            server
                .write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n")
                .await
                .unwrap();
            // The client dropping its end shows up as EOF here.
            let mut rest = Vec::new();
            server.read_to_end(&mut rest).await.unwrap();
            rest.len()
        });

        let err = handshake(client, &endpoint()).await.unwrap_err();
        assert!(matches!(err, NetworkError::Handshake { status: 404 }));
        assert_eq!(server_task.await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_handshake_eof_before_status_is_connection_error() {
        let (client, mut server) = duplex(4096);

        let server_task = tokio::spawn(async move {
            read_request(&mut server).await;
            drop(server);
        });

        let err = handshake(client, &endpoint()).await.unwrap_err();
        assert!(matches!(err, NetworkError::Connection(_)));
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn test_overlong_response_line_is_protocol_error() {
        let (client, mut server) = duplex(4096);

        let server_task = tokio::spawn(async move {
            read_request(&mut server).await;
            server.write_all(b"HTTP/1.1 101 Switching Protocols\r\n").await.unwrap();
            // The client stops reading once the cap is hit, so writes may fail.
            let filler = vec![b'x'; 1024];
            for _ in 0..(MAX_LINE_LEN / filler.len() + 2) {
                if server.write_all(&filler).await.is_err() {
                    break;
                }
            }
            server
        });

        let err = handshake(client, &endpoint()).await.unwrap_err();
        assert!(matches!(err, NetworkError::Protocol(ref msg) if msg.contains("8192")));
        drop(server_task.await.unwrap());
    }

    #[tokio::test]
    async fn test_header_line_at_cap_with_newline_is_accepted() {
        let (client, mut server) = duplex(4096);

        let server_task = tokio::spawn(async move {
            read_request(&mut server).await;
            let mut header = b"X-Padding: ".to_vec();
            header.resize(MAX_LINE_LEN - 2, b'p');
            header.extend_from_slice(b"\r\n");
            server.write_all(b"HTTP/1.1 101 Switching Protocols\r\n").await.unwrap();
            server.write_all(&header).await.unwrap();
            server.write_all(b"\r\n").await.unwrap();
            server
        });

        assert!(handshake(client, &endpoint()).await.is_ok());
        drop(server_task.await.unwrap());
    }
}
