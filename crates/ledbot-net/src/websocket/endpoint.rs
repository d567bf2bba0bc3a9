//! `ws://` / `wss://` endpoint parsing.

use url::{Host, Url};

use crate::error::{NetworkError, Result};

/// The parts of a WebSocket URL needed to open and upgrade a socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WsUrl {
    /// Whether the socket is wrapped in TLS (`wss`).
    pub tls: bool,
    /// Host name or address without IPv6 brackets, also used for SNI and
    /// certificate validation.
    pub host: String,
    /// Port, defaulted from the scheme when absent.
    pub port: u16,
    /// Request target for the upgrade `GET`: path plus query, never empty.
    pub resource: String,
}

impl WsUrl {
    /// Parse a WebSocket URL.
    ///
    /// Schemes other than `ws` and `wss` are rejected.
    pub fn parse(input: &str) -> Result<Self> {
        let url = Url::parse(input)?;

        let tls = match url.scheme() {
            "ws" => false,
            "wss" => true,
            other => {
                return Err(NetworkError::Connection(format!(
                    "unsupported URL scheme '{other}'"
                )));
            }
        };

        let host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            None => {
                return Err(NetworkError::Connection(format!("URL '{input}' has no host")));
            }
        };

        let port = url
            .port_or_known_default()
            .unwrap_or(if tls { 443 } else { 80 });

        let mut resource = url.path().to_string();
        if resource.is_empty() {
            resource.push('/');
        }
        if let Some(query) = url.query() {
            resource.push('?');
            resource.push_str(query);
        }

        Ok(Self {
            tls,
            host,
            port,
            resource,
        })
    }

    /// Whether the port is the scheme's default.
    pub fn is_default_port(&self) -> bool {
        self.port == if self.tls { 443 } else { 80 }
    }

    /// Value for the `Host` request header.
    pub fn host_header(&self) -> String {
        if self.is_default_port() {
            self.bracketed_host()
        } else {
            self.address()
        }
    }

    /// `host:port`, with IPv6 literals in brackets.
    pub fn address(&self) -> String {
        format!("{}:{}", self.bracketed_host(), self.port)
    }

    fn bracketed_host(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wss_with_query() {
        let url = WsUrl::parse("wss://wss-primary.slack.com/link/?ticket=abc&app_id=xyz").unwrap();
        assert!(url.tls);
        assert_eq!(url.host, "wss-primary.slack.com");
        assert_eq!(url.port, 443);
        assert_eq!(url.resource, "/link/?ticket=abc&app_id=xyz");
        assert_eq!(url.host_header(), "wss-primary.slack.com");
    }

    #[test]
    fn test_parse_ws_with_port_and_no_path() {
        let url = WsUrl::parse("ws://127.0.0.1:9001").unwrap();
        assert!(!url.tls);
        assert_eq!(url.port, 9001);
        assert_eq!(url.resource, "/");
        assert_eq!(url.host_header(), "127.0.0.1:9001");
        assert_eq!(url.address(), "127.0.0.1:9001");
    }

    #[test]
    fn test_parse_ipv6_literal_strips_brackets() {
        let url = WsUrl::parse("ws://[::1]:9001/socket").unwrap();
        assert_eq!(url.host, "::1");
        assert_eq!(url.host_header(), "[::1]:9001");
        assert_eq!(url.address(), "[::1]:9001");

        let url = WsUrl::parse("wss://[2001:db8::7]/").unwrap();
        assert_eq!(url.host, "2001:db8::7");
        assert_eq!(url.host_header(), "[2001:db8::7]");
    }

    #[test]
    fn test_parse_rejects_http_scheme() {
        let err = WsUrl::parse("https://example.com/socket").unwrap_err();
        assert!(matches!(err, NetworkError::Connection(ref msg) if msg.contains("https")));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            WsUrl::parse("not a url"),
            Err(NetworkError::Connection(_))
        ));
    }
}
