//! Trust configuration for outgoing TLS.
//!
//! The raw WebSocket socket (tokio-rustls) and the HTTP client (reqwest) are
//! configured from the same [`TlsConfig`]: the bundled Mozilla roots from
//! `webpki-roots`, any extra CA bundles, and a protocol floor.
//!
//! ```ignore
//! use ledbot_net::tls::{CaBundle, TlsConfig, TlsVersion};
//!
//! let tls = TlsConfig::new()
//!     .with_ca_bundle(CaBundle::load("/etc/ledbot/ca.pem")?)
//!     .with_min_version(TlsVersion::Tls1_3);
//! ```

use std::path::Path;
use std::sync::Arc;

use rustls::pki_types::CertificateDer;
use rustls::{ClientConfig, RootCertStore, SupportedProtocolVersion};
use serde::Deserialize;

use crate::error::{NetworkError, Result};

/// Make ring the process-wide rustls provider.
///
/// Later calls are no-ops.
pub fn install_crypto_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

/// Lowest TLS version a connection may negotiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum TlsVersion {
    #[default]
    #[serde(rename = "1.2")]
    Tls1_2,
    #[serde(rename = "1.3")]
    Tls1_3,
}

impl TlsVersion {
    /// Versions rustls may negotiate given this floor.
    pub(crate) fn protocol_versions(self) -> &'static [&'static SupportedProtocolVersion] {
        static FROM_1_2: [&SupportedProtocolVersion; 2] =
            [&rustls::version::TLS13, &rustls::version::TLS12];
        static FROM_1_3: [&SupportedProtocolVersion; 1] = [&rustls::version::TLS13];

        match self {
            Self::Tls1_2 => &FROM_1_2,
            Self::Tls1_3 => &FROM_1_3,
        }
    }

    pub(crate) fn reqwest_version(self) -> reqwest::tls::Version {
        match self {
            Self::Tls1_2 => reqwest::tls::Version::TLS_1_2,
            Self::Tls1_3 => reqwest::tls::Version::TLS_1_3,
        }
    }
}

/// CA certificates parsed from a PEM bundle.
#[derive(Clone)]
pub struct CaBundle {
    certs: Vec<CertificateDer<'static>>,
}

impl CaBundle {
    /// Parse every `CERTIFICATE` block in `pem`. An empty bundle is an error.
    pub fn parse(pem: &[u8]) -> Result<Self> {
        let mut reader = pem;
        let certs = rustls_pemfile::certs(&mut reader)
            .collect::<std::io::Result<Vec<_>>>()
            .map_err(|e| NetworkError::Connection(format!("malformed PEM: {e}")))?;

        if certs.is_empty() {
            return Err(NetworkError::Connection(
                "PEM bundle holds no certificates".to_string(),
            ));
        }
        Ok(Self { certs })
    }

    /// Read and parse a PEM file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let pem = std::fs::read(path).map_err(|e| {
            NetworkError::Connection(format!("cannot read CA bundle {}: {e}", path.display()))
        })?;
        Self::parse(&pem)
    }

    pub fn len(&self) -> usize {
        self.certs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certs.is_empty()
    }

    fn reqwest_certificates(&self) -> impl Iterator<Item = reqwest::Certificate> + '_ {
        self.certs
            .iter()
            .filter_map(|der| reqwest::Certificate::from_der(der.as_ref()).ok())
    }
}

impl std::fmt::Debug for CaBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CaBundle({} certs)", self.certs.len())
    }
}

/// Trust roots and protocol floor shared by every outgoing connection.
#[derive(Debug, Clone, Default)]
pub struct TlsConfig {
    /// Trusted in addition to the bundled roots.
    pub extra_roots: Vec<CaBundle>,
    pub min_version: TlsVersion,
}

impl TlsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ca_bundle(mut self, bundle: CaBundle) -> Self {
        self.extra_roots.push(bundle);
        self
    }

    pub fn with_min_version(mut self, version: TlsVersion) -> Self {
        self.min_version = version;
        self
    }

    /// True when only the bundled roots and the TLS 1.2 floor apply.
    pub fn is_default(&self) -> bool {
        self.extra_roots.is_empty() && self.min_version == TlsVersion::default()
    }

    /// rustls client configuration for the raw WebSocket socket.
    pub fn client_config(&self) -> Result<Arc<ClientConfig>> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let config = ClientConfig::builder_with_provider(provider)
            .with_protocol_versions(self.min_version.protocol_versions())
            .map_err(|e| NetworkError::Connection(format!("TLS setup failed: {e}")))?
            .with_root_certificates(self.root_store()?)
            .with_no_client_auth();

        Ok(Arc::new(config))
    }

    /// Apply roots and protocol floor to a reqwest client builder.
    pub(crate) fn apply_to(&self, mut builder: reqwest::ClientBuilder) -> reqwest::ClientBuilder {
        for bundle in &self.extra_roots {
            for cert in bundle.reqwest_certificates() {
                builder = builder.add_root_certificate(cert);
            }
        }
        builder.min_tls_version(self.min_version.reqwest_version())
    }

    fn root_store(&self) -> Result<RootCertStore> {
        let mut store = RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        };

        let extra = self.extra_roots.iter().flat_map(|bundle| bundle.certs.iter().cloned());
        let (added, ignored) = store.add_parsable_certificates(extra);
        if ignored > 0 {
            tracing::warn!(
                target: "ledbot_net::tls",
                added,
                ignored,
                "unusable CA certificates skipped"
            );
        }
        if added == 0 && !self.extra_roots.is_empty() {
            return Err(NetworkError::Connection(
                "none of the configured CA certificates could be parsed".to_string(),
            ));
        }

        Ok(store)
    }
}
