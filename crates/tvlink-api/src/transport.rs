// Connection target and TLS setup for the TV socket.
//
// The TV listens on two fixed ports: plaintext WebSocket on 3000 and
// TLS on 3001. The TLS port presents a self-signed certificate, so
// secure mode uses a verifier that accepts any certificate while still
// checking handshake signatures.

use std::sync::Arc;
use std::time::Duration;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
use rustls::{ClientConfig, DigitallySignedStruct, SignatureScheme};
use rustls_pki_types::{CertificateDer, ServerName, UnixTime};
use url::Url;

use crate::error::Error;

pub const INSECURE_PORT: u16 = 3000;
pub const SECURE_PORT: u16 = 3001;

/// Where and how to open the socket.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// TV hostname or IP address.
    pub host: String,
    /// Use `wss://` on the TLS port instead of `ws://`.
    pub secure: bool,
    /// Explicit port. `None` picks the fixed port for the mode.
    pub port: Option<u16>,
    /// Upper bound on TCP connect + WebSocket upgrade.
    pub connect_timeout: Duration,
}

impl TransportConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            secure: false,
            port: None,
            connect_timeout: Duration::from_secs(10),
        }
    }

    pub fn port(&self) -> u16 {
        self.port
            .unwrap_or(if self.secure { SECURE_PORT } else { INSECURE_PORT })
    }

    /// The WebSocket URL for this target.
    pub fn url(&self) -> Result<Url, Error> {
        let scheme = if self.secure { "wss" } else { "ws" };
        // Bare IPv6 literals need brackets inside a URL authority.
        let host = if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        Ok(Url::parse(&format!("{scheme}://{host}:{}/", self.port()))?)
    }
}

// ── Relaxed TLS ──────────────────────────────────────────────────────

/// Build a rustls client config that trusts any server certificate.
pub(crate) fn accept_any_cert_config() -> Result<ClientConfig, Error> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = ClientConfig::builder_with_provider(Arc::clone(&provider))
        .with_safe_default_protocol_versions()
        .map_err(|e| Error::Tls(format!("unsupported protocol versions: {e}")))?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyCert(provider)))
        .with_no_client_auth();
    Ok(config)
}

#[derive(Debug)]
struct AcceptAnyCert(Arc<CryptoProvider>);

impl ServerCertVerifier for AcceptAnyCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}
