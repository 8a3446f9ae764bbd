use std::io;

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Top-level error type for the `tvlink-api` crate.
///
/// Every failure the transport can report ends up here. `tvlink-core`
/// only cares about one distinction: [`is_soft`](Self::is_soft).
#[derive(Debug, Error)]
pub enum Error {
    // ── Reachability (soft) ─────────────────────────────────────────
    /// The TV's address could not be reached (powered off, asleep, off-network).
    #[error("Host unreachable: {0}")]
    Unreachable(String),

    /// The connection attempt did not complete in time.
    #[error("Connection timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Transport (hard) ────────────────────────────────────────────
    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// WebSocket connection failed or broke mid-stream.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// WebSocket closed with an error code.
    #[error("WebSocket closed (code {code}): {reason}")]
    WebSocketClosed { code: u16, reason: String },

    /// TLS setup or handshake error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Protocol ────────────────────────────────────────────────────
    /// The TV answered the registration with an error (user declined the prompt,
    /// stale client key, ...).
    #[error("Pairing rejected by TV: {0}")]
    PairingRejected(String),

    /// An outbound frame could not be encoded.
    #[error("Failed to encode frame: {0}")]
    Serialization(String),
}

impl Error {
    /// Returns `true` for expected network noise: the TV is simply not
    /// there right now. Soft errors never count towards offline escalation.
    pub fn is_soft(&self) -> bool {
        matches!(self, Self::Unreachable(_) | Self::Timeout { .. })
    }
}

impl From<tungstenite::Error> for Error {
    fn from(err: tungstenite::Error) -> Self {
        match err {
            tungstenite::Error::Io(e) => Self::from(e),
            tungstenite::Error::Tls(e) => Self::Tls(e.to_string()),
            tungstenite::Error::Url(e) => Self::WebSocketConnect(format!("bad URL: {e}")),
            other => Self::WebSocketConnect(other.to_string()),
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::HostUnreachable
            | io::ErrorKind::NetworkUnreachable
            | io::ErrorKind::TimedOut => Self::Unreachable(err.to_string()),
            _ => Self::WebSocketConnect(err.to_string()),
        }
    }
}
