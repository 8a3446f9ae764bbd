// ── Runtime session configuration ──
//
// Describes *where* the TV is and how patient to be with it. Never touches
// disk: `tvlink-config` (or any other host) builds a `SessionConfig` and
// hands it to `Session::start`.

use std::time::Duration;

use tvlink_api::TransportConfig;

use crate::backoff::DEFAULT_RETRY_INTERVAL;
use crate::error::CoreError;

/// Default display name for the TV entity.
pub const DEFAULT_NAME: &str = "Television";

/// Connection parameters for one TV.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Hostname or IP address. Required; `start` fails without it.
    pub host: Option<String>,
    /// Connect over TLS (port 3001) instead of plaintext (port 3000).
    pub secure: bool,
    /// Port override, mostly useful for test doubles.
    pub port: Option<u16>,
    /// Upper bound on a single connection attempt.
    pub connect_timeout: Duration,
    /// Base reconnect delay, also the fixed delay after soft failures.
    pub retry_interval: Duration,
    /// Display name announced to the host when the entity is registered.
    pub name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: None,
            secure: false,
            port: None,
            connect_timeout: Duration::from_secs(10),
            retry_interval: DEFAULT_RETRY_INTERVAL,
            name: DEFAULT_NAME.into(),
        }
    }
}

impl SessionConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: Some(host.into()),
            ..Self::default()
        }
    }

    /// The trimmed host address, or a configuration error if none is set.
    pub fn address(&self) -> Result<&str, CoreError> {
        match self.host.as_deref().map(str::trim) {
            Some(host) if !host.is_empty() => Ok(host),
            _ => Err(CoreError::Configuration {
                message: "no TV host address configured".into(),
            }),
        }
    }

    pub(crate) fn transport(&self) -> Result<TransportConfig, CoreError> {
        let mut transport = TransportConfig::new(self.address()?);
        transport.secure = self.secure;
        transport.port = self.port;
        transport.connect_timeout = self.connect_timeout;
        Ok(transport)
    }
}
