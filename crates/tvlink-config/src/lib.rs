//! Configuration for the tvlink binary.
//!
//! A single TOML file (plus `TVLINK_*` environment overrides) describes the
//! TV to control, and translates into `tvlink_core::SessionConfig`. The
//! pairing key the TV issues is kept in its own file, next to the rest of
//! the application data, through [`FileKeyStore`].

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use tvlink_core::{KeyStore, SessionConfig};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config ─────────────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// TV hostname or IP address.
    pub host: Option<String>,

    /// Connect over TLS on port 3001.
    #[serde(default)]
    pub secure: bool,

    /// Port override (defaults to 3000, or 3001 when `secure`).
    pub port: Option<u16>,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Base reconnect interval.
    #[serde(default = "default_retry_interval")]
    pub retry_interval_ms: u64,

    /// Display name for the TV.
    #[serde(default = "default_name")]
    pub name: String,

    /// Where the pairing key is stored. Defaults to the data directory.
    pub key_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: None,
            secure: false,
            port: None,
            connect_timeout_secs: default_connect_timeout(),
            retry_interval_ms: default_retry_interval(),
            name: default_name(),
            key_file: None,
        }
    }
}

fn default_connect_timeout() -> u64 {
    10
}
fn default_retry_interval() -> u64 {
    5000
}
fn default_name() -> String {
    tvlink_core::config::DEFAULT_NAME.into()
}

impl Config {
    /// Translate to the session's runtime configuration.
    pub fn to_session_config(&self) -> Result<SessionConfig, ConfigError> {
        if self.connect_timeout_secs == 0 {
            return Err(ConfigError::Validation {
                field: "connect_timeout_secs".into(),
                reason: "must be greater than zero".into(),
            });
        }
        if self.retry_interval_ms == 0 {
            return Err(ConfigError::Validation {
                field: "retry_interval_ms".into(),
                reason: "must be greater than zero".into(),
            });
        }

        Ok(SessionConfig {
            host: self.host.clone().filter(|h| !h.trim().is_empty()),
            secure: self.secure,
            port: self.port,
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            retry_interval: Duration::from_millis(self.retry_interval_ms),
            name: self.name.clone(),
        })
    }

    /// Resolved pairing-key location.
    pub fn key_path(&self) -> PathBuf {
        self.key_file.clone().unwrap_or_else(default_key_path)
    }
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "tvlink", "tvlink")
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default location of the stored pairing key.
pub fn default_key_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback().join("client-key"),
        |dirs| dirs.data_dir().join("client-key"),
    )
}

fn home_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("tvlink");
    p
}

// ── Loading / saving ────────────────────────────────────────────────

/// Load config from `path` (missing file is fine) layered under `TVLINK_*` env vars.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("TVLINK_"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Serialize config to TOML and write it to `path`.
pub fn save_config(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    fs::write(path, toml_str)?;
    Ok(())
}

// ── Pairing key storage ─────────────────────────────────────────────

/// Stores the pairing key as a single-line file.
///
/// I/O failures are logged and otherwise ignored: a missing key only means
/// the TV will prompt for pairing again.
#[derive(Debug, Clone)]
pub struct FileKeyStore {
    path: PathBuf,
}

impl FileKeyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, key: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path)?;

        // `mode` only applies on creation; tighten a file that already existed.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600))?;
        }
        file.write_all(format!("{key}\n").as_bytes())?;
        Ok(())
    }
}

impl KeyStore for FileKeyStore {
    fn load(&self) -> Option<SecretString> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let key = contents.trim();
                (!key.is_empty()).then(|| SecretString::from(key.to_owned()))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no stored pairing key");
                None
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "cannot read pairing key");
                None
            }
        }
    }

    fn save(&self, key: &SecretString) {
        match self.write(key.expose_secret()) {
            Ok(()) => debug!(path = %self.path.display(), "pairing key stored"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "cannot store pairing key"),
        }
    }
}
