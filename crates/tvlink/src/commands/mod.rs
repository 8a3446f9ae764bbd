//! Command handlers and the session plumbing they share.

pub mod config_cmd;
pub mod run;
pub mod send;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tvlink_config::{Config, FileKeyStore};
use tvlink_core::{ConnectionState, Host, Session, SessionConfig, WebSocketConnector};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Grace period for queued frames to reach the TV before the socket closes.
pub const LINGER: Duration = Duration::from_millis(500);

/// Config file contents merged with CLI overrides.
#[derive(Debug)]
pub struct Resolved {
    pub path: PathBuf,
    pub config: Config,
}

pub fn config_path(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(tvlink_config::config_path)
}

/// Load the config file and apply `--host` / `--secure`.
pub fn resolve(global: &GlobalOpts) -> Result<Resolved, CliError> {
    let path = config_path(global);
    let mut config = tvlink_config::load_config(&path)?;

    if let Some(ref host) = global.host {
        config.host = Some(host.clone());
    }
    if global.secure {
        config.secure = true;
    }

    Ok(Resolved { path, config })
}

impl Resolved {
    pub fn session_config(&self) -> Result<SessionConfig, CliError> {
        let session = self.config.to_session_config()?;
        if session.address().is_err() {
            return Err(CliError::NoHost {
                path: self.path.display().to_string(),
            });
        }
        Ok(session)
    }

    /// Spawn a session against the real TV and start connecting.
    pub fn start_session(&self, host: Arc<dyn Host>) -> Result<Session, CliError> {
        let session_config = self.session_config()?;
        let keys = Arc::new(FileKeyStore::new(self.config.key_path()));
        let session = Session::spawn(host, Arc::new(WebSocketConnector), keys);
        session.start(session_config)?;
        Ok(session)
    }
}

/// Stop the session and give the socket a moment to close cleanly.
pub async fn finish(session: Session) {
    session.stop();
    let mut state = session.connection_state();
    let _ = tokio::time::timeout(
        LINGER,
        state.wait_for(|s| *s == ConnectionState::Disconnected),
    )
    .await;
    session.shutdown();
}
