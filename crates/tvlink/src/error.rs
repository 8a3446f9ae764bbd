//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use tvlink_config::ConfigError;
use tvlink_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONFIG: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────

    #[error("No TV address configured")]
    #[diagnostic(
        code(tvlink::no_host),
        help(
            "Create a config with: tvlink config init <HOST>\n\
             Or pass --host, or set TVLINK_HOST.\n\
             Expected config at: {path}"
        )
    )]
    NoHost { path: String },

    #[error("Config file already exists at {path}")]
    #[diagnostic(
        code(tvlink::config_exists),
        help("Use --force to overwrite it.")
    )]
    ConfigExists { path: String },

    #[error(transparent)]
    #[diagnostic(code(tvlink::config))]
    Config(#[from] ConfigError),

    // ── Actions ──────────────────────────────────────────────────────

    #[error("Unknown action '{name}'")]
    #[diagnostic(
        code(tvlink::unknown_action),
        help("Run: tvlink actions to see what the TV understands")
    )]
    UnknownAction { name: String },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(tvlink::validation))]
    Validation { field: String, reason: String },

    // ── Connection ───────────────────────────────────────────────────

    #[error("TV at {host} did not accept the connection within {seconds}s")]
    #[diagnostic(
        code(tvlink::timeout),
        help(
            "Check that the TV is on and reachable, and that network control\n\
             (\"LG Connect Apps\") is enabled. On first use, accept the pairing\n\
             prompt on the TV screen. Increase the wait with --wait."
        )
    )]
    Timeout { host: String, seconds: u64 },

    #[error("Session ended unexpectedly")]
    #[diagnostic(code(tvlink::session_closed))]
    SessionClosed,

    // ── IO ───────────────────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoHost { .. } | Self::ConfigExists { .. } | Self::Config(_) => exit_code::CONFIG,
            Self::UnknownAction { .. } | Self::Validation { .. } => exit_code::USAGE,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::SessionClosed => exit_code::CONNECTION,
            Self::Io(_) => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Configuration { message } => Self::Validation {
                field: "host".into(),
                reason: message,
            },
            CoreError::InvalidAction {
                action,
                param,
                reason,
            } => Self::Validation {
                field: format!("{action} {param}"),
                reason,
            },
            CoreError::SessionClosed => Self::SessionClosed,
        }
    }
}
