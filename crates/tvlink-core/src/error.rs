// ── Core error types ──
//
// User-facing errors from tvlink-core. Transport failures never surface
// here: the session classifies and retries them internally, and the host
// only ever observes reachability changes.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    // ── Action errors ────────────────────────────────────────────────
    /// An action parameter could not be interpreted. The action is dropped.
    #[error("Invalid parameter '{param}' for {action}: {reason}")]
    InvalidAction {
        action: String,
        param: String,
        reason: String,
    },

    // ── Lifecycle errors ─────────────────────────────────────────────
    #[error("Session task is no longer running")]
    SessionClosed,
}
