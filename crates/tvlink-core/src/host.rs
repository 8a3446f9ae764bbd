// ── Host seams ──
//
// The session core never talks to a UI, an automation engine, or the disk
// directly. Everything it needs from its embedding goes through `Host`
// (attribute storage, reachability, warnings, unknown actions) and
// `KeyStore` (the pairing key).

use std::sync::Mutex;

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::command::ActionParams;
use crate::model::{Attribute, AttributeBatch, EntityDescriptor};

/// The embedding application, seen from the session.
///
/// Implementations must be cheap and non-blocking: every call is made from
/// the session task.
pub trait Host: Send + Sync {
    /// Announce the TV entity. Called once, on the first `start`.
    fn register_entity(&self, entity: &EntityDescriptor);

    /// Last value the host holds for `key`, used to seed the reconciler.
    fn attribute(&self, key: Attribute) -> Option<Value>;

    /// Apply a batch of attribute writes, notifying observers once.
    fn write_attributes(&self, batch: &AttributeBatch);

    /// Report whether the TV is currently reachable.
    fn set_reachable(&self, reachable: bool);

    /// Surface a user-facing warning (e.g. "accept the pairing prompt").
    fn warn(&self, message: &str);

    /// Handle an action the session does not recognize.
    fn default_action(&self, name: &str, params: &ActionParams);
}

// ── KeyStore ─────────────────────────────────────────────────────────

/// Persistent storage for the client key the TV issues on pairing.
pub trait KeyStore: Send + Sync {
    fn load(&self) -> Option<SecretString>;
    fn save(&self, key: &SecretString);
}

/// In-memory key storage. Forgets the key when dropped.
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    key: Mutex<Option<String>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            key: Mutex::new(Some(key.into())),
        }
    }
}

impl KeyStore for MemoryKeyStore {
    fn load(&self) -> Option<SecretString> {
        let guard = self.key.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        guard.clone().map(SecretString::from)
    }

    fn save(&self, key: &SecretString) {
        let mut guard = self.key.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = Some(key.expose_secret().to_owned());
    }
}
