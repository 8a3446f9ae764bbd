// ── Console host ──
//
// Minimal `Host` for the CLI: keeps attributes in memory, prints each
// written value to stdout as `key = value`, and routes warnings to stderr.

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde_json::Value;
use tracing::{info, warn};

use tvlink_core::{ActionParams, Attribute, AttributeBatch, EntityDescriptor, Host};

#[derive(Debug, Default)]
pub struct ConsoleHost {
    attributes: Mutex<BTreeMap<Attribute, Value>>,
    /// Suppress attribute output (used by one-shot commands).
    quiet: bool,
}

impl ConsoleHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn quiet() -> Self {
        Self {
            quiet: true,
            ..Self::default()
        }
    }
}

impl Host for ConsoleHost {
    fn register_entity(&self, entity: &EntityDescriptor) {
        let capabilities: Vec<String> = entity.capabilities.iter().map(ToString::to_string).collect();
        info!(id = %entity.id, name = %entity.name, capabilities = ?capabilities, "TV registered");
    }

    fn attribute(&self, key: Attribute) -> Option<Value> {
        let attributes = self.attributes.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        attributes.get(&key).cloned()
    }

    fn write_attributes(&self, batch: &AttributeBatch) {
        let mut attributes = self.attributes.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        for (key, value) in &batch.writes {
            attributes.insert(*key, value.clone());
            if !self.quiet {
                println!("{key} = {value}");
            }
        }
    }

    fn set_reachable(&self, reachable: bool) {
        if reachable {
            info!("TV reachable");
        } else {
            warn!("TV unreachable, still retrying");
        }
    }

    fn warn(&self, message: &str) {
        eprintln!("warning: {message}");
    }

    fn default_action(&self, name: &str, params: &ActionParams) {
        warn!(action = name, params = ?params, "unsupported action");
    }
}
