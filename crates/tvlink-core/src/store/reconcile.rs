// ── Attribute reconciler ──
//
// Decides, per attribute, whether a proposed value is a real change. Pushes
// from the TV repeat unchanged fields constantly; only values that differ
// structurally from what the host already holds are written, and all of
// one push's writes go to the host as a single batch.

use std::collections::BTreeMap;

use serde_json::Value;
use strum::IntoEnumIterator;
use tracing::trace;

use crate::host::Host;
use crate::model::{Attribute, AttributeBatch, AttributeDelta, Proposed, values_equal};

/// Result of comparing one proposed value against the current one.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Emit(Value),
    Skip,
}

/// Pure decision for a single attribute.
pub fn reconcile(current: Option<&Value>, proposed: Proposed) -> Outcome {
    match (proposed, current) {
        (Proposed::Ignored, _) => Outcome::Skip,
        (Proposed::Value(next), Some(current)) if values_equal(current, &next) => Outcome::Skip,
        (Proposed::Value(next), _) => Outcome::Emit(next),
    }
}

/// Last-written attribute values, mirrored from the host.
#[derive(Debug, Default)]
pub struct AttributeReconciler {
    known: BTreeMap<Attribute, Value>,
}

impl AttributeReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load whatever the host already holds, without emitting anything.
    pub fn seed_from(&mut self, host: &dyn Host) {
        for attribute in Attribute::iter() {
            if let Some(value) = host.attribute(attribute) {
                self.known.insert(attribute, value);
            }
        }
    }

    pub fn get(&self, attribute: Attribute) -> Option<&Value> {
        self.known.get(&attribute)
    }

    pub fn power_state(&self) -> Option<bool> {
        self.get(Attribute::PowerState).and_then(Value::as_bool)
    }

    pub fn volume_level(&self) -> Option<f64> {
        self.get(Attribute::VolumeLevel).and_then(Value::as_f64)
    }

    /// Filter `delta` down to real changes, record them, and write them to
    /// the host as one batch. Returns the batch that was written.
    pub fn apply(&mut self, delta: AttributeDelta, host: &dyn Host) -> AttributeBatch {
        let mut batch = AttributeBatch::default();
        for (attribute, proposed) in delta {
            match reconcile(self.known.get(&attribute), proposed) {
                Outcome::Emit(value) => {
                    self.known.insert(attribute, value.clone());
                    batch.writes.push((attribute, value));
                }
                Outcome::Skip => trace!(%attribute, "unchanged, skipping"),
            }
        }

        if !batch.is_empty() {
            host.write_attributes(&batch);
        }
        batch
    }
}
