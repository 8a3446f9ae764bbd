// ── Domain model ──
//
// Attribute keys, proposed values, and the entity descriptor announced to
// the host.

pub mod attribute;
pub mod entity;

pub use attribute::{Attribute, AttributeBatch, AttributeDelta, Proposed, values_equal};
pub use entity::{Capability, EntityDescriptor};
