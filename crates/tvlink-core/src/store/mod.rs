// ── Attribute store ──
//
// The session's view of what the host already shows, and the logic that
// decides which proposed values are worth writing.

pub mod reconcile;

pub use reconcile::{AttributeReconciler, Outcome, reconcile};
