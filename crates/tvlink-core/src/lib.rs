//! Device session core for webOS televisions.
//!
//! This crate owns the connection lifecycle and state synchronization for a
//! single TV, independent of any particular host application:
//!
//! - **[`Session`]**: handle to a single-task state machine. Every input
//!   (host calls, transport events, timer expiries) is processed in order
//!   from one queue. Reconnects follow a [`BackoffPolicy`] and repeated hard
//!   failures mark the TV unreachable.
//!
//! - **[`SubscriptionRouter`]**: registers the TV's push feeds on connect,
//!   normalizes pushes into attribute deltas, and unlocks the channel feed
//!   when live TV comes to the foreground.
//!
//! - **[`AttributeReconciler`]**: suppresses writes whose value has not
//!   changed and flushes each push to the [`Host`] as one batch.
//!
//! - **[`Action`]** and [`translate()`]: typed host actions and their
//!   mapping to protocol requests.
//!
//! - **Seams**: [`Host`], [`KeyStore`] and [`Connector`] are traits so the
//!   embedding application (and tests) can supply their own.

pub mod backoff;
pub mod command;
pub mod config;
pub mod debounce;
pub mod error;
pub mod host;
pub mod model;
pub mod session;
pub mod store;
pub mod subscription;
pub mod transport;

// ── Primary re-exports ──────────────────────────────────────────────
pub use backoff::BackoffPolicy;
pub use command::{Action, ActionName, ActionParams, MuteKind, translate};
pub use config::SessionConfig;
pub use debounce::Debouncer;
pub use error::CoreError;
pub use host::{Host, KeyStore, MemoryKeyStore};
pub use model::{Attribute, AttributeBatch, AttributeDelta, Capability, EntityDescriptor, Proposed};
pub use session::{ConnectionState, Session};
pub use store::AttributeReconciler;
pub use subscription::{Channel, SubscriptionRouter};
pub use transport::{Connection, Connector, WebSocketConnector};
