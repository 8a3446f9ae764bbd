//! Async client for the webOS television control protocol.
//!
//! The TV exposes a JSON request/subscribe protocol over a single
//! WebSocket. This crate owns everything that touches the wire:
//!
//! - **[`protocol`]**: endpoint table, outbound/inbound frame shapes, and
//!   the registration manifest.
//! - **[`transport`]**: URL construction for the plaintext and TLS ports,
//!   plus the relaxed certificate verifier used in secure mode.
//! - **[`websocket`]**: [`TvSocket`], a handle to a background task that
//!   performs the pairing handshake, frames requests and subscriptions,
//!   and reports progress as [`TransportEvent`]s.
//!
//! Nothing here retries or reconnects; recovery policy belongs to the
//! session layer in `tvlink-core`.

pub mod error;
pub mod protocol;
pub mod transport;
pub mod websocket;

pub use error::Error;
pub use protocol::{Endpoint, LIVE_TV_APP_ID, Request, SubscriptionId};
pub use transport::TransportConfig;
pub use websocket::{TransportEvent, TvSocket};
