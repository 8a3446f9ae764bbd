// ── Transport seam ──
//
// The session drives the TV through `Connector`/`Connection` rather than
// `TvSocket` directly, so tests can stand in a scripted fake. Connection
// progress is reported asynchronously on the `TransportEvent` channel
// handed to `open`.

use secrecy::SecretString;
use tokio::sync::mpsc;
use tvlink_api::{Endpoint, Request, SubscriptionId, TransportConfig, TransportEvent, TvSocket};

/// One live (or in-progress) connection to the TV.
pub trait Connection: Send {
    /// Queue a fire-and-forget request.
    fn send(&self, request: Request);

    /// Register a push feed and return the id its pushes will carry.
    fn subscribe(&self, endpoint: Endpoint) -> SubscriptionId;

    /// Tear the connection down. No further events are reported for it.
    fn close(&self);
}

/// Opens connections without blocking the caller.
pub trait Connector: Send + Sync {
    fn open(
        &self,
        target: &TransportConfig,
        client_key: Option<SecretString>,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Box<dyn Connection>;
}

// ── WebSocket implementation ─────────────────────────────────────────

/// Production connector backed by [`TvSocket`].
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketConnector;

impl Connector for WebSocketConnector {
    fn open(
        &self,
        target: &TransportConfig,
        client_key: Option<SecretString>,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Box<dyn Connection> {
        Box::new(TvSocket::connect(target.clone(), client_key, events))
    }
}

impl Connection for TvSocket {
    fn send(&self, request: Request) {
        TvSocket::send(self, request);
    }

    fn subscribe(&self, endpoint: Endpoint) -> SubscriptionId {
        TvSocket::subscribe(self, endpoint)
    }

    fn close(&self) {
        TvSocket::close(self);
    }
}
