//! WebSocket connection to the TV.
//!
//! [`TvSocket::connect`] returns immediately and spawns a background task
//! that opens the socket, runs the registration handshake, and then
//! multiplexes outbound frames with inbound pushes. Progress is reported
//! on the caller-supplied [`TransportEvent`] channel; exactly one terminal
//! event (`Closed` or `Failed`) is sent per connection unless the caller
//! closes it first.
//!
//! # Example
//!
//! ```rust,ignore
//! use tokio::sync::mpsc;
//! use tvlink_api::{Endpoint, Request, TransportConfig, TransportEvent, TvSocket};
//!
//! let (tx, mut rx) = mpsc::unbounded_channel();
//! let socket = TvSocket::connect(TransportConfig::new("192.168.1.40"), None, tx);
//!
//! while let Some(event) = rx.recv().await {
//!     if let TransportEvent::Connected { .. } = event {
//!         socket.send(Request::new(Endpoint::VolumeUp));
//!     }
//! }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_tungstenite::Connector;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::error::Error;
use crate::protocol::{
    self, Endpoint, FrameKind, InboundFrame, OutboundFrame, REGISTER_ID, Request, SubscriptionId,
};
use crate::transport::{TransportConfig, accept_any_cert_config};

// ── TransportEvent ───────────────────────────────────────────────────

/// Progress report from a socket task.
#[derive(Debug)]
pub enum TransportEvent {
    /// Registration accepted. Carries the client key the TV issued, if any.
    Connected { client_key: Option<SecretString> },
    /// The TV is showing a pairing prompt; waiting on the user.
    PairingRequired,
    /// A subscription delivered a value.
    Push {
        subscription: SubscriptionId,
        payload: Value,
    },
    /// The remote end closed the connection cleanly.
    Closed,
    /// The connection failed or broke.
    Failed(Error),
}

// ── TvSocket ─────────────────────────────────────────────────────────

enum Outbound {
    Request { id: String, request: Request },
    Subscribe { id: SubscriptionId, endpoint: Endpoint },
}

/// Handle to a running socket task.
///
/// Dropping the handle closes the connection.
pub struct TvSocket {
    outbound: mpsc::UnboundedSender<Outbound>,
    seq: AtomicU64,
    cancel: CancellationToken,
}

impl TvSocket {
    /// Spawn the socket task. Must be called from within a Tokio runtime.
    ///
    /// Frames queued through [`send`](Self::send) and
    /// [`subscribe`](Self::subscribe) before registration completes are
    /// held back and flushed once the TV accepts the client.
    pub fn connect(
        config: TransportConfig,
        client_key: Option<SecretString>,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Self {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        tokio::spawn(socket_task(
            config,
            client_key,
            events,
            outbound_rx,
            cancel.clone(),
        ));

        Self {
            outbound,
            seq: AtomicU64::new(1),
            cancel,
        }
    }

    /// Queue a fire-and-forget request.
    pub fn send(&self, request: Request) {
        let id = format!("req_{}", self.next_seq());
        if self.outbound.send(Outbound::Request { id, request }).is_err() {
            debug!("socket task has exited, dropping request");
        }
    }

    /// Queue a subscription and return the id its pushes will carry.
    pub fn subscribe(&self, endpoint: Endpoint) -> SubscriptionId {
        let id = SubscriptionId::new(self.next_seq());
        let queued = self.outbound.send(Outbound::Subscribe {
            id: id.clone(),
            endpoint,
        });
        if queued.is_err() {
            debug!(%endpoint, "socket task has exited, dropping subscription");
        }
        id
    }

    /// Close the connection. No terminal event is reported afterwards.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }
}

impl Drop for TvSocket {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Socket task ──────────────────────────────────────────────────────

enum Ended {
    Remote,
    Local,
}

async fn socket_task(
    config: TransportConfig,
    client_key: Option<SecretString>,
    events: mpsc::UnboundedSender<TransportEvent>,
    mut outbound_rx: mpsc::UnboundedReceiver<Outbound>,
    cancel: CancellationToken,
) {
    let result = run_connection(
        &config,
        client_key.as_ref(),
        &events,
        &mut outbound_rx,
        &cancel,
    )
    .await;

    // Receiver gone just means nobody is listening for this connection anymore.
    match result {
        Ok(Ended::Local) => debug!(host = %config.host, "socket closed locally"),
        Ok(Ended::Remote) => {
            let _ = events.send(TransportEvent::Closed);
        }
        Err(e) => {
            let _ = events.send(TransportEvent::Failed(e));
        }
    }
}

/// Connect, register, then pump frames until either side closes.
async fn run_connection(
    config: &TransportConfig,
    client_key: Option<&SecretString>,
    events: &mpsc::UnboundedSender<TransportEvent>,
    outbound_rx: &mut mpsc::UnboundedReceiver<Outbound>,
    cancel: &CancellationToken,
) -> Result<Ended, Error> {
    let url = config.url()?;
    let connector = if config.secure {
        Some(Connector::Rustls(Arc::new(accept_any_cert_config()?)))
    } else {
        None
    };

    info!(url = %url, "connecting to TV");

    let connect = tokio::time::timeout(
        config.connect_timeout,
        tokio_tungstenite::connect_async_tls_with_config(url.as_str(), None, false, connector),
    );

    let connected = tokio::select! {
        biased;
        () = cancel.cancelled() => return Ok(Ended::Local),
        result = connect => result,
    };
    let (ws_stream, _response) = connected.map_err(|_| Error::Timeout {
        timeout_secs: config.connect_timeout.as_secs(),
    })??;

    debug!("socket open, registering");

    let (mut write, mut read) = ws_stream.split();

    let register = protocol::register_payload(client_key.map(|key| key.expose_secret()));
    let frame = OutboundFrame {
        kind: FrameKind::Register,
        id: REGISTER_ID,
        uri: None,
        payload: Some(&register),
    };
    write.send(Message::text(frame.to_text()?)).await?;

    let mut registered = false;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                let _ = write.send(Message::Close(None)).await;
                return Ok(Ended::Local);
            }
            out = outbound_rx.recv(), if registered => {
                let Some(out) = out else { return Ok(Ended::Local) };
                let text = encode_outbound(&out)?;
                trace!(frame = %text, "sending frame");
                write.send(Message::text(text)).await?;
            }
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    handle_text(&text, &mut registered, events)?;
                }
                Some(Ok(Message::Close(frame))) => {
                    return match frame {
                        Some(cf) if cf.code != CloseCode::Normal => Err(Error::WebSocketClosed {
                            code: u16::from(cf.code),
                            reason: cf.reason.as_str().to_owned(),
                        }),
                        _ => {
                            info!("TV closed the connection");
                            Ok(Ended::Remote)
                        }
                    };
                }
                Some(Err(e)) => return Err(e.into()),
                None => {
                    info!("socket stream ended");
                    return Ok(Ended::Remote);
                }
                // Ping/pong are answered by tungstenite; binary frames are unused.
                Some(Ok(_)) => {}
            }
        }
    }
}

fn encode_outbound(out: &Outbound) -> Result<String, Error> {
    match out {
        Outbound::Request { id, request } => OutboundFrame {
            kind: FrameKind::Request,
            id,
            uri: Some(request.endpoint.uri()),
            payload: request.payload.as_ref(),
        }
        .to_text(),
        Outbound::Subscribe { id, endpoint } => OutboundFrame {
            kind: FrameKind::Subscribe,
            id: id.as_str(),
            uri: Some(endpoint.uri()),
            payload: None,
        }
        .to_text(),
    }
}

/// Interpret one inbound text frame. Only a rejected registration is fatal.
fn handle_text(
    text: &str,
    registered: &mut bool,
    events: &mpsc::UnboundedSender<TransportEvent>,
) -> Result<(), Error> {
    let frame: InboundFrame = match serde_json::from_str(text) {
        Ok(f) => f,
        Err(e) => {
            debug!(error = %e, "failed to parse frame");
            return Ok(());
        }
    };

    let id = frame.id.as_deref().unwrap_or_default();

    match (frame.kind.as_str(), id) {
        ("registered", REGISTER_ID) => {
            info!("registered with TV");
            *registered = true;
            let client_key = frame
                .client_key()
                .map(|key| SecretString::from(key.to_owned()));
            let _ = events.send(TransportEvent::Connected { client_key });
        }
        ("response", REGISTER_ID) if frame.is_pairing_prompt() => {
            info!("TV is prompting the user to accept pairing");
            let _ = events.send(TransportEvent::PairingRequired);
        }
        ("error", REGISTER_ID) => {
            return Err(Error::PairingRejected(
                frame.error.unwrap_or_else(|| "no reason given".into()),
            ));
        }
        ("response", sub) if sub.starts_with("sub_") => {
            let _ = events.send(TransportEvent::Push {
                subscription: SubscriptionId::from(sub),
                payload: frame.payload.unwrap_or(Value::Null),
            });
        }
        ("error", id) => debug!(id, error = ?frame.error, "request rejected by TV"),
        (kind, id) => trace!(kind, id, "ignoring frame"),
    }

    Ok(())
}

// ── Tests ────────────────────────────────────────────────────────────
