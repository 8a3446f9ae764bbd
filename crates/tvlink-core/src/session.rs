// ── Session manager ──
//
// One TV, one session task. Every input (host calls, transport events,
// timer expiries) is posted to a single ordered queue and handled to
// completion before the next, so the state below never needs a lock.
//
// Timers are plain spawned sleeps that post back into the queue. Each
// carries the connection generation it was armed for; `stop`, `restart`
// and every dropped connection bump the generation, so a late firing is
// recognized as stale and ignored.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};
use tvlink_api::TransportEvent;

use crate::backoff::BackoffPolicy;
use crate::command::{Action, ActionParams, translate};
use crate::config::SessionConfig;
use crate::debounce::{Debouncer, Ticket};
use crate::error::CoreError;
use crate::host::{Host, KeyStore};
use crate::model::{Attribute, AttributeDelta, EntityDescriptor};
use crate::store::AttributeReconciler;
use crate::subscription::{Channel, SubscriptionRouter};
use crate::transport::{Connection, Connector};

/// Message shown to the user when the TV asks for pairing approval.
pub const PAIRING_PROMPT: &str = "Accept the pairing request on the TV screen to finish connecting";

// ── ConnectionState ──────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    AwaitingPairing,
    Connected,
    Closing,
}

// ── Events ───────────────────────────────────────────────────────

enum SessionEvent {
    Start(SessionConfig),
    Stop,
    Restart,
    Dispatch(Action),
    Transport {
        generation: u64,
        event: TransportEvent,
    },
    ReconnectDue {
        generation: u64,
    },
    DerivedDue {
        generation: u64,
        channel: Channel,
    },
    DebounceElapsed(Ticket),
}

// ── Session ──────────────────────────────────────────────────────

/// Handle to a running session task.
///
/// All methods are non-blocking: they enqueue work for the task and
/// return. Dropping the handle (or calling [`shutdown`](Self::shutdown))
/// ends the task and closes any open connection.
pub struct Session {
    inbox: mpsc::UnboundedSender<SessionEvent>,
    state: watch::Receiver<ConnectionState>,
    cancel: CancellationToken,
}

impl Session {
    /// Spawn the session task. Must be called from within a Tokio runtime.
    pub fn spawn(host: Arc<dyn Host>, connector: Arc<dyn Connector>, keys: Arc<dyn KeyStore>) -> Self {
        let (inbox, rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(ConnectionState::Disconnected);
        let cancel = CancellationToken::new();

        let actor = SessionActor {
            host,
            connector,
            keys,
            inbox: inbox.clone(),
            state: state_tx,
            cancel: cancel.clone(),
            config: None,
            backoff: BackoffPolicy::default(),
            failures: 0,
            stopping: false,
            generation: 0,
            connection: None,
            router: SubscriptionRouter::default(),
            reconciler: AttributeReconciler::new(),
            debounce: Debouncer::default(),
            pairing_advised: false,
            registered: false,
        };
        tokio::spawn(actor.run(rx));

        Self {
            inbox,
            state,
            cancel,
        }
    }

    /// Begin connecting to the configured TV.
    ///
    /// Fails only if no host address is configured. Calling `start` on a
    /// session that is already connecting or connected is a no-op.
    pub fn start(&self, config: SessionConfig) -> Result<(), CoreError> {
        config.address()?;
        self.post(SessionEvent::Start(config))
    }

    /// Close the connection and cancel pending reconnects.
    pub fn stop(&self) {
        let _ = self.post(SessionEvent::Stop);
    }

    /// Drop the current connection and reconnect immediately.
    pub fn restart(&self) {
        let _ = self.post(SessionEvent::Restart);
    }

    pub fn dispatch(&self, action: Action) {
        let _ = self.post(SessionEvent::Dispatch(action));
    }

    /// Parse and dispatch a named action. Malformed parameters are logged
    /// and the action is dropped.
    pub fn dispatch_named(&self, name: &str, params: &ActionParams) {
        match Action::parse(name, params) {
            Ok(action) => self.dispatch(action),
            Err(e) => warn!(error = %e, "dropping action"),
        }
    }

    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Stream of connection states, starting with the current one.
    pub fn states(&self) -> WatchStream<ConnectionState> {
        WatchStream::new(self.state.clone())
    }

    /// End the session task. Idempotent.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    fn post(&self, event: SessionEvent) -> Result<(), CoreError> {
        self.inbox
            .send(event)
            .map_err(|_| CoreError::SessionClosed)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── SessionActor ─────────────────────────────────────────────────

struct SessionActor {
    host: Arc<dyn Host>,
    connector: Arc<dyn Connector>,
    keys: Arc<dyn KeyStore>,
    /// Loopback for timers and transport forwarders.
    inbox: mpsc::UnboundedSender<SessionEvent>,
    state: watch::Sender<ConnectionState>,
    cancel: CancellationToken,

    config: Option<SessionConfig>,
    backoff: BackoffPolicy,
    /// Consecutive hard failures since the last successful connect.
    failures: u32,
    stopping: bool,
    generation: u64,
    connection: Option<Box<dyn Connection>>,

    router: SubscriptionRouter,
    reconciler: AttributeReconciler,
    debounce: Debouncer<AttributeDelta>,
    pairing_advised: bool,
    registered: bool,
}

impl SessionActor {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<SessionEvent>) {
        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                event = rx.recv() => {
                    let Some(event) = event else { break };
                    self.handle(event);
                }
            }
        }

        if let Some(connection) = self.connection.take() {
            connection.close();
        }
        debug!("session task exited");
    }

    fn handle(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Start(config) => self.on_start(config),
            SessionEvent::Stop => self.on_stop(),
            SessionEvent::Restart => self.on_restart(),
            SessionEvent::Dispatch(action) => self.on_dispatch(action),
            SessionEvent::Transport { generation, event } => {
                if generation == self.generation {
                    self.on_transport(event);
                } else {
                    trace!(generation, current = self.generation, "stale transport event");
                }
            }
            SessionEvent::ReconnectDue { generation } => {
                if self.is_current(generation) && self.current_state() == ConnectionState::Disconnected {
                    self.connect();
                } else {
                    trace!(generation, "stale reconnect timer");
                }
            }
            SessionEvent::DerivedDue { generation, channel } => {
                if !self.is_current(generation) || self.current_state() != ConnectionState::Connected {
                    trace!(%channel, "stale derived subscription timer");
                    return;
                }
                if let Some(connection) = self.connection.as_deref() {
                    self.router.activate(channel, connection);
                }
            }
            SessionEvent::DebounceElapsed(ticket) => {
                if let Some(delta) = self.debounce.fire(ticket) {
                    self.publish(delta);
                }
            }
        }
    }

    // ── Host commands ────────────────────────────────────────────

    fn on_start(&mut self, config: SessionConfig) {
        if self.current_state() != ConnectionState::Disconnected {
            debug!(state = %self.current_state(), "start ignored, session already running");
            return;
        }

        if !self.registered {
            let address = config.address().unwrap_or_default();
            self.host
                .register_entity(&EntityDescriptor::television(address, &config.name));
            self.reconciler.seed_from(self.host.as_ref());
            self.registered = true;
        }

        self.backoff = BackoffPolicy::new(config.retry_interval);
        self.config = Some(config);
        self.stopping = false;
        self.failures = 0;

        self.host.set_reachable(true);
        self.connect();
    }

    fn on_stop(&mut self) {
        self.stopping = true;
        // Invalidate any armed reconnect or settle timer.
        self.generation += 1;

        if self.connection.is_none() && self.current_state() == ConnectionState::Disconnected {
            debug!("stop: no active connection");
            return;
        }

        self.set_state(ConnectionState::Closing);
        self.drop_connection();
        self.set_state(ConnectionState::Disconnected);
        self.publish(connectivity(false));
        info!("session stopped");
    }

    fn on_restart(&mut self) {
        if self.config.is_none() {
            warn!("restart requested before start, ignoring");
            return;
        }

        info!("restarting session");
        if self.connection.is_some() {
            self.set_state(ConnectionState::Closing);
            self.drop_connection();
        }
        self.set_state(ConnectionState::Disconnected);
        self.publish(connectivity(false));

        self.stopping = false;
        self.failures = 0;
        self.host.set_reachable(true);
        self.connect();
    }

    fn on_dispatch(&mut self, action: Action) {
        let state = self.current_state();
        match action {
            Action::Restart => self.on_restart(),
            action if state != ConnectionState::Connected => {
                warn!(action = %action, %state, "TV not connected, dropping action");
            }
            Action::Other { name, params } => {
                debug!(action = %name, "forwarding unrecognized action to host");
                self.host.default_action(&name, &params);
            }
            action => {
                let Some(connection) = self.connection.as_deref() else {
                    return;
                };
                for request in translate(&action, &self.reconciler) {
                    debug!(action = %action, endpoint = %request.endpoint, "sending request");
                    connection.send(request);
                }
            }
        }
    }

    // ── Transport events ─────────────────────────────────────────

    fn on_transport(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected { client_key } => {
                if let Some(key) = client_key {
                    self.keys.save(&key);
                }
                self.failures = 0;
                self.set_state(ConnectionState::Connected);
                self.host.set_reachable(true);
                if let Some(connection) = self.connection.as_deref() {
                    self.router.register_base(connection);
                }
                self.publish(connectivity(true));
                info!("connected to TV");
            }
            TransportEvent::PairingRequired => {
                self.set_state(ConnectionState::AwaitingPairing);
                if !self.pairing_advised {
                    self.host.warn(PAIRING_PROMPT);
                    self.pairing_advised = true;
                }
            }
            TransportEvent::Push {
                subscription,
                payload,
            } => {
                if self.current_state() != ConnectionState::Connected {
                    trace!(%subscription, "push before registration, ignoring");
                    return;
                }
                let Some(routed) = self.router.route(&subscription, &payload) else {
                    return;
                };
                for (channel, settle) in routed.unlock {
                    debug!(%channel, settle_ms = settle.as_millis(), "scheduling derived subscription");
                    self.schedule(
                        settle,
                        SessionEvent::DerivedDue {
                            generation: self.generation,
                            channel,
                        },
                    );
                }
                if routed.channel.is_debounced() {
                    let ticket = self.debounce.push(routed.delta);
                    self.schedule(self.debounce.window(), SessionEvent::DebounceElapsed(ticket));
                } else {
                    self.publish(routed.delta);
                }
            }
            TransportEvent::Closed => self.on_connection_lost(None),
            TransportEvent::Failed(e) => self.on_connection_lost(Some(e)),
        }
    }

    fn on_connection_lost(&mut self, error: Option<tvlink_api::Error>) {
        self.drop_connection();
        self.set_state(ConnectionState::Disconnected);
        self.publish(connectivity(false));

        let delay = match error {
            None => {
                info!("TV closed the connection");
                self.backoff.delay(self.failures)
            }
            Some(e) if e.is_soft() => {
                info!(error = %e, "TV not reachable");
                self.backoff.base
            }
            Some(e) => {
                self.failures += 1;
                error!(error = %e, failures = self.failures, "connection failed");
                if self.backoff.is_offline(self.failures) {
                    self.host.set_reachable(false);
                }
                self.backoff.delay(self.failures)
            }
        };

        if self.stopping {
            return;
        }
        debug!(delay_ms = delay.as_millis(), "scheduling reconnect");
        self.schedule(
            delay,
            SessionEvent::ReconnectDue {
                generation: self.generation,
            },
        );
    }

    // ── Connection management ────────────────────────────────────

    fn connect(&mut self) {
        let Some(config) = self.config.as_ref() else {
            warn!("connect requested without configuration");
            return;
        };
        let target = match config.transport() {
            Ok(target) => target,
            Err(e) => {
                error!(error = %e, "cannot connect");
                return;
            }
        };

        self.generation += 1;
        let generation = self.generation;
        self.pairing_advised = false;
        self.set_state(ConnectionState::Connecting);
        info!(host = %target.host, secure = target.secure, "connecting to TV");

        let (events, rx) = mpsc::unbounded_channel();
        self.forward(rx, generation);
        self.connection = Some(self.connector.open(&target, self.keys.load(), events));
    }

    fn drop_connection(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.close();
        }
        self.router.reset();
        self.generation += 1;
    }

    /// Relay one connection's events into the session queue, tagged with its generation.
    fn forward(&self, mut rx: mpsc::UnboundedReceiver<TransportEvent>, generation: u64) {
        let inbox = self.inbox.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    event = rx.recv() => {
                        let Some(event) = event else { break };
                        if inbox.send(SessionEvent::Transport { generation, event }).is_err() {
                            break;
                        }
                    }
                }
            }
        });
    }

    fn schedule(&self, delay: Duration, event: SessionEvent) {
        let inbox = self.inbox.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    let _ = inbox.send(event);
                }
            }
        });
    }

    // ── Helpers ──────────────────────────────────────────────────

    fn is_current(&self, generation: u64) -> bool {
        !self.stopping && generation == self.generation
    }

    fn current_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    fn set_state(&self, next: ConnectionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(from = %previous, to = %next, "connection state");
        }
    }

    fn publish(&mut self, delta: AttributeDelta) {
        self.reconciler.apply(delta, self.host.as_ref());
    }
}

/// Synthetic attributes published on every connect and disconnect.
fn connectivity(online: bool) -> AttributeDelta {
    AttributeDelta::new()
        .set(Attribute::PowerState, online)
        .set(Attribute::Online, online)
}
