// Session behavior against a scripted connector and a recording host.
//
// Every test runs on a paused clock, so reconnect delays, the debounce
// window and the channel settle time are exact.
#![allow(clippy::unwrap_used)]

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::time::Instant;

use tvlink_api::{Endpoint, Error, LIVE_TV_APP_ID, Request, SubscriptionId, TransportConfig, TransportEvent};
use tvlink_core::session::PAIRING_PROMPT;
use tvlink_core::{
    Action, ActionParams, Attribute, AttributeBatch, Connection, ConnectionState, Connector, CoreError,
    EntityDescriptor, Host, KeyStore, MemoryKeyStore, MuteKind, Session, SessionConfig,
};

// ── Fakes ───────────────────────────────────────────────────────────

#[derive(Default)]
struct ConnectionLog {
    subscribed: Mutex<Vec<(SubscriptionId, Endpoint)>>,
    sent: Mutex<Vec<Request>>,
    closed: AtomicBool,
    seq: AtomicU64,
}

impl ConnectionLog {
    fn id_for(&self, endpoint: Endpoint) -> SubscriptionId {
        let subscribed = self.subscribed.lock().unwrap();
        let (id, _) = subscribed.iter().rev().find(|(_, e)| *e == endpoint).unwrap();
        id.clone()
    }

    fn subscriptions_to(&self, endpoint: Endpoint) -> usize {
        let subscribed = self.subscribed.lock().unwrap();
        subscribed.iter().filter(|(_, e)| *e == endpoint).count()
    }

    fn sent(&self) -> Vec<Request> {
        self.sent.lock().unwrap().clone()
    }
}

struct FakeConnection(Arc<ConnectionLog>);

impl Connection for FakeConnection {
    fn send(&self, request: Request) {
        self.0.sent.lock().unwrap().push(request);
    }

    fn subscribe(&self, endpoint: Endpoint) -> SubscriptionId {
        let n = self.0.seq.fetch_add(1, Ordering::Relaxed) + 1;
        let id = SubscriptionId::from(format!("sub_{n}").as_str());
        self.0.subscribed.lock().unwrap().push((id.clone(), endpoint));
        id
    }

    fn close(&self) {
        self.0.closed.store(true, Ordering::Relaxed);
    }
}

#[derive(Clone)]
struct Opened {
    events: mpsc::UnboundedSender<TransportEvent>,
    log: Arc<ConnectionLog>,
    key: Option<String>,
    target: TransportConfig,
}

impl Opened {
    fn emit(&self, event: TransportEvent) {
        let _ = self.events.send(event);
    }

    fn accept(&self) {
        self.emit(TransportEvent::Connected {
            client_key: Some(SecretString::from("paired-key".to_owned())),
        });
    }

    fn fail(&self, error: Error) {
        self.emit(TransportEvent::Failed(error));
    }

    fn push(&self, endpoint: Endpoint, payload: Value) {
        self.emit(TransportEvent::Push {
            subscription: self.log.id_for(endpoint),
            payload,
        });
    }

    fn is_closed(&self) -> bool {
        self.log.closed.load(Ordering::Relaxed)
    }
}

#[derive(Default)]
struct FakeConnector {
    opened: Mutex<Vec<Opened>>,
}

impl FakeConnector {
    fn count(&self) -> usize {
        self.opened.lock().unwrap().len()
    }

    fn last(&self) -> Opened {
        self.opened.lock().unwrap().last().unwrap().clone()
    }
}

impl Connector for FakeConnector {
    fn open(
        &self,
        target: &TransportConfig,
        client_key: Option<SecretString>,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Box<dyn Connection> {
        let log = Arc::new(ConnectionLog::default());
        self.opened.lock().unwrap().push(Opened {
            events,
            log: Arc::clone(&log),
            key: client_key.map(|k| k.expose_secret().to_owned()),
            target: target.clone(),
        });
        Box::new(FakeConnection(log))
    }
}

#[derive(Default)]
struct FakeHost {
    seeded: Vec<(Attribute, Value)>,
    entities: Mutex<Vec<EntityDescriptor>>,
    writes: Mutex<Vec<(Instant, Attribute, Value)>>,
    batches: AtomicU64,
    reachable: Mutex<Vec<bool>>,
    warnings: Mutex<Vec<String>>,
    forwarded: Mutex<Vec<(String, ActionParams)>>,
}

impl FakeHost {
    fn writes_of(&self, attribute: Attribute) -> Vec<(Instant, Value)> {
        let writes = self.writes.lock().unwrap();
        writes
            .iter()
            .filter(|(_, a, _)| *a == attribute)
            .map(|(at, _, v)| (*at, v.clone()))
            .collect()
    }

    fn last_of(&self, attribute: Attribute) -> Option<Value> {
        self.writes_of(attribute).pop().map(|(_, v)| v)
    }

    fn reachable(&self) -> Vec<bool> {
        self.reachable.lock().unwrap().clone()
    }

    fn warnings(&self) -> Vec<String> {
        self.warnings.lock().unwrap().clone()
    }
}

impl Host for FakeHost {
    fn register_entity(&self, entity: &EntityDescriptor) {
        self.entities.lock().unwrap().push(entity.clone());
    }

    fn attribute(&self, key: Attribute) -> Option<Value> {
        self.seeded.iter().find(|(a, _)| *a == key).map(|(_, v)| v.clone())
    }

    fn write_attributes(&self, batch: &AttributeBatch) {
        self.batches.fetch_add(1, Ordering::Relaxed);
        let now = Instant::now();
        let mut writes = self.writes.lock().unwrap();
        for (attribute, value) in &batch.writes {
            writes.push((now, *attribute, value.clone()));
        }
    }

    fn set_reachable(&self, reachable: bool) {
        self.reachable.lock().unwrap().push(reachable);
    }

    fn warn(&self, message: &str) {
        self.warnings.lock().unwrap().push(message.to_owned());
    }

    fn default_action(&self, name: &str, params: &ActionParams) {
        self.forwarded.lock().unwrap().push((name.to_owned(), params.clone()));
    }
}

// ── Harness ─────────────────────────────────────────────────────────

struct Harness {
    host: Arc<FakeHost>,
    connector: Arc<FakeConnector>,
    keys: Arc<MemoryKeyStore>,
    session: Session,
}

impl Harness {
    fn new() -> Self {
        Self::with_host(FakeHost::default())
    }

    fn with_host(host: FakeHost) -> Self {
        let host = Arc::new(host);
        let connector = Arc::new(FakeConnector::default());
        let keys = Arc::new(MemoryKeyStore::new());
        let session = Session::spawn(host.clone(), connector.clone(), keys.clone());
        Self {
            host,
            connector,
            keys,
            session,
        }
    }

    fn state(&self) -> ConnectionState {
        *self.session.connection_state().borrow()
    }

    async fn start(&self) {
        self.session.start(SessionConfig::new("10.0.0.5")).unwrap();
        settle().await;
    }

    /// Start and complete the handshake on the first connection.
    async fn connected(&self) -> Opened {
        self.start().await;
        let connection = self.connector.last();
        connection.accept();
        settle().await;
        assert_eq!(self.state(), ConnectionState::Connected);
        connection
    }
}

/// Let the forwarder and session tasks drain without moving the clock.
async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

async fn advance_to(instant: Instant) {
    tokio::time::sleep_until(instant).await;
    settle().await;
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

// ── Lifecycle ───────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn start_without_host_is_a_configuration_error() {
    let h = Harness::new();
    let result = h.session.start(SessionConfig::default());
    assert!(matches!(result, Err(CoreError::Configuration { .. })));
    settle().await;
    assert_eq!(h.connector.count(), 0);
}

#[tokio::test(start_paused = true)]
async fn start_registers_entity_and_opens_one_connection() {
    let h = Harness::new();
    h.start().await;

    assert_eq!(h.connector.count(), 1);
    assert_eq!(h.state(), ConnectionState::Connecting);
    assert_eq!(h.host.reachable(), vec![true]);

    let target = h.connector.last().target;
    assert_eq!(target.host, "10.0.0.5");
    assert_eq!(target.port(), 3000);

    let entities = h.host.entities.lock().unwrap().clone();
    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0].name, "Television");
    assert_eq!(entities[0].primary, Attribute::PowerState);

    // A second start while connecting is a no-op.
    h.start().await;
    assert_eq!(h.connector.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn connect_subscribes_base_feeds_and_publishes_online() {
    let h = Harness::new();
    let connection = h.connected().await;

    assert_eq!(connection.log.subscriptions_to(Endpoint::GetVolume), 1);
    assert_eq!(connection.log.subscriptions_to(Endpoint::ForegroundApp), 1);
    assert_eq!(connection.log.subscriptions_to(Endpoint::CurrentChannel), 0);

    assert_eq!(h.host.last_of(Attribute::PowerState), Some(json!(true)));
    assert_eq!(h.host.last_of(Attribute::Online), Some(json!(true)));

    let stored = h.keys.load().map(|k| k.expose_secret().to_owned());
    assert_eq!(stored.as_deref(), Some("paired-key"));
}

#[tokio::test(start_paused = true)]
async fn pairing_prompt_warns_once() {
    let h = Harness::new();
    h.start().await;
    let connection = h.connector.last();

    connection.emit(TransportEvent::PairingRequired);
    connection.emit(TransportEvent::PairingRequired);
    settle().await;

    assert_eq!(h.state(), ConnectionState::AwaitingPairing);
    assert_eq!(h.host.warnings(), vec![PAIRING_PROMPT.to_owned()]);

    connection.accept();
    settle().await;
    assert_eq!(h.state(), ConnectionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn pairing_prompt_repeats_on_next_attempt() {
    let h = Harness::new();
    h.start().await;

    let first = h.connector.last();
    first.emit(TransportEvent::PairingRequired);
    settle().await;
    first.fail(Error::PairingRejected("403 User denied access".into()));
    settle().await;
    assert_eq!(h.state(), ConnectionState::Disconnected);

    advance_to(Instant::now() + Duration::from_secs(5)).await;
    assert_eq!(h.connector.count(), 2);

    h.connector.last().emit(TransportEvent::PairingRequired);
    settle().await;

    assert_eq!(h.state(), ConnectionState::AwaitingPairing);
    assert_eq!(
        h.host.warnings(),
        vec![PAIRING_PROMPT.to_owned(), PAIRING_PROMPT.to_owned()]
    );
}

#[tokio::test(start_paused = true)]
async fn stop_closes_connection_and_publishes_offline() {
    let h = Harness::new();
    let connection = h.connected().await;

    h.session.stop();
    settle().await;

    assert!(connection.is_closed());
    assert_eq!(h.state(), ConnectionState::Disconnected);
    assert_eq!(h.host.last_of(Attribute::PowerState), Some(json!(false)));
    assert_eq!(h.host.last_of(Attribute::Online), Some(json!(false)));

    // Nothing reconnects afterwards.
    advance_to(Instant::now() + Duration::from_secs(300)).await;
    assert_eq!(h.connector.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn restart_reconnects_immediately_with_stored_key() {
    let h = Harness::new();
    let first = h.connected().await;

    h.session.restart();
    settle().await;

    assert!(first.is_closed());
    assert_eq!(h.connector.count(), 2);
    assert_eq!(h.state(), ConnectionState::Connecting);
    assert_eq!(h.connector.last().key.as_deref(), Some("paired-key"));
    assert_eq!(h.host.last_of(Attribute::Online), Some(json!(false)));
}

#[tokio::test(start_paused = true)]
async fn events_from_a_replaced_connection_are_ignored() {
    let h = Harness::new();
    let first = h.connected().await;

    h.session.restart();
    settle().await;

    first.emit(TransportEvent::Closed);
    first.accept();
    settle().await;

    assert_eq!(h.state(), ConnectionState::Connecting);
    advance_to(Instant::now() + Duration::from_secs(60)).await;
    assert_eq!(h.connector.count(), 2);
}

// ── Reconnect and reachability ──────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn repeated_hard_failures_mark_tv_unreachable() {
    let h = Harness::new();
    h.start().await;

    for attempt in 1..=3 {
        h.connector.last().fail(Error::WebSocketConnect("connection refused".into()));
        settle().await;
        assert_eq!(h.state(), ConnectionState::Disconnected);

        let expected = if attempt < 3 { vec![true] } else { vec![true, false] };
        assert_eq!(h.host.reachable(), expected, "after failure {attempt}");

        // Inside the grace period every retry waits the base interval.
        advance_to(Instant::now() + ms(4_999)).await;
        assert_eq!(h.connector.count(), attempt);
        advance_to(Instant::now() + ms(1)).await;
        assert_eq!(h.connector.count(), attempt + 1);
    }
}

#[tokio::test(start_paused = true)]
async fn soft_failures_never_mark_tv_unreachable() {
    let h = Harness::new();
    h.start().await;

    for attempt in 1..=6 {
        h.connector.last().fail(Error::Unreachable("no route to host".into()));
        settle().await;
        advance_to(Instant::now() + Duration::from_secs(5)).await;
        assert_eq!(h.connector.count(), attempt + 1);
    }

    assert_eq!(h.host.reachable(), vec![true]);
}

#[tokio::test(start_paused = true)]
async fn successful_connect_resets_failure_count() {
    let h = Harness::new();
    h.start().await;

    for _ in 0..2 {
        h.connector.last().fail(Error::WebSocketConnect("reset".into()));
        settle().await;
        advance_to(Instant::now() + Duration::from_secs(5)).await;
    }
    h.connector.last().accept();
    settle().await;
    assert_eq!(h.state(), ConnectionState::Connected);

    for _ in 0..2 {
        h.connector.last().fail(Error::WebSocketConnect("reset".into()));
        settle().await;
        advance_to(Instant::now() + Duration::from_secs(5)).await;
    }

    assert!(!h.host.reachable().contains(&false));
}

#[tokio::test(start_paused = true)]
async fn close_by_tv_reconnects_after_base_interval() {
    let h = Harness::new();
    let connection = h.connected().await;

    connection.emit(TransportEvent::Closed);
    settle().await;
    assert_eq!(h.state(), ConnectionState::Disconnected);
    assert_eq!(h.host.last_of(Attribute::PowerState), Some(json!(false)));

    advance_to(Instant::now() + Duration::from_secs(5)).await;
    assert_eq!(h.connector.count(), 2);
    assert_eq!(h.host.reachable(), vec![true, true]);
}

#[tokio::test(start_paused = true)]
async fn stop_cancels_pending_reconnect() {
    let h = Harness::new();
    h.start().await;

    h.connector.last().fail(Error::WebSocketConnect("refused".into()));
    settle().await;
    h.session.stop();
    settle().await;

    advance_to(Instant::now() + Duration::from_secs(300)).await;
    assert_eq!(h.connector.count(), 1);
    assert_eq!(h.state(), ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn restart_action_bypasses_connection_gate() {
    let h = Harness::new();
    h.start().await;
    h.connector.last().fail(Error::WebSocketConnect("refused".into()));
    settle().await;

    h.session.dispatch(Action::Restart);
    settle().await;

    assert_eq!(h.connector.count(), 2);
    assert_eq!(h.state(), ConnectionState::Connecting);
}

// ── Pushes ──────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn volume_burst_publishes_last_value_once_after_quiet_window() {
    let h = Harness::new();
    let connection = h.connected().await;
    let start = Instant::now();

    for (at, volume) in [(0, 10), (200, 20), (900, 30), (1800, 40)] {
        advance_to(start + ms(at)).await;
        connection.push(Endpoint::GetVolume, json!({ "volumeStatus": { "volume": volume } }));
        settle().await;
    }

    advance_to(start + ms(3_799)).await;
    assert!(h.host.writes_of(Attribute::VolumeLevel).is_empty());

    advance_to(start + ms(3_801)).await;
    let writes = h.host.writes_of(Attribute::VolumeLevel);
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].1, json!(0.4));
    let elapsed = writes[0].0 - start;
    assert!(elapsed >= ms(3_800) && elapsed < ms(3_802), "emitted at {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn unchanged_volume_is_not_rewritten() {
    let h = Harness::new();
    let connection = h.connected().await;

    for _ in 0..2 {
        connection.push(
            Endpoint::GetVolume,
            json!({ "volumeStatus": { "volume": 50, "muteStatus": false } }),
        );
        settle().await;
        advance_to(Instant::now() + Duration::from_secs(3)).await;
    }

    assert_eq!(h.host.writes_of(Attribute::VolumeLevel).len(), 1);
    assert_eq!(h.host.writes_of(Attribute::Muted).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn live_tv_registers_channel_feed_once_after_settle() {
    let h = Harness::new();
    let connection = h.connected().await;
    let start = Instant::now();
    let live = json!({ "appId": LIVE_TV_APP_ID });

    connection.push(Endpoint::ForegroundApp, live.clone());
    settle().await;
    advance_to(start + ms(1_000)).await;
    connection.push(Endpoint::ForegroundApp, live);
    settle().await;

    assert_eq!(h.host.last_of(Attribute::ForegroundApp), Some(json!(LIVE_TV_APP_ID)));

    advance_to(start + ms(2_999)).await;
    assert_eq!(connection.log.subscriptions_to(Endpoint::CurrentChannel), 0);

    advance_to(start + ms(3_001)).await;
    assert_eq!(connection.log.subscriptions_to(Endpoint::CurrentChannel), 1);

    advance_to(start + Duration::from_secs(30)).await;
    assert_eq!(connection.log.subscriptions_to(Endpoint::CurrentChannel), 1);

    connection.push(
        Endpoint::CurrentChannel,
        json!({ "channelNumber": "7", "channelName": "KQED" }),
    );
    settle().await;
    assert_eq!(h.host.last_of(Attribute::ChannelNumber), Some(json!("7")));
    assert_eq!(h.host.last_of(Attribute::ChannelName), Some(json!("KQED")));
}

#[tokio::test(start_paused = true)]
async fn settle_timer_is_dropped_when_connection_goes_away() {
    let h = Harness::new();
    let connection = h.connected().await;

    connection.push(Endpoint::ForegroundApp, json!({ "appId": LIVE_TV_APP_ID }));
    settle().await;
    h.session.stop();
    settle().await;

    advance_to(Instant::now() + Duration::from_secs(10)).await;
    assert_eq!(connection.log.subscriptions_to(Endpoint::CurrentChannel), 0);
}

// ── Actions ─────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn actions_are_dropped_while_not_connected() {
    let h = Harness::new();
    h.start().await;

    h.session.dispatch(Action::PowerOff);
    h.session.dispatch(Action::Other {
        name: "input.select".into(),
        params: ActionParams::new(),
    });
    settle().await;

    assert!(h.connector.last().log.sent().is_empty());
    assert!(h.host.forwarded.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn toggle_uses_published_power_state() {
    let h = Harness::new();
    let connection = h.connected().await;

    h.session.dispatch(Action::PowerToggle);
    settle().await;

    assert_eq!(connection.log.sent(), vec![Request::new(Endpoint::PowerOff)]);
}

#[tokio::test(start_paused = true)]
async fn volume_step_uses_known_level() {
    let h = Harness::new();
    let connection = h.connected().await;

    connection.push(Endpoint::GetVolume, json!({ "volumeStatus": { "volume": 40 } }));
    settle().await;
    advance_to(Instant::now() + Duration::from_secs(2)).await;

    h.session
        .dispatch_named("volume.increase", &ActionParams::new().with("amount", "0.05"));
    h.session.dispatch(Action::Mute {
        kind: MuteKind::Mute,
        state: true,
    });
    settle().await;

    assert_eq!(
        connection.log.sent(),
        vec![
            Request::with_payload(Endpoint::SetVolume, json!({ "volume": 45 })),
            Request::with_payload(Endpoint::SetMute, json!({ "mute": true })),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn malformed_and_unknown_actions() {
    let h = Harness::new();
    let connection = h.connected().await;

    h.session
        .dispatch_named("volume.set", &ActionParams::new().with("value", "loud"));
    h.session
        .dispatch_named("input.select", &ActionParams::new().with("input", "HDMI_1"));
    settle().await;

    assert!(connection.log.sent().is_empty());
    let forwarded = h.host.forwarded.lock().unwrap().clone();
    assert_eq!(forwarded.len(), 1);
    assert_eq!(forwarded[0].0, "input.select");
    assert_eq!(forwarded[0].1.get("input"), Some("HDMI_1"));
}

#[tokio::test(start_paused = true)]
async fn mute_state_other_than_true_clears_the_flag() {
    let h = Harness::new();
    let connection = h.connected().await;

    h.session
        .dispatch_named("mute.mute", &ActionParams::new().with("state", "yes"));
    h.session
        .dispatch_named("mute.set", &ActionParams::new().with("state", "1"));
    settle().await;

    assert_eq!(
        connection.log.sent(),
        vec![
            Request::with_payload(Endpoint::SetMute, json!({ "mute": true })),
            Request::with_payload(Endpoint::SetMute, json!({ "mute": false })),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn seeded_host_values_suppress_redundant_writes() {
    let h = Harness::with_host(FakeHost {
        seeded: vec![(Attribute::PowerState, json!(true))],
        ..FakeHost::default()
    });
    h.connected().await;

    assert!(h.host.writes_of(Attribute::PowerState).is_empty());
    assert_eq!(h.host.last_of(Attribute::Online), Some(json!(true)));
    assert_eq!(h.host.batches.load(Ordering::Relaxed), 1);
}
