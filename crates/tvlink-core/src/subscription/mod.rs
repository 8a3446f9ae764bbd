// ── Subscription router ──
//
// Owns the push feeds of one connection. On connect it registers the
// always-on channels; each push is looked up by subscription id,
// normalized to an attribute delta, and checked against the derived rules
// that unlock further channels (the channel feed only exists while live
// TV is in the foreground).

pub mod payload;

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, trace};
use tvlink_api::{Endpoint, LIVE_TV_APP_ID, SubscriptionId};

use crate::model::{Attribute, AttributeDelta, Proposed};
use crate::transport::Connection;
use self::payload::{ChannelPush, ForegroundAppPush, VolumePush};

/// Settle time between live TV appearing and the channel feed being registered.
pub const CHANNEL_SETTLE: Duration = Duration::from_millis(3000);

/// A push feed the session understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Channel {
    Volume,
    ForegroundApp,
    CurrentChannel,
}

impl Channel {
    pub const fn endpoint(self) -> Endpoint {
        match self {
            Self::Volume => Endpoint::GetVolume,
            Self::ForegroundApp => Endpoint::ForegroundApp,
            Self::CurrentChannel => Endpoint::CurrentChannel,
        }
    }

    /// Bursty channels go through the debounce buffer.
    pub const fn is_debounced(self) -> bool {
        matches!(self, Self::Volume)
    }

    fn normalize(self, payload: &Value) -> Result<AttributeDelta, serde_json::Error> {
        Ok(match self {
            Self::Volume => VolumePush::deserialize(payload)?.into_delta(),
            Self::ForegroundApp => ForegroundAppPush::deserialize(payload)?.into_delta(),
            Self::CurrentChannel => ChannelPush::deserialize(payload)?.into_delta(),
        })
    }
}

/// Channels registered unconditionally on every connect.
pub const BASE_CHANNELS: [Channel; 2] = [Channel::Volume, Channel::ForegroundApp];

// ── Derived rules ────────────────────────────────────────────────────

/// "When `trigger` takes value `equals`, register `unlocks` after `settle`."
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedRule {
    pub trigger: Attribute,
    pub equals: &'static str,
    pub unlocks: Channel,
    pub settle: Duration,
}

pub const LIVE_TV_CHANNEL_RULE: DerivedRule = DerivedRule {
    trigger: Attribute::ForegroundApp,
    equals: LIVE_TV_APP_ID,
    unlocks: Channel::CurrentChannel,
    settle: CHANNEL_SETTLE,
};

impl DerivedRule {
    fn matches(&self, delta: &AttributeDelta) -> bool {
        matches!(
            delta.get(self.trigger),
            Some(Proposed::Value(Value::String(v))) if v == self.equals
        )
    }
}

// ── Router ───────────────────────────────────────────────────────────

/// A normalized push, ready for the reconciler.
#[derive(Debug, Clone, PartialEq)]
pub struct Routed {
    pub channel: Channel,
    pub delta: AttributeDelta,
    /// Channels whose registration should be scheduled, with their settle time.
    pub unlock: Vec<(Channel, Duration)>,
}

#[derive(Debug)]
pub struct SubscriptionRouter {
    registrations: HashMap<SubscriptionId, Channel>,
    rules: Vec<DerivedRule>,
    /// Channels already scheduled or registered on this connection.
    latched: HashSet<Channel>,
}

impl Default for SubscriptionRouter {
    fn default() -> Self {
        Self::new(vec![LIVE_TV_CHANNEL_RULE])
    }
}

impl SubscriptionRouter {
    pub fn new(rules: Vec<DerivedRule>) -> Self {
        Self {
            registrations: HashMap::new(),
            rules,
            latched: HashSet::new(),
        }
    }

    /// Forget everything about the previous connection.
    pub fn reset(&mut self) {
        self.registrations.clear();
        self.latched.clear();
    }

    /// Register the always-on channels on a fresh connection.
    pub fn register_base(&mut self, connection: &dyn Connection) {
        self.reset();
        for channel in BASE_CHANNELS {
            self.register(channel, connection);
        }
    }

    /// Register a derived channel once its settle time has passed.
    /// Returns `false` if it is already registered on this connection.
    pub fn activate(&mut self, channel: Channel, connection: &dyn Connection) -> bool {
        if self.is_registered(channel) {
            trace!(%channel, "already registered");
            return false;
        }
        info!(%channel, "registering derived subscription");
        self.register(channel, connection);
        true
    }

    pub fn is_registered(&self, channel: Channel) -> bool {
        self.registrations.values().any(|c| *c == channel)
    }

    fn register(&mut self, channel: Channel, connection: &dyn Connection) {
        let id = connection.subscribe(channel.endpoint());
        debug!(%channel, subscription = %id, "subscribed");
        self.latched.insert(channel);
        self.registrations.insert(id, channel);
    }

    /// Normalize one push. Unknown subscriptions and malformed payloads are dropped.
    pub fn route(&mut self, subscription: &SubscriptionId, payload: &Value) -> Option<Routed> {
        let Some(&channel) = self.registrations.get(subscription) else {
            trace!(%subscription, "push for unknown subscription");
            return None;
        };

        let delta = match channel.normalize(payload) {
            Ok(delta) => delta,
            Err(e) => {
                debug!(%channel, error = %e, "unrecognized push payload");
                return None;
            }
        };

        let mut unlock = Vec::new();
        for rule in &self.rules {
            if rule.matches(&delta) && self.latched.insert(rule.unlocks) {
                unlock.push((rule.unlocks, rule.settle));
            }
        }

        Some(Routed {
            channel,
            delta,
            unlock,
        })
    }
}
