// ── Wire protocol ──
//
// Endpoint table and frame shapes for the webOS control protocol.
// Frames are JSON text messages; every outbound frame carries an `id`
// that the TV echoes back on its response(s).

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Foreground application identifier the TV reports while showing live TV.
pub const LIVE_TV_APP_ID: &str = "com.webos.app.livetv";

/// Id used for the single registration frame sent per connection.
pub(crate) const REGISTER_ID: &str = "register_0";

// ── Endpoint ─────────────────────────────────────────────────────────

/// Every protocol endpoint the session core talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Endpoint {
    PowerOff,
    PowerOn,
    GetVolume,
    SetVolume,
    VolumeUp,
    VolumeDown,
    GetMute,
    SetMute,
    CreateToast,
    ForegroundApp,
    CurrentChannel,
}

impl Endpoint {
    /// The `ssap://` URI for this endpoint.
    pub const fn uri(self) -> &'static str {
        match self {
            Self::PowerOff => "ssap://system/turnOff",
            Self::PowerOn => "ssap://system/turnOn",
            Self::GetVolume => "ssap://audio/getVolume",
            Self::SetVolume => "ssap://audio/setVolume",
            Self::VolumeUp => "ssap://audio/volumeUp",
            Self::VolumeDown => "ssap://audio/volumeDown",
            Self::GetMute => "ssap://audio/getMute",
            Self::SetMute => "ssap://audio/setMute",
            Self::CreateToast => "ssap://system.notifications/createToast",
            Self::ForegroundApp => "ssap://com.webos.applicationManager/getForegroundAppInfo",
            Self::CurrentChannel => "ssap://tv/getCurrentChannel",
        }
    }
}

// ── Request ──────────────────────────────────────────────────────────

/// A fire-and-forget request: target endpoint plus optional payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub endpoint: Endpoint,
    pub payload: Option<Value>,
}

impl Request {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            payload: None,
        }
    }

    pub fn with_payload(endpoint: Endpoint, payload: Value) -> Self {
        Self {
            endpoint,
            payload: Some(payload),
        }
    }
}

// ── SubscriptionId ───────────────────────────────────────────────────

/// Handle for an active subscription: the frame id the TV tags pushes with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId(String);

impl SubscriptionId {
    pub(crate) fn new(seq: u64) -> Self {
        Self(format!("sub_{seq}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubscriptionId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ── Frames ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum FrameKind {
    Register,
    Request,
    Subscribe,
}

/// Outbound envelope.
#[derive(Debug, Serialize)]
pub(crate) struct OutboundFrame<'a> {
    #[serde(rename = "type")]
    pub kind: FrameKind,
    pub id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<&'a Value>,
}

impl OutboundFrame<'_> {
    pub(crate) fn to_text(&self) -> Result<String, crate::Error> {
        serde_json::to_string(self).map_err(|e| crate::Error::Serialization(e.to_string()))
    }
}

/// Inbound envelope. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
pub(crate) struct InboundFrame {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub payload: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl InboundFrame {
    /// `true` when a registration response asks the user to accept a prompt.
    pub(crate) fn is_pairing_prompt(&self) -> bool {
        self.payload
            .as_ref()
            .and_then(|p| p.get("pairingType"))
            .and_then(Value::as_str)
            == Some("PROMPT")
    }

    pub(crate) fn client_key(&self) -> Option<&str> {
        self.payload
            .as_ref()
            .and_then(|p| p.get("client-key"))
            .and_then(Value::as_str)
    }
}

// ── Registration ─────────────────────────────────────────────────────

/// Permissions requested in the registration manifest.
const PERMISSIONS: &[&str] = &[
    "CONTROL_AUDIO",
    "CONTROL_POWER",
    "CONTROL_DISPLAY",
    "CONTROL_INPUT_TV",
    "READ_CURRENT_CHANNEL",
    "READ_RUNNING_APPS",
    "READ_TV_CURRENT_TIME",
    "READ_NOTIFICATIONS",
    "WRITE_NOTIFICATION_TOAST",
];

/// Build the registration payload, including a stored client key if we have one.
pub(crate) fn register_payload(client_key: Option<&str>) -> Value {
    let mut payload = json!({
        "forcePairing": false,
        "pairingType": "PROMPT",
        "manifest": {
            "manifestVersion": 1,
            "appVersion": "1.1",
            "permissions": PERMISSIONS,
            "signed": {
                "appId": "com.tvlink.session",
                "vendorId": "com.tvlink",
                "localizedAppNames": { "": "tvlink" },
            },
        },
    });

    if let (Some(key), Some(obj)) = (client_key, payload.as_object_mut()) {
        obj.insert("client-key".into(), Value::String(key.to_owned()));
    }

    payload
}

// ── Tests ────────────────────────────────────────────────────────────
