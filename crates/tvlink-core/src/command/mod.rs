// ── Action API ──
//
// Host-issued actions arrive as a name plus string parameters. They are
// parsed once into a typed `Action`; the translator then turns device
// actions into protocol requests. `restart` is handled by the session
// itself, and unknown names are handed back to the host.

pub mod translate;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

pub use translate::translate;

// ── ActionParams ─────────────────────────────────────────────────────

/// Raw string parameters attached to an action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionParams(BTreeMap<String, String>);

impl ActionParams {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn number(&self, action: ActionName, key: &str) -> Result<Option<f64>, CoreError> {
        self.get(key)
            .map(|raw| {
                raw.trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|n| n.is_finite())
                    .ok_or_else(|| invalid(action, key, format!("'{raw}' is not a number")))
            })
            .transpose()
    }

    /// Only the literal `"true"` sets a flag; any other value clears it.
    fn flag(&self, key: &str) -> bool {
        self.get(key) == Some("true")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ActionParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

fn invalid(action: ActionName, param: &str, reason: String) -> CoreError {
    CoreError::InvalidAction {
        action: action.to_string(),
        param: param.to_owned(),
        reason,
    }
}

// ── Action names ─────────────────────────────────────────────────────

/// Every action name the session understands.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString, strum::IntoStaticStr, strum::EnumIter,
)]
pub enum ActionName {
    #[strum(serialize = "power.on")]
    PowerOn,
    #[strum(serialize = "power.off")]
    PowerOff,
    #[strum(serialize = "power.toggle")]
    PowerToggle,
    #[strum(serialize = "volume.increase")]
    VolumeIncrease,
    #[strum(serialize = "volume.decrease")]
    VolumeDecrease,
    #[strum(serialize = "volume.relative")]
    VolumeRelative,
    #[strum(serialize = "volume.set")]
    VolumeSet,
    #[strum(serialize = "volume.set_db")]
    VolumeSetDecibel,
    #[strum(serialize = "mute.mute")]
    Mute,
    #[strum(serialize = "mute.unmute")]
    Unmute,
    #[strum(serialize = "mute.toggle")]
    MuteToggle,
    #[strum(serialize = "mute.set")]
    MuteSet,
    #[strum(serialize = "notification.send")]
    Notify,
    #[strum(serialize = "system.restart")]
    Restart,
}

// ── Action ───────────────────────────────────────────────────────────

/// Which mute action was requested. Only `Mute` forces the flag on by itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuteKind {
    Mute,
    Unmute,
    Toggle,
    Set,
}

/// A parsed host action.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // ── Power ────────────────────────────────────────────────────────
    PowerOn,
    PowerOff,
    PowerToggle,

    // ── Volume (levels on a 0..1 scale) ──────────────────────────────
    VolumeIncrease { amount: Option<f64> },
    VolumeDecrease { amount: Option<f64> },
    VolumeRelative { level: Option<f64> },
    VolumeSet { level: Option<f64> },
    VolumeSetDecibel { level: Option<f64> },

    // ── Mute ─────────────────────────────────────────────────────────
    /// `state` is the resolved mute flag; `mute.mute` always carries `true`.
    Mute { kind: MuteKind, state: bool },

    // ── Notifications ────────────────────────────────────────────────
    Notify { text: Option<String> },

    // ── Session ──────────────────────────────────────────────────────
    Restart,

    /// Anything the session does not recognize; forwarded to the host.
    Other { name: String, params: ActionParams },
}

impl Action {
    /// Parse a host action. Unknown names become [`Action::Other`]; known
    /// names with malformed parameters are rejected.
    pub fn parse(name: &str, params: &ActionParams) -> Result<Self, CoreError> {
        let Ok(action) = ActionName::from_str(name) else {
            return Ok(Self::Other {
                name: name.to_owned(),
                params: params.clone(),
            });
        };

        let mute = |kind: MuteKind| Self::Mute {
            kind,
            state: kind == MuteKind::Mute || params.flag("state"),
        };
        // The absolute volume actions accept any of the three level keys.
        let level = || -> Result<Option<f64>, CoreError> {
            Ok(params
                .number(action, "amount")?
                .or(params.number(action, "value")?)
                .or(params.number(action, "db")?))
        };

        Ok(match action {
            ActionName::PowerOn => Self::PowerOn,
            ActionName::PowerOff => Self::PowerOff,
            ActionName::PowerToggle => Self::PowerToggle,
            ActionName::VolumeIncrease => Self::VolumeIncrease {
                amount: params.number(action, "amount")?,
            },
            ActionName::VolumeDecrease => Self::VolumeDecrease {
                amount: params.number(action, "amount")?,
            },
            ActionName::VolumeRelative => Self::VolumeRelative { level: level()? },
            ActionName::VolumeSet => Self::VolumeSet { level: level()? },
            ActionName::VolumeSetDecibel => Self::VolumeSetDecibel { level: level()? },
            ActionName::Mute => mute(MuteKind::Mute),
            ActionName::Unmute => mute(MuteKind::Unmute),
            ActionName::MuteToggle => mute(MuteKind::Toggle),
            ActionName::MuteSet => mute(MuteKind::Set),
            ActionName::Notify => Self::Notify {
                text: params.get("text").map(str::to_owned),
            },
            ActionName::Restart => Self::Restart,
        })
    }

    /// The action's wire name.
    pub fn name(&self) -> &str {
        let known = match self {
            Self::PowerOn => ActionName::PowerOn,
            Self::PowerOff => ActionName::PowerOff,
            Self::PowerToggle => ActionName::PowerToggle,
            Self::VolumeIncrease { .. } => ActionName::VolumeIncrease,
            Self::VolumeDecrease { .. } => ActionName::VolumeDecrease,
            Self::VolumeRelative { .. } => ActionName::VolumeRelative,
            Self::VolumeSet { .. } => ActionName::VolumeSet,
            Self::VolumeSetDecibel { .. } => ActionName::VolumeSetDecibel,
            Self::Mute { kind, .. } => match kind {
                MuteKind::Mute => ActionName::Mute,
                MuteKind::Unmute => ActionName::Unmute,
                MuteKind::Toggle => ActionName::MuteToggle,
                MuteKind::Set => ActionName::MuteSet,
            },
            Self::Notify { .. } => ActionName::Notify,
            Self::Restart => ActionName::Restart,
            Self::Other { name, .. } => return name,
        };
        let name: &'static str = known.into();
        name
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
