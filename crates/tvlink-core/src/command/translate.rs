// ── Command translator ──
//
// Maps a typed `Action` plus the last known attribute values to zero or
// more protocol requests. Pure apart from logging: the session decides
// whether the connection is up and sends whatever comes back.

use serde_json::json;
use tracing::{debug, warn};
use tvlink_api::{Endpoint, Request};

use crate::command::{Action, MuteKind};
use crate::store::AttributeReconciler;

/// Requests to send for `action`. Session-level and unknown actions yield none.
pub fn translate(action: &Action, known: &AttributeReconciler) -> Vec<Request> {
    match action {
        Action::PowerOn => vec![Request::new(Endpoint::PowerOn)],
        Action::PowerOff => vec![Request::new(Endpoint::PowerOff)],
        Action::PowerToggle => match known.power_state() {
            Some(true) => vec![Request::new(Endpoint::PowerOff)],
            _ => vec![Request::new(Endpoint::PowerOn)],
        },

        Action::VolumeIncrease { amount } => {
            vec![step_volume(known.volume_level(), amount.unwrap_or(0.0), Endpoint::VolumeUp)]
        }
        Action::VolumeDecrease { amount } => {
            vec![step_volume(known.volume_level(), -amount.unwrap_or(0.0), Endpoint::VolumeDown)]
        }
        Action::VolumeRelative { level }
        | Action::VolumeSet { level }
        | Action::VolumeSetDecibel { level } => vec![set_volume(level.unwrap_or(0.0))],

        Action::Mute { kind, state } => {
            let mute = *kind == MuteKind::Mute || *state;
            vec![Request::with_payload(Endpoint::SetMute, json!({ "mute": mute }))]
        }

        Action::Notify { text } => match text.as_deref().filter(|t| !t.is_empty()) {
            Some(text) => vec![Request::with_payload(
                Endpoint::CreateToast,
                json!({ "message": text }),
            )],
            None => {
                warn!("notification.send requires a 'text' parameter; dropping");
                Vec::new()
            }
        },

        Action::Restart | Action::Other { .. } => {
            debug!(action = %action, "not a device action");
            Vec::new()
        }
    }
}

/// Step relative to the known level, or fall back to the TV's own step.
fn step_volume(current: Option<f64>, delta: f64, fallback: Endpoint) -> Request {
    match current {
        Some(level) => set_volume(level + delta),
        None => Request::new(fallback),
    }
}

/// `setVolume` takes an integer percentage. Not clamped.
fn set_volume(level: f64) -> Request {
    Request::with_payload(Endpoint::SetVolume, json!({ "volume": percent(level) }))
}

#[allow(clippy::cast_possible_truncation)]
fn percent(level: f64) -> i64 {
    (level * 100.0).trunc() as i64
}
