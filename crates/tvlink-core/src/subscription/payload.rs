// ── Push payload shapes ──
//
// Typed views of the JSON the TV pushes on each subscription, and their
// normalization into attribute deltas. Volume is reported as 0..100 and
// published as 0..1.

use serde::Deserialize;
use serde_json::Value;

use crate::model::{Attribute, AttributeDelta, Proposed};

// ── Volume ───────────────────────────────────────────────────────────

/// Volume feed push. Newer firmware sends a full snapshot; older firmware
/// sends a change list naming the fields that moved.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum VolumePush {
    Snapshot {
        #[serde(rename = "volumeStatus")]
        status: VolumeStatus,
    },
    Changes {
        changed: Vec<String>,
        #[serde(default)]
        volume: Option<f64>,
        #[serde(default)]
        muted: Option<bool>,
        #[serde(default, rename = "soundOutput")]
        sound_output: Option<String>,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeStatus {
    #[serde(default)]
    pub volume: Option<f64>,
    #[serde(default)]
    pub mute_status: Option<bool>,
    #[serde(default)]
    pub sound_output: Option<String>,
}

impl VolumePush {
    pub fn into_delta(self) -> AttributeDelta {
        match self {
            Self::Snapshot { status } => AttributeDelta::new()
                .with(Attribute::VolumeLevel, Proposed::from_option(status.volume.map(unit_level)))
                .with(Attribute::Muted, Proposed::from_option(status.mute_status))
                .with(Attribute::SoundOutput, Proposed::from_option(status.sound_output)),
            Self::Changes {
                changed,
                volume,
                muted,
                sound_output,
            } => {
                let flagged = |field: &str| changed.iter().any(|c| c == field);
                AttributeDelta::new()
                    .with(
                        Attribute::VolumeLevel,
                        Proposed::from_option(volume.filter(|_| flagged("volume")).map(unit_level)),
                    )
                    .with(
                        Attribute::Muted,
                        Proposed::from_option(muted.filter(|_| flagged("muted"))),
                    )
                    .with(
                        Attribute::SoundOutput,
                        Proposed::from_option(sound_output.filter(|_| flagged("soundOutput"))),
                    )
            }
        }
    }
}

fn unit_level(percent: f64) -> f64 {
    percent / 100.0
}

// ── Foreground app ───────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForegroundAppPush {
    #[serde(default)]
    pub app_id: Option<String>,
}

impl ForegroundAppPush {
    pub fn into_delta(self) -> AttributeDelta {
        let app = self.app_id.filter(|id| !id.is_empty());
        AttributeDelta::new().with(Attribute::ForegroundApp, Proposed::from_option(app))
    }
}

// ── Current channel ──────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelPush {
    #[serde(default)]
    pub channel_number: Option<Value>,
    #[serde(default)]
    pub channel_name: Option<String>,
}

impl ChannelPush {
    pub fn into_delta(self) -> AttributeDelta {
        let number = self.channel_number.filter(|n| !n.is_null());
        AttributeDelta::new()
            .with(Attribute::ChannelNumber, Proposed::from_option(number))
            .with(Attribute::ChannelName, Proposed::from_option(self.channel_name))
    }
}
