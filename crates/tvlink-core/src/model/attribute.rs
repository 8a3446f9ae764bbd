// ── Attribute keys and values ──
//
// Every piece of TV state the session publishes is a keyed JSON value.
// Push handlers produce `AttributeDelta`s of *proposed* values; the
// reconciler turns them into an `AttributeBatch` of actual writes.

use serde_json::Value;

/// Host-side attribute keys.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::EnumIter,
)]
pub enum Attribute {
    #[strum(serialize = "power.state")]
    PowerState,
    #[strum(serialize = "connection.online")]
    Online,
    #[strum(serialize = "volume.level")]
    VolumeLevel,
    #[strum(serialize = "volume.muted")]
    Muted,
    #[strum(serialize = "webos.sound_output")]
    SoundOutput,
    #[strum(serialize = "webos.foreground_app")]
    ForegroundApp,
    #[strum(serialize = "webos.channel_number")]
    ChannelNumber,
    #[strum(serialize = "webos.channel_name")]
    ChannelName,
}

// ── Proposed ─────────────────────────────────────────────────────────

/// A value a push handler would like to publish.
#[derive(Debug, Clone, PartialEq)]
pub enum Proposed {
    /// "No update for this key": the field was absent or not flagged as changed.
    Ignored,
    Value(Value),
}

impl Proposed {
    /// `Some(v)` becomes a value, `None` is ignored.
    pub fn from_option<T: Into<Value>>(value: Option<T>) -> Self {
        value.map_or(Self::Ignored, |v| Self::Value(v.into()))
    }
}

// ── AttributeDelta ───────────────────────────────────────────────────

/// An ordered set of proposed attribute values from one push.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeDelta {
    entries: Vec<(Attribute, Proposed)>,
}

impl AttributeDelta {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, attribute: Attribute, proposed: Proposed) -> Self {
        self.entries.push((attribute, proposed));
        self
    }

    #[must_use]
    pub fn set(self, attribute: Attribute, value: impl Into<Value>) -> Self {
        self.with(attribute, Proposed::Value(value.into()))
    }

    #[must_use]
    pub fn ignore(self, attribute: Attribute) -> Self {
        self.with(attribute, Proposed::Ignored)
    }

    pub fn get(&self, attribute: Attribute) -> Option<&Proposed> {
        self.entries
            .iter()
            .find(|(a, _)| *a == attribute)
            .map(|(_, p)| p)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Attribute, Proposed)> {
        self.entries.iter()
    }
}

impl IntoIterator for AttributeDelta {
    type Item = (Attribute, Proposed);
    type IntoIter = std::vec::IntoIter<(Attribute, Proposed)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

// ── AttributeBatch ───────────────────────────────────────────────────

/// Attribute writes flushed to the host in one go.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeBatch {
    pub writes: Vec<(Attribute, Value)>,
}

impl AttributeBatch {
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn get(&self, attribute: Attribute) -> Option<&Value> {
        self.writes
            .iter()
            .find(|(a, _)| *a == attribute)
            .map(|(_, v)| v)
    }
}

// ── Structural equality ──────────────────────────────────────────────

/// Deep equality that treats numbers by value and numeric strings as numbers.
///
/// `1`, `1.0` and `"1"` are all equal. Arrays and objects compare
/// element-wise with the same rules.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x == y || numbers_equal(x.as_f64(), y.as_f64()),
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            numbers_equal(n.as_f64(), s.trim().parse().ok())
        }
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| values_equal(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(k, v)| y.get(k).is_some_and(|w| values_equal(v, w)))
        }
        _ => a == b,
    }
}

#[allow(clippy::float_cmp)]
fn numbers_equal(a: Option<f64>, b: Option<f64>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a == b)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use serde_json::json;
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn attribute_keys_round_trip_through_strings() {
        for attribute in Attribute::iter() {
            assert_eq!(Attribute::from_str(attribute.as_ref()).unwrap(), attribute);
        }
        assert_eq!(Attribute::VolumeLevel.to_string(), "volume.level");
        assert_eq!(Attribute::ChannelNumber.as_ref(), "webos.channel_number");
    }

    #[test]
    fn numbers_compare_by_value() {
        assert!(values_equal(&json!(1), &json!(1.0)));
        assert!(values_equal(&json!(0.5), &json!(0.50)));
        assert!(!values_equal(&json!(0.5), &json!(0.55)));
    }

    #[test]
    fn numeric_strings_equal_numbers() {
        assert!(values_equal(&json!("7"), &json!(7)));
        assert!(values_equal(&json!(12), &json!("12.0")));
        assert!(!values_equal(&json!("7a"), &json!(7)));
    }

    #[test]
    fn containers_compare_structurally() {
        assert!(values_equal(&json!([1, "2"]), &json!([1.0, 2])));
        assert!(values_equal(&json!({"a": 1, "b": [true]}), &json!({"b": [true], "a": "1"})));
        assert!(!values_equal(&json!({"a": 1}), &json!({"a": 1, "b": 2})));
        assert!(!values_equal(&json!([1]), &json!([1, 1])));
    }

    #[test]
    fn distinct_kinds_are_unequal() {
        assert!(!values_equal(&json!(true), &json!("true")));
        assert!(!values_equal(&json!(null), &json!(0)));
        assert!(values_equal(&json!("hdmi"), &json!("hdmi")));
    }

    #[test]
    fn proposed_from_option() {
        assert_eq!(Proposed::from_option::<bool>(None), Proposed::Ignored);
        assert_eq!(Proposed::from_option(Some(true)), Proposed::Value(json!(true)));
    }
}
