use crate::model::Attribute;

/// What the TV entity can do, as announced to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Capability {
    Power,
    Volume,
    Mute,
    Notification,
}

/// Descriptor passed to `Host::register_entity` on first start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDescriptor {
    /// Stable id derived from the TV address.
    pub id: String,
    pub name: String,
    pub capabilities: Vec<Capability>,
    /// Attribute that best summarizes the entity's state.
    pub primary: Attribute,
}

impl EntityDescriptor {
    pub fn television(address: &str, name: &str) -> Self {
        Self {
            id: format!("webos-tv:{address}"),
            name: name.to_owned(),
            capabilities: vec![
                Capability::Power,
                Capability::Volume,
                Capability::Mute,
                Capability::Notification,
            ],
            primary: Attribute::PowerState,
        }
    }
}
