use std::{collections::BTreeMap, fmt::Display};

use serde::{Deserialize, Serialize};
use serde_plain::derive_display_from_serialize;

pub mod resolver;

pub use resolver::{fill_device_info, normalize_interface_name, resolve_volatile_id};

/// Live devices of one direction, keyed by their identifier.
pub type DeviceInventory = BTreeMap<String, DeviceInfo>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceDirection {
    #[default]
    #[serde(alias = "INPUT", alias = "Input")]
    Input,
    #[serde(alias = "OUTPUT", alias = "Output")]
    Output,
}

derive_display_from_serialize!(DeviceDirection);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceRole {
    #[default]
    #[serde(alias = "DEFAULT", alias = "Default")]
    Default,
    #[serde(alias = "COMMUNICATION", alias = "Communication")]
    Communication,
}

derive_display_from_serialize!(DeviceRole);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceState {
    Connected,
    Disconnected,
    #[default]
    Unknown,
}

derive_display_from_serialize!(DeviceState);

/// A device as currently reported by the platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub id: String,
    pub display_name: String,
    /// Name of the physical interface, e.g. `"2- USB Audio"`
    pub interface_name: String,
    /// Name of the endpoint on that interface, e.g. `"Speakers"`
    pub endpoint_name: String,
    pub state: DeviceState,
    pub direction: DeviceDirection,
}

/// A device as the user picked it, which may no longer match anything attached.
///
/// An empty `id` means nothing is configured. An empty `display_name` next to a
/// populated `id` means the rest of the record hasn't been filled from the live
/// inventory yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeviceReference {
    #[serde(alias = "identifier")]
    pub id: String,
    pub display_name: String,
    pub interface_name: String,
    pub endpoint_name: String,
}

impl DeviceReference {
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
    pub fn is_configured(&self) -> bool {
        !self.id.is_empty()
    }
}

impl From<&DeviceInfo> for DeviceReference {
    fn from(value: &DeviceInfo) -> Self {
        Self {
            id: value.id.clone(),
            display_name: value.display_name.clone(),
            interface_name: value.interface_name.clone(),
            endpoint_name: value.endpoint_name.clone(),
        }
    }
}

impl Display for DeviceReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.id.is_empty(), self.display_name.is_empty()) {
            // If the name's populated, just use that
            (_, false) => write!(f, "{}", self.display_name),
            // Only ID populated
            (false, true) => write!(f, "By ID: \"{}\"", self.id),
            (true, true) => write!(f, "No device"),
        }
    }
}
