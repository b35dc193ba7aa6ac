use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::*;

use crate::devices::{DeviceDirection, DeviceReference, DeviceRole};

use super::HotkeyBinding;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStrategy {
    /// Only ever use the stored identifier
    #[default]
    #[serde(rename = "ID")]
    ExactIdentifier,
    /// Fall back to the interface and endpoint names when the identifier is gone
    #[serde(rename = "Fuzzy")]
    FuzzyName,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("Button settings have no direction")]
    ConfigurationAbsent,
    #[error("Button settings have an unknown direction: {0}")]
    UnknownDirection(String),
}

/// Everything a single Stream Deck button remembers, as stored by the Stream Deck app.
///
/// Written back with [`Serialize`] using only the current field names. Read with
/// [`ButtonSettings::decode`], which also understands what older versions wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonSettings {
    pub direction: DeviceDirection,
    pub role: DeviceRole,
    #[serde(rename = "primary")]
    pub primary_device: DeviceReference,
    #[serde(rename = "secondary")]
    pub secondary_device: DeviceReference,
    pub match_strategy: MatchStrategy,
    pub primary_hotkey: HotkeyBinding,
    pub secondary_hotkey: HotkeyBinding,
}

/// Older settings stored a device as its bare identifier.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredDeviceReference {
    Bare(String),
    Full(DeviceReference),
}

impl From<StoredDeviceReference> for DeviceReference {
    fn from(value: StoredDeviceReference) -> Self {
        match value {
            StoredDeviceReference::Bare(id) => DeviceReference::by_id(id),
            StoredDeviceReference::Full(reference) => reference,
        }
    }
}

/// Looks up `current`, falling back to `legacy` only when `current` is absent.
pub(super) fn aliased<'a>(
    raw: &'a Map<String, Value>,
    current: &str,
    legacy: &str,
) -> Option<&'a Value> {
    raw.get(current).or_else(|| raw.get(legacy))
}

/// Reads an optional field, logging (and discarding) values of the wrong shape.
fn optional<T: DeserializeOwned>(raw: &Map<String, Value>, name: &str) -> Option<T> {
    let value = raw.get(name)?;
    T::deserialize(value)
        .inspect_err(|e| warn!("Ignoring invalid button setting {name} ({value}): {e}"))
        .ok()
}

impl ButtonSettings {
    /// Builds settings from the JSON stored for a button.
    ///
    /// `direction` is the only required field. Everything else falls back to its default.
    pub fn decode(raw: &Value) -> Result<Self, SettingsError> {
        let raw = raw.as_object().ok_or(SettingsError::ConfigurationAbsent)?;
        let direction = raw
            .get("direction")
            .ok_or(SettingsError::ConfigurationAbsent)?;
        let direction = DeviceDirection::deserialize(direction)
            .map_err(|_| SettingsError::UnknownDirection(direction.to_string()))?;

        let mut settings = Self {
            direction,
            ..Default::default()
        };

        if let Some(role) = optional(raw, "role") {
            settings.role = role;
        }
        if let Some(primary) = optional::<StoredDeviceReference>(raw, "primary") {
            settings.primary_device = primary.into();
        }
        if let Some(secondary) = optional::<StoredDeviceReference>(raw, "secondary") {
            settings.secondary_device = secondary.into();
        }
        if let Some(strategy) = optional(raw, "matchStrategy") {
            settings.match_strategy = strategy;
        }

        let hotkeys = [
            (
                &mut settings.primary_hotkey,
                "primaryHotkey",
                aliased(raw, "primaryHotkey", "hotkey"),
            ),
            (
                &mut settings.secondary_hotkey,
                "secondaryHotkey",
                raw.get("secondaryHotkey"),
            ),
        ];
        for (hotkey, name, value) in hotkeys {
            match value {
                Some(Value::Object(fields)) => hotkey.decode_onto(fields),
                Some(other) => warn!("Ignoring invalid button setting {name}: {other}"),
                None => (),
            }
        }

        Ok(settings)
    }
    pub fn encode(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}
