use std::str::FromStr;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::*;

use crate::errors::SwitcherError;

use super::settings::aliased;

/// A key chord to send after switching to a device.
///
/// Serialized with the current field names only, see [`HotkeyBinding::decode_onto`]
/// for the names accepted when reading.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HotkeyBinding {
    pub enabled: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    /// Windows key, or Command on macOS
    #[serde(rename = "win")]
    pub meta: bool,
    pub key_code: String,
}

impl HotkeyBinding {
    /// Overlays whatever fields `raw` carries onto `self`.
    ///
    /// Each field is looked up by its current name first, then by the name older
    /// versions of the property inspector stored it under. Fields that are missing
    /// (or hold the wrong type) keep their existing value.
    pub fn decode_onto(&mut self, raw: &Map<String, Value>) {
        let flags = [
            (&mut self.enabled, "enabled", "hotkeyEnabled"),
            (&mut self.ctrl, "ctrl", "hotkeyCtrl"),
            (&mut self.alt, "alt", "hotkeyAlt"),
            (&mut self.shift, "shift", "hotkeyShift"),
            (&mut self.meta, "win", "hotkeyWin"),
        ];
        for (flag, current, legacy) in flags {
            match aliased(raw, current, legacy) {
                Some(Value::Bool(value)) => *flag = *value,
                Some(other) => warn!("Ignoring non-boolean hotkey field {current}: {other}"),
                None => (),
            }
        }
        match aliased(raw, "keyCode", "hotkeyKey") {
            Some(Value::String(key)) => self.key_code.clone_from(key),
            Some(other) => warn!("Ignoring non-string hotkey key code: {other}"),
            None => (),
        }
    }
    /// A binding only does something when enabled with a key to press.
    pub fn is_armed(&self) -> bool {
        self.enabled && !self.key_code.is_empty()
    }
    pub fn key(&self) -> Result<HotkeyKey, SwitcherError> {
        self.key_code.parse()
    }
}

/// The non-modifier key of a [`HotkeyBinding`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyKey {
    Character(char),
    /// `F1` through `F24`
    Function(u8),
    Space,
    Enter,
    Escape,
    Tab,
}

impl FromStr for HotkeyKey {
    type Err = SwitcherError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Ok(Self::Character(c));
        }

        let upper = s.to_ascii_uppercase();
        match upper.as_str() {
            "SPACE" => return Ok(Self::Space),
            "ENTER" | "RETURN" => return Ok(Self::Enter),
            "ESCAPE" | "ESC" => return Ok(Self::Escape),
            "TAB" => return Ok(Self::Tab),
            _ => (),
        }

        upper
            .strip_prefix('F')
            .filter(|digits| {
                (1..=2).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
            })
            .and_then(|digits| digits.parse::<u8>().ok())
            .filter(|n| (1..=24).contains(n))
            .map(Self::Function)
            .ok_or_else(|| SwitcherError::UnknownKeyCode(s.to_owned()))
    }
}
