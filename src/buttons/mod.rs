mod hotkey;
mod registry;
mod settings;

pub use hotkey::{HotkeyBinding, HotkeyKey};
pub use registry::{ButtonState, Registry};
pub use settings::{ButtonSettings, MatchStrategy, SettingsError};

/// Action identifiers from the plugin manifest.
pub const SET_ACTION_ID: &str = "com.fredemmott.audiooutputswitch.set";
pub const TOGGLE_ACTION_ID: &str = "com.fredemmott.audiooutputswitch.toggle";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Always switches to the primary device
    Set,
    /// Flips between the primary and secondary devices
    Toggle,
}

impl ActionKind {
    pub fn from_action_id(action: &str) -> Self {
        if action == SET_ACTION_ID {
            Self::Set
        } else {
            Self::Toggle
        }
    }
}
