use serde_json::Value;

use crate::{buttons::ButtonSettings, errors::AppResult};

mod connection;
mod events;

pub use connection::{connect, StreamDeckOutbound};
pub use events::*;

/// What the button logic can ask of the Stream Deck application.
pub trait HostSink: Send + Sync {
    /// Picks which of the action's two images/titles the button shows.
    fn set_state(&self, context: &str, state: u32) -> AppResult<()>;
    /// Briefly flashes a warning triangle on the button.
    fn show_alert(&self, context: &str) -> AppResult<()>;
    /// Persists the button's settings.
    fn set_settings(&self, context: &str, settings: &ButtonSettings) -> AppResult<()>;
    fn send_to_property_inspector(
        &self,
        action: &str,
        context: &str,
        payload: Value,
    ) -> AppResult<()>;
}
