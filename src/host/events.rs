use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Messages from the Stream Deck application that we care about.
///
/// Anything else it sends (device connections, title changes, global settings...)
/// lands in [`HostEvent::Unknown`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum HostEvent {
    KeyDown(ActionEvent),
    KeyUp(ActionEvent),
    WillAppear(ActionEvent),
    WillDisappear(ActionEvent),
    DidReceiveSettings(ActionEvent),
    SendToPlugin(PropertyInspectorEvent),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ActionEvent {
    pub action: String,
    pub context: String,
    #[serde(default)]
    pub device: String,
    #[serde(default)]
    pub payload: ActionPayload,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ActionPayload {
    /// Kept raw, settings are decoded by the button registry
    #[serde(default)]
    pub settings: Option<Value>,
    /// State the button was showing when the event fired
    #[serde(default)]
    pub state: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PropertyInspectorEvent {
    pub action: String,
    pub context: String,
    #[serde(default)]
    pub payload: Value,
}

/// Messages we send to the Stream Deck application.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum OutboundMessage {
    SetState {
        context: String,
        payload: StatePayload,
    },
    ShowAlert {
        context: String,
    },
    SetSettings {
        context: String,
        payload: Value,
    },
    SendToPropertyInspector {
        action: String,
        context: String,
        payload: Value,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatePayload {
    pub state: u32,
}

/// First message on a fresh connection, the event name comes from the launch arguments.
#[derive(Debug, Clone, Serialize)]
pub struct Registration<'a> {
    pub event: &'a str,
    pub uuid: &'a str,
}
