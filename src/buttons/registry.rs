use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use parking_lot::Mutex;
use serde_json::{json, Value};
use tracing::*;

use crate::{
    devices::{
        fill_device_info, resolve_volatile_id, DeviceDirection, DeviceInventory, DeviceRole,
        DeviceState,
    },
    host::HostSink,
    platform::{AudioBackend, HotkeyInjector},
};

use super::{ActionKind, ButtonSettings, HotkeyBinding, MatchStrategy};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonState {
    pub action: ActionKind,
    pub context: String,
    /// `None` when the stored settings couldn't be decoded
    pub settings: Option<ButtonSettings>,
}

#[derive(Debug, Default)]
struct Buttons {
    by_context: HashMap<String, ButtonState>,
    visible: HashSet<String>,
}

/// Every button the Stream Deck app has told us about, and the logic that keeps
/// their displayed state in line with the system's default devices.
///
/// All entry points take `&self` and may be called from any thread. Each one holds
/// the registry's lock for its whole duration, including the (local, quick) queries
/// it makes to the [`AudioBackend`].
pub struct Registry {
    buttons: Mutex<Buttons>,
    audio: Arc<dyn AudioBackend>,
    host: Arc<dyn HostSink>,
    hotkeys: Arc<dyn HotkeyInjector>,
}

impl Registry {
    pub fn new(
        audio: Arc<dyn AudioBackend>,
        host: Arc<dyn HostSink>,
        hotkeys: Arc<dyn HotkeyInjector>,
    ) -> Self {
        Self {
            buttons: Mutex::new(Buttons::default()),
            audio,
            host,
            hotkeys,
        }
    }
    /// A button was placed on (or scrolled onto) the Stream Deck.
    pub fn on_will_appear(&self, action: ActionKind, context: &str, settings: Option<&Value>) {
        let mut buttons = self.buttons.lock();
        buttons.visible.insert(context.to_owned());
        buttons.by_context.insert(
            context.to_owned(),
            ButtonState {
                action,
                context: context.to_owned(),
                settings: decode_settings(context, settings),
            },
        );

        self.refresh_displayed_state(&buttons, context, None);
        self.backfill_device_info(&mut buttons, context);
    }
    pub fn on_will_disappear(&self, context: &str) {
        let mut buttons = self.buttons.lock();
        buttons.visible.remove(context);
        buttons.by_context.remove(context);
    }
    /// The property inspector changed the button's settings. Re-applied from scratch.
    pub fn on_settings_changed(&self, action: ActionKind, context: &str, settings: Option<&Value>) {
        self.on_will_appear(action, context, settings);
    }
    /// Nothing happens on key down, switching waits for the key to be released.
    pub fn on_key_down(&self, context: &str, state: u32) {
        trace!("Key down on {context} in state {state}");
    }
    /// The user pressed a button. `state` is what the button showed before the press.
    pub fn on_key_up(
        &self,
        action: ActionKind,
        context: &str,
        settings: Option<&Value>,
        state: u32,
    ) {
        let Some(raw_settings) = settings else {
            debug!("Key up on {context} without settings, ignoring");
            return;
        };

        let mut buttons = self.buttons.lock();
        let button = buttons
            .by_context
            .entry(context.to_owned())
            .or_insert_with(|| ButtonState {
                action,
                context: context.to_owned(),
                settings: None,
            });
        button.action = action;
        button.settings = decode_settings(context, Some(raw_settings));

        self.backfill_device_info(&mut buttons, context);

        let Some(settings) = buttons
            .by_context
            .get(context)
            .and_then(|button| button.settings.as_ref())
        else {
            return;
        };

        // Looks inverted, but state 0 means we're on the primary device,
        // so pressing it should move us to the secondary one (and vice versa).
        let to_primary = state != 0 || action == ActionKind::Set;
        let (primary_id, secondary_id) = self.resolve_targets(settings);
        let (device_id, hotkey) = if to_primary {
            (primary_id, &settings.primary_hotkey)
        } else {
            (secondary_id, &settings.secondary_hotkey)
        };

        if device_id.is_empty() {
            debug!("Doing nothing, no device ID");
            return;
        }

        let connection = self
            .audio
            .device_connection_state(&device_id)
            .unwrap_or_else(|e| {
                warn!("Couldn't get state of {device_id}: {e}");
                DeviceState::Unknown
            });
        if connection != DeviceState::Connected {
            info!("Device {device_id} is not connected ({connection:?})");
            if action == ActionKind::Set {
                self.set_state(context, 1);
            }
            self.show_alert(context);
            return;
        }

        if action == ActionKind::Set {
            match self.audio.default_device_id(settings.direction, settings.role) {
                Ok(current) if current == device_id => {
                    // We already have the correct device, undo the state change
                    self.set_state(context, state);
                    debug!("Already set, nothing to do");
                    return;
                }
                Ok(_) => (),
                Err(e) => warn!("Couldn't get current default device: {e}"),
            }
        }

        info!(
            "Setting {} {} device to {device_id}",
            settings.direction, settings.role
        );
        if let Err(e) =
            self.audio
                .set_default_device_id(settings.direction, settings.role, &device_id)
        {
            error!("Failed to set default device: {e}");
            self.show_alert(context);
            return;
        }

        self.trigger_hotkey(hotkey);
    }
    /// The system's default device changed, possibly by one of our own key presses.
    ///
    /// Called by [`crate::bridge::NotificationBridge`], from whatever thread the platform
    /// delivers notifications on.
    pub fn on_default_device_changed(
        &self,
        direction: DeviceDirection,
        role: DeviceRole,
        device_id: &str,
    ) {
        debug!("Default {direction} {role} device is now {device_id:?}");
        // An empty ID means "no default", so go ask what it is instead
        let active = Some(device_id).filter(|id| !id.is_empty());

        let buttons = self.buttons.lock();
        for (context, button) in &buttons.by_context {
            let Some(settings) = button.settings.as_ref() else {
                continue;
            };
            if settings.direction != direction || settings.role != role {
                continue;
            }
            self.refresh_displayed_state(&buttons, context, active);
        }
    }
    /// Answers requests from the property inspector.
    pub fn on_send_to_plugin(&self, action_id: &str, context: &str, payload: &Value) {
        let event = payload
            .get("event")
            .and_then(Value::as_str)
            .unwrap_or_default();
        debug!("Received event {event}");

        if event != "getDeviceList" {
            return;
        }

        let output_devices = self.inventory(DeviceDirection::Output);
        let input_devices = self.inventory(DeviceDirection::Input);
        let reply = json!({
            "event": event,
            "outputDevices": output_devices,
            "inputDevices": input_devices,
        });
        if let Err(e) = self
            .host
            .send_to_property_inspector(action_id, context, reply)
        {
            error!("Failed to send device list to {context}: {e}");
        }
    }
    pub fn button(&self, context: &str) -> Option<ButtonState> {
        self.buttons.lock().by_context.get(context).cloned()
    }
    pub fn is_visible(&self, context: &str) -> bool {
        self.buttons.lock().visible.contains(context)
    }
    pub fn len(&self) -> usize {
        self.buttons.lock().by_context.len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn refresh_displayed_state(&self, buttons: &Buttons, context: &str, active: Option<&str>) {
        let Some(button) = buttons.by_context.get(context) else {
            return;
        };
        let Some(settings) = button.settings.as_ref() else {
            debug!("{context} isn't configured, leaving it be");
            return;
        };

        let active = match active {
            Some(id) => id.to_owned(),
            None => match self
                .audio
                .default_device_id(settings.direction, settings.role)
            {
                Ok(id) => id,
                Err(e) => {
                    warn!(
                        "Couldn't get default {} {} device: {e}",
                        settings.direction, settings.role
                    );
                    return;
                }
            },
        };

        let (primary_id, secondary_id) = self.resolve_targets(settings);

        match button.action {
            ActionKind::Set => {
                self.set_state(context, if active == primary_id { 0 } else { 1 });
            }
            ActionKind::Toggle if active == primary_id => self.set_state(context, 0),
            ActionKind::Toggle if active == secondary_id => self.set_state(context, 1),
            ActionKind::Toggle => {
                debug!("{context}: active device {active} is neither primary nor secondary");
                self.show_alert(context);
            }
        }
    }
    /// Fills in devices stored by ID alone, and saves the result so it sticks.
    fn backfill_device_info(&self, buttons: &mut Buttons, context: &str) {
        let Some(settings) = buttons
            .by_context
            .get_mut(context)
            .and_then(|button| button.settings.as_mut())
        else {
            return;
        };

        let needs_fill = [&settings.primary_device, &settings.secondary_device]
            .iter()
            .any(|device| device.is_configured() && device.display_name.is_empty());
        if !needs_fill {
            return;
        }

        let inventory = self.inventory(settings.direction);
        let filled_primary = fill_device_info(&mut settings.primary_device, &inventory);
        let filled_secondary = fill_device_info(&mut settings.secondary_device, &inventory);
        if filled_primary || filled_secondary {
            debug!("Backfilling settings for {context}: {settings:?}");
            if let Err(e) = self.host.set_settings(context, settings) {
                error!("Failed to save settings for {context}: {e}");
            }
        }
    }
    /// Current identifiers for the button's primary and secondary devices.
    fn resolve_targets(&self, settings: &ButtonSettings) -> (String, String) {
        let inventory = match settings.match_strategy {
            // Exact matching never looks at what's attached
            MatchStrategy::ExactIdentifier => DeviceInventory::new(),
            MatchStrategy::FuzzyName => self.inventory(settings.direction),
        };
        (
            resolve_volatile_id(
                &settings.primary_device,
                settings.match_strategy,
                &inventory,
            ),
            resolve_volatile_id(
                &settings.secondary_device,
                settings.match_strategy,
                &inventory,
            ),
        )
    }
    fn inventory(&self, direction: DeviceDirection) -> DeviceInventory {
        self.audio.list_devices(direction).unwrap_or_else(|e| {
            warn!("Couldn't list {direction} devices: {e}");
            DeviceInventory::new()
        })
    }
    fn trigger_hotkey(&self, hotkey: &HotkeyBinding) {
        if hotkey.is_armed() {
            debug!("Triggering hotkey: {}", hotkey.key_code);
            self.hotkeys.inject(hotkey);
        }
    }
    fn set_state(&self, context: &str, state: u32) {
        if let Err(e) = self.host.set_state(context, state) {
            error!("Failed to set state of {context}: {e}");
        }
    }
    fn show_alert(&self, context: &str) {
        if let Err(e) = self.host.show_alert(context) {
            error!("Failed to show alert on {context}: {e}");
        }
    }
}

fn decode_settings(context: &str, raw: Option<&Value>) -> Option<ButtonSettings> {
    let raw = raw?;
    ButtonSettings::decode(raw)
        .inspect_err(|e| warn!("{context} left unconfigured: {e}"))
        .ok()
}

#[cfg(test)]
mod tests {
    use std::thread;

    use serde_json::json;

    use super::*;
    use crate::{
        devices::DeviceReference,
        test_support::{output_device, Harness, HostCall},
    };

    const CTX: &str = "button-1";
    const A: &str = "{0.0.0.00000000}.{aaaa}";
    const B: &str = "{0.0.0.00000000}.{bbbb}";

    fn speakers_and_headset() -> Harness {
        let harness = Harness::new([
            output_device(A, "USB Audio", "Speakers"),
            output_device(B, "Headset", "Headphones"),
        ]);
        harness
            .audio
            .set_default(DeviceDirection::Output, DeviceRole::Default, A);
        harness
    }

    /// Settings with full device details, so nothing gets backfilled.
    fn settings() -> Value {
        json!({
            "direction": "output",
            "role": "default",
            "primary": {
                "id": A,
                "displayName": "Speakers (USB Audio)",
                "interfaceName": "USB Audio",
                "endpointName": "Speakers",
            },
            "secondary": {
                "id": B,
                "displayName": "Headphones (Headset)",
                "interfaceName": "Headset",
                "endpointName": "Headphones",
            },
            "primaryHotkey": {"enabled": true, "ctrl": true, "keyCode": "F13"},
            "secondaryHotkey": {"enabled": true, "alt": true, "keyCode": "F14"},
        })
    }

    #[test]
    fn appearing_shows_current_device() {
        let harness = speakers_and_headset();
        harness
            .registry
            .on_will_appear(ActionKind::Toggle, CTX, Some(&settings()));
        assert_eq!(harness.host.take(), [HostCall::State(CTX.into(), 0)]);
        assert!(harness.registry.is_visible(CTX));

        harness
            .audio
            .set_default(DeviceDirection::Output, DeviceRole::Default, B);
        harness
            .registry
            .on_will_appear(ActionKind::Toggle, "button-2", Some(&settings()));
        assert_eq!(harness.host.take(), [HostCall::State("button-2".into(), 1)]);
        assert_eq!(harness.registry.len(), 2);
    }

    #[test]
    fn toggle_follows_default_device_changes() {
        let harness = speakers_and_headset();
        harness
            .registry
            .on_will_appear(ActionKind::Toggle, CTX, Some(&settings()));
        harness.host.take();

        harness
            .registry
            .on_default_device_changed(DeviceDirection::Output, DeviceRole::Default, B);
        assert_eq!(harness.host.take(), [HostCall::State(CTX.into(), 1)]);

        harness
            .registry
            .on_default_device_changed(DeviceDirection::Output, DeviceRole::Default, A);
        assert_eq!(harness.host.take(), [HostCall::State(CTX.into(), 0)]);
    }

    #[test]
    fn toggle_alerts_on_unrelated_default() {
        let harness = speakers_and_headset();
        harness
            .registry
            .on_will_appear(ActionKind::Toggle, CTX, Some(&settings()));
        harness.host.take();

        harness.registry.on_default_device_changed(
            DeviceDirection::Output,
            DeviceRole::Default,
            "{0.0.0.00000000}.{cccc}",
        );
        assert_eq!(harness.host.take(), [HostCall::Alert(CTX.into())]);
    }

    #[test]
    fn set_shows_whether_primary_is_active() {
        let harness = speakers_and_headset();
        harness
            .registry
            .on_will_appear(ActionKind::Set, CTX, Some(&settings()));
        assert_eq!(harness.host.take(), [HostCall::State(CTX.into(), 0)]);

        harness.registry.on_default_device_changed(
            DeviceDirection::Output,
            DeviceRole::Default,
            "{0.0.0.00000000}.{cccc}",
        );
        assert_eq!(harness.host.take(), [HostCall::State(CTX.into(), 1)]);
    }

    #[test]
    fn notifications_for_other_direction_or_role_are_ignored() {
        let harness = speakers_and_headset();
        harness
            .registry
            .on_will_appear(ActionKind::Toggle, CTX, Some(&settings()));
        harness.host.take();

        harness
            .registry
            .on_default_device_changed(DeviceDirection::Input, DeviceRole::Default, B);
        harness
            .registry
            .on_default_device_changed(DeviceDirection::Output, DeviceRole::Communication, B);
        assert!(harness.host.take().is_empty());
    }

    #[test]
    fn empty_notification_queries_current_default() {
        let harness = speakers_and_headset();
        harness
            .registry
            .on_will_appear(ActionKind::Toggle, CTX, Some(&settings()));
        harness.host.take();

        harness
            .audio
            .set_default(DeviceDirection::Output, DeviceRole::Default, B);
        harness
            .registry
            .on_default_device_changed(DeviceDirection::Output, DeviceRole::Default, "");
        assert_eq!(harness.host.take(), [HostCall::State(CTX.into(), 1)]);
    }

    #[test]
    fn pressing_set_on_active_device_restores_state() {
        let harness = speakers_and_headset();
        harness
            .registry
            .on_will_appear(ActionKind::Set, CTX, Some(&settings()));
        harness.host.take();

        harness
            .registry
            .on_key_up(ActionKind::Set, CTX, Some(&settings()), 0);
        assert_eq!(harness.host.take(), [HostCall::State(CTX.into(), 0)]);
        assert!(harness.audio.set_calls().is_empty());
        assert!(harness.hotkeys.fired().is_empty());
    }

    #[test]
    fn pressing_set_switches_and_sends_hotkey() {
        let harness = speakers_and_headset();
        harness
            .audio
            .set_default(DeviceDirection::Output, DeviceRole::Default, B);

        harness
            .registry
            .on_key_up(ActionKind::Set, CTX, Some(&settings()), 1);
        assert_eq!(
            harness.audio.set_calls(),
            [(DeviceDirection::Output, DeviceRole::Default, A.to_owned())]
        );
        let fired = harness.hotkeys.fired();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].key_code, "F13");
        assert!(harness.host.take().is_empty());
    }

    #[test]
    fn toggle_from_primary_switches_to_secondary() {
        let harness = speakers_and_headset();
        harness
            .registry
            .on_key_up(ActionKind::Toggle, CTX, Some(&settings()), 0);
        assert_eq!(
            harness.audio.set_calls(),
            [(DeviceDirection::Output, DeviceRole::Default, B.to_owned())]
        );
        let fired = harness.hotkeys.fired();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].key_code, "F14");
        assert!(fired[0].alt);
    }

    #[test]
    fn toggle_from_secondary_switches_to_primary() {
        let harness = speakers_and_headset();
        harness
            .audio
            .set_default(DeviceDirection::Output, DeviceRole::Default, B);
        harness
            .registry
            .on_key_up(ActionKind::Toggle, CTX, Some(&settings()), 1);
        assert_eq!(
            harness.audio.set_calls(),
            [(DeviceDirection::Output, DeviceRole::Default, A.to_owned())]
        );
    }

    #[test]
    fn disconnected_target_alerts_without_switching() {
        let harness = speakers_and_headset();
        harness.audio.set_connected(B, false);

        harness
            .registry
            .on_key_up(ActionKind::Toggle, CTX, Some(&settings()), 0);
        assert_eq!(harness.host.take(), [HostCall::Alert(CTX.into())]);
        assert!(harness.audio.set_calls().is_empty());
        assert!(harness.hotkeys.fired().is_empty());
    }

    #[test]
    fn disconnected_set_target_shows_inactive() {
        let harness = speakers_and_headset();
        harness.audio.set_connected(A, false);

        harness
            .registry
            .on_key_up(ActionKind::Set, CTX, Some(&settings()), 0);
        assert_eq!(
            harness.host.take(),
            [HostCall::State(CTX.into(), 1), HostCall::Alert(CTX.into())]
        );
        assert!(harness.audio.set_calls().is_empty());
    }

    #[test]
    fn failed_switch_alerts_and_skips_hotkey() {
        let harness = speakers_and_headset();
        harness.audio.fail_set_default(true);

        harness
            .registry
            .on_key_up(ActionKind::Toggle, CTX, Some(&settings()), 0);
        assert_eq!(harness.host.take(), [HostCall::Alert(CTX.into())]);
        assert!(harness.hotkeys.fired().is_empty());
    }

    #[test]
    fn unarmed_hotkey_is_not_sent() {
        let harness = speakers_and_headset();
        let mut raw = settings();
        raw["secondaryHotkey"]["enabled"] = json!(false);

        harness
            .registry
            .on_key_up(ActionKind::Toggle, CTX, Some(&raw), 0);
        assert_eq!(harness.audio.set_calls().len(), 1);
        assert!(harness.hotkeys.fired().is_empty());
    }

    #[test]
    fn key_up_without_target_does_nothing() {
        let harness = speakers_and_headset();
        let mut raw = settings();
        raw.as_object_mut().unwrap().remove("secondary");

        harness
            .registry
            .on_key_up(ActionKind::Toggle, CTX, Some(&raw), 0);
        assert!(harness.host.take().is_empty());
        assert!(harness.audio.set_calls().is_empty());
    }

    #[test]
    fn key_up_without_settings_is_ignored() {
        let harness = speakers_and_headset();
        harness.registry.on_key_up(ActionKind::Toggle, CTX, None, 0);
        assert!(harness.registry.is_empty());
        assert!(harness.audio.set_calls().is_empty());
    }

    #[test]
    fn unconfigured_buttons_stay_quiet() {
        let harness = speakers_and_headset();
        let raw = json!({"primary": A});
        harness
            .registry
            .on_will_appear(ActionKind::Toggle, CTX, Some(&raw));
        harness.registry.on_will_appear(ActionKind::Set, "button-2", None);
        harness
            .registry
            .on_default_device_changed(DeviceDirection::Output, DeviceRole::Default, B);
        harness
            .registry
            .on_key_up(ActionKind::Toggle, CTX, Some(&raw), 0);

        assert!(harness.host.take().is_empty());
        assert!(harness.audio.set_calls().is_empty());
        assert_eq!(harness.registry.len(), 2);
        assert_eq!(harness.registry.button(CTX).unwrap().settings, None);
    }

    #[test]
    fn bare_identifiers_are_backfilled_once() {
        let harness = speakers_and_headset();
        let raw = json!({"direction": "output", "primary": A, "secondary": B});
        harness
            .registry
            .on_will_appear(ActionKind::Toggle, CTX, Some(&raw));

        let calls = harness.host.take();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], HostCall::State(CTX.into(), 0));
        let HostCall::Settings(context, saved) = &calls[1] else {
            panic!("expected settings to be saved, got {calls:?}");
        };
        assert_eq!(context, CTX);
        assert_eq!(
            saved.primary_device,
            DeviceReference {
                id: A.into(),
                display_name: "Speakers (USB Audio)".into(),
                interface_name: "USB Audio".into(),
                endpoint_name: "Speakers".into(),
            }
        );
        assert_eq!(saved.secondary_device.endpoint_name, "Headphones");

        let saved = saved.encode().unwrap();
        harness
            .registry
            .on_settings_changed(ActionKind::Toggle, CTX, Some(&saved));
        assert_eq!(harness.host.take(), [HostCall::State(CTX.into(), 0)]);
    }

    #[test]
    fn unknown_devices_are_not_backfilled() {
        let harness = speakers_and_headset();
        let raw = json!({"direction": "output", "primary": "{0.0.0.00000000}.{gone}"});
        harness
            .registry
            .on_will_appear(ActionKind::Set, CTX, Some(&raw));
        assert_eq!(harness.host.take(), [HostCall::State(CTX.into(), 1)]);
    }

    #[test]
    fn unplugged_devices_are_listed_and_backfilled() {
        let harness = speakers_and_headset();
        harness.audio.set_connected(B, false);

        let raw = json!({"direction": "output", "primary": A, "secondary": B});
        harness
            .registry
            .on_will_appear(ActionKind::Toggle, CTX, Some(&raw));
        let calls = harness.host.take();
        let [HostCall::State(_, 0), HostCall::Settings(_, saved)] = calls.as_slice() else {
            panic!("expected state then saved settings, got {calls:?}");
        };
        assert_eq!(saved.secondary_device.display_name, "Headphones (Headset)");
        assert_eq!(saved.secondary_device.interface_name, "Headset");

        harness.registry.on_send_to_plugin(
            TOGGLE_ACTION,
            CTX,
            &json!({"event": "getDeviceList"}),
        );
        let calls = harness.host.take();
        let [HostCall::Inspector { payload, .. }] = calls.as_slice() else {
            panic!("expected a single reply, got {calls:?}");
        };
        assert_eq!(payload["outputDevices"][B]["state"], "disconnected");
        assert_eq!(payload["outputDevices"][A]["state"], "connected");
    }

    #[test]
    fn fuzzy_matching_follows_reenumerated_device() {
        let harness = Harness::new([
            output_device("{0.0.0.00000000}.{new}", "3- USB Audio", "Speakers"),
            output_device(B, "Headset", "Headphones"),
        ]);
        harness.audio.set_default(
            DeviceDirection::Output,
            DeviceRole::Default,
            "{0.0.0.00000000}.{new}",
        );
        let mut raw = settings();
        raw["primary"]["id"] = json!("{0.0.0.00000000}.{old}");
        raw["primary"]["interfaceName"] = json!("2- USB Audio");
        raw["matchStrategy"] = json!("Fuzzy");

        harness
            .registry
            .on_will_appear(ActionKind::Toggle, CTX, Some(&raw));
        assert_eq!(harness.host.take(), [HostCall::State(CTX.into(), 0)]);

        // Exact matching only knows the stale identifier
        raw["matchStrategy"] = json!("ID");
        harness
            .registry
            .on_settings_changed(ActionKind::Toggle, CTX, Some(&raw));
        assert_eq!(harness.host.take(), [HostCall::Alert(CTX.into())]);
    }

    #[test]
    fn disappearing_forgets_the_button() {
        let harness = speakers_and_headset();
        harness
            .registry
            .on_will_appear(ActionKind::Toggle, CTX, Some(&settings()));
        harness.host.take();

        harness.registry.on_will_disappear(CTX);
        assert!(!harness.registry.is_visible(CTX));
        assert!(harness.registry.button(CTX).is_none());

        harness
            .registry
            .on_default_device_changed(DeviceDirection::Output, DeviceRole::Default, B);
        assert!(harness.host.take().is_empty());
    }

    #[test]
    fn settings_change_replaces_action_and_settings() {
        let harness = speakers_and_headset();
        harness
            .registry
            .on_will_appear(ActionKind::Toggle, CTX, Some(&settings()));
        let mut raw = settings();
        raw["role"] = json!("communication");
        harness
            .registry
            .on_settings_changed(ActionKind::Set, CTX, Some(&raw));

        let button = harness.registry.button(CTX).unwrap();
        assert_eq!(button.action, ActionKind::Set);
        assert_eq!(button.settings.unwrap().role, DeviceRole::Communication);
    }

    #[test]
    fn device_list_request_gets_both_directions() {
        let harness = speakers_and_headset();
        harness
            .audio
            .add_device(crate::test_support::input_device(
                "{0.0.1.00000000}.{mic}",
                "USB Audio",
                "Microphone",
            ));

        harness.registry.on_send_to_plugin(
            TOGGLE_ACTION,
            CTX,
            &json!({"event": "getDeviceList"}),
        );
        let calls = harness.host.take();
        let [HostCall::Inspector {
            action,
            context,
            payload,
        }] = calls.as_slice()
        else {
            panic!("expected a single reply, got {calls:?}");
        };
        assert_eq!(action, TOGGLE_ACTION);
        assert_eq!(context, CTX);
        assert_eq!(payload["event"], "getDeviceList");
        assert_eq!(payload["outputDevices"].as_object().unwrap().len(), 2);
        assert_eq!(
            payload["outputDevices"][A]["displayName"],
            "Speakers (USB Audio)"
        );
        assert_eq!(
            payload["inputDevices"]["{0.0.1.00000000}.{mic}"]["direction"],
            "input"
        );
        assert_eq!(
            payload["inputDevices"]["{0.0.1.00000000}.{mic}"]["state"],
            "connected"
        );
    }

    #[test]
    fn other_inspector_events_are_ignored() {
        let harness = speakers_and_headset();
        harness
            .registry
            .on_send_to_plugin(TOGGLE_ACTION, CTX, &json!({"event": "somethingElse"}));
        harness
            .registry
            .on_send_to_plugin(TOGGLE_ACTION, CTX, &json!({}));
        assert!(harness.host.take().is_empty());
    }

    #[test]
    fn concurrent_notifications_and_presses() {
        let harness = speakers_and_headset();
        harness
            .registry
            .on_will_appear(ActionKind::Toggle, CTX, Some(&settings()));

        thread::scope(|s| {
            s.spawn(|| {
                for i in 0..200 {
                    let id = if i % 2 == 0 { A } else { B };
                    harness.registry.on_default_device_changed(
                        DeviceDirection::Output,
                        DeviceRole::Default,
                        id,
                    );
                }
            });
            s.spawn(|| {
                for i in 0..200 {
                    harness
                        .registry
                        .on_key_up(ActionKind::Toggle, CTX, Some(&settings()), i % 2);
                }
            });
            s.spawn(|| {
                for i in 0..200 {
                    let context = format!("extra-{i}");
                    harness
                        .registry
                        .on_will_appear(ActionKind::Set, &context, Some(&settings()));
                    harness.registry.on_will_disappear(&context);
                }
            });
        });

        assert_eq!(harness.registry.len(), 1);
        assert_eq!(harness.audio.set_calls().len(), 200);
        assert!(harness
            .host
            .take()
            .iter()
            .all(|call| matches!(call, HostCall::State(..))));
    }

    const TOGGLE_ACTION: &str = crate::buttons::TOGGLE_ACTION_ID;
}
