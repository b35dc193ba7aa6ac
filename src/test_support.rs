//! In-memory stand-ins for the platform and the Stream Deck app.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use parking_lot::Mutex;
use serde_json::Value;

use crate::{
    buttons::{ButtonSettings, HotkeyBinding, Registry},
    devices::{DeviceDirection, DeviceInfo, DeviceInventory, DeviceRole, DeviceState},
    errors::{AppResult, SwitcherError},
    host::HostSink,
    platform::{AudioBackend, DefaultDeviceCallback, HotkeyInjector, Subscription},
};

pub fn output_device(id: &str, interface: &str, endpoint: &str) -> DeviceInfo {
    DeviceInfo {
        id: id.into(),
        display_name: format!("{endpoint} ({interface})"),
        interface_name: interface.into(),
        endpoint_name: endpoint.into(),
        state: DeviceState::Connected,
        direction: DeviceDirection::Output,
    }
}

pub fn input_device(id: &str, interface: &str, endpoint: &str) -> DeviceInfo {
    DeviceInfo {
        direction: DeviceDirection::Input,
        ..output_device(id, interface, endpoint)
    }
}

#[derive(Default)]
struct MockAudioState {
    devices: BTreeMap<String, DeviceInfo>,
    defaults: HashMap<(DeviceDirection, DeviceRole), String>,
    set_calls: Vec<(DeviceDirection, DeviceRole, String)>,
    fail_set: bool,
    subscribers: BTreeMap<u64, Arc<DefaultDeviceCallback>>,
    next_subscription: u64,
}

#[derive(Default)]
pub struct MockAudio {
    state: Arc<Mutex<MockAudioState>>,
}

impl MockAudio {
    pub fn with_devices(devices: impl IntoIterator<Item = DeviceInfo>) -> Self {
        let audio = Self::default();
        for device in devices {
            audio.add_device(device);
        }
        audio
    }
    pub fn add_device(&self, device: DeviceInfo) {
        self.state.lock().devices.insert(device.id.clone(), device);
    }
    pub fn set_connected(&self, id: &str, connected: bool) {
        if let Some(device) = self.state.lock().devices.get_mut(id) {
            device.state = if connected {
                DeviceState::Connected
            } else {
                DeviceState::Disconnected
            };
        }
    }
    /// Changes the default without telling subscribers.
    pub fn set_default(&self, direction: DeviceDirection, role: DeviceRole, id: &str) {
        self.state
            .lock()
            .defaults
            .insert((direction, role), id.to_owned());
    }
    /// Changes the default and tells subscribers, like the OS would.
    pub fn notify_default_changed(&self, direction: DeviceDirection, role: DeviceRole, id: &str) {
        self.set_default(direction, role, id);
        let subscribers: Vec<_> = self.state.lock().subscribers.values().cloned().collect();
        for callback in subscribers {
            callback(direction, role, id);
        }
    }
    pub fn fail_set_default(&self, fail: bool) {
        self.state.lock().fail_set = fail;
    }
    pub fn set_calls(&self) -> Vec<(DeviceDirection, DeviceRole, String)> {
        self.state.lock().set_calls.clone()
    }
    pub fn subscriber_count(&self) -> usize {
        self.state.lock().subscribers.len()
    }
}

impl AudioBackend for MockAudio {
    fn list_devices(&self, direction: DeviceDirection) -> AppResult<DeviceInventory> {
        Ok(self
            .state
            .lock()
            .devices
            .values()
            .filter(|device| device.direction == direction)
            .map(|device| (device.id.clone(), device.clone()))
            .collect())
    }
    fn device_connection_state(&self, id: &str) -> AppResult<DeviceState> {
        Ok(self
            .state
            .lock()
            .devices
            .get(id)
            .map(|device| device.state)
            .unwrap_or(DeviceState::Unknown))
    }
    fn default_device_id(&self, direction: DeviceDirection, role: DeviceRole) -> AppResult<String> {
        Ok(self
            .state
            .lock()
            .defaults
            .get(&(direction, role))
            .cloned()
            .unwrap_or_default())
    }
    fn set_default_device_id(
        &self,
        direction: DeviceDirection,
        role: DeviceRole,
        id: &str,
    ) -> AppResult<()> {
        let mut state = self.state.lock();
        if state.fail_set {
            return Err(SwitcherError::UnsupportedPlatform);
        }
        state.set_calls.push((direction, role, id.to_owned()));
        state.defaults.insert((direction, role), id.to_owned());
        Ok(())
    }
    fn subscribe_default_device_changed(
        &self,
        callback: DefaultDeviceCallback,
    ) -> AppResult<Subscription> {
        let mut state = self.state.lock();
        let id = state.next_subscription;
        state.next_subscription += 1;
        state.subscribers.insert(id, Arc::new(callback));

        let shared = Arc::clone(&self.state);
        Ok(Subscription::new(move || {
            shared.lock().subscribers.remove(&id);
        }))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    State(String, u32),
    Alert(String),
    Settings(String, ButtonSettings),
    Inspector {
        action: String,
        context: String,
        payload: Value,
    },
}

#[derive(Default)]
pub struct RecordingHost {
    calls: Mutex<Vec<HostCall>>,
}

impl RecordingHost {
    /// Everything sent since the last call.
    pub fn take(&self) -> Vec<HostCall> {
        std::mem::take(&mut *self.calls.lock())
    }
}

impl HostSink for RecordingHost {
    fn set_state(&self, context: &str, state: u32) -> AppResult<()> {
        self.calls
            .lock()
            .push(HostCall::State(context.to_owned(), state));
        Ok(())
    }
    fn show_alert(&self, context: &str) -> AppResult<()> {
        self.calls.lock().push(HostCall::Alert(context.to_owned()));
        Ok(())
    }
    fn set_settings(&self, context: &str, settings: &ButtonSettings) -> AppResult<()> {
        self.calls
            .lock()
            .push(HostCall::Settings(context.to_owned(), settings.clone()));
        Ok(())
    }
    fn send_to_property_inspector(
        &self,
        action: &str,
        context: &str,
        payload: Value,
    ) -> AppResult<()> {
        self.calls.lock().push(HostCall::Inspector {
            action: action.to_owned(),
            context: context.to_owned(),
            payload,
        });
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingInjector {
    fired: Mutex<Vec<HotkeyBinding>>,
}

impl RecordingInjector {
    pub fn fired(&self) -> Vec<HotkeyBinding> {
        self.fired.lock().clone()
    }
}

impl HotkeyInjector for RecordingInjector {
    fn inject(&self, hotkey: &HotkeyBinding) {
        self.fired.lock().push(hotkey.clone());
    }
}

pub struct Harness {
    pub audio: Arc<MockAudio>,
    pub host: Arc<RecordingHost>,
    pub hotkeys: Arc<RecordingInjector>,
    pub registry: Arc<Registry>,
}

impl Harness {
    pub fn new(devices: impl IntoIterator<Item = DeviceInfo>) -> Self {
        let audio = Arc::new(MockAudio::with_devices(devices));
        let host = Arc::new(RecordingHost::default());
        let hotkeys = Arc::new(RecordingInjector::default());
        let registry = Arc::new(Registry::new(
            audio.clone(),
            host.clone(),
            hotkeys.clone(),
        ));
        Self {
            audio,
            host,
            hotkeys,
            registry,
        }
    }
}
