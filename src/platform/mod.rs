use std::sync::Arc;

use crate::{
    buttons::HotkeyBinding,
    devices::{DeviceDirection, DeviceInventory, DeviceRole, DeviceState},
    errors::AppResult,
};

#[cfg(target_os = "windows")]
mod windows;
#[cfg(target_os = "windows")]
pub use self::windows::{AudioNightmare, SendInputInjector};

/// Called with the direction, role and identifier of the new default device.
///
/// May be invoked from any thread.
pub type DefaultDeviceCallback = Box<dyn Fn(DeviceDirection, DeviceRole, &str) + Send + Sync>;

/// Everything the button logic needs to know about, and do to, the system's audio devices.
pub trait AudioBackend: Send + Sync {
    /// Devices of `direction` currently known to the system, keyed by identifier.
    fn list_devices(&self, direction: DeviceDirection) -> AppResult<DeviceInventory>;
    fn device_connection_state(&self, id: &str) -> AppResult<DeviceState>;
    fn default_device_id(&self, direction: DeviceDirection, role: DeviceRole)
        -> AppResult<String>;
    fn set_default_device_id(
        &self,
        direction: DeviceDirection,
        role: DeviceRole,
        id: &str,
    ) -> AppResult<()>;
    /// Stays subscribed until the returned [`Subscription`] is dropped or unsubscribed.
    fn subscribe_default_device_changed(
        &self,
        callback: DefaultDeviceCallback,
    ) -> AppResult<Subscription>;
}

/// Sends a key chord to whatever has focus. Best effort, failures are only logged.
pub trait HotkeyInjector: Send + Sync {
    fn inject(&self, hotkey: &HotkeyBinding);
}

/// Handle for a registered callback, cancelled on drop.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }
    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }
    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

pub type NativeCollaborators = (Arc<dyn AudioBackend>, Arc<dyn HotkeyInjector>);

#[cfg(target_os = "windows")]
pub fn native_collaborators() -> AppResult<NativeCollaborators> {
    let audio = AudioNightmare::build()?;
    Ok((Arc::new(audio), Arc::new(SendInputInjector)))
}

#[cfg(not(target_os = "windows"))]
pub fn native_collaborators() -> AppResult<NativeCollaborators> {
    Err(crate::errors::SwitcherError::UnsupportedPlatform)
}
