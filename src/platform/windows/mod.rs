use std::{
    cell::Cell,
    sync::mpsc,
    thread::{self},
};

use tracing::*;
use wasapi::{get_default_device_for_role, Device, Direction, Role};
use windows::{
    core::PWSTR,
    Win32::{
        Media::Audio::*,
        System::Com::{CoCreateInstance, CoInitializeEx, CLSCTX_ALL, COINIT_MULTITHREADED},
    },
};

use crate::{
    devices::{DeviceDirection, DeviceInfo, DeviceInventory, DeviceRole, DeviceState},
    errors::{AppResult, SwitcherError},
};

use device_notifications::NotificationCallbacks;
use policy_config::{IPolicyConfig, PolicyConfig};

use super::{AudioBackend, DefaultDeviceCallback, Subscription};

mod device_notifications;
mod hotkeys;
mod policy_config;

pub use hotkeys::SendInputInjector;

/// [`AudioBackend`] on top of WASAPI and the undocumented `IPolicyConfig`.
///
/// Holds no COM objects itself: they aren't safe to share between threads, and calls
/// come in from both the event loop and the notification thread. Each call creates
/// what it needs on the calling thread instead.
#[derive(Debug)]
pub struct AudioNightmare {
    _private: (),
}

impl AudioNightmare {
    pub fn build() -> AppResult<Self> {
        com_initialized()?;
        // Fail early if the policy config object can't be created at all
        let _policy_config = policy_config()?;
        Ok(Self { _private: () })
    }
}

/// Joins the multithreaded apartment on the calling thread, once.
pub(super) fn com_initialized() -> AppResult<()> {
    thread_local! {
        static COM_READY: Cell<bool> = const { Cell::new(false) };
    }
    if COM_READY.get() {
        return Ok(());
    }
    unsafe {
        CoInitializeEx(None, COINIT_MULTITHREADED).ok()?;
    }
    // Never uninitialized, the thread's COM objects may outlive any guard we'd hold.
    // https://github.com/microsoft/windows-rs/issues/1169#issuecomment-926877227
    COM_READY.set(true);
    Ok(())
}

fn device_enumerator() -> AppResult<IMMDeviceEnumerator> {
    Ok(unsafe { CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL) }?)
}

fn policy_config() -> AppResult<IPolicyConfig> {
    Ok(unsafe { CoCreateInstance(&PolicyConfig, None, CLSCTX_ALL) }?)
}

impl From<DeviceDirection> for Direction {
    fn from(value: DeviceDirection) -> Self {
        match value {
            DeviceDirection::Output => Direction::Render,
            DeviceDirection::Input => Direction::Capture,
        }
    }
}

impl From<DeviceRole> for Role {
    fn from(value: DeviceRole) -> Self {
        match value {
            DeviceRole::Default => Role::Console,
            DeviceRole::Communication => Role::Communications,
        }
    }
}

/// Windows keeps separate Console and Multimedia defaults, we treat them as one.
fn roles_to_set(role: DeviceRole) -> &'static [ERole] {
    match role {
        DeviceRole::Default => &[eConsole, eMultimedia],
        DeviceRole::Communication => &[eCommunications],
    }
}

fn connection_state(state: DEVICE_STATE) -> DeviceState {
    // https://learn.microsoft.com/en-us/windows/win32/coreaudio/device-state-xxx-constants
    match state {
        DEVICE_STATE_ACTIVE => DeviceState::Connected,
        DEVICE_STATE_DISABLED | DEVICE_STATE_NOTPRESENT | DEVICE_STATE_UNPLUGGED => {
            DeviceState::Disconnected
        }
        _ => DeviceState::Unknown,
    }
}

fn data_flow(direction: DeviceDirection) -> EDataFlow {
    match direction {
        DeviceDirection::Output => eRender,
        DeviceDirection::Input => eCapture,
    }
}

fn device_info(device: IMMDevice, direction: DeviceDirection) -> AppResult<DeviceInfo> {
    let state = connection_state(unsafe { device.GetState() }?);
    let device = Device::custom(device, direction.into());
    Ok(DeviceInfo {
        id: device.get_id()?,
        display_name: device.get_friendlyname()?,
        interface_name: device.get_interface_friendlyname()?,
        endpoint_name: device.get_description()?,
        state,
        direction,
    })
}

impl AudioBackend for AudioNightmare {
    fn list_devices(&self, direction: DeviceDirection) -> AppResult<DeviceInventory> {
        com_initialized()?;
        // Unplugged and disabled endpoints too, so they can still be picked and matched
        let enumerator = device_enumerator()?;
        let collection =
            unsafe { enumerator.EnumAudioEndpoints(data_flow(direction), DEVICE_STATEMASK_ALL) }?;
        let count = unsafe { collection.GetCount() }?;
        let mut inventory = DeviceInventory::new();
        for index in 0..count {
            let device = unsafe { collection.Item(index) }
                .map_err(SwitcherError::from)
                .and_then(|device| device_info(device, direction));
            match device {
                Ok(device) => {
                    inventory.insert(device.id.clone(), device);
                }
                // Long gone endpoints often have no readable property store left
                Err(e) => debug!("Skipping unreadable {direction} device: {e}"),
            }
        }
        Ok(inventory)
    }
    fn device_connection_state(&self, id: &str) -> AppResult<DeviceState> {
        com_initialized()?;
        let wide_id = id.to_wide();
        let device = match unsafe { device_enumerator()?.GetDevice(wide_id.as_pwstr()) } {
            Ok(device) => device,
            Err(e) => {
                debug!("Couldn't find device {id}: {e}");
                return Ok(DeviceState::Unknown);
            }
        };
        let state = unsafe { device.GetState() }?;
        Ok(connection_state(state))
    }
    fn default_device_id(
        &self,
        direction: DeviceDirection,
        role: DeviceRole,
    ) -> AppResult<String> {
        com_initialized()?;
        let device = get_default_device_for_role(&direction.into(), &role.into())?;
        Ok(device.get_id()?)
    }
    fn set_default_device_id(
        &self,
        direction: DeviceDirection,
        role: DeviceRole,
        id: &str,
    ) -> AppResult<()> {
        com_initialized()?;
        let policy_config = policy_config()?;
        let wide_id = id.to_wide();
        for erole in roles_to_set(role) {
            debug!("Setting {direction} {id} -> {erole:?}");
            unsafe { policy_config.SetDefaultEndpoint(wide_id.as_pwstr(), *erole) }?;
        }
        Ok(())
    }
    fn subscribe_default_device_changed(
        &self,
        callback: DefaultDeviceCallback,
    ) -> AppResult<Subscription> {
        let (ready_tx, ready_rx) = mpsc::channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        // The client has to be registered and unregistered on the same thread,
        // and delivery happens on threads owned by Windows regardless.
        let handle = thread::Builder::new()
            .name("audio-notifications".into())
            .spawn(move || {
                let registration =
                    com_initialized().and_then(|_| NotificationCallbacks::register(callback));
                match registration {
                    Ok(callbacks) => {
                        // If this fails, nobody's waiting on us anymore.
                        let _ = ready_tx.send(Ok(()));
                        // Returns once the subscription is dropped, either way.
                        let _ = shutdown_rx.recv();
                        drop(callbacks);
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                    }
                }
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => (),
            Ok(Err(e)) => {
                let _ = handle.join();
                return Err(e);
            }
            Err(_) => return Err(SwitcherError::NotificationThread),
        }

        Ok(Subscription::new(move || {
            let _ = shutdown_tx.send(());
            if handle.join().is_err() {
                error!("Audio notification thread panicked");
            }
        }))
    }
}

// Yoinked from https://gist.github.com/dgellow/fb85229ee8aeabf3844a5f3d38eb445d

#[derive(Default)]
pub struct WideString(pub Vec<u16>);

pub trait ToWide {
    fn to_wide(&self) -> WideString;
}

impl ToWide for &str {
    fn to_wide(&self) -> WideString {
        let mut result: Vec<u16> = self.encode_utf16().collect();
        result.push(0);
        WideString(result)
    }
}

impl WideString {
    pub fn as_pwstr(&self) -> PWSTR {
        PWSTR(self.0.as_ptr() as *mut _)
    }
}
