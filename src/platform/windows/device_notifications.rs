// "Inspired" by https://github.com/fmsyt/output-switcher/blob/1528d44747793ab4e42d23761e021976a3113d98/src-tauri/src/ipc/audio/notifier.rs#L25

use std::fmt::Debug;

use tracing::*;
use windows::{
    core::{implement, PCWSTR},
    Win32::{
        Foundation::{ERROR_INVALID_DATA, WIN32_ERROR},
        Media::Audio::{
            eCapture, eCommunications, eConsole, eRender, EDataFlow, ERole, IMMDeviceEnumerator,
            IMMNotificationClient, IMMNotificationClient_Impl, DEVICE_STATE,
        },
        UI::Shell::PropertiesSystem::PROPERTYKEY,
    },
};

use crate::{
    devices::{DeviceDirection, DeviceRole},
    errors::AppResult,
    platform::DefaultDeviceCallback,
};

use super::device_enumerator;

fn to_win_error<E: Debug>(e: E, code: WIN32_ERROR) -> windows::core::Error {
    windows::core::Error::new::<String>(code.to_hresult(), format!("{:?}", e).into())
}

fn direction_of(flow: EDataFlow) -> Option<DeviceDirection> {
    if flow == eRender {
        Some(DeviceDirection::Output)
    } else if flow == eCapture {
        Some(DeviceDirection::Input)
    } else {
        None
    }
}

/// Multimedia always follows Console when we're the ones setting it, so
/// only the Console notification is passed along.
fn role_of(role: ERole) -> Option<DeviceRole> {
    if role == eConsole {
        Some(DeviceRole::Default)
    } else if role == eCommunications {
        Some(DeviceRole::Communication)
    } else {
        None
    }
}

#[implement(IMMNotificationClient)]
struct DefaultDeviceListener(DefaultDeviceCallback);

impl IMMNotificationClient_Impl for DefaultDeviceListener {
    fn OnDeviceStateChanged(
        &self,
        _pwstrdeviceid: &PCWSTR,
        _dwnewstate: DEVICE_STATE,
    ) -> windows::core::Result<()> {
        Ok(())
    }

    fn OnDeviceAdded(&self, _pwstrdeviceid: &PCWSTR) -> windows::core::Result<()> {
        Ok(())
    }

    fn OnDeviceRemoved(&self, _pwstrdeviceid: &PCWSTR) -> windows::core::Result<()> {
        Ok(())
    }

    fn OnDefaultDeviceChanged(
        &self,
        flow: EDataFlow,
        role: ERole,
        pwstrdefaultdeviceid: &PCWSTR,
    ) -> windows::core::Result<()> {
        let (Some(direction), Some(role)) = (direction_of(flow), role_of(role)) else {
            return Ok(());
        };
        // Null when the last device of this kind went away
        let id = if pwstrdefaultdeviceid.is_null() {
            String::new()
        } else {
            unsafe { pwstrdefaultdeviceid.to_string() }
                .map_err(|e| to_win_error(e, ERROR_INVALID_DATA))?
        };
        trace!("Default {direction} {role} device changed: {id:?}");
        // Blocks on the registry lock. Windows asks for quick callbacks, but a keypress
        // holding it only does a handful of WASAPI queries.
        (self.0)(direction, role, &id);
        Ok(())
    }

    fn OnPropertyValueChanged(
        &self,
        _pwstrdeviceid: &PCWSTR,
        _key: &PROPERTYKEY,
    ) -> windows::core::Result<()> {
        Ok(())
    }
}

/// A registered notification client, unregistered on drop.
///
/// Must be dropped on the thread that registered it.
pub(crate) struct NotificationCallbacks {
    device_enumerator: IMMDeviceEnumerator,
    notification_client: IMMNotificationClient,
}

impl NotificationCallbacks {
    pub(crate) fn register(callback: DefaultDeviceCallback) -> AppResult<Self> {
        let device_enumerator = device_enumerator()?;
        let notification_client: IMMNotificationClient = DefaultDeviceListener(callback).into();
        unsafe {
            device_enumerator.RegisterEndpointNotificationCallback(&notification_client)?;
        }
        debug!("Registered for audio endpoint notifications");
        Ok(Self {
            device_enumerator,
            notification_client,
        })
    }
}

impl Drop for NotificationCallbacks {
    fn drop(&mut self) {
        let result = unsafe {
            self.device_enumerator
                .UnregisterEndpointNotificationCallback(&self.notification_client)
        };
        match result {
            Ok(()) => debug!("Unregistered from audio endpoint notifications"),
            Err(e) => error!("Failed to unregister audio endpoint notifications: {e}"),
        }
    }
}
