use std::{
    ops::ControlFlow,
    sync::{
        mpsc::{self, Receiver, Sender},
        Arc,
    },
    thread::JoinHandle,
};

use tracing::*;

use crate::{
    args::{LaunchArgs, ListSubcommand},
    bridge::NotificationBridge,
    buttons::{ActionKind, Registry},
    devices::{DeviceDirection, DeviceInventory, DeviceReference, DeviceState},
    errors::AppResult,
    host::{self, ActionEvent, HostEvent, HostSink, PropertyInspectorEvent},
    platform::{native_collaborators, AudioBackend, HotkeyInjector},
};

#[derive(Debug)]
pub enum CustomEvent {
    /// Something the Stream Deck application sent us
    Host(HostEvent),
    HostDisconnected,
    ExitRequested,
}

pub struct App {
    pub registry: Arc<Registry>,
    bridge: NotificationBridge,
    events: Receiver<CustomEvent>,
    host_pump_handle: JoinHandle<AppResult<()>>,
}

impl App {
    /// Connects to the Stream Deck application and starts following default devices.
    ///
    /// `events` must be the receiving end of `event_tx`, which also goes to anything
    /// else that wants to reach the event loop (like the Ctrl+C handler).
    pub fn build(
        launch: &LaunchArgs,
        event_tx: Sender<CustomEvent>,
        events: Receiver<CustomEvent>,
    ) -> AppResult<Self> {
        let (audio, hotkeys) = native_collaborators()?;
        let (outbound, host_pump_handle) = host::connect(launch, event_tx)?;
        Self::with_collaborators(
            audio,
            Arc::new(outbound),
            hotkeys,
            events,
            host_pump_handle,
        )
    }
    fn with_collaborators(
        audio: Arc<dyn AudioBackend>,
        host: Arc<dyn HostSink>,
        hotkeys: Arc<dyn HotkeyInjector>,
        events: Receiver<CustomEvent>,
        host_pump_handle: JoinHandle<AppResult<()>>,
    ) -> AppResult<Self> {
        let registry = Arc::new(Registry::new(Arc::clone(&audio), host, hotkeys));
        let bridge = NotificationBridge::attach(audio.as_ref(), &registry)?;
        Ok(Self {
            registry,
            bridge,
            events,
            host_pump_handle,
        })
    }
    pub fn run(self) -> AppResult<()> {
        info!("Plugin running");
        while let Ok(event) = self.events.recv() {
            if self.handle_custom_event(event).is_break() {
                break;
            }
        }
        self.shutdown()
    }
    /// Handle our defined `CustomEvent`s coming in from the host connection and signal handlers
    pub fn handle_custom_event(&self, event: CustomEvent) -> ControlFlow<()> {
        use CustomEvent::*;
        match event {
            Host(event) => {
                self.handle_host_event(event);
                ControlFlow::Continue(())
            }
            HostDisconnected => {
                info!("Stream Deck went away, exiting");
                ControlFlow::Break(())
            }
            ExitRequested => ControlFlow::Break(()),
        }
    }
    fn handle_host_event(&self, event: HostEvent) {
        use HostEvent::*;
        match event {
            KeyDown(ActionEvent {
                context, payload, ..
            }) => self.registry.on_key_down(&context, payload.state),
            KeyUp(ActionEvent {
                action,
                context,
                payload,
                ..
            }) => self.registry.on_key_up(
                ActionKind::from_action_id(&action),
                &context,
                payload.settings.as_ref(),
                payload.state,
            ),
            WillAppear(ActionEvent {
                action,
                context,
                payload,
                ..
            }) => self.registry.on_will_appear(
                ActionKind::from_action_id(&action),
                &context,
                payload.settings.as_ref(),
            ),
            WillDisappear(ActionEvent { context, .. }) => {
                self.registry.on_will_disappear(&context)
            }
            DidReceiveSettings(ActionEvent {
                action,
                context,
                payload,
                ..
            }) => self.registry.on_settings_changed(
                ActionKind::from_action_id(&action),
                &context,
                payload.settings.as_ref(),
            ),
            SendToPlugin(PropertyInspectorEvent {
                action,
                context,
                payload,
            }) => self.registry.on_send_to_plugin(&action, &context, &payload),
            Unknown => (),
        }
    }
    fn shutdown(mut self) -> AppResult<()> {
        self.bridge.detach();
        // Dropping the registry drops our end of the outbound queue,
        // which is the pump's cue to close the socket.
        let Self {
            registry,
            host_pump_handle,
            ..
        } = self;
        drop(registry);
        match host_pump_handle.join() {
            Ok(result) => result,
            Err(_) => {
                error!("Host connection thread panicked");
                Ok(())
            }
        }
    }
}

/// Prints what [`AudioBackend::list_devices`] sees, for the `list` subcommand.
pub fn print_devices(audio: &dyn AudioBackend, categories: ListSubcommand) -> AppResult<()> {
    let (playback, recording) = {
        // If neither specified, do both
        if !categories.playback && !categories.recording {
            (true, true)
        } else {
            (categories.playback, categories.recording)
        }
    };
    let playback_devices = if playback {
        audio.list_devices(DeviceDirection::Output)?
    } else {
        DeviceInventory::new()
    };
    let recording_devices = if recording {
        audio.list_devices(DeviceDirection::Input)?
    } else {
        DeviceInventory::new()
    };
    let output = if categories.settings_format {
        settings_format(&playback_devices, &recording_devices, playback, recording)?
    } else {
        human_readable(&playback_devices, &recording_devices, playback, recording)
    };
    print!("{output}");
    Ok(())
}

fn settings_format(
    playback_devices: &DeviceInventory,
    recording_devices: &DeviceInventory,
    playback: bool,
    recording: bool,
) -> AppResult<String> {
    let mut output = String::new();
    if playback {
        output.push_str("Playback devices: \n");
        for device in playback_devices.values() {
            output.push_str(&serde_json::to_string(&DeviceReference::from(device))?);
            output.push('\n');
        }
    }
    if recording {
        if playback {
            output.push_str("----------\n");
        }
        output.push_str("Recording devices: \n");
        for device in recording_devices.values() {
            output.push_str(&serde_json::to_string(&DeviceReference::from(device))?);
            output.push('\n');
        }
    }
    Ok(output)
}

fn human_readable(
    playback_devices: &DeviceInventory,
    recording_devices: &DeviceInventory,
    playback: bool,
    recording: bool,
) -> String {
    let max_len = playback_devices
        .values()
        .chain(recording_devices.values())
        .map(|device| device.display_name.len())
        .max()
        .unwrap_or(0);

    let mut output = String::new();
    let mut section = |title: &str, devices: &DeviceInventory| {
        output.push_str(title);
        output.push('\n');
        for device in devices.values() {
            output.push_str(&format!(
                "{:<width$} - {}",
                device.display_name,
                device.id,
                width = max_len
            ));
            if device.state != DeviceState::Connected {
                output.push_str(&format!(" ({})", device.state));
            }
            output.push('\n');
        }
    };
    if playback {
        section("Playback devices: ", playback_devices);
    }
    if recording {
        if playback {
            section("----------", &DeviceInventory::new());
        }
        section("Recording devices: ", recording_devices);
    }
    output
}

/// Channel every [`CustomEvent`] travels through.
pub fn event_channel() -> (Sender<CustomEvent>, Receiver<CustomEvent>) {
    mpsc::channel()
}
