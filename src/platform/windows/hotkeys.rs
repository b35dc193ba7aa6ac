use std::mem::size_of;

use tracing::*;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, VkKeyScanW, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYBD_EVENT_FLAGS,
    KEYEVENTF_KEYUP, VIRTUAL_KEY, VK_CONTROL, VK_ESCAPE, VK_F1, VK_LWIN, VK_MENU, VK_RETURN,
    VK_SHIFT, VK_SPACE, VK_TAB,
};

use crate::{
    buttons::{HotkeyBinding, HotkeyKey},
    platform::HotkeyInjector,
};

/// Presses hotkeys with `SendInput`, as if they were typed on the keyboard.
#[derive(Debug, Clone, Copy, Default)]
pub struct SendInputInjector;

fn virtual_key(key: HotkeyKey) -> Option<VIRTUAL_KEY> {
    match key {
        HotkeyKey::Character(c) => {
            let unit = u16::try_from(u32::from(c)).ok()?;
            let scan = unsafe { VkKeyScanW(unit) };
            // Low byte is the key, high byte the shift state it'd need
            (scan != -1).then(|| VIRTUAL_KEY((scan as u16) & 0xff))
        }
        HotkeyKey::Function(n) => Some(VIRTUAL_KEY(VK_F1.0 + u16::from(n) - 1)),
        HotkeyKey::Space => Some(VK_SPACE),
        HotkeyKey::Enter => Some(VK_RETURN),
        HotkeyKey::Escape => Some(VK_ESCAPE),
        HotkeyKey::Tab => Some(VK_TAB),
    }
}

fn key_event(key: VIRTUAL_KEY, flags: KEYBD_EVENT_FLAGS) -> INPUT {
    INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: key,
                wScan: 0,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

impl HotkeyInjector for SendInputInjector {
    fn inject(&self, hotkey: &HotkeyBinding) {
        let key = match hotkey.key() {
            Ok(key) => key,
            Err(e) => {
                warn!("Not sending hotkey: {e}");
                return;
            }
        };
        let Some(key) = virtual_key(key) else {
            warn!("No virtual key for {:?}", hotkey.key_code);
            return;
        };

        let modifiers: Vec<VIRTUAL_KEY> = [
            (hotkey.ctrl, VK_CONTROL),
            (hotkey.alt, VK_MENU),
            (hotkey.shift, VK_SHIFT),
            (hotkey.meta, VK_LWIN),
        ]
        .into_iter()
        .filter_map(|(held, vk)| held.then_some(vk))
        .collect();

        let press = KEYBD_EVENT_FLAGS(0);
        let mut inputs: Vec<INPUT> = modifiers.iter().map(|m| key_event(*m, press)).collect();
        inputs.push(key_event(key, press));
        inputs.push(key_event(key, KEYEVENTF_KEYUP));
        inputs.extend(modifiers.iter().rev().map(|m| key_event(*m, KEYEVENTF_KEYUP)));

        let sent = unsafe { SendInput(&inputs, size_of::<INPUT>() as i32) };
        if sent as usize != inputs.len() {
            error!(
                "SendInput only sent {sent} of {} events: {}",
                inputs.len(),
                windows::core::Error::from_win32()
            );
        }
    }
}
