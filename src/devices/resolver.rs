//! Mapping stored device references onto devices that are attached right now.
//!
//! Windows re-enumerates some devices (usually USB audio interfaces moved between ports)
//! under a new identifier, and prefixes their interface name with a counter, turning
//! `"USB Audio"` into `"2- USB Audio"`. The interface/endpoint name pair survives that,
//! so [`MatchStrategy::FuzzyName`] falls back to it when the stored identifier is gone.

use std::sync::OnceLock;

use regex_lite::Regex;
use tracing::*;

use crate::buttons::MatchStrategy;

use super::{DeviceInventory, DeviceReference, DeviceState};

fn interface_prefix() -> &'static Regex {
    static PREFIX: OnceLock<Regex> = OnceLock::new();
    // An optional run of digits, a dash and a space at the very start,
    // then at least one character of the actual name.
    PREFIX.get_or_init(|| Regex::new(r"^(?:[0-9]+- )?(.+)$").expect("Regex failed to build"))
}

/// Strips the numeric prefix Windows adds to re-enumerated interfaces.
///
/// `"3- Headset Mic"` becomes `"Headset Mic"`, anything without the prefix is returned as is.
pub fn normalize_interface_name(name: &str) -> &str {
    match interface_prefix().captures(name).and_then(|c| c.get(1)) {
        Some(rest) => rest.as_str(),
        None => name,
    }
}

/// Returns the identifier that should currently be treated as `reference`.
///
/// `inventory` should hold the devices of the button's direction. Falls back to the
/// stored identifier when nothing better is found, which may well be stale.
pub fn resolve_volatile_id(
    reference: &DeviceReference,
    strategy: MatchStrategy,
    inventory: &DeviceInventory,
) -> String {
    if reference.id.is_empty() {
        return String::new();
    }

    if strategy == MatchStrategy::ExactIdentifier {
        return reference.id.clone();
    }

    let still_connected = inventory
        .get(&reference.id)
        .is_some_and(|device| device.state == DeviceState::Connected);
    if still_connected {
        return reference.id.clone();
    }

    let wanted_interface = normalize_interface_name(&reference.interface_name);
    debug!(
        "Looking for a fuzzy match: {} -> {wanted_interface}",
        reference.interface_name
    );

    let found = inventory
        .values()
        .filter(|device| device.state == DeviceState::Connected)
        .find(|device| {
            let interface = normalize_interface_name(&device.interface_name);
            trace!("Trying {} -> {interface}", device.interface_name);
            interface == wanted_interface && device.endpoint_name == reference.endpoint_name
        });

    match found {
        Some(device) => {
            debug!(
                "Fuzzy device match for {}/{}: {}",
                reference.interface_name, reference.endpoint_name, device.id
            );
            device.id.clone()
        }
        None => {
            debug!(
                "Failed fuzzy match for {}/{}",
                reference.interface_name, reference.endpoint_name
            );
            reference.id.clone()
        }
    }
}

/// Fills in a reference that only carries an identifier from the live inventory.
///
/// Returns `true` if `reference` was replaced. A reference that already has a display
/// name is never touched.
pub fn fill_device_info(reference: &mut DeviceReference, inventory: &DeviceInventory) -> bool {
    if reference.id.is_empty() || !reference.display_name.is_empty() {
        return false;
    }
    match inventory.get(&reference.id) {
        Some(device) => {
            *reference = DeviceReference::from(device);
            true
        }
        None => false,
    }
}
