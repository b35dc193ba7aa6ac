use std::sync::{Arc, Weak};

use tracing::*;

use crate::{
    buttons::Registry,
    errors::AppResult,
    platform::{AudioBackend, Subscription},
};

/// Keeps the registry told about default device changes for as long as it lives.
///
/// The callback only holds a weak reference, so a registry that's been dropped just
/// stops receiving updates instead of being kept alive by the platform.
#[derive(Debug)]
pub struct NotificationBridge {
    subscription: Option<Subscription>,
}

impl NotificationBridge {
    pub fn attach(audio: &dyn AudioBackend, registry: &Arc<Registry>) -> AppResult<Self> {
        let registry: Weak<Registry> = Arc::downgrade(registry);
        let subscription = audio.subscribe_default_device_changed(Box::new(
            move |direction, role, device_id: &str| match registry.upgrade() {
                Some(registry) => registry.on_default_device_changed(direction, role, device_id),
                None => trace!("Registry gone, dropping {direction} {role} notification"),
            },
        ))?;
        debug!("Listening for default device changes");
        Ok(Self {
            subscription: Some(subscription),
        })
    }
    pub fn is_attached(&self) -> bool {
        self.subscription.is_some()
    }
    /// Stops notifications. Also happens on drop.
    pub fn detach(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            debug!("No longer listening for default device changes");
            subscription.unsubscribe();
        }
    }
}

impl Drop for NotificationBridge {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        buttons::ActionKind,
        devices::{DeviceDirection, DeviceRole},
        test_support::{output_device, Harness, HostCall},
    };

    fn harness_with_button() -> Harness {
        let harness = Harness::new([
            output_device("a", "USB Audio", "Speakers"),
            output_device("b", "Headset", "Headphones"),
        ]);
        harness
            .audio
            .set_default(DeviceDirection::Output, DeviceRole::Default, "a");
        harness.registry.on_will_appear(
            ActionKind::Toggle,
            "ctx",
            Some(&json!({
                "direction": "output",
                "primary": {"id": "a", "displayName": "Speakers"},
                "secondary": {"id": "b", "displayName": "Headphones"},
            })),
        );
        harness.host.take();
        harness
    }

    #[test]
    fn forwards_notifications_until_detached() {
        let harness = harness_with_button();
        let mut bridge = NotificationBridge::attach(&*harness.audio, &harness.registry).unwrap();
        assert!(bridge.is_attached());
        assert_eq!(harness.audio.subscriber_count(), 1);

        harness
            .audio
            .notify_default_changed(DeviceDirection::Output, DeviceRole::Default, "b");
        assert_eq!(harness.host.take(), [HostCall::State("ctx".into(), 1)]);

        bridge.detach();
        assert!(!bridge.is_attached());
        assert_eq!(harness.audio.subscriber_count(), 0);
        harness
            .audio
            .notify_default_changed(DeviceDirection::Output, DeviceRole::Default, "a");
        assert!(harness.host.take().is_empty());

        // Detaching twice is harmless
        bridge.detach();
    }

    #[test]
    fn dropping_unsubscribes() {
        let harness = harness_with_button();
        let bridge = NotificationBridge::attach(&*harness.audio, &harness.registry).unwrap();
        drop(bridge);
        assert_eq!(harness.audio.subscriber_count(), 0);
    }

    #[test]
    fn outliving_the_registry_is_harmless() {
        let Harness {
            audio,
            host,
            registry,
            ..
        } = harness_with_button();
        let _bridge = NotificationBridge::attach(&*audio, &registry).unwrap();
        drop(registry);

        audio.notify_default_changed(DeviceDirection::Output, DeviceRole::Default, "b");
        assert!(host.take().is_empty());
    }
}
