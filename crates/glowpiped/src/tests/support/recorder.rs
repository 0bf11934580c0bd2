//! Records device commands and client churn in arrival order.

use std::sync::Mutex;

use glowpipe_protocol::Rgb;

use crate::device::DeviceController;
use crate::observer::ClientObserver;
use crate::server::ClientId;

/// Observable side effects of the server.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DriverEvent {
    Connected(ClientId),
    Disconnected(ClientId),
    Colors(Vec<Rgb>),
    Brightness(f32),
}

/// Device and observer double sharing one event log.
#[derive(Debug, Default)]
pub(crate) struct Recorder {
    events: Mutex<Vec<DriverEvent>>,
}

impl Recorder {
    pub(crate) fn events(&self) -> Vec<DriverEvent> {
        self.events.lock().expect("recorder mutex poisoned").clone()
    }

    pub(crate) fn disconnected(&self) -> Vec<ClientId> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                DriverEvent::Disconnected(client) => Some(client),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn device_commands(&self) -> Vec<DriverEvent> {
        self.events()
            .into_iter()
            .filter(|event| matches!(event, DriverEvent::Colors(_) | DriverEvent::Brightness(_)))
            .collect()
    }

    fn record(&self, event: DriverEvent) {
        self.events
            .lock()
            .expect("recorder mutex poisoned")
            .push(event);
    }
}

impl DeviceController for Recorder {
    fn set_led_colors(&self, colors: &[Rgb]) {
        self.record(DriverEvent::Colors(colors.to_vec()));
    }

    fn set_brightness(&self, level: f32) {
        self.record(DriverEvent::Brightness(level));
    }
}

impl ClientObserver for Recorder {
    fn client_connected(&self, client: ClientId) {
        self.record(DriverEvent::Connected(client));
    }

    fn client_disconnected(&self, client: ClientId) {
        self.record(DriverEvent::Disconnected(client));
    }
}
