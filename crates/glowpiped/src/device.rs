//! Sink for decoded lighting commands.

use std::sync::Arc;

use glowpipe_protocol::Rgb;

const DEVICE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::device");

/// Consumer of colour and brightness commands received from clients.
///
/// Implementations are called from the server's control thread and must not
/// block for long; a slow device stalls every connection.
#[cfg_attr(test, mockall::automock)]
pub trait DeviceController: Send + Sync {
    /// Applies one colour per LED, in order.
    fn set_led_colors(&self, colors: &[Rgb]);

    /// Applies a brightness level, nominally in `[0, 1]`.
    fn set_brightness(&self, level: f32);
}

impl<T> DeviceController for Arc<T>
where
    T: DeviceController + ?Sized,
{
    fn set_led_colors(&self, colors: &[Rgb]) {
        (**self).set_led_colors(colors);
    }

    fn set_brightness(&self, level: f32) {
        (**self).set_brightness(level);
    }
}

/// Controller that records each command as a structured event.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingDeviceController;

impl LoggingDeviceController {
    /// Builds a new controller.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl DeviceController for LoggingDeviceController {
    fn set_led_colors(&self, colors: &[Rgb]) {
        tracing::info!(
            target: DEVICE_TARGET,
            event = "set_led_colors",
            count = colors.len(),
            first = ?colors.first().map(ToString::to_string),
            "applying LED colours"
        );
    }

    fn set_brightness(&self, level: f32) {
        tracing::info!(
            target: DEVICE_TARGET,
            event = "set_brightness",
            level,
            "applying brightness"
        );
    }
}
