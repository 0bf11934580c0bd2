//! Routes decoded frames to their handlers.
//!
//! Each frame produces at most one reply for the connection it arrived on.
//! Frames that carry server-to-client types, or codes this build does not
//! know, are logged and dropped without disturbing the connection.

use tracing::{debug, warn};

use glowpipe_protocol::{Frame, Message, MessageType, StatusReport, decode_brightness, decode_colors};

use crate::device::DeviceController;
use crate::server::ClientId;

const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Server-side view handed to handlers.
pub(crate) struct DispatchContext<'a> {
    pub(crate) client: ClientId,
    pub(crate) device: &'a dyn DeviceController,
    pub(crate) connected_clients: usize,
}

/// Handles one frame and returns the reply, if the type has one.
pub(crate) fn dispatch(context: &DispatchContext<'_>, frame: &Frame) -> Option<Message> {
    let client = context.client;
    let Some(kind) = frame.message_type() else {
        warn!(
            target: DISPATCH_TARGET,
            %client,
            type_code = frame.type_code(),
            payload_len = frame.payload().len(),
            "ignoring unknown message type"
        );
        return None;
    };
    debug!(
        target: DISPATCH_TARGET,
        %client,
        message = %kind,
        payload_len = frame.payload().len(),
        "dispatching frame"
    );

    match kind {
        MessageType::Ping => Some(Message::Pong),
        MessageType::SetLedColors => {
            let colors = decode_colors(frame.payload());
            context.device.set_led_colors(&colors);
            None
        }
        MessageType::SetBrightness => {
            match decode_brightness(frame.payload()) {
                Some(level) => context.device.set_brightness(level),
                None => debug!(
                    target: DISPATCH_TARGET,
                    %client,
                    payload_len = frame.payload().len(),
                    "brightness payload too short; ignored"
                ),
            }
            None
        }
        MessageType::GetStatus => Some(Message::StatusResponse(StatusReport::ok(
            context.connected_clients,
        ))),
        MessageType::Pong | MessageType::StatusResponse => {
            warn!(
                target: DISPATCH_TARGET,
                %client,
                message = %kind,
                "ignoring reply-only message sent by a client"
            );
            None
        }
    }
}
