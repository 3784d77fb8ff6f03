// MIT License - Copyright (c) 2026 Peter Wright
// Controller events

use crate::status::StatusSnapshot;

/// All events that can be emitted by the controller.
///
/// Users subscribe via `controller.subscribe()` to receive a
/// `tokio::sync::broadcast::Receiver<ControllerEvent>`.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    /// Metadata fetched and first status refresh done
    Initialized,
    /// Emitted after every status refresh
    StatusChanged(StatusSnapshot),
    /// Rain sensor set point crossed
    RainSensorChanged { set_point_reached: bool },
    /// Zone enabled or disabled by the user
    ZoneEnableChanged { zone: u8, enabled: bool },
    /// A program became the current program
    ProgramStarted { program: String },
    /// The previous program is no longer current
    ProgramCompleted { program: String },
}

/// Type alias for the broadcast sender.
pub type EventSender = tokio::sync::broadcast::Sender<ControllerEvent>;

/// Type alias for the broadcast receiver.
pub type EventReceiver = tokio::sync::broadcast::Receiver<ControllerEvent>;

/// Create a new event channel with the given capacity.
pub fn event_channel(capacity: usize) -> (EventSender, EventReceiver) {
    tokio::sync::broadcast::channel(capacity)
}
