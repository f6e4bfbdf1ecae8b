//! Effects produced by state transitions

use super::event::Event;
use crate::message::MessageStamp;
use serde_json::{Map, Value};
use std::time::Duration;

/// Key/value payload attached to an analytics event
pub type Payload = Map<String, Value>;

/// Timers the state machine asks the runtime to arm
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Timer {
    /// End of a typing phase; the pending bot message gets appended
    Typing,
    /// End of the gap between two opening messages
    Pause,
    /// Visitor message flips to read
    ReadReceipt { message_id: String },
}

impl Timer {
    /// Turn a fired timer back into an event, stamping any message it creates
    pub fn into_event(self, stamp: MessageStamp) -> Event {
        match self {
            Timer::Typing => Event::TypingElapsed { stamp },
            Timer::Pause => Event::PauseElapsed,
            Timer::ReadReceipt { message_id } => Event::ReadReceiptDue { message_id },
        }
    }
}

/// Notification sounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundCue {
    Sent,
    Received,
}

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Arm a one-shot timer
    Schedule { delay: Duration, timer: Timer },

    /// Fire an analytics event (best effort)
    Emit { name: String, payload: Payload },

    /// Play a notification sound
    PlaySound(SoundCue),

    /// Ask the surface to open the outbound link
    HandOff,

    /// Drop every pending timer
    CancelTimers,
}

impl Effect {
    pub fn schedule(delay: Duration, timer: Timer) -> Self {
        Effect::Schedule { delay, timer }
    }

    pub fn emit(name: impl Into<String>) -> Self {
        Effect::Emit {
            name: name.into(),
            payload: Payload::new(),
        }
    }

    pub fn emit_with<K, V>(name: impl Into<String>, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Effect::Emit {
            name: name.into(),
            payload: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn event_name(&self) -> Option<&str> {
        match self {
            Effect::Emit { name, .. } => Some(name),
            _ => None,
        }
    }
}
