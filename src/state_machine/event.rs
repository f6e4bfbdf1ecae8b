//! Events that drive the conversation

use crate::message::MessageStamp;

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // Surface events
    Start,
    SubmitText {
        text: String,
        stamp: MessageStamp,
    },
    SubmitChoice {
        label: String,
        stamp: MessageStamp,
    },
    ActivateCallToAction,
    Teardown,

    // Timer events
    TypingElapsed {
        stamp: MessageStamp,
    },
    PauseElapsed,
    ReadReceiptDue {
        message_id: String,
    },
}

impl Event {
    pub fn submit_text(text: impl Into<String>) -> Self {
        Event::SubmitText {
            text: text.into(),
            stamp: MessageStamp::now(),
        }
    }

    pub fn submit_choice(label: impl Into<String>) -> Self {
        Event::SubmitChoice {
            label: label.into(),
            stamp: MessageStamp::now(),
        }
    }

    /// Short name for log fields
    pub fn name(&self) -> &'static str {
        match self {
            Event::Start => "start",
            Event::SubmitText { .. } => "submit_text",
            Event::SubmitChoice { .. } => "submit_choice",
            Event::ActivateCallToAction => "activate_call_to_action",
            Event::Teardown => "teardown",
            Event::TypingElapsed { .. } => "typing_elapsed",
            Event::PauseElapsed => "pause_elapsed",
            Event::ReadReceiptDue { .. } => "read_receipt_due",
        }
    }
}
