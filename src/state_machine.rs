//! Conversation flow state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions: the
//! runtime feeds events in and executes the effects that come out.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::{Effect, Payload, SoundCue, Timer};
pub use event::Event;
pub use state::{ConversationState, FlowContext, Phase, Snapshot, Timing};
pub use transition::{
    transition, TransitionError, TransitionResult, CONVERSION_COMPLETED, FORM_START, NAME_PROVIDED,
    PAGE_VIEW, QUESTION_ANSWERED, WHATSAPP_CLICK,
};
