//! Conversation state types

use crate::message::Message;
use crate::script::{Script, ScriptError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Where the conversation is between visitor inputs and timer firings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Phase {
    /// Surface mounted, `start()` not called yet
    #[default]
    NotStarted,

    /// Delivering the opening messages
    Opening {
        /// Index of the next opening message to append
        next: usize,
        /// True while the typing indicator is up, false during the gap
        /// between two opening messages
        typing: bool,
    },

    /// Waiting for the visitor to answer
    AwaitingVisitor,

    /// Bot is typing the reply for script step `step`
    Composing { step: usize },

    /// Call to action delivered; nothing left to answer
    Completed,

    /// Surface unmounted; every further input and timer is dropped
    TornDown,
}

/// Per-session conversation state. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    pub timeline: Vec<Message>,
    /// Cursor into the script; one increment per accepted visitor answer
    pub step: usize,
    pub visitor_name: String,
    pub phase: Phase,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bot-is-typing flag shown by the surface
    pub fn is_composing(&self) -> bool {
        matches!(
            self.phase,
            Phase::Opening { typing: true, .. } | Phase::Composing { .. }
        )
    }

    /// Whether the visitor is currently blocked from answering
    pub fn input_locked(&self) -> bool {
        !matches!(self.phase, Phase::AwaitingVisitor)
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.phase, Phase::Completed)
    }

    /// The most recent choice prompt still waiting for an answer
    pub fn pending_choice(&self) -> Option<&Message> {
        self.timeline.iter().rev().find(|m| m.is_unresolved_choice())
    }

    pub(crate) fn pending_choice_mut(&mut self) -> Option<&mut Message> {
        self.timeline
            .iter_mut()
            .rev()
            .find(|m| m.is_unresolved_choice())
    }

    pub fn message(&self, id: &str) -> Option<&Message> {
        self.timeline.iter().find(|m| m.id == id)
    }

    pub(crate) fn message_mut(&mut self, id: &str) -> Option<&mut Message> {
        self.timeline.iter_mut().find(|m| m.id == id)
    }

    /// Count of choice prompts without a recorded answer
    pub fn unresolved_choice_count(&self) -> usize {
        self.timeline
            .iter()
            .filter(|m| m.is_unresolved_choice())
            .count()
    }

    /// Read-only view handed to the presentation surface
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            timeline: self.timeline.clone(),
            is_composing: self.is_composing(),
            input_locked: self.input_locked(),
            step: self.step,
        }
    }
}

/// Fixed delays used to simulate a human on the other side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub typing: Duration,
    pub opening_pause: Duration,
    pub read_receipt: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            typing: Duration::from_millis(1500),
            opening_pause: Duration::from_millis(500),
            read_receipt: Duration::from_millis(1000),
        }
    }
}

/// Immutable inputs to every transition
#[derive(Debug, Clone)]
pub struct FlowContext {
    pub script: Arc<Script>,
    pub timing: Timing,
}

impl FlowContext {
    /// # Panics
    ///
    /// Panics if the script fails [`Script::validate`].
    pub fn new(script: Arc<Script>, timing: Timing) -> Self {
        match Self::try_new(script, timing) {
            Ok(context) => context,
            Err(e) => panic!("Invalid conversation script: {e}"),
        }
    }

    pub fn try_new(script: Arc<Script>, timing: Timing) -> Result<Self, ScriptError> {
        script.validate()?;
        Ok(Self { script, timing })
    }
}

/// What the surface re-renders from after every mutation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub timeline: Vec<Message>,
    pub is_composing: bool,
    pub input_locked: bool,
    pub step: usize,
}

impl Snapshot {
    /// Options the surface should render as buttons, if any
    pub fn pending_choices(&self) -> &[String] {
        self.timeline
            .iter()
            .rev()
            .find(|m| m.is_unresolved_choice())
            .map_or(&[], |m| m.choices())
    }
}
