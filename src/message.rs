//! Conversation message model
//!
//! A message is immutable once it lands on the timeline, except for two
//! one-way marks: a choice prompt can be resolved once, and a visitor
//! message can move from `Sent` to `Read` once.

use serde::{Deserialize, Serialize};

/// Display format for `created_at` (time of day, like a phone chat bubble)
const TIME_OF_DAY_FORMAT: &str = "%H:%M";

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Bot,
    Visitor,
}

/// Delivery receipt for visitor messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryState {
    Sent,
    Read,
}

/// What a message renders as, with the fields each kind carries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageKind {
    Plain,
    Choice {
        choices: Vec<String>,
        /// Set once the prompt has been answered; the options stop being interactive
        #[serde(default)]
        resolved_choice: Option<String>,
    },
    CallToAction {
        label: String,
    },
}

/// Identity and display time assigned when a message is created.
///
/// Stamps are produced by the runtime and carried in on events so the state
/// machine never touches the clock or the id generator itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageStamp {
    pub id: String,
    pub created_at: String,
}

impl MessageStamp {
    pub fn new(id: impl Into<String>, created_at: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: created_at.into(),
        }
    }

    /// Fresh random id, local time of day
    #[must_use]
    pub fn now() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: chrono::Local::now().format(TIME_OF_DAY_FORMAT).to_string(),
        }
    }
}

/// A single timeline entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub text: String,
    pub origin: Origin,
    pub created_at: String,
    #[serde(flatten)]
    pub kind: MessageKind,
    /// Only present on visitor messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_state: Option<DeliveryState>,
}

impl Message {
    pub fn bot_plain(stamp: MessageStamp, text: impl Into<String>) -> Self {
        Self::bot(stamp, text, MessageKind::Plain)
    }

    /// Bot prompt with button options.
    ///
    /// # Panics
    ///
    /// Panics if `choices` is empty or any option is blank. A choice prompt
    /// without options is a construction bug, not visitor input.
    pub fn bot_choice(stamp: MessageStamp, text: impl Into<String>, choices: Vec<String>) -> Self {
        assert!(!choices.is_empty(), "choice message requires at least one option");
        assert!(
            choices.iter().all(|c| !c.trim().is_empty()),
            "choice message options must not be blank"
        );
        Self::bot(
            stamp,
            text,
            MessageKind::Choice {
                choices,
                resolved_choice: None,
            },
        )
    }

    /// Bot message ending the script with an outbound button.
    ///
    /// # Panics
    ///
    /// Panics if `label` is blank.
    pub fn bot_call_to_action(
        stamp: MessageStamp,
        text: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        let label = label.into();
        assert!(
            !label.trim().is_empty(),
            "call-to-action message requires a label"
        );
        Self::bot(stamp, text, MessageKind::CallToAction { label })
    }

    pub fn visitor(stamp: MessageStamp, text: impl Into<String>) -> Self {
        Self {
            id: stamp.id,
            text: text.into(),
            origin: Origin::Visitor,
            created_at: stamp.created_at,
            kind: MessageKind::Plain,
            delivery_state: Some(DeliveryState::Sent),
        }
    }

    fn bot(stamp: MessageStamp, text: impl Into<String>, kind: MessageKind) -> Self {
        Self {
            id: stamp.id,
            text: text.into(),
            origin: Origin::Bot,
            created_at: stamp.created_at,
            kind,
            delivery_state: None,
        }
    }

    /// True for a choice prompt that has not been answered yet
    pub fn is_unresolved_choice(&self) -> bool {
        matches!(
            self.kind,
            MessageKind::Choice {
                resolved_choice: None,
                ..
            }
        )
    }

    /// Options of a choice prompt, empty for any other kind
    pub fn choices(&self) -> &[String] {
        match &self.kind {
            MessageKind::Choice { choices, .. } => choices,
            _ => &[],
        }
    }

    pub fn resolved_choice(&self) -> Option<&str> {
        match &self.kind {
            MessageKind::Choice {
                resolved_choice, ..
            } => resolved_choice.as_deref(),
            _ => None,
        }
    }

    pub fn call_to_action_label(&self) -> Option<&str> {
        match &self.kind {
            MessageKind::CallToAction { label } => Some(label),
            _ => None,
        }
    }

    /// Record the answer to an open choice prompt.
    ///
    /// Returns false (and changes nothing) if this is not a choice prompt or
    /// it was already resolved.
    pub fn resolve_choice(&mut self, answer: impl Into<String>) -> bool {
        match &mut self.kind {
            MessageKind::Choice {
                resolved_choice: slot @ None,
                ..
            } => {
                *slot = Some(answer.into());
                true
            }
            _ => false,
        }
    }

    /// Advance the read receipt. Never regresses; no-op on bot messages.
    pub fn mark_read(&mut self) -> bool {
        match self.delivery_state {
            Some(DeliveryState::Sent) => {
                self.delivery_state = Some(DeliveryState::Read);
                true
            }
            _ => false,
        }
    }
}
