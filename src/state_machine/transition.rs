//! Pure state transition function
//!
//! Given the same state, context and event this always produces the same new
//! state and effects. Clock reads, id generation, timers, sounds and analytics
//! all happen in the runtime.

use super::effect::{Payload, SoundCue, Timer};
use super::state::Phase;
use super::{ConversationState, Effect, Event, FlowContext};
use crate::message::{Message, MessageStamp};
use crate::script::{interpolate, Capture, Reply, ScriptEvent, ScriptStep};
use serde_json::Value;
use thiserror::Error;

pub const PAGE_VIEW: &str = "page_view";
pub const FORM_START: &str = "form_start";
pub const NAME_PROVIDED: &str = "name_provided";
pub const QUESTION_ANSWERED: &str = "question_answered";
pub const CONVERSION_COMPLETED: &str = "conversion_completed";
pub const WHATSAPP_CLICK: &str = "whatsapp_click";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ConversationState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ConversationState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Why an event was not applied.
///
/// Most of these are ordinary rejections of visitor input or late timers and
/// are dropped silently. `is_programmer_error` marks the ones that mean the
/// caller is wired up wrong.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Conversation has not been started")]
    NotStarted,
    #[error("Conversation already started")]
    AlreadyStarted,
    #[error("Input is locked while the bot is busy")]
    InputLocked,
    #[error("Submission is empty")]
    EmptySubmission,
    #[error("Option is not offered by the pending prompt: {0}")]
    StaleChoice(String),
    #[error("No call to action to activate yet")]
    NoCallToAction,
    #[error("Conversation was torn down")]
    TornDown,
    #[error("Timer fired outside its phase: {0}")]
    UnexpectedTimer(&'static str),
    #[error("Script has no step {0}")]
    ScriptExhausted(usize),
    #[error("Script has no opening message {0}")]
    OpeningExhausted(usize),
}

impl TransitionError {
    pub fn is_programmer_error(&self) -> bool {
        matches!(
            self,
            Self::NotStarted | Self::ScriptExhausted(_) | Self::OpeningExhausted(_)
        )
    }
}

/// Pure transition function
pub fn transition(
    state: &ConversationState,
    ctx: &FlowContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (&state.phase, event) {
        // ============================================================
        // Teardown
        // ============================================================
        (Phase::TornDown, _) => Err(TransitionError::TornDown),

        (_, Event::Teardown) => {
            let mut new_state = state.clone();
            new_state.phase = Phase::TornDown;
            Ok(TransitionResult::new(new_state).with_effect(Effect::CancelTimers))
        }

        // ============================================================
        // Opening sequence
        // ============================================================
        (Phase::NotStarted, Event::Start) => {
            let mut new_state = state.clone();
            new_state.phase = Phase::Opening {
                next: 0,
                typing: true,
            };
            Ok(TransitionResult::new(new_state)
                .with_effect(Effect::emit(PAGE_VIEW))
                .with_effect(Effect::schedule(ctx.timing.typing, Timer::Typing)))
        }

        (_, Event::Start) => Err(TransitionError::AlreadyStarted),

        (Phase::Opening { next, typing: true }, Event::TypingElapsed { stamp }) => {
            let next = *next;
            let text = ctx
                .script
                .opening
                .get(next)
                .ok_or(TransitionError::OpeningExhausted(next))?;

            let mut new_state = state.clone();
            new_state.timeline.push(Message::bot_plain(stamp, text.clone()));
            let result = TransitionResult::new(new_state)
                .with_effect(Effect::PlaySound(SoundCue::Received));

            if next + 1 < ctx.script.opening.len() {
                let mut result = result
                    .with_effect(Effect::schedule(ctx.timing.opening_pause, Timer::Pause));
                result.new_state.phase = Phase::Opening {
                    next: next + 1,
                    typing: false,
                };
                Ok(result)
            } else {
                let mut result = result.with_effect(Effect::emit(FORM_START));
                result.new_state.phase = Phase::AwaitingVisitor;
                Ok(result)
            }
        }

        (Phase::Opening { next, typing: false }, Event::PauseElapsed) => {
            let mut new_state = state.clone();
            new_state.phase = Phase::Opening {
                next: *next,
                typing: true,
            };
            Ok(TransitionResult::new(new_state)
                .with_effect(Effect::schedule(ctx.timing.typing, Timer::Typing)))
        }

        // ============================================================
        // Visitor answers
        // ============================================================
        (Phase::NotStarted, Event::SubmitText { .. } | Event::SubmitChoice { .. }) => {
            Err(TransitionError::NotStarted)
        }

        (Phase::AwaitingVisitor, Event::SubmitText { text, stamp }) => {
            let answer = text.trim();
            if answer.is_empty() {
                return Err(TransitionError::EmptySubmission);
            }
            accept_answer(state, ctx, answer, stamp)
        }

        (Phase::AwaitingVisitor, Event::SubmitChoice { label, stamp }) => {
            let offered = state
                .pending_choice()
                .is_some_and(|m| m.choices().iter().any(|c| *c == label));
            if !offered {
                return Err(TransitionError::StaleChoice(label));
            }
            accept_answer(state, ctx, &label, stamp)
        }

        (_, Event::SubmitText { .. } | Event::SubmitChoice { .. }) => {
            Err(TransitionError::InputLocked)
        }

        // ============================================================
        // Bot reply
        // ============================================================
        (Phase::Composing { step }, Event::TypingElapsed { stamp }) => {
            let step = *step;
            let definition = ctx
                .script
                .step(step)
                .ok_or(TransitionError::ScriptExhausted(step))?;
            // The visitor message that triggered this reply is the last entry
            let answer = state
                .timeline
                .last()
                .map(|m| m.text.clone())
                .unwrap_or_default();

            let mut new_state = state.clone();
            new_state
                .timeline
                .push(build_reply(definition, &state.visitor_name, stamp));
            new_state.phase = if definition.is_terminal() {
                Phase::Completed
            } else {
                Phase::AwaitingVisitor
            };

            Ok(TransitionResult::new(new_state)
                .with_effect(Effect::PlaySound(SoundCue::Received))
                .with_effects(
                    definition
                        .events
                        .iter()
                        .map(|e| script_event_effect(e, &state.visitor_name, &answer)),
                ))
        }

        // ============================================================
        // Read receipts
        // ============================================================
        (_, Event::ReadReceiptDue { message_id }) => {
            let mut new_state = state.clone();
            let flipped = new_state
                .message_mut(&message_id)
                .is_some_and(Message::mark_read);
            if flipped {
                Ok(TransitionResult::new(new_state))
            } else {
                Err(TransitionError::UnexpectedTimer("read_receipt"))
            }
        }

        // ============================================================
        // Call to action
        // ============================================================
        (Phase::Completed, Event::ActivateCallToAction) => {
            Ok(TransitionResult::new(state.clone())
                .with_effect(Effect::emit_with(
                    WHATSAPP_CLICK,
                    [("user_name", state.visitor_name.clone())],
                ))
                .with_effect(Effect::HandOff))
        }

        (_, Event::ActivateCallToAction) => Err(TransitionError::NoCallToAction),

        // ============================================================
        // Late or misrouted timers
        // ============================================================
        (_, Event::TypingElapsed { .. }) => Err(TransitionError::UnexpectedTimer("typing")),
        (_, Event::PauseElapsed) => Err(TransitionError::UnexpectedTimer("pause")),
    }
}

/// Record an accepted answer and start the bot's typing phase
fn accept_answer(
    state: &ConversationState,
    ctx: &FlowContext,
    answer: &str,
    stamp: MessageStamp,
) -> Result<TransitionResult, TransitionError> {
    let step = state.step;
    let definition = ctx
        .script
        .step(step)
        .ok_or(TransitionError::ScriptExhausted(step))?;

    let mut new_state = state.clone();
    if let Some(prompt) = new_state.pending_choice_mut() {
        prompt.resolve_choice(answer);
    }
    if definition.capture == Some(Capture::VisitorName) {
        new_state.visitor_name = answer.to_string();
    }

    let message_id = stamp.id.clone();
    new_state.timeline.push(Message::visitor(stamp, answer));
    new_state.step = step + 1;
    new_state.phase = Phase::Composing { step };

    Ok(TransitionResult::new(new_state)
        .with_effect(Effect::PlaySound(SoundCue::Sent))
        .with_effect(Effect::schedule(
            ctx.timing.read_receipt,
            Timer::ReadReceipt { message_id },
        ))
        .with_effect(Effect::schedule(ctx.timing.typing, Timer::Typing)))
}

fn build_reply(step: &ScriptStep, visitor_name: &str, stamp: MessageStamp) -> Message {
    let text = interpolate(&step.reply_template, visitor_name);
    match &step.reply {
        Reply::Choice { options } => Message::bot_choice(stamp, text, options.clone()),
        Reply::CallToAction { label } => Message::bot_call_to_action(stamp, text, label.clone()),
    }
}

fn script_event_effect(event: &ScriptEvent, visitor_name: &str, answer: &str) -> Effect {
    match event {
        ScriptEvent::NameProvided => Effect::emit(NAME_PROVIDED),
        ScriptEvent::QuestionAnswered { question } => Effect::emit_with(
            QUESTION_ANSWERED,
            [("question", question.as_str()), ("answer", answer)],
        ),
        ScriptEvent::ConversionCompleted => Effect::Emit {
            name: CONVERSION_COMPLETED.to_string(),
            payload: Payload::from_iter([
                ("user_name".to_string(), Value::from(visitor_name)),
                ("value".to_string(), Value::from(1)),
            ]),
        },
    }
}
