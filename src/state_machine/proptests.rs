//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across arbitrary event orderings.

use super::*;
use crate::message::{DeliveryState, MessageStamp, Origin};
use crate::script::Script;
use proptest::prelude::*;
use std::sync::Arc;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_context() -> FlowContext {
    FlowContext::new(Arc::new(Script::builtin()), Timing::default())
}

/// Event shape without stamps; stamps are assigned in order while replaying
#[derive(Debug, Clone)]
enum Input {
    Start,
    Text(String),
    Choice(String),
    Typing,
    Pause,
    ReadReceipt(usize),
    CallToAction,
}

impl Input {
    fn into_event(self, seq: usize, state: &ConversationState) -> Event {
        let stamp = MessageStamp::new(format!("m{seq}"), "10:00");
        match self {
            Input::Start => Event::Start,
            Input::Text(text) => Event::SubmitText { text, stamp },
            Input::Choice(label) => Event::SubmitChoice { label, stamp },
            Input::Typing => Event::TypingElapsed { stamp },
            Input::Pause => Event::PauseElapsed,
            Input::ReadReceipt(pick) => {
                let visitor: Vec<_> = state
                    .timeline
                    .iter()
                    .filter(|m| m.origin == Origin::Visitor)
                    .collect();
                let message_id = if visitor.is_empty() {
                    "missing".to_string()
                } else {
                    visitor[pick % visitor.len()].id.clone()
                };
                Event::ReadReceiptDue { message_id }
            }
            Input::CallToAction => Event::ActivateCallToAction,
        }
    }
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_label() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Sim, já ouvi".to_string()),
        Just("Ainda não".to_string()),
        Just("Sim, claro".to_string()),
        Just("Com certeza".to_string()),
        "[a-z]{1,8}",
    ]
}

fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z ]{1,12}",
        Just(String::new()),
        Just("   ".to_string()),
        Just("\t\n".to_string()),
    ]
}

fn arb_input() -> impl Strategy<Value = Input> {
    prop_oneof![
        1 => Just(Input::Start),
        3 => arb_text().prop_map(Input::Text),
        3 => arb_label().prop_map(Input::Choice),
        4 => Just(Input::Typing),
        2 => Just(Input::Pause),
        2 => (0usize..4).prop_map(Input::ReadReceipt),
        1 => Just(Input::CallToAction),
    ]
}

/// Feed a started session enough timers and answers to reach `AwaitingVisitor`
fn started() -> ConversationState {
    let ctx = test_context();
    let mut state = ConversationState::new();
    for (seq, input) in [Input::Start, Input::Typing, Input::Pause, Input::Typing]
        .into_iter()
        .enumerate()
    {
        let event = input.into_event(1000 + seq, &state);
        state = transition(&state, &ctx, event).unwrap().new_state;
    }
    state
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Step moves by exactly one per accepted answer and never passes the end
    #[test]
    fn prop_step_advances_by_one(inputs in proptest::collection::vec(arb_input(), 0..40)) {
        let ctx = test_context();
        let terminal = ctx.script.terminal_step();
        let mut state = ConversationState::new();

        for (seq, input) in inputs.into_iter().enumerate() {
            let is_answer = matches!(input, Input::Text(_) | Input::Choice(_));
            let event = input.into_event(seq, &state);
            if let Ok(result) = transition(&state, &ctx, event) {
                let expected = if is_answer { state.step + 1 } else { state.step };
                prop_assert_eq!(result.new_state.step, expected);
                prop_assert!(result.new_state.step <= terminal);
                state = result.new_state;
            }
        }
    }

    // At most one choice prompt is open at any time, and none once completed
    #[test]
    fn prop_single_open_choice(inputs in proptest::collection::vec(arb_input(), 0..40)) {
        let ctx = test_context();
        let mut state = started();

        for (seq, input) in inputs.into_iter().enumerate() {
            let event = input.into_event(seq, &state);
            if let Ok(result) = transition(&state, &ctx, event) {
                state = result.new_state;
                prop_assert!(state.unresolved_choice_count() <= 1);
                if state.is_completed() {
                    prop_assert_eq!(state.unresolved_choice_count(), 0);
                }
            }
        }
    }

    // Blank submissions never change anything
    #[test]
    fn prop_blank_submission_is_noop(
        inputs in proptest::collection::vec(arb_input(), 0..20),
        blank in "[ \t\n]{0,6}",
    ) {
        let ctx = test_context();
        let mut state = started();

        for (seq, input) in inputs.into_iter().enumerate() {
            let event = input.into_event(seq, &state);
            if let Ok(result) = transition(&state, &ctx, event) {
                state = result.new_state;
            }
        }
        let event = Event::SubmitText {
            text: blank,
            stamp: MessageStamp::new("blank", "10:00"),
        };
        prop_assert!(transition(&state, &ctx, event).is_err());
    }

    // Read receipts only ever move forward; the timeline only grows
    #[test]
    fn prop_receipts_and_timeline_monotonic(inputs in proptest::collection::vec(arb_input(), 0..40)) {
        let ctx = test_context();
        let mut state = started();

        for (seq, input) in inputs.into_iter().enumerate() {
            let event = input.into_event(seq, &state);
            if let Ok(result) = transition(&state, &ctx, event) {
                let next = result.new_state;
                prop_assert!(next.timeline.len() >= state.timeline.len());
                for (before, after) in state.timeline.iter().zip(next.timeline.iter()) {
                    prop_assert_eq!(&before.id, &after.id);
                    prop_assert_eq!(&before.created_at, &after.created_at);
                    prop_assert!(after.delivery_state >= before.delivery_state);
                    if let Some(choice) = before.resolved_choice() {
                        prop_assert_eq!(after.resolved_choice(), Some(choice));
                    }
                }
                state = next;
            }
        }
    }

    // Locked input rejects every answer, whatever its content
    #[test]
    fn prop_locked_input_rejects_answers(text in "[a-zA-Z]{1,10}") {
        let ctx = test_context();
        let state = started();
        let state = transition(&state, &ctx, Event::SubmitText {
            text: "Ana".to_string(),
            stamp: MessageStamp::new("v1", "10:00"),
        }).unwrap().new_state;
        prop_assert!(state.input_locked());

        let result = transition(&state, &ctx, Event::SubmitText {
            text,
            stamp: MessageStamp::new("v2", "10:00"),
        });
        prop_assert!(matches!(result, Err(TransitionError::InputLocked)));
    }
}

#[test]
fn test_visitor_messages_only_carry_receipts() {
    let state = started();
    let state = transition(
        &state,
        &test_context(),
        Event::SubmitText {
            text: "Ana".to_string(),
            stamp: MessageStamp::new("v1", "10:00"),
        },
    )
    .unwrap()
    .new_state;
    for message in &state.timeline {
        match message.origin {
            Origin::Visitor => assert_eq!(message.delivery_state, Some(DeliveryState::Sent)),
            Origin::Bot => assert_eq!(message.delivery_state, None),
        }
    }
}
