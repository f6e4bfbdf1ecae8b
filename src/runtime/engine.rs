//! Conversation flow engine
//!
//! Owns the session state and runs every input through the pure transition
//! function, then carries out the resulting effects against the injected
//! collaborators.

use super::traits::{EventSink, Scheduler, SoundPlayer};
use crate::message::MessageStamp;
use crate::state_machine::{
    transition, ConversationState, Effect, Event, FlowContext, Payload, Snapshot, Timer,
};
use serde_json::Value;
use tokio::sync::watch;

/// What happened to a dispatched event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Ignored,
    Applied { handed_off: bool },
}

/// Generic engine that can work with any scheduler, sink and sound player
pub struct FunnelEngine<S, E, P>
where
    S: Scheduler,
    E: EventSink,
    P: SoundPlayer,
{
    context: FlowContext,
    state: ConversationState,
    scheduler: S,
    sink: E,
    sound: P,
    handoff_uri: Option<String>,
    snapshot_tx: watch::Sender<Snapshot>,
}

impl<S, E, P> FunnelEngine<S, E, P>
where
    S: Scheduler,
    E: EventSink,
    P: SoundPlayer,
{
    pub fn new(context: FlowContext, scheduler: S, sink: E, sound: P) -> Self {
        let state = ConversationState::new();
        let (snapshot_tx, _) = watch::channel(state.snapshot());
        Self {
            context,
            state,
            scheduler,
            sink,
            sound,
            handoff_uri: None,
            snapshot_tx,
        }
    }

    /// Outbound link handed to the surface when the call to action is used
    #[must_use]
    pub fn with_handoff_uri(mut self, uri: impl Into<String>) -> Self {
        self.handoff_uri = Some(uri.into());
        self
    }

    /// Begin the opening sequence. Later calls are ignored.
    pub fn start(&mut self) {
        self.dispatch(Event::Start);
    }

    /// Visitor typed an answer. Blank text, or text sent while the bot is
    /// busy, is ignored.
    ///
    /// # Panics
    ///
    /// Panics if called before [`start`](Self::start).
    pub fn submit_text(&mut self, text: &str) {
        self.dispatch(Event::submit_text(text));
    }

    /// Visitor pressed one of the pending prompt's buttons. Labels that the
    /// pending prompt does not offer are ignored.
    ///
    /// # Panics
    ///
    /// Panics if called before [`start`](Self::start).
    pub fn submit_choice(&mut self, label: &str) {
        self.dispatch(Event::submit_choice(label));
    }

    /// Visitor pressed the final button. Emits a click event each time and
    /// returns the link to open, or `None` if the script has not reached its
    /// call to action yet.
    pub fn activate_call_to_action(&mut self) -> Option<&str> {
        match self.dispatch(Event::ActivateCallToAction) {
            Outcome::Applied { handed_off: true } => self.handoff_uri.as_deref(),
            _ => None,
        }
    }

    /// Deliver a timer that the scheduler reports as elapsed
    pub fn fire(&mut self, timer: Timer) {
        self.dispatch(timer.into_event(MessageStamp::now()));
    }

    /// Surface unmounted: cancel timers and stop reacting to anything
    pub fn teardown(&mut self) {
        self.dispatch(Event::Teardown);
    }

    pub fn snapshot(&self) -> Snapshot {
        self.state.snapshot()
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    /// Receiver that sees a fresh snapshot after every state change
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    fn dispatch(&mut self, event: Event) -> Outcome {
        let event_name = event.name();
        let result = match transition(&self.state, &self.context, event) {
            Ok(r) => r,
            Err(e) if e.is_programmer_error() => {
                panic!("{event_name} dispatched in an invalid state: {e}");
            }
            Err(e) => {
                tracing::debug!(event = event_name, reason = %e, "Event ignored");
                return Outcome::Ignored;
            }
        };

        let changed = result.new_state != self.state;
        self.state = result.new_state;
        if changed {
            tracing::debug!(
                event = event_name,
                step = self.state.step,
                phase = ?self.state.phase,
                "State updated"
            );
            self.snapshot_tx.send_replace(self.state.snapshot());
        }

        let mut handed_off = false;
        for effect in result.effects {
            handed_off |= self.execute_effect(effect);
        }
        Outcome::Applied { handed_off }
    }

    /// Execute an effect; returns true for a hand-off request
    fn execute_effect(&mut self, effect: Effect) -> bool {
        match effect {
            Effect::Schedule { delay, timer } => {
                tracing::trace!(?timer, delay_ms = delay.as_millis(), "Schedule timer");
                self.scheduler.schedule_after(delay, timer);
            }
            Effect::Emit { name, payload } => self.emit(&name, payload),
            Effect::PlaySound(cue) => self.sound.play(cue),
            Effect::HandOff => return true,
            Effect::CancelTimers => {
                tracing::info!(step = self.state.step, "Session torn down");
                self.scheduler.cancel_all();
            }
        }
        false
    }

    /// Best-effort emission; a failing sink never affects the conversation
    fn emit(&self, name: &str, mut payload: Payload) {
        payload
            .entry("timestamp")
            .or_insert_with(|| Value::from(chrono::Utc::now().to_rfc3339()));
        if let Err(e) = self.sink.emit(name, &payload) {
            tracing::warn!(event = %name, error = %e, "Failed to emit analytics event");
        }
    }
}
