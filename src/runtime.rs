//! Runtime for driving a conversation session
//!
//! A session is one engine owned by one task. Surface commands and fired
//! timers are funnelled through a single `select!` loop, so two transitions
//! can never interleave.

mod engine;
mod scheduler;
pub mod traits;


pub use engine::FunnelEngine;
pub use scheduler::TokioScheduler;
pub use traits::*;

use crate::state_machine::{FlowContext, Snapshot, Timer};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

/// Type alias for the engine used by a live session
pub type SessionEngine<E, P> = FunnelEngine<TokioScheduler, E, P>;

/// Inputs from the presentation surface
#[derive(Debug)]
pub enum SurfaceCommand {
    SubmitText(String),
    SubmitChoice(String),
    ActivateCallToAction {
        reply: oneshot::Sender<Option<String>>,
    },
    Teardown,
}

/// Handle the surface uses to talk to a running session
pub struct SessionHandle {
    pub command_tx: mpsc::Sender<SurfaceCommand>,
    pub snapshots: watch::Receiver<Snapshot>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// Build an engine on the tokio scheduler, start it, and run it in a
    /// background task
    pub fn spawn<E, P>(context: FlowContext, sink: E, sound: P, handoff_uri: Option<String>) -> Self
    where
        E: EventSink + 'static,
        P: SoundPlayer + 'static,
    {
        let (scheduler, timer_rx) = TokioScheduler::new();
        let mut engine = FunnelEngine::new(context, scheduler, sink, sound);
        if let Some(uri) = handoff_uri {
            engine = engine.with_handoff_uri(uri);
        }
        let snapshots = engine.subscribe();
        let (command_tx, command_rx) = mpsc::channel(32);

        let task = tokio::spawn(run_session(engine, command_rx, timer_rx));

        Self {
            command_tx,
            snapshots,
            task,
        }
    }

    pub async fn submit_text(&self, text: impl Into<String>) -> bool {
        self.send(SurfaceCommand::SubmitText(text.into())).await
    }

    pub async fn submit_choice(&self, label: impl Into<String>) -> bool {
        self.send(SurfaceCommand::SubmitChoice(label.into())).await
    }

    /// Returns the link to open, if the call to action is available
    pub async fn activate_call_to_action(&self) -> Option<String> {
        let (reply, rx) = oneshot::channel();
        if !self
            .send(SurfaceCommand::ActivateCallToAction { reply })
            .await
        {
            return None;
        }
        rx.await.ok().flatten()
    }

    /// Stop the session and wait for its task to finish
    pub async fn teardown(self) {
        let _ = self.command_tx.send(SurfaceCommand::Teardown).await;
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Session task failed");
        }
    }

    async fn send(&self, command: SurfaceCommand) -> bool {
        self.command_tx.send(command).await.is_ok()
    }
}

/// Drive an engine until teardown or until every command sender is gone
pub async fn run_session<E, P>(
    mut engine: SessionEngine<E, P>,
    mut command_rx: mpsc::Receiver<SurfaceCommand>,
    mut timer_rx: mpsc::UnboundedReceiver<Timer>,
) where
    E: EventSink,
    P: SoundPlayer,
{
    tracing::info!("Starting conversation session");
    engine.start();

    // Process inputs in a loop - one transition at a time
    loop {
        tokio::select! {
            command = command_rx.recv() => match command {
                Some(SurfaceCommand::SubmitText(text)) => engine.submit_text(&text),
                Some(SurfaceCommand::SubmitChoice(label)) => engine.submit_choice(&label),
                Some(SurfaceCommand::ActivateCallToAction { reply }) => {
                    let uri = engine.activate_call_to_action().map(str::to_string);
                    let _ = reply.send(uri);
                }
                Some(SurfaceCommand::Teardown) | None => {
                    engine.teardown();
                    break;
                }
            },
            Some(timer) = timer_rx.recv() => engine.fire(timer),
        }
    }

    tracing::info!("Conversation session stopped");
}
