//! Timer scheduling on the tokio runtime

use super::traits::Scheduler;
use crate::state_machine::Timer;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Spawns one sleeping task per timer and delivers fired timers over a
/// channel that the session loop drains.
pub struct TokioScheduler {
    timer_tx: mpsc::UnboundedSender<Timer>,
    cancel: CancellationToken,
}

impl TokioScheduler {
    /// Create a scheduler and the receiver its timers arrive on
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Timer>) {
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        (
            Self {
                timer_tx,
                cancel: CancellationToken::new(),
            },
            timer_rx,
        )
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_after(&mut self, delay: Duration, timer: Timer) {
        let cancel = self.cancel.clone();
        let timer_tx = self.timer_tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::trace!(?timer, "Timer cancelled");
                }
                () = tokio::time::sleep(delay) => {
                    // Receiver gone means the session already ended
                    let _ = timer_tx.send(timer);
                }
            }
        });
    }

    fn cancel_all(&mut self) {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
