//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the engine with mock implementations and
//! running it headless with the no-op ones.

use crate::state_machine::{Payload, SoundCue, Timer};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Failure reported by an analytics backend
#[derive(Debug, Error)]
#[error("{backend}: {message}")]
pub struct SinkError {
    pub backend: String,
    pub message: String,
}

impl SinkError {
    pub fn new(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            message: message.into(),
        }
    }

    pub fn unavailable(backend: impl Into<String>) -> Self {
        Self::new(backend, "backend unavailable")
    }
}

/// Arms one-shot timers that come back to the engine as `Timer` values
pub trait Scheduler: Send {
    /// Deliver `timer` once `delay` has elapsed
    fn schedule_after(&mut self, delay: Duration, timer: Timer);

    /// Drop every timer that has not fired yet
    fn cancel_all(&mut self);
}

/// Destination for analytics events. Emission is fire-and-forget; the engine
/// logs and discards any error.
pub trait EventSink: Send + Sync {
    fn emit(&self, name: &str, payload: &Payload) -> Result<(), SinkError>;
}

/// Plays notification sounds
pub trait SoundPlayer: Send + Sync {
    fn play(&self, cue: SoundCue);
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn emit(&self, name: &str, payload: &Payload) -> Result<(), SinkError> {
        (**self).emit(name, payload)
    }
}

impl<T: SoundPlayer + ?Sized> SoundPlayer for Arc<T> {
    fn play(&self, cue: SoundCue) {
        (**self).play(cue);
    }
}

impl<T: EventSink + ?Sized> EventSink for Box<T> {
    fn emit(&self, name: &str, payload: &Payload) -> Result<(), SinkError> {
        (**self).emit(name, payload)
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Sink for headless runs
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&self, _name: &str, _payload: &Payload) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Writes every event as a structured log line
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, name: &str, payload: &Payload) -> Result<(), SinkError> {
        let payload = serde_json::to_string(payload)
            .map_err(|e| SinkError::new("tracing", e.to_string()))?;
        tracing::info!(event = %name, %payload, "Analytics event");
        Ok(())
    }
}

/// Forwards each event to every backend. One failing backend does not stop
/// the rest; the first failure is reported after all have been tried.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Box<dyn EventSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, sink: impl EventSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }
}

impl EventSink for FanoutSink {
    fn emit(&self, name: &str, payload: &Payload) -> Result<(), SinkError> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.emit(name, payload) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

/// Silent player for headless runs
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSound;

impl SoundPlayer for NoopSound {
    fn play(&self, _cue: SoundCue) {}
}

/// Logs cues instead of playing them
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSound;

impl SoundPlayer for TracingSound {
    fn play(&self, cue: SoundCue) {
        tracing::debug!(?cue, "Play sound");
    }
}
