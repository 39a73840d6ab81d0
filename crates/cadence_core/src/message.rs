//! Message Types for Thread Communication
//!
//! Commands flow from the control handle -> processing actor.
//! Events flow from the actors -> whoever polls the engine (display,
//! recorder, logs). Parameter mutations do NOT travel as commands: they go
//! straight into the ParameterStore so validation errors surface
//! synchronously to the caller.

use serde::{Deserialize, Serialize};

/// Commands sent to the processing actor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Open the device boundary and start the capture/processing actors
    Start,

    /// Stop the actors, releasing device handles cooperatively
    Stop,

    /// Request current state (triggers a StateUpdate event)
    RequestState,

    /// Shut the engine down
    Shutdown,
}

/// Events emitted by the engine
///
/// Serializable so the display/persistence boundaries can consume them as
/// read-only snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Event {
    /// Engine started successfully
    Started,

    /// Engine stopped
    Stopped,

    /// Error occurred
    Error { message: String },

    /// A musical onset was detected
    Onset { timestamp: f64, strength: f32 },

    /// The tempo estimate was refreshed
    Tempo {
        bpm: f32,
        confidence: f32,
        updated_at: f64,
    },

    /// Magnitude spectrum of the latest processed frame
    Spectrum { bins: Vec<f32>, bin_hz: f32 },

    /// A frame missed its real-time budget and was dropped
    Underrun { timestamp: f64 },

    /// Capture overwrote unprocessed frames; `dropped` is the running count
    Overrun { dropped: u64 },

    /// Current state snapshot
    StateUpdate {
        is_running: bool,
        frames_processed: u64,
        underruns: u64,
        overruns: u64,
        tempo_bpm: Option<f32>,
    },
}

impl Event {
    /// Create an error event from any error type
    pub fn error<E: std::fmt::Display>(err: E) -> Self {
        Event::Error {
            message: err.to_string(),
        }
    }
}
