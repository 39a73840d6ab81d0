//! Cadence Core - Audio Engine
//!
//! This crate provides the streaming engine for Cadence, including:
//! - The capture/processing frame handoff (fixed-slot SPSC ring)
//! - The per-frame processing pipeline (effects -> spectrum -> onset ->
//!   tempo)
//! - A concurrently-mutable parameter store with snapshot-read semantics
//! - Actor threads bound to the audio cadence, with cooperative teardown
//! - The cpal device boundary (injectable for tests)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Control thread                         │
//! │   set(param)──▶ ParameterStore      events ◀── poll_event() │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ crossbeam-channel
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Capture ──FrameBuffer──▶ Pipeline ──rtrb──▶ Output         │
//! │  (cadence-io thread)      (cadence-dsp thread)              │
//! │        frames dropped, never blocked, on overflow           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod engine;
mod error;
mod frame;
mod message;
mod params;
mod pipeline;
mod stream;

pub use config::{AnalysisConfig, EngineConfig, StreamConfig};
pub use engine::AudioEngine;
pub use error::{EngineError, EngineResult};
pub use frame::{AudioFrame, FrameBuffer};
pub use message::{Command, Event};
pub use params::{Param, ParamSnapshot, ParameterStore, Stage};
pub use pipeline::{Pipeline, PipelineOutput};
pub use stream::{CaptureSource, CpalCapture, CpalDeviceIo, CpalPlayback, IoFactory, IoPair, PlaybackSink};

// Re-export DSP types for convenience
pub use cadence_dsp::{
    ChainParams, DetectorParams, FilterKind, OnsetEvent, SpectrumFrame, TempoEstimate,
};
