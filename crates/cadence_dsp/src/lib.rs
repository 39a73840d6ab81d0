//! Cadence DSP - Digital Signal Processing Module
//!
//! This crate provides the signal processing for Cadence, including:
//! - A fixed-order effect chain (Filter -> Distortion -> Echo -> Reverb)
//!   with per-stage enable and click-free live toggling
//! - BiQuad low/high/band-pass filtering with stable coefficients over the
//!   whole control range
//! - A windowed-FFT spectral analyzer shared by display and beat detection
//! - Spectral-flux onset detection with an adaptive threshold
//! - Inter-onset tempo estimation with octave folding and outlier rejection
//!
//! # Architecture
//!
//! Everything here is synchronous and thread-free: one call processes one
//! frame. The engine crate owns the threads and feeds frames in; parameter
//! records are plain `Copy` snapshots applied at frame boundaries, so no
//! stage ever observes a half-applied change.

mod distortion;
mod echo;
mod error;
mod filter;
mod onset;
mod presets;
mod processor;
mod reverb;
mod spectrum;
mod tempo;

pub use distortion::{Distortion, DistortionParams, GAIN_MAX, GAIN_MIN};
pub use echo::{Echo, EchoParams, DELAY_MS_MAX, DELAY_MS_MIN};
pub use error::DspError;
pub use filter::{FilterBank, FilterKind, FilterParams, MAX_CUTOFF_RATIO, MIN_CUTOFF_HZ};
pub use onset::{DetectorParams, OnsetDetector, OnsetEvent};
pub use presets::{find as find_preset, Preset, PRESETS};
pub use processor::{ChainParams, Effect, EffectChain, ProcessContext};
pub use reverb::{Reverb, ReverbParams};
pub use spectrum::{SpectralAnalyzer, SpectrumFrame};
pub use tempo::{fold_bpm, TempoEstimate, TempoEstimator, MAX_BPM, MIN_BPM};
