//! Live Parameter Store
//!
//! Process-wide, concurrently-mutable configuration for the effect chain
//! and the onset detector. The control actor writes; the processing actor
//! reads one `Copy` snapshot at the start of each frame, so a change lands
//! atomically on a frame boundary and no reader ever sees a half-applied
//! mutation.
//!
//! `set` validates against each parameter's declared range and rejects
//! out-of-range values synchronously, leaving the prior value in place.

use parking_lot::RwLock;

use cadence_dsp::{
    ChainParams, DetectorParams, FilterKind, DELAY_MS_MAX, DELAY_MS_MIN, GAIN_MAX, GAIN_MIN,
};

use crate::error::{EngineError, EngineResult};

/// A validated parameter mutation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Param {
    /// Reverb tail persistence, [0, 1)
    ReverbDecay(f32),
    /// Reverb comb scale, [0, 1]
    ReverbRoomSize(f32),
    /// Echo delay in milliseconds, [1, 2000]
    EchoDelayMs(f32),
    /// Echo repeat decay, [0, 1)
    EchoFeedback(f32),
    /// Filter cutoff in Hz, (0, sample_rate / 2)
    FilterCutoffHz(f32),
    /// Filter response shape
    FilterKind(FilterKind),
    /// Distortion drive, [1, 50]
    DistortionGain(f32),
    /// Onset threshold sensitivity, (0, 8]
    OnsetThresholdK(f32),
    /// Onset refractory interval in milliseconds, [10, 1000]
    OnsetRefractoryMs(f32),
}

/// Effect stage selector for enable toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Filter,
    Distortion,
    Echo,
    Reverb,
}

/// Everything the processing actor needs for one cycle
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ParamSnapshot {
    pub chain: ChainParams,
    pub detector: DetectorParams,
}

/// Concurrently-mutable parameter state with snapshot-read semantics
pub struct ParameterStore {
    inner: RwLock<ParamSnapshot>,
    sample_rate: f32,
}

impl ParameterStore {
    pub fn new(sample_rate: f32, initial: ParamSnapshot) -> Self {
        Self {
            inner: RwLock::new(initial),
            sample_rate,
        }
    }

    /// Immutable copy of the current state for one processing cycle
    ///
    /// The snapshot is a plain `Copy`; nothing mutates it after handoff.
    pub fn snapshot(&self) -> ParamSnapshot {
        *self.inner.read()
    }

    /// Validate and apply one parameter mutation
    ///
    /// Out-of-range values fail with `InvalidParameter` and leave the prior
    /// value unchanged. An accepted value is visible to the next snapshot.
    pub fn set(&self, param: Param) -> EngineResult<()> {
        // Validate before taking the write lock: a rejected set never
        // touches the store.
        match param {
            Param::ReverbDecay(v) => check("Reverb.decay", v, 0.0, 1.0, Bound::ExcludeMax)?,
            Param::ReverbRoomSize(v) => {
                check("Reverb.roomSize", v, 0.0, 1.0, Bound::Inclusive)?
            }
            Param::EchoDelayMs(v) => {
                check("Echo.delayMs", v, DELAY_MS_MIN, DELAY_MS_MAX, Bound::Inclusive)?
            }
            Param::EchoFeedback(v) => check("Echo.feedback", v, 0.0, 1.0, Bound::ExcludeMax)?,
            Param::FilterCutoffHz(v) => check(
                "Filter.cutoffHz",
                v,
                0.0,
                self.sample_rate / 2.0,
                Bound::Exclusive,
            )?,
            Param::FilterKind(_) => {}
            Param::DistortionGain(v) => {
                check("Distortion.gain", v, GAIN_MIN, GAIN_MAX, Bound::Inclusive)?
            }
            Param::OnsetThresholdK(v) => {
                check("Onset.thresholdK", v, 0.0, 8.0, Bound::ExcludeMin)?
            }
            Param::OnsetRefractoryMs(v) => {
                check("Onset.refractoryMs", v, 10.0, 1000.0, Bound::Inclusive)?
            }
        }

        let mut inner = self.inner.write();
        match param {
            Param::ReverbDecay(v) => inner.chain.reverb.decay = v,
            Param::ReverbRoomSize(v) => inner.chain.reverb.room_size = v,
            Param::EchoDelayMs(v) => inner.chain.echo.delay_ms = v,
            Param::EchoFeedback(v) => inner.chain.echo.feedback = v,
            Param::FilterCutoffHz(v) => inner.chain.filter.cutoff_hz = v,
            Param::FilterKind(kind) => inner.chain.filter.kind = kind,
            Param::DistortionGain(v) => inner.chain.distortion.gain = v,
            Param::OnsetThresholdK(v) => inner.detector.threshold_k = v,
            Param::OnsetRefractoryMs(v) => inner.detector.refractory_ms = v,
        }
        Ok(())
    }

    /// Toggle an effect stage
    ///
    /// The processing actor resets a stage's state on the rising edge, so
    /// enabling mid-stream is click-free.
    pub fn set_stage_enabled(&self, stage: Stage, enabled: bool) {
        let mut inner = self.inner.write();
        match stage {
            Stage::Filter => inner.chain.filter.enabled = enabled,
            Stage::Distortion => inner.chain.distortion.enabled = enabled,
            Stage::Echo => inner.chain.echo.enabled = enabled,
            Stage::Reverb => inner.chain.reverb.enabled = enabled,
        }
    }

    /// Toggle onset detection
    pub fn set_detector_enabled(&self, enabled: bool) {
        self.inner.write().detector.enabled = enabled;
    }

    /// Replace the whole chain configuration (e.g. applying a preset)
    pub fn set_chain(&self, chain: ChainParams) {
        self.inner.write().chain = chain;
    }

    /// Reset everything to the given state
    pub fn reset(&self, snapshot: ParamSnapshot) {
        *self.inner.write() = snapshot;
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }
}

enum Bound {
    Inclusive,
    Exclusive,
    ExcludeMin,
    ExcludeMax,
}

fn check(name: &'static str, value: f32, min: f32, max: f32, bound: Bound) -> EngineResult<()> {
    let ok = value.is_finite()
        && match bound {
            Bound::Inclusive => value >= min && value <= max,
            Bound::Exclusive => value > min && value < max,
            Bound::ExcludeMin => value > min && value <= max,
            Bound::ExcludeMax => value >= min && value < max,
        };
    if ok {
        Ok(())
    } else {
        Err(EngineError::InvalidParameter {
            name,
            value,
            min,
            max,
        })
    }
}
