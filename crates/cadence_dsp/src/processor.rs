//! Effect Trait and Chain
//!
//! Defines the interface for chainable effect stages and the fixed-order
//! chain used by the engine: Filter -> Distortion -> Echo -> Reverb.
//! Filtering runs before the nonlinearity so shaping doesn't amplify
//! content the filter was meant to remove, and the delay-based stages come
//! last so they repeat the already-shaped signal.

use crate::distortion::{Distortion, DistortionParams};
use crate::echo::{Echo, EchoParams};
use crate::error::DspError;
use crate::filter::{FilterBank, FilterParams};
use crate::reverb::{Reverb, ReverbParams};

/// Context passed to effects containing stream metadata
#[derive(Debug, Clone, Copy)]
pub struct ProcessContext {
    pub sample_rate: f32,
    pub channels: usize,
    pub frame_len: usize,
}

impl ProcessContext {
    pub fn new(sample_rate: f32, channels: usize, frame_len: usize) -> Self {
        Self {
            sample_rate,
            channels,
            frame_len,
        }
    }
}

/// Trait for effect stages in the chain
///
/// # Real-time Safety Contract
///
/// Implementors MUST follow these rules in `process()`:
/// - NO heap allocations (no Vec::push, no Box::new, no String)
/// - NO syscalls (no file I/O, no network, no mutex locks)
/// - NO unbounded loops
/// - Constant or O(n) time complexity where n = buffer size
///
/// Violating these rules causes audio dropouts ("glitches").
pub trait Effect: Send {
    /// Process an interleaved buffer in-place
    fn process(&mut self, buffer: &mut [f32], ctx: &ProcessContext);

    /// Reset internal state (delay lines, filter history)
    fn reset(&mut self);

    /// Human-readable name for debugging/UI
    fn name(&self) -> &'static str;
}

/// Parameters for the full chain, one record per stage
///
/// Plain `Copy` data: the engine snapshots this once at the start of each
/// frame so no stage ever sees a half-applied change mid-block.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChainParams {
    pub filter: FilterParams,
    pub distortion: DistortionParams,
    pub echo: EchoParams,
    pub reverb: ReverbParams,
}

/// The fixed-order effect chain
///
/// Stages are independently enabled. A stage that turns on mid-stream is
/// reset first: its delay lines and filter history start from silence, so
/// the first wet sample blends in instead of clicking.
pub struct EffectChain {
    filter: FilterBank,
    distortion: Distortion,
    echo: Echo,
    reverb: Reverb,
    params: ChainParams,
    ctx: ProcessContext,
}

impl EffectChain {
    /// Create a chain with every stage disabled (identity passthrough)
    pub fn new(sample_rate: f32, channels: usize, frame_len: usize) -> Result<Self, DspError> {
        Self::with_params(sample_rate, channels, frame_len, ChainParams::default())
    }

    pub fn with_params(
        sample_rate: f32,
        channels: usize,
        frame_len: usize,
        params: ChainParams,
    ) -> Result<Self, DspError> {
        Ok(Self {
            filter: FilterBank::new(sample_rate, channels, params.filter)?,
            distortion: Distortion::new(params.distortion.gain),
            echo: Echo::new(sample_rate, channels, params.echo),
            reverb: Reverb::new(sample_rate, channels, params.reverb),
            params,
            ctx: ProcessContext::new(sample_rate, channels, frame_len),
        })
    }

    /// Apply a parameter snapshot for the next frame
    ///
    /// Call between frames, never mid-block. Stages whose enable flag rises
    /// are reset before their first wet frame.
    pub fn apply_params(&mut self, next: ChainParams) -> Result<(), DspError> {
        if next.filter.enabled && !self.params.filter.enabled {
            self.filter.reset();
        }
        if next.echo.enabled && !self.params.echo.enabled {
            self.echo.reset();
        }
        if next.reverb.enabled && !self.params.reverb.enabled {
            self.reverb.reset();
        }

        self.filter.apply_params(next.filter)?;
        self.distortion.set_gain(next.distortion.gain);
        self.echo.apply_params(next.echo);
        self.reverb.apply_params(next.reverb);

        self.params = next;
        Ok(())
    }

    /// Run one frame through the enabled stages in order
    ///
    /// With every stage disabled this is a bit-for-bit passthrough.
    ///
    /// # Real-time Safety
    /// No allocations, no locks. O(n) where n = buffer length.
    #[inline]
    pub fn process(&mut self, buffer: &mut [f32]) {
        debug_assert_eq!(buffer.len() % self.ctx.channels, 0);

        let any_enabled = self.params.filter.enabled
            || self.params.distortion.enabled
            || self.params.echo.enabled
            || self.params.reverb.enabled;
        if !any_enabled {
            return;
        }

        if self.params.filter.enabled {
            self.filter.process(buffer);
        }
        if self.params.distortion.enabled {
            self.distortion.process(buffer, &self.ctx);
        }
        if self.params.echo.enabled {
            self.echo.process(buffer, &self.ctx);
        }
        if self.params.reverb.enabled {
            self.reverb.process(buffer, &self.ctx);
        }

        // The delay stages sum repeats onto the dry signal; pin the frame
        // back into sample range.
        for sample in buffer.iter_mut() {
            *sample = sample.clamp(-1.0, 1.0);
        }
    }

    /// Reset every stage's internal state
    pub fn reset(&mut self) {
        self.filter.reset();
        self.distortion.reset();
        self.echo.reset();
        self.reverb.reset();
    }

    pub fn params(&self) -> &ChainParams {
        &self.params
    }

    pub fn context(&self) -> &ProcessContext {
        &self.ctx
    }
}
