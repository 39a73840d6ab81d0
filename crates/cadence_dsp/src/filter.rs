//! Streaming Frequency Filter
//!
//! A cascade of BiQuad sections per channel implementing the low-pass,
//! high-pass and band-pass responses used by the effect chain.
//! Based on the RBJ (Robert Bristow-Johnson) Audio EQ Cookbook.

use biquad::{Biquad, Coefficients, DirectForm2Transposed, ToHertz, Type, Q_BUTTERWORTH_F32};

use crate::error::DspError;

/// Sections cascaded per channel (2 biquads = 4th-order Butterworth slope)
const SECTIONS: usize = 2;

/// Lowest cutoff we derive coefficients for.
/// Below ~10Hz the normalized frequency is close enough to zero that the
/// pole pair collapses onto the unit circle.
pub const MIN_CUTOFF_HZ: f32 = 10.0;

/// Cutoff ceiling as a fraction of the sample rate. Keeping the corner
/// under 0.49·fs keeps the poles strictly inside the unit circle.
pub const MAX_CUTOFF_RATIO: f32 = 0.49;

/// Filter response shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    LowPass,
    HighPass,
    BandPass,
}

/// Filter stage configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterParams {
    pub cutoff_hz: f32,
    pub kind: FilterKind,
    pub enabled: bool,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            cutoff_hz: 1000.0,
            kind: FilterKind::LowPass,
            enabled: false,
        }
    }
}

/// Stateful filter over an interleaved stream
///
/// Each channel owns its own cascade of `DirectForm2Transposed` sections
/// (better numerical stability than DF1). Coefficients are derived once per
/// parameter change, never per sample.
///
/// Changing the filter kind resets the delay lines: reinterpreting old state
/// under a different topology produces an audible step, so the transition
/// starts from silence instead.
pub struct FilterBank {
    sections: Vec<[DirectForm2Transposed<f32>; SECTIONS]>,
    params: FilterParams,
    sample_rate: f32,
}

impl FilterBank {
    pub fn new(sample_rate: f32, channels: usize, params: FilterParams) -> Result<Self, DspError> {
        if sample_rate <= 0.0 {
            return Err(DspError::InvalidSampleRate(sample_rate));
        }
        if channels == 0 || channels > 2 {
            return Err(DspError::InvalidChannelCount(channels));
        }

        let coeffs = Self::coefficients(params.kind, params.cutoff_hz, sample_rate)?;
        let sections = (0..channels)
            .map(|_| core::array::from_fn(|_| DirectForm2Transposed::<f32>::new(coeffs)))
            .collect();

        Ok(Self {
            sections,
            params,
            sample_rate,
        })
    }

    /// Derive BiQuad coefficients for a kind/cutoff pair
    ///
    /// The cutoff is clamped into [`MIN_CUTOFF_HZ`, `MAX_CUTOFF_RATIO`·fs]
    /// before derivation so the filter stays stable over the whole supported
    /// control range.
    fn coefficients(
        kind: FilterKind,
        cutoff_hz: f32,
        sample_rate: f32,
    ) -> Result<Coefficients<f32>, DspError> {
        let clamped = cutoff_hz.clamp(MIN_CUTOFF_HZ, sample_rate * MAX_CUTOFF_RATIO);

        let filter_type = match kind {
            FilterKind::LowPass => Type::LowPass,
            FilterKind::HighPass => Type::HighPass,
            FilterKind::BandPass => Type::BandPass,
        };

        Coefficients::<f32>::from_params(
            filter_type,
            sample_rate.hz(),
            clamped.hz(),
            Q_BUTTERWORTH_F32,
        )
        .map_err(|_| DspError::InvalidCoefficients {
            cutoff_hz,
            sample_rate,
        })
    }

    /// Move the cutoff frequency, keeping filter state
    ///
    /// Same topology under new coefficients is a continuous transition, so
    /// the delay lines carry over.
    pub fn set_cutoff(&mut self, cutoff_hz: f32) -> Result<(), DspError> {
        let coeffs = Self::coefficients(self.params.kind, cutoff_hz, self.sample_rate)?;
        for channel in &mut self.sections {
            for section in channel.iter_mut() {
                section.update_coefficients(coeffs);
            }
        }
        self.params.cutoff_hz = cutoff_hz;
        Ok(())
    }

    /// Switch the response shape, resetting filter state
    pub fn set_kind(&mut self, kind: FilterKind) -> Result<(), DspError> {
        let coeffs = Self::coefficients(kind, self.params.cutoff_hz, self.sample_rate)?;
        for channel in &mut self.sections {
            for section in channel.iter_mut() {
                section.update_coefficients(coeffs);
                section.reset_state();
            }
        }
        self.params.kind = kind;
        Ok(())
    }

    /// Apply a parameter snapshot, recomputing coefficients only on change
    pub fn apply_params(&mut self, next: FilterParams) -> Result<(), DspError> {
        if next.kind != self.params.kind {
            self.set_kind(next.kind)?;
        }
        if (next.cutoff_hz - self.params.cutoff_hz).abs() > f32::EPSILON {
            self.set_cutoff(next.cutoff_hz)?;
        }
        self.params.enabled = next.enabled;
        Ok(())
    }

    /// Process one sample through the cascade for the given channel
    ///
    /// # Real-time Safety
    /// No allocations, no syscalls, O(1) time.
    #[inline]
    pub fn process_sample(&mut self, channel: usize, sample: f32) -> f32 {
        let mut y = sample;
        for section in self.sections[channel].iter_mut() {
            y = section.run(y);
        }
        // Bounded-output contract: a stable filter fed [-1,1] stays within
        // a hair of unity, the clamp pins the transient overshoot.
        y.clamp(-1.0, 1.0)
    }

    /// Process an interleaved buffer in-place
    ///
    /// # Real-time Safety
    /// No allocations. O(n) where n = buffer length.
    #[inline]
    pub fn process(&mut self, buffer: &mut [f32]) {
        let channels = self.sections.len();
        for frame in buffer.chunks_exact_mut(channels) {
            for (ch, sample) in frame.iter_mut().enumerate() {
                *sample = self.process_sample(ch, *sample);
            }
        }
    }

    /// Clear the delay lines
    pub fn reset(&mut self) {
        for channel in &mut self.sections {
            for section in channel.iter_mut() {
                section.reset_state();
            }
        }
    }

    pub fn params(&self) -> &FilterParams {
        &self.params
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.sections.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn test_invalid_construction() {
        let params = FilterParams::default();
        assert!(FilterBank::new(0.0, 1, params).is_err());
        assert!(FilterBank::new(44100.0, 0, params).is_err());
        assert!(FilterBank::new(44100.0, 3, params).is_err());
    }

    #[test]
    fn test_output_bounded_for_all_kinds_and_cutoffs() {
        let sample_rate = 44100.0;
        let kinds = [FilterKind::LowPass, FilterKind::HighPass, FilterKind::BandPass];
        let cutoffs = [20.0, 250.0, 1000.0, 8000.0, 20000.0];

        for kind in kinds {
            for cutoff in cutoffs {
                let params = FilterParams {
                    cutoff_hz: cutoff,
                    kind,
                    enabled: true,
                };
                let mut filter = FilterBank::new(sample_rate, 1, params).unwrap();

                // Worst-case bounded input: full-scale alternating signal
                let mut buffer: Vec<f32> =
                    (0..4096).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
                filter.process(&mut buffer);

                for sample in &buffer {
                    assert!(
                        sample.is_finite() && sample.abs() <= 1.0,
                        "{kind:?} @ {cutoff}Hz produced out-of-range sample {sample}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_low_pass_attenuates_high_frequency() {
        let sample_rate = 44100.0;
        let params = FilterParams {
            cutoff_hz: 500.0,
            kind: FilterKind::LowPass,
            enabled: true,
        };
        let mut filter = FilterBank::new(sample_rate, 1, params).unwrap();

        let mut high = sine(8000.0, sample_rate, 4096);
        filter.process(&mut high);
        // Skip the transient, measure the settled tail
        let peak = high[2048..].iter().fold(0.0_f32, |m, s| m.max(s.abs()));
        assert!(peak < 0.05, "8kHz should be strongly attenuated, peak {peak}");

        filter.reset();
        let mut low = sine(100.0, sample_rate, 4096);
        filter.process(&mut low);
        let peak = low[2048..].iter().fold(0.0_f32, |m, s| m.max(s.abs()));
        assert!(peak > 0.8, "100Hz should pass, peak {peak}");
    }

    #[test]
    fn test_high_pass_attenuates_low_frequency() {
        let sample_rate = 44100.0;
        let params = FilterParams {
            cutoff_hz: 2000.0,
            kind: FilterKind::HighPass,
            enabled: true,
        };
        let mut filter = FilterBank::new(sample_rate, 1, params).unwrap();

        let mut low = sine(100.0, sample_rate, 4096);
        filter.process(&mut low);
        let peak = low[2048..].iter().fold(0.0_f32, |m, s| m.max(s.abs()));
        assert!(peak < 0.05, "100Hz should be strongly attenuated, peak {peak}");
    }

    #[test]
    fn test_cutoff_change_keeps_state() {
        let sample_rate = 44100.0;
        let mut filter = FilterBank::new(sample_rate, 1, FilterParams::default()).unwrap();

        let signal = sine(440.0, sample_rate, 1024);
        let mut buffer = signal.clone();
        filter.process(&mut buffer);

        // Moving the cutoff mid-stream must not discontinue the output
        let before = filter.process_sample(0, 0.5);
        filter.set_cutoff(1200.0).unwrap();
        let after = filter.process_sample(0, 0.5);
        assert!((before - after).abs() < 0.2, "cutoff move stepped the output");
    }

    #[test]
    fn test_kind_change_resets_state() {
        let sample_rate = 44100.0;
        let mut filter = FilterBank::new(sample_rate, 2, FilterParams::default()).unwrap();

        let mut buffer = sine(440.0, sample_rate, 2048);
        filter.process(&mut buffer);

        filter.set_kind(FilterKind::HighPass).unwrap();
        assert_eq!(filter.params().kind, FilterKind::HighPass);

        // Fresh state: silence in, silence out
        let out = filter.process_sample(0, 0.0);
        assert_eq!(out, 0.0);
    }

    #[test]
    fn test_extreme_cutoff_is_clamped_stable() {
        let sample_rate = 44100.0;
        let params = FilterParams {
            cutoff_hz: 44100.0, // beyond Nyquist, clamped internally
            kind: FilterKind::LowPass,
            enabled: true,
        };
        let mut filter = FilterBank::new(sample_rate, 1, params).unwrap();

        let mut buffer = sine(1000.0, sample_rate, 2048);
        filter.process(&mut buffer);
        for sample in &buffer {
            assert!(sample.is_finite());
        }
    }

    #[test]
    fn test_apply_params_noop_when_unchanged() {
        let mut filter = FilterBank::new(44100.0, 1, FilterParams::default()).unwrap();
        let params = *filter.params();
        filter.apply_params(params).unwrap();
        assert_eq!(*filter.params(), params);
    }
}
