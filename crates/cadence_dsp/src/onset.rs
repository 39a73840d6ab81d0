//! Onset Detection
//!
//! Spectral-flux onset strength with an adaptive threshold. One step per
//! processed frame:
//!
//! 1. Flux = positive-only magnitude increase per bin since the previous
//!    frame, normalized by bin count.
//! 2. Rolling mean and standard deviation of flux over a trailing window.
//! 3. Flag an onset when flux exceeds `mean + k * stddev` and the
//!    refractory interval since the last onset has elapsed (one transient,
//!    one onset).
//!
//! Detection stays suppressed until the flux window has a minimum amount of
//! history, so startup noise cannot produce false positives.

use std::collections::VecDeque;

use crate::spectrum::SpectrumFrame;

/// Detector tuning, snapshot-read per frame like the effect parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorParams {
    /// Threshold sensitivity: onsets fire above mean + k * stddev
    pub threshold_k: f32,
    /// Minimum spacing between flagged onsets (milliseconds)
    pub refractory_ms: f32,
    pub enabled: bool,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            threshold_k: 1.5,
            refractory_ms: 100.0,
            enabled: true,
        }
    }
}

/// A detected onset: when it happened and how hard it hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OnsetEvent {
    /// Stream time in seconds
    pub timestamp: f64,
    /// Flux value that crossed the threshold
    pub strength: f32,
}

/// Spectral-flux onset detector
pub struct OnsetDetector {
    /// Magnitudes of the previous frame, for the flux difference
    prev_bins: Vec<f32>,
    have_prev: bool,
    /// Trailing flux window backing the adaptive threshold
    flux_window: VecDeque<f32>,
    window_len: usize,
    /// Frames of history required before detection is allowed
    min_history: usize,
    last_onset: Option<f64>,
}

impl OnsetDetector {
    /// `window_len` is the trailing window in frames (~1.5s worth)
    pub fn new(window_len: usize) -> Self {
        let window_len = window_len.max(4);
        Self {
            prev_bins: Vec::new(),
            have_prev: false,
            flux_window: VecDeque::with_capacity(window_len + 1),
            window_len,
            min_history: (window_len / 4).max(4),
            last_onset: None,
        }
    }

    /// Feed one spectrum, returning an onset if this frame crossed the
    /// threshold
    pub fn observe(
        &mut self,
        spectrum: &SpectrumFrame,
        timestamp: f64,
        params: &DetectorParams,
    ) -> Option<OnsetEvent> {
        let flux = self.flux(&spectrum.bins);

        let (mean, stddev) = self.window_stats();
        let refractory_ok = match self.last_onset {
            Some(last) => timestamp - last >= f64::from(params.refractory_ms) / 1000.0,
            None => true,
        };

        let detected = params.enabled
            && self.flux_window.len() >= self.min_history
            && flux > mean + params.threshold_k * stddev
            && refractory_ok;

        self.flux_window.push_back(flux);
        if self.flux_window.len() > self.window_len {
            self.flux_window.pop_front();
        }

        if detected {
            self.last_onset = Some(timestamp);
            Some(OnsetEvent {
                timestamp,
                strength: flux,
            })
        } else {
            None
        }
    }

    /// Positive-only frame-to-frame magnitude increase, per bin
    fn flux(&mut self, bins: &[f32]) -> f32 {
        let flux = if self.have_prev && self.prev_bins.len() == bins.len() {
            let rise: f32 = bins
                .iter()
                .zip(self.prev_bins.iter())
                .map(|(&m, &p)| (m - p).max(0.0))
                .sum();
            rise / bins.len() as f32
        } else {
            0.0
        };

        self.prev_bins.resize(bins.len(), 0.0);
        self.prev_bins.copy_from_slice(bins);
        self.have_prev = true;

        flux
    }

    /// Mean and standard deviation over the trailing flux window
    fn window_stats(&self) -> (f32, f32) {
        let n = self.flux_window.len();
        if n == 0 {
            return (0.0, 0.0);
        }
        let mean = self.flux_window.iter().sum::<f32>() / n as f32;
        let var = self
            .flux_window
            .iter()
            .map(|&f| (f - mean) * (f - mean))
            .sum::<f32>()
            / n as f32;
        (mean, var.sqrt())
    }

    /// Frames of history currently held
    pub fn history_len(&self) -> usize {
        self.flux_window.len()
    }

    pub fn reset(&mut self) {
        self.prev_bins.clear();
        self.have_prev = false;
        self.flux_window.clear();
        self.last_onset = None;
    }
}
