//! Tempo Estimation
//!
//! Maintains a rolling history of onset times and derives a smoothed BPM
//! estimate from the inter-onset intervals. Intervals far from the median
//! are rejected as missed/spurious onsets; instantaneous values outside the
//! musical band are octave-folded (the halved/doubled tempo of a beat is
//! the same rhythm), then exponentially smoothed to suppress jitter.

use std::collections::VecDeque;

use crate::onset::OnsetEvent;

/// Musical tempo band; estimates are folded into this range
pub const MIN_BPM: f32 = 60.0;
pub const MAX_BPM: f32 = 180.0;

/// Onsets used per interval calculation (the most recent ones)
const INTERVAL_ONSETS: usize = 10;

/// Exponential smoothing: weight kept from the previous estimate
const SMOOTHING: f32 = 0.8;

/// Current tempo estimate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoEstimate {
    /// Beats per minute, within [MIN_BPM, MAX_BPM]
    pub bpm: f32,
    /// Interval consistency, [0, 1]: low variance reads as high confidence
    pub confidence: f32,
    /// Stream time of the onset that produced this estimate (seconds)
    pub updated_at: f64,
}

/// Fold a BPM value into the musical band by octave doubling/halving
pub fn fold_bpm(mut bpm: f32) -> f32 {
    if !bpm.is_finite() || bpm <= 0.0 {
        return MIN_BPM;
    }
    while bpm < MIN_BPM {
        bpm *= 2.0;
    }
    while bpm > MAX_BPM {
        bpm *= 0.5;
    }
    bpm
}

/// Inter-onset-interval tempo tracker
pub struct TempoEstimator {
    /// Onset timestamps, oldest first, bounded by the horizon
    onsets: VecDeque<f64>,
    /// Seconds of onset history to retain
    horizon: f64,
    estimate: Option<TempoEstimate>,
}

impl TempoEstimator {
    /// `horizon_secs` bounds the onset history (~8s keeps a couple dozen
    /// beats at musical tempos)
    pub fn new(horizon_secs: f64) -> Self {
        Self {
            onsets: VecDeque::new(),
            horizon: horizon_secs,
            estimate: None,
        }
    }

    /// Record an onset and refresh the estimate
    ///
    /// Returns the new estimate when enough consistent history exists.
    pub fn record(&mut self, onset: &OnsetEvent) -> Option<TempoEstimate> {
        let now = onset.timestamp;
        self.onsets.push_back(now);
        while let Some(&oldest) = self.onsets.front() {
            if now - oldest > self.horizon {
                self.onsets.pop_front();
            } else {
                break;
            }
        }

        if self.onsets.len() < 2 {
            return None;
        }

        let start = self.onsets.len().saturating_sub(INTERVAL_ONSETS);
        let recent: Vec<f64> = self.onsets.iter().skip(start).copied().collect();
        let intervals: Vec<f64> = recent.windows(2).map(|w| w[1] - w[0]).collect();

        let accepted = reject_outliers(&intervals);
        if accepted.is_empty() {
            return None;
        }

        let mean = accepted.iter().sum::<f64>() / accepted.len() as f64;
        if mean <= f64::EPSILON {
            return None;
        }

        let instantaneous = fold_bpm((60.0 / mean) as f32);
        let bpm = match self.estimate {
            Some(prev) => SMOOTHING * prev.bpm + (1.0 - SMOOTHING) * instantaneous,
            None => instantaneous,
        };

        let estimate = TempoEstimate {
            bpm,
            confidence: confidence(&accepted, mean),
            updated_at: now,
        };
        self.estimate = Some(estimate);
        Some(estimate)
    }

    /// Latest estimate, if any history has produced one
    pub fn current(&self) -> Option<TempoEstimate> {
        self.estimate
    }

    /// Onsets currently held in the history window
    pub fn onset_count(&self) -> usize {
        self.onsets.len()
    }

    pub fn reset(&mut self) {
        self.onsets.clear();
        self.estimate = None;
    }
}

/// Keep intervals within 50% of the median; a missed beat shows up as a
/// doubled interval and a spurious onset as a near-zero one
fn reject_outliers(intervals: &[f64]) -> Vec<f64> {
    if intervals.is_empty() {
        return Vec::new();
    }
    let mut sorted = intervals.to_vec();
    sorted.sort_by(f64::total_cmp);
    let median = sorted[sorted.len() / 2];

    intervals
        .iter()
        .copied()
        .filter(|&i| (i - median).abs() < median * 0.5)
        .collect()
}

/// 1 - coefficient of variation, clamped to [0, 1]
fn confidence(intervals: &[f64], mean: f64) -> f32 {
    if intervals.len() < 2 {
        return 0.5;
    }
    let var = intervals.iter().map(|&i| (i - mean) * (i - mean)).sum::<f64>()
        / intervals.len() as f64;
    let cv = var.sqrt() / mean;
    (1.0 - cv as f32).clamp(0.0, 1.0)
}
