//! Spectral Analyzer
//!
//! Windowed FFT front end producing one magnitude spectrum per frame,
//! shared by the display path and the onset detector.
//!
//! `analyze` is deterministic and observably pure: the FFT plan and the
//! window table are fixed at construction and the working buffers are
//! per-call, so the two consumers can analyze the same frame redundantly
//! without interfering with each other.

use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

/// Magnitude spectrum for one frame
///
/// Bin `i` covers frequencies around `i * bin_hz`, from DC up to Nyquist.
/// Ephemeral: recomputed every cycle, never persisted.
#[derive(Debug, Clone)]
pub struct SpectrumFrame {
    pub bins: Vec<f32>,
    /// Frequency step between adjacent bins (sample_rate / fft_size)
    pub bin_hz: f32,
}

impl SpectrumFrame {
    /// Index of the strongest bin
    pub fn peak_bin(&self) -> usize {
        self.bins
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    /// Center frequency of a bin in Hz
    pub fn frequency_of(&self, bin: usize) -> f32 {
        bin as f32 * self.bin_hz
    }
}

/// Hann window coefficients, reduces spectral leakage
fn hann(n: usize, size: usize) -> f32 {
    0.5 * (1.0 - (2.0 * std::f32::consts::PI * n as f32 / (size - 1) as f32).cos())
}

/// Windowed-FFT spectrum analyzer
pub struct SpectralAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    /// Pre-computed Hann window, one coefficient per input sample
    window: Vec<f32>,
    fft_size: usize,
    sample_rate: f32,
}

impl SpectralAnalyzer {
    /// Create an analyzer for mono frames of `frame_len` samples
    ///
    /// The FFT size is the next power of two >= `frame_len`; shorter input
    /// is zero-padded.
    pub fn new(sample_rate: f32, frame_len: usize) -> Self {
        let fft_size = frame_len.next_power_of_two();
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        Self {
            fft,
            window: (0..frame_len).map(|n| hann(n, frame_len)).collect(),
            fft_size,
            sample_rate,
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Number of magnitude bins per spectrum (DC through Nyquist)
    pub fn num_bins(&self) -> usize {
        self.fft_size / 2 + 1
    }

    /// Compute the magnitude spectrum of one mono frame
    ///
    /// Input longer than the configured frame length is truncated. Runs on
    /// the processing thread, not the audio callback; the per-call buffers
    /// are the price of keeping this callable from two paths at once.
    pub fn analyze(&self, samples: &[f32]) -> SpectrumFrame {
        let mut buf = vec![Complex::new(0.0, 0.0); self.fft_size];
        for (i, (&sample, &w)) in samples.iter().zip(self.window.iter()).enumerate() {
            buf[i] = Complex::new(sample * w, 0.0);
        }

        let mut scratch = vec![Complex::new(0.0, 0.0); self.fft.get_inplace_scratch_len()];
        self.fft.process_with_scratch(&mut buf, &mut scratch);

        let scale = 2.0 / self.fft_size as f32;
        let bins = buf[..self.num_bins()].iter().map(|c| c.norm() * scale).collect();

        SpectrumFrame {
            bins,
            bin_hz: self.sample_rate / self.fft_size as f32,
        }
    }
}
