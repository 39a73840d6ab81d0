//! Engine and Stream Configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Audio stream configuration, fixed for the session's lifetime
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Sample rate in Hz (e.g., 44100, 48000)
    pub sample_rate: u32,

    /// Number of audio channels (1 = mono, 2 = stereo interleaved)
    pub channels: u16,

    /// Frame length in samples per channel (lower = less latency)
    pub frame_len: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 1,
            frame_len: 1024,
        }
    }
}

impl StreamConfig {
    /// One frame's duration in milliseconds
    pub fn period_ms(&self) -> f32 {
        (self.frame_len as f32 / self.sample_rate as f32) * 1000.0
    }

    /// The real-time budget for processing one frame
    pub fn frame_budget(&self) -> Duration {
        Duration::from_secs_f64(self.frame_len as f64 / self.sample_rate as f64)
    }

    /// Interleaved samples per frame (frame_len * channels)
    pub fn samples_per_frame(&self) -> usize {
        self.frame_len as usize * self.channels as usize
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate < 8000 || self.sample_rate > 192_000 {
            return Err(format!("Invalid sample rate: {}", self.sample_rate));
        }
        if self.channels == 0 || self.channels > 2 {
            return Err(format!("Invalid channel count: {}", self.channels));
        }
        if self.frame_len < 64 || self.frame_len > 8192 {
            return Err(format!("Invalid frame length: {}", self.frame_len));
        }
        Ok(())
    }
}

/// Detector and tempo tuning
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Trailing window backing the adaptive onset threshold (seconds)
    pub flux_window_secs: f32,

    /// Initial threshold sensitivity (mean + k * stddev)
    pub threshold_k: f32,

    /// Initial minimum spacing between onsets (milliseconds)
    pub refractory_ms: f32,

    /// Onset history retained for tempo estimation (seconds)
    pub onset_horizon_secs: f32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            flux_window_secs: 1.5,
            threshold_k: 1.5,
            refractory_ms: 100.0,
            onset_horizon_secs: 8.0,
        }
    }
}

impl AnalysisConfig {
    /// Flux window length in frames for a given stream
    pub fn flux_window_frames(&self, stream: &StreamConfig) -> usize {
        let frames = self.flux_window_secs * stream.sample_rate as f32 / stream.frame_len as f32;
        (frames.round() as usize).max(4)
    }
}

/// Overall engine configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Stream configuration
    pub stream: StreamConfig,

    /// Frame buffer capacity between capture and processing
    /// (>= 4 frames absorbs scheduling jitter without adding much latency)
    pub frame_buffer_frames: usize,

    /// Detector tuning
    pub analysis: AnalysisConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stream: StreamConfig::default(),
            frame_buffer_frames: 8,
            analysis: AnalysisConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Create config optimized for low latency
    pub fn low_latency() -> Self {
        Self {
            stream: StreamConfig {
                sample_rate: 44100,
                channels: 1,
                frame_len: 256, // ~5.8ms latency
            },
            frame_buffer_frames: 8,
            analysis: AnalysisConfig::default(),
        }
    }

    /// Create config optimized for stability
    pub fn stable() -> Self {
        Self {
            stream: StreamConfig {
                sample_rate: 44100,
                channels: 1,
                frame_len: 2048, // ~46ms latency
            },
            frame_buffer_frames: 4,
            analysis: AnalysisConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        self.stream.validate()?;
        if self.frame_buffer_frames < 2 {
            return Err(format!(
                "Frame buffer too small: {}",
                self.frame_buffer_frames
            ));
        }
        Ok(())
    }
}
