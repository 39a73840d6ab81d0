//! DSP Error Types

use thiserror::Error;

/// Errors that can occur during DSP operations
#[derive(Error, Debug)]
pub enum DspError {
    #[error("Invalid filter coefficients for cutoff {cutoff_hz}Hz at sample rate {sample_rate}Hz")]
    InvalidCoefficients { cutoff_hz: f32, sample_rate: f32 },

    #[error("Sample rate must be positive, got {0}")]
    InvalidSampleRate(f32),

    #[error("Channel count must be 1 (mono) or 2 (stereo), got {0}")]
    InvalidChannelCount(usize),

    #[error("Buffer length {got} is not a multiple of the channel count {channels}")]
    BufferSizeMismatch { got: usize, channels: usize },
}
