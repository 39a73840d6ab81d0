//! Engine Error Types

use thiserror::Error;

/// Errors that can occur in the audio engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("No input device found")]
    NoInputDevice,

    #[error("No output device found")]
    NoOutputDevice,

    #[error("Failed to build audio stream: {0}")]
    StreamBuildError(String),

    #[error("Failed to play audio stream: {0}")]
    StreamPlayError(String),

    #[error("Audio device failed: {0}")]
    DeviceError(String),

    #[error("Stream configuration error: {0}")]
    ConfigError(String),

    #[error("Parameter {name} = {value} outside [{min}, {max}]")]
    InvalidParameter {
        name: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },

    #[error("Channel send error - receiver dropped")]
    ChannelSendError,

    #[error("DSP error: {0}")]
    DspError(#[from] cadence_dsp::DspError),
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::NoInputDevice;
        assert!(err.to_string().contains("input device"));

        let err = EngineError::InvalidParameter {
            name: "Distortion.gain",
            value: 0.0,
            min: 1.0,
            max: 50.0,
        };
        let msg = err.to_string();
        assert!(msg.contains("Distortion.gain"));
        assert!(msg.contains('0'));
    }

    #[test]
    fn test_error_from_dsp() {
        let dsp_err = cadence_dsp::DspError::InvalidSampleRate(0.0);
        let engine_err: EngineError = dsp_err.into();
        assert!(matches!(engine_err, EngineError::DspError(_)));
    }
}
