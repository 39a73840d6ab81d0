//! Per-Frame Processing Kernel
//!
//! One `process` call is one cycle of the processing actor: snapshot the
//! parameters, run the effect chain, then the analysis path (spectrum ->
//! onset -> tempo) over the processed signal. Synchronous and deterministic
//! so the whole pipeline can be driven end-to-end in tests without threads
//! or hardware.
//!
//! Detection follows the *processed* signal: the operator hears the chain's
//! output, so the beat tracker listens to the same thing.

use std::sync::Arc;

use cadence_dsp::{
    EffectChain, OnsetDetector, OnsetEvent, SpectralAnalyzer, SpectrumFrame, TempoEstimate,
    TempoEstimator,
};

use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::frame::AudioFrame;
use crate::params::ParameterStore;

/// Everything one cycle produces
pub struct PipelineOutput {
    /// The processed frame, ready for the output path
    pub frame: AudioFrame,
    /// Magnitude spectrum of the processed frame
    pub spectrum: SpectrumFrame,
    /// Onset flagged this cycle, if any
    pub onset: Option<OnsetEvent>,
    /// Tempo estimate refreshed by that onset, if any
    pub tempo: Option<TempoEstimate>,
}

/// The processing actor's stateful kernel
pub struct Pipeline {
    chain: EffectChain,
    analyzer: SpectralAnalyzer,
    onsets: OnsetDetector,
    tempo: TempoEstimator,
    params: Arc<ParameterStore>,
    /// Mono mixdown scratch, reused across frames
    mono: Vec<f32>,
    channels: usize,
    frames_processed: u64,
}

impl Pipeline {
    pub fn new(config: &EngineConfig, params: Arc<ParameterStore>) -> EngineResult<Self> {
        let stream = &config.stream;
        let sample_rate = stream.sample_rate as f32;
        let channels = stream.channels as usize;
        let frame_len = stream.frame_len as usize;

        Ok(Self {
            chain: EffectChain::with_params(
                sample_rate,
                channels,
                frame_len,
                params.snapshot().chain,
            )?,
            analyzer: SpectralAnalyzer::new(sample_rate, frame_len),
            onsets: OnsetDetector::new(config.analysis.flux_window_frames(stream)),
            tempo: TempoEstimator::new(config.analysis.onset_horizon_secs as f64),
            params,
            mono: vec![0.0; frame_len],
            channels,
            frames_processed: 0,
        })
    }

    /// Run one frame through effects and analysis
    ///
    /// Parameters are snapshot once, here, at the frame boundary - the only
    /// point where a control-thread change becomes visible.
    pub fn process(&mut self, mut frame: AudioFrame) -> EngineResult<PipelineOutput> {
        let snapshot = self.params.snapshot();

        self.chain.apply_params(snapshot.chain)?;
        self.chain.process(&mut frame.samples);

        self.mix_mono(&frame.samples);
        let spectrum = self.analyzer.analyze(&self.mono);

        let onset = self
            .onsets
            .observe(&spectrum, frame.timestamp, &snapshot.detector);
        let tempo = onset.as_ref().and_then(|o| self.tempo.record(o));

        self.frames_processed += 1;

        Ok(PipelineOutput {
            frame,
            spectrum,
            onset,
            tempo,
        })
    }

    /// Average interleaved channels into the mono scratch
    fn mix_mono(&mut self, samples: &[f32]) {
        if self.channels == 1 {
            self.mono.resize(samples.len(), 0.0);
            self.mono.copy_from_slice(samples);
            return;
        }
        let frames = samples.len() / self.channels;
        self.mono.resize(frames, 0.0);
        let scale = 1.0 / self.channels as f32;
        for (i, chunk) in samples.chunks_exact(self.channels).enumerate() {
            self.mono[i] = chunk.iter().sum::<f32>() * scale;
        }
    }

    /// Latest tempo estimate, if onsets have produced one
    pub fn current_tempo(&self) -> Option<TempoEstimate> {
        self.tempo.current()
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Clear all DSP state (delay lines, flux history, onset history)
    pub fn reset(&mut self) {
        self.chain.reset();
        self.onsets.reset();
        self.tempo.reset();
        self.frames_processed = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StreamConfig;
    use crate::params::{Param, ParamSnapshot, Stage};

    const SAMPLE_RATE: u32 = 44100;
    const FRAME_LEN: usize = 1024;

    fn pipeline() -> (Pipeline, Arc<ParameterStore>) {
        let config = EngineConfig::default();
        let params = Arc::new(ParameterStore::new(
            SAMPLE_RATE as f32,
            ParamSnapshot::default(),
        ));
        let pipeline = Pipeline::new(&config, Arc::clone(&params)).unwrap();
        (pipeline, params)
    }

    /// Deterministic white-ish noise
    fn noise(len: usize, seed: &mut u32) -> Vec<f32> {
        (0..len)
            .map(|_| {
                *seed ^= *seed << 13;
                *seed ^= *seed >> 17;
                *seed ^= *seed << 5;
                (*seed as f32 / u32::MAX as f32) * 1.6 - 0.8
            })
            .collect()
    }

    fn frames_of(signal: &[f32]) -> impl Iterator<Item = AudioFrame> + '_ {
        signal.chunks_exact(FRAME_LEN).enumerate().map(|(i, chunk)| {
            AudioFrame::new(
                chunk.to_vec(),
                i as f64 * FRAME_LEN as f64 / SAMPLE_RATE as f64,
            )
        })
    }

    #[test]
    fn test_passthrough_when_all_disabled() {
        let (mut pipeline, _params) = pipeline();

        let input: Vec<f32> = (0..FRAME_LEN)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44100.0).sin())
            .collect();
        let out = pipeline
            .process(AudioFrame::new(input.clone(), 0.0))
            .unwrap();

        assert_eq!(out.frame.samples, input);
        assert_eq!(out.frame.timestamp, 0.0);
    }

    #[test]
    fn test_end_to_end_burst_detection() {
        // 2 seconds of silence with a 50ms noise burst at t=1.0s: the full
        // pipeline must flag exactly one onset within +-20ms of the burst.
        let (mut pipeline, params) = pipeline();
        params.set(Param::OnsetThresholdK(1.5)).unwrap();

        let total = 2 * SAMPLE_RATE as usize;
        let mut signal = vec![0.0_f32; total];
        let burst_start = SAMPLE_RATE as usize; // t = 1.0s
        let burst_len = (0.05 * SAMPLE_RATE as f64) as usize;
        let mut seed = 0x9E3779B9_u32;
        signal[burst_start..burst_start + burst_len]
            .copy_from_slice(&noise(burst_len, &mut seed));

        let mut onsets = Vec::new();
        for frame in frames_of(&signal) {
            let out = pipeline.process(frame).unwrap();
            if let Some(onset) = out.onset {
                onsets.push(onset);
            }
        }

        assert_eq!(onsets.len(), 1, "expected exactly one onset, got {onsets:?}");
        let expected = burst_start as f64 / SAMPLE_RATE as f64;
        assert!(
            (onsets[0].timestamp - expected).abs() <= 0.02,
            "onset at {}s, expected {expected}s +-20ms",
            onsets[0].timestamp
        );
    }

    #[test]
    fn test_pure_silence_no_events() {
        let (mut pipeline, _params) = pipeline();

        let silence = vec![0.0_f32; 2 * SAMPLE_RATE as usize];
        for frame in frames_of(&silence) {
            let out = pipeline.process(frame).unwrap();
            assert!(out.onset.is_none(), "silence produced an onset");
            assert!(out.tempo.is_none());
        }
        assert!(pipeline.current_tempo().is_none());
    }

    #[test]
    fn test_click_track_tempo_through_pipeline() {
        // 120 BPM click track: a 10ms noise burst every 0.5s for 8 seconds
        let (mut pipeline, _params) = pipeline();

        let total = 8 * SAMPLE_RATE as usize;
        let mut signal = vec![0.0_f32; total];
        let click_len = (0.01 * SAMPLE_RATE as f64) as usize;
        let mut seed = 0x1234_5678_u32;
        let mut t = SAMPLE_RATE as usize / 2; // first click at 0.5s, past warm-up
        while t + click_len < total {
            let click = noise(click_len, &mut seed);
            signal[t..t + click_len].copy_from_slice(&click);
            t += SAMPLE_RATE as usize / 2;
        }

        let mut last_tempo = None;
        let mut onset_count = 0;
        for frame in frames_of(&signal) {
            let out = pipeline.process(frame).unwrap();
            if out.onset.is_some() {
                onset_count += 1;
            }
            last_tempo = out.tempo.or(last_tempo);
        }

        assert!(onset_count >= 8, "expected a warmed-up click per beat, got {onset_count}");
        let tempo = last_tempo.expect("tempo estimate after 8s of clicks");
        assert!(
            (tempo.bpm - 120.0).abs() <= 2.0,
            "click track estimated at {} BPM",
            tempo.bpm
        );
    }

    #[test]
    fn test_spectrum_follows_processed_signal() {
        // With a low-pass at 300Hz engaged, an 8kHz tone's spectrum peak
        // must disappear from the analysis path too.
        let (mut pipeline, params) = pipeline();
        params.set(Param::FilterCutoffHz(300.0)).unwrap();
        params.set_stage_enabled(Stage::Filter, true);

        let tone: Vec<f32> = (0..FRAME_LEN * 8)
            .map(|i| 0.8 * (2.0 * std::f32::consts::PI * 8000.0 * i as f32 / 44100.0).sin())
            .collect();

        let mut last = None;
        for frame in frames_of(&tone) {
            last = Some(pipeline.process(frame).unwrap());
        }
        let spectrum = last.unwrap().spectrum;
        let tone_bin = (8000.0 / spectrum.bin_hz).round() as usize;
        assert!(
            spectrum.bins[tone_bin] < 0.01,
            "8kHz leaked through the analysis tap: magnitude {}",
            spectrum.bins[tone_bin]
        );
    }

    #[test]
    fn test_stereo_mono_mixdown() {
        let config = EngineConfig {
            stream: StreamConfig {
                channels: 2,
                ..StreamConfig::default()
            },
            ..EngineConfig::default()
        };
        let params = Arc::new(ParameterStore::new(44100.0, ParamSnapshot::default()));
        let mut pipeline = Pipeline::new(&config, params).unwrap();

        // Anti-phase stereo mixes to silence: the analysis path must see none
        let mut samples = Vec::with_capacity(FRAME_LEN * 2);
        for i in 0..FRAME_LEN {
            let s = 0.7 * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44100.0).sin();
            samples.push(s);
            samples.push(-s);
        }
        let out = pipeline.process(AudioFrame::new(samples, 0.0)).unwrap();
        assert!(out.spectrum.bins.iter().all(|&m| m < 1e-3));
    }

    #[test]
    fn test_parameter_change_lands_next_frame() {
        let (mut pipeline, params) = pipeline();

        let frame = || AudioFrame::new(vec![0.5; FRAME_LEN], 0.0);
        let clean = pipeline.process(frame()).unwrap();

        params.set(Param::DistortionGain(20.0)).unwrap();
        params.set_stage_enabled(Stage::Distortion, true);
        let driven = pipeline.process(frame()).unwrap();

        assert_eq!(clean.frame.samples[0], 0.5);
        assert_ne!(driven.frame.samples[0], 0.5);
    }

    #[test]
    fn test_reset_clears_counters_and_state() {
        let (mut pipeline, _params) = pipeline();
        for frame in frames_of(&vec![0.1_f32; FRAME_LEN * 4]) {
            pipeline.process(frame).unwrap();
        }
        assert_eq!(pipeline.frames_processed(), 4);

        pipeline.reset();
        assert_eq!(pipeline.frames_processed(), 0);
        assert!(pipeline.current_tempo().is_none());
    }
}
