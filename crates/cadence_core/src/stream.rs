//! Device I/O Boundary
//!
//! The engine talks to audio hardware through two narrow traits:
//! `CaptureSource` hands the capture actor one frame per period, and
//! `PlaybackSink` accepts processed frames for the output path. Tests
//! inject synthetic implementations; production uses `CpalDeviceIo`.
//!
//! # Audio Flow
//!
//! ```text
//! Input device -> cpal callback -> rtrb ring -> CpalCapture::next_frame
//!                                                     (capture actor)
//! CpalPlayback::submit -> rtrb ring -> cpal callback -> Output device
//!   (processing actor)                 (silence-fill on starvation)
//! ```
//!
//! The cpal callbacks never allocate and never block; the rings absorb the
//! cadence mismatch between the hardware interrupts and the actors. Sample
//! rate and channel count are negotiated once at session start and fixed
//! for the stream's lifetime.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleRate, Stream, StreamConfig as CpalStreamConfig};
use rtrb::{Consumer, Producer, RingBuffer};
use tracing::{error, warn};

use crate::config::StreamConfig;
use crate::error::{EngineError, EngineResult};
use crate::frame::AudioFrame;

/// Capture side of the device boundary
///
/// Lives on the capture actor's thread; implementations need not be `Send`
/// (cpal streams are not), they are created by the thread that drives them.
pub trait CaptureSource {
    /// Next input frame, blocking up to roughly one audio period
    ///
    /// `Ok(None)` means no frame arrived this period - not an error.
    /// `Err` is fatal: the session must terminate.
    fn next_frame(&mut self) -> EngineResult<Option<AudioFrame>>;
}

/// Playback side of the device boundary
///
/// Crosses from the capture thread (where the device is opened) to the
/// processing actor, so it must be `Send`.
pub trait PlaybackSink: Send {
    /// Queue one processed frame for output
    fn submit(&mut self, frame: &AudioFrame) -> EngineResult<()>;
}

/// A connected capture/playback pair
pub type IoPair = (Box<dyn CaptureSource>, Box<dyn PlaybackSink>);

/// Opens the device boundary for a session; called on the capture actor's
/// thread so stream handles live and die there
pub type IoFactory = Arc<dyn Fn(&StreamConfig) -> EngineResult<IoPair> + Send + Sync>;

/// Sleep quantum while waiting for capture samples
const POLL_INTERVAL: Duration = Duration::from_micros(500);

/// cpal-backed device boundary
pub struct CpalDeviceIo;

impl CpalDeviceIo {
    /// Open the default input and output devices for this stream shape
    ///
    /// Returns the capture side (which owns both cpal streams - dropping it
    /// releases the hardware) and the `Send` playback side.
    pub fn open(config: &StreamConfig) -> EngineResult<(CpalCapture, CpalPlayback)> {
        config.validate().map_err(EngineError::ConfigError)?;

        let host = cpal::default_host();
        let input_device = host.default_input_device().ok_or(EngineError::NoInputDevice)?;
        let output_device = host
            .default_output_device()
            .ok_or(EngineError::NoOutputDevice)?;

        let cpal_config = CpalStreamConfig {
            channels: config.channels,
            sample_rate: SampleRate(config.sample_rate),
            buffer_size: BufferSize::Fixed(config.frame_len),
        };

        // 4x one frame of ring capacity absorbs callback jitter
        let ring_size = config.samples_per_frame() * 4;
        let (capture_producer, capture_consumer) = RingBuffer::<f32>::new(ring_size);
        let (playback_producer, playback_consumer) = RingBuffer::<f32>::new(ring_size);

        let device_error = Arc::new(AtomicBool::new(false));
        let input_overflow = Arc::new(AtomicU64::new(0));
        let output_starved = Arc::new(AtomicU64::new(0));

        let input_stream = build_input_stream(
            &input_device,
            &cpal_config,
            capture_producer,
            Arc::clone(&device_error),
            Arc::clone(&input_overflow),
        )?;
        let output_stream = build_output_stream(
            &output_device,
            &cpal_config,
            playback_consumer,
            Arc::clone(&device_error),
            Arc::clone(&output_starved),
        )?;

        input_stream
            .play()
            .map_err(|e| EngineError::StreamPlayError(e.to_string()))?;
        output_stream
            .play()
            .map_err(|e| EngineError::StreamPlayError(e.to_string()))?;

        let capture = CpalCapture {
            _input_stream: input_stream,
            _output_stream: output_stream,
            consumer: capture_consumer,
            pending: Vec::with_capacity(config.samples_per_frame()),
            config: *config,
            frames_captured: 0,
            device_error,
            input_overflow,
        };
        let playback = CpalPlayback {
            producer: playback_producer,
            dropped: 0,
        };

        Ok((capture, playback))
    }
}

/// Build the capture stream feeding the ring
///
/// The callback is the hardware-driven edge of the system: it copies the
/// period's samples into the ring and returns. On a full ring it drops the
/// excess and counts the overflow - capture never stalls.
fn build_input_stream(
    device: &cpal::Device,
    config: &CpalStreamConfig,
    mut producer: Producer<f32>,
    device_error: Arc<AtomicBool>,
    overflow: Arc<AtomicU64>,
) -> EngineResult<Stream> {
    let err_flag = Arc::clone(&device_error);

    device
        .build_input_stream(
            config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                // Real-time audio callback - no allocations allowed here
                let len = data.len().min(producer.slots());
                if let Ok(mut chunk) = producer.write_chunk_uninit(len) {
                    let mut written = 0;
                    let (first, second) = chunk.as_mut_slices();
                    for slot in first.iter_mut() {
                        slot.write(data[written]);
                        written += 1;
                    }
                    for slot in second.iter_mut() {
                        slot.write(data[written]);
                        written += 1;
                    }
                    unsafe { chunk.commit_all() };
                }
                if len < data.len() {
                    overflow.fetch_add((data.len() - len) as u64, Ordering::Relaxed);
                }
            },
            move |err| {
                error!("Input stream error: {err}");
                err_flag.store(true, Ordering::Relaxed);
            },
            None,
        )
        .map_err(|e| EngineError::StreamBuildError(e.to_string()))
}

/// Build the output stream draining the ring
///
/// On starvation the callback fills the period with silence and counts the
/// underrun; the stream keeps running.
fn build_output_stream(
    device: &cpal::Device,
    config: &CpalStreamConfig,
    mut consumer: Consumer<f32>,
    device_error: Arc<AtomicBool>,
    starved: Arc<AtomicU64>,
) -> EngineResult<Stream> {
    let err_flag = Arc::clone(&device_error);

    device
        .build_output_stream(
            config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                // Real-time audio callback - no allocations allowed here
                let available = consumer.slots();
                let to_read = data.len().min(available);

                if to_read < data.len() {
                    data.fill(0.0);
                    starved.fetch_add(1, Ordering::Relaxed);
                }

                if let Ok(chunk) = consumer.read_chunk(to_read) {
                    let (first, second) = chunk.as_slices();
                    data[..first.len()].copy_from_slice(first);
                    data[first.len()..first.len() + second.len()].copy_from_slice(second);
                    chunk.commit_all();
                }
            },
            move |err| {
                error!("Output stream error: {err}");
                err_flag.store(true, Ordering::Relaxed);
            },
            None,
        )
        .map_err(|e| EngineError::StreamBuildError(e.to_string()))
}

/// Capture side over the cpal input ring
///
/// Owns both cpal streams: hardware handles are released when the capture
/// actor drops this at session teardown.
pub struct CpalCapture {
    _input_stream: Stream,
    _output_stream: Stream,
    consumer: Consumer<f32>,
    /// Partial frame carried across calls when a period delivers short
    pending: Vec<f32>,
    config: StreamConfig,
    frames_captured: u64,
    device_error: Arc<AtomicBool>,
    input_overflow: Arc<AtomicU64>,
}

impl CpalCapture {
    /// Samples the input callback had to drop so far
    pub fn overflow_count(&self) -> u64 {
        self.input_overflow.load(Ordering::Relaxed)
    }
}

impl CaptureSource for CpalCapture {
    fn next_frame(&mut self) -> EngineResult<Option<AudioFrame>> {
        let needed = self.config.samples_per_frame();
        let deadline = Instant::now() + self.config.frame_budget();

        loop {
            if self.device_error.load(Ordering::Relaxed) {
                return Err(EngineError::DeviceError(
                    "audio stream reported an error".into(),
                ));
            }

            // Drain whatever the callback has delivered so far
            while self.pending.len() < needed {
                let want = (needed - self.pending.len()).min(self.consumer.slots());
                if want == 0 {
                    break;
                }
                if let Ok(chunk) = self.consumer.read_chunk(want) {
                    let (first, second) = chunk.as_slices();
                    self.pending.extend_from_slice(first);
                    self.pending.extend_from_slice(second);
                    chunk.commit_all();
                } else {
                    break;
                }
            }

            if self.pending.len() >= needed {
                let samples: Vec<f32> = self.pending.drain(..needed).collect();
                let timestamp = self.frames_captured as f64 * self.config.frame_len as f64
                    / self.config.sample_rate as f64;
                self.frames_captured += 1;
                return Ok(Some(AudioFrame::new(samples, timestamp)));
            }

            if Instant::now() >= deadline {
                // No full frame this period; the partial stays pending
                return Ok(None);
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

/// Playback side over the cpal output ring
pub struct CpalPlayback {
    producer: Producer<f32>,
    dropped: u64,
}

impl PlaybackSink for CpalPlayback {
    fn submit(&mut self, frame: &AudioFrame) -> EngineResult<()> {
        let samples = &frame.samples;
        let len = samples.len().min(self.producer.slots());
        if len < samples.len() {
            self.dropped += (samples.len() - len) as u64;
            warn!(
                dropped_total = self.dropped,
                "output ring full, dropping samples"
            );
        }
        if len == 0 {
            return Ok(());
        }

        if let Ok(mut chunk) = self.producer.write_chunk_uninit(len) {
            let mut written = 0;
            let (first, second) = chunk.as_mut_slices();
            for slot in first.iter_mut() {
                slot.write(samples[written]);
                written += 1;
            }
            for slot in second.iter_mut() {
                slot.write(samples[written]);
                written += 1;
            }
            unsafe { chunk.commit_all() };
        }
        Ok(())
    }
}
