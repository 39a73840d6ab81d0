//! Audio Engine - Main Entry Point
//!
//! The `AudioEngine` owns the actor threads and is the control boundary:
//! the caller's thread mutates parameters synchronously through the
//! ParameterStore and drives the session lifecycle over a command channel.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Control thread                          │
//! │  set(param) ──▶ ParameterStore          AudioEngine handle  │
//! │  Start/Stop ──▶ command channel    events ◀── poll_event()  │
//! └─────────────────────────────────────────────────────────────┘
//!                           │ crossbeam-channel
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  cadence-io thread:   device ──▶ FrameBuffer (rotate-drop)  │
//! │  cadence-dsp thread:  FrameBuffer ──▶ Pipeline ──▶ sink     │
//! │                       (snapshot params once per frame)      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Per-frame failures degrade to "skip this frame"; only device errors end
//! a session. Teardown is cooperative: actors finish their current cycle
//! before the device handles drop on the thread that opened them.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use tracing::{debug, error, info, warn};

use cadence_dsp::{ChainParams, DetectorParams};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::frame::FrameBuffer;
use crate::message::{Command, Event};
use crate::params::{Param, ParamSnapshot, ParameterStore, Stage};
use crate::pipeline::Pipeline;
use crate::stream::{CaptureSource, CpalDeviceIo, IoFactory, PlaybackSink};

/// How long the processing actor waits on the command channel between
/// buffer drains; short enough to keep frame latency low
const COMMAND_POLL: Duration = Duration::from_millis(4);

/// The main audio engine controller
///
/// Lives on the caller's thread and communicates with the processing actor
/// via channels; parameter mutations bypass the channel so their validation
/// errors surface synchronously.
pub struct AudioEngine {
    command_sender: Sender<Command>,
    event_receiver: Receiver<Event>,
    params: Arc<ParameterStore>,
    processing_thread: Option<JoinHandle<()>>,
    shutdown_flag: Arc<AtomicBool>,
    is_running: Arc<AtomicBool>,
    config: EngineConfig,
}

impl AudioEngine {
    /// Create an engine with default configuration and the cpal boundary
    pub fn new() -> EngineResult<Self> {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine with custom configuration and the cpal boundary
    pub fn with_config(config: EngineConfig) -> EngineResult<Self> {
        Self::with_io_factory(
            config,
            Arc::new(|stream: &crate::config::StreamConfig| {
                let (capture, playback) = CpalDeviceIo::open(stream)?;
                Ok((
                    Box::new(capture) as Box<dyn CaptureSource>,
                    Box::new(playback) as Box<dyn PlaybackSink>,
                ))
            }),
        )
    }

    /// Create an engine with a custom device boundary (used by tests and
    /// alternative backends)
    pub fn with_io_factory(config: EngineConfig, io_factory: IoFactory) -> EngineResult<Self> {
        config.validate().map_err(EngineError::ConfigError)?;

        let (command_sender, command_receiver) = bounded::<Command>(32);
        let (event_sender, event_receiver) = unbounded::<Event>();

        let params = Arc::new(ParameterStore::new(
            config.stream.sample_rate as f32,
            ParamSnapshot {
                chain: ChainParams::default(),
                detector: DetectorParams {
                    threshold_k: config.analysis.threshold_k,
                    refractory_ms: config.analysis.refractory_ms,
                    enabled: true,
                },
            },
        ));

        let shutdown_flag = Arc::new(AtomicBool::new(false));
        let is_running = Arc::new(AtomicBool::new(false));

        let thread_params = Arc::clone(&params);
        let thread_shutdown = Arc::clone(&shutdown_flag);
        let thread_running = Arc::clone(&is_running);

        let processing_thread = thread::Builder::new()
            .name("cadence-dsp".into())
            .spawn(move || {
                processing_main(
                    config,
                    thread_params,
                    io_factory,
                    command_receiver,
                    event_sender,
                    thread_shutdown,
                    thread_running,
                );
            })
            .map_err(|e| EngineError::StreamBuildError(e.to_string()))?;

        Ok(Self {
            command_sender,
            event_receiver,
            params,
            processing_thread: Some(processing_thread),
            shutdown_flag,
            is_running,
            config,
        })
    }

    /// Start the capture and processing actors
    pub fn start(&self) -> EngineResult<()> {
        self.send_command(Command::Start)
    }

    /// Stop the actors and release the device
    pub fn stop(&self) -> EngineResult<()> {
        self.send_command(Command::Stop)
    }

    /// Request a StateUpdate event
    pub fn request_state(&self) -> EngineResult<()> {
        self.send_command(Command::RequestState)
    }

    /// Validate and apply one parameter; takes effect at the next frame
    /// boundary
    ///
    /// Rejection is synchronous: an out-of-range value returns
    /// `InvalidParameter` here and the prior value stays live.
    pub fn set_parameter(&self, param: Param) -> EngineResult<()> {
        self.params.set(param)
    }

    /// Toggle an effect stage (its state is primed on the rising edge)
    pub fn set_stage_enabled(&self, stage: Stage, enabled: bool) {
        self.params.set_stage_enabled(stage, enabled);
    }

    /// Toggle onset detection
    pub fn set_detector_enabled(&self, enabled: bool) {
        self.params.set_detector_enabled(enabled);
    }

    /// Apply a named preset to the whole chain
    pub fn apply_preset(&self, name: &str) -> EngineResult<()> {
        let chain = cadence_dsp::find_preset(name)
            .ok_or_else(|| EngineError::ConfigError(format!("unknown preset: {name}")))?;
        self.params.set_chain(chain);
        Ok(())
    }

    /// Check if a session is currently running
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    /// Get next event (non-blocking)
    pub fn poll_event(&self) -> Option<Event> {
        self.event_receiver.try_recv().ok()
    }

    /// Get next event (blocking)
    pub fn wait_event(&self) -> Option<Event> {
        self.event_receiver.recv().ok()
    }

    /// Get next event, blocking up to `timeout`
    pub fn wait_event_timeout(&self, timeout: Duration) -> Option<Event> {
        self.event_receiver.recv_timeout(timeout).ok()
    }

    /// Get current configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The live parameter store (shared with the processing actor)
    pub fn params(&self) -> &Arc<ParameterStore> {
        &self.params
    }

    fn send_command(&self, command: Command) -> EngineResult<()> {
        self.command_sender
            .send(command)
            .map_err(|_| EngineError::ChannelSendError)
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        self.shutdown_flag.store(true, Ordering::SeqCst);
        let _ = self.command_sender.send(Command::Shutdown);
        if let Some(handle) = self.processing_thread.take() {
            let _ = handle.join();
        }
    }
}

/// Processing actor main loop
fn processing_main(
    config: EngineConfig,
    params: Arc<ParameterStore>,
    io_factory: IoFactory,
    command_receiver: Receiver<Command>,
    event_sender: Sender<Event>,
    shutdown_flag: Arc<AtomicBool>,
    is_running: Arc<AtomicBool>,
) {
    info!("Processing actor started");

    let mut session: Option<Session> = None;

    while !shutdown_flag.load(Ordering::SeqCst) {
        match command_receiver.recv_timeout(COMMAND_POLL) {
            Ok(Command::Start) => {
                if session.is_some() {
                    warn!("Engine already running");
                    let _ = event_sender.send(Event::error("Already running"));
                    continue;
                }
                match Session::start(&config, Arc::clone(&params), Arc::clone(&io_factory), &event_sender) {
                    Ok(s) => {
                        session = Some(s);
                        is_running.store(true, Ordering::SeqCst);
                        let _ = event_sender.send(Event::Started);
                        info!(
                            sample_rate = config.stream.sample_rate,
                            channels = config.stream.channels,
                            frame_len = config.stream.frame_len,
                            "Audio engine started"
                        );
                    }
                    Err(e) => {
                        error!("Failed to start session: {e}");
                        let _ = event_sender.send(Event::error(e));
                    }
                }
            }

            Ok(Command::Stop) => {
                if let Some(s) = session.take() {
                    s.stop();
                    is_running.store(false, Ordering::SeqCst);
                    let _ = event_sender.send(Event::Stopped);
                    info!("Audio engine stopped");
                } else {
                    debug!("Engine not running");
                }
            }

            Ok(Command::RequestState) => {
                let (frames_processed, underruns, overruns, tempo_bpm) = match &session {
                    Some(s) => (
                        s.pipeline.frames_processed(),
                        s.underruns,
                        s.overruns.load(Ordering::Relaxed),
                        s.pipeline.current_tempo().map(|t| t.bpm),
                    ),
                    None => (0, 0, 0, None),
                };
                let _ = event_sender.send(Event::StateUpdate {
                    is_running: session.is_some(),
                    frames_processed,
                    underruns,
                    overruns,
                    tempo_bpm,
                });
            }

            Ok(Command::Shutdown) => {
                info!("Shutdown command received");
                break;
            }

            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
        }

        // Drain and process whatever capture has delivered
        let mut failed = false;
        if let Some(s) = session.as_mut() {
            s.drain(&event_sender);
            failed = s.device_failed.load(Ordering::Relaxed);
        }
        if failed {
            if let Some(s) = session.take() {
                s.stop();
            }
            is_running.store(false, Ordering::SeqCst);
            let _ = event_sender.send(Event::Stopped);
            warn!("Session ended after device failure");
        }
    }

    // Cooperative teardown: finish the current cycle, then release
    if let Some(s) = session.take() {
        s.stop();
    }
    is_running.store(false, Ordering::SeqCst);
    info!("Processing actor stopped");
}

/// One running capture/processing session
struct Session {
    frames: Arc<FrameBuffer>,
    pipeline: Pipeline,
    sink: Box<dyn PlaybackSink>,
    capture_stop: Arc<AtomicBool>,
    capture_thread: Option<JoinHandle<()>>,
    overruns: Arc<AtomicU64>,
    device_failed: Arc<AtomicBool>,
    underruns: u64,
    budget: Duration,
}

impl Session {
    fn start(
        config: &EngineConfig,
        params: Arc<ParameterStore>,
        io_factory: IoFactory,
        event_sender: &Sender<Event>,
    ) -> EngineResult<Self> {
        let frames = Arc::new(FrameBuffer::with_capacity(config.frame_buffer_frames));
        let pipeline = Pipeline::new(config, params)?;

        let (sink_tx, sink_rx) = bounded::<EngineResult<Box<dyn PlaybackSink>>>(1);
        let capture_stop = Arc::new(AtomicBool::new(false));
        let overruns = Arc::new(AtomicU64::new(0));
        let device_failed = Arc::new(AtomicBool::new(false));

        let stream_config = config.stream;
        let capture_frames = Arc::clone(&frames);
        let capture_stop_flag = Arc::clone(&capture_stop);
        let capture_overruns = Arc::clone(&overruns);
        let capture_failed = Arc::clone(&device_failed);
        let capture_events = event_sender.clone();

        let capture_thread = thread::Builder::new()
            .name("cadence-io".into())
            .spawn(move || {
                capture_main(
                    io_factory,
                    stream_config,
                    capture_frames,
                    sink_tx,
                    capture_stop_flag,
                    capture_overruns,
                    capture_failed,
                    capture_events,
                );
            })
            .map_err(|e| EngineError::StreamBuildError(e.to_string()))?;

        // The capture thread opens the device; wait for its playback half
        let sink = match sink_rx.recv_timeout(Duration::from_secs(5)) {
            Ok(Ok(sink)) => sink,
            Ok(Err(e)) => {
                let _ = capture_thread.join();
                return Err(e);
            }
            Err(_) => {
                capture_stop.store(true, Ordering::SeqCst);
                let _ = capture_thread.join();
                return Err(EngineError::StreamBuildError(
                    "device boundary did not open in time".into(),
                ));
            }
        };

        Ok(Self {
            frames,
            pipeline,
            sink,
            capture_stop,
            capture_thread: Some(capture_thread),
            overruns,
            device_failed,
            underruns: 0,
            budget: config.stream.frame_budget(),
        })
    }

    /// Process all frames waiting in the buffer, strictly FIFO
    fn drain(&mut self, events: &Sender<Event>) {
        while let Some(frame) = self.frames.pop() {
            let started = Instant::now();
            match self.pipeline.process(frame) {
                Ok(out) => {
                    if started.elapsed() > self.budget {
                        // Missed the real-time deadline: drop, report, move
                        // on - retrying would accumulate unbounded latency
                        self.underruns += 1;
                        warn!(
                            timestamp = out.frame.timestamp,
                            total = self.underruns,
                            "frame exceeded real-time budget, dropped"
                        );
                        let _ = events.try_send(Event::Underrun {
                            timestamp: out.frame.timestamp,
                        });
                        continue;
                    }

                    if let Err(e) = self.sink.submit(&out.frame) {
                        warn!("output submit failed: {e}");
                    }

                    let _ = events.try_send(Event::Spectrum {
                        bins: out.spectrum.bins,
                        bin_hz: out.spectrum.bin_hz,
                    });
                    if let Some(onset) = out.onset {
                        debug!(
                            timestamp = onset.timestamp,
                            strength = onset.strength,
                            "onset"
                        );
                        let _ = events.try_send(Event::Onset {
                            timestamp: onset.timestamp,
                            strength: onset.strength,
                        });
                    }
                    if let Some(tempo) = out.tempo {
                        let _ = events.try_send(Event::Tempo {
                            bpm: tempo.bpm,
                            confidence: tempo.confidence,
                            updated_at: tempo.updated_at,
                        });
                    }
                }
                Err(e) => {
                    // Per-frame failure degrades to a skipped frame; the
                    // stream keeps going
                    warn!("frame skipped: {e}");
                }
            }
        }
    }

    /// Cooperative teardown: the capture actor finishes its cycle and drops
    /// the device handles on its own thread
    fn stop(mut self) {
        self.capture_stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.capture_thread.take() {
            let _ = handle.join();
        }
    }
}

/// Capture actor main loop
///
/// Owns the device boundary for the session; frames flow into the
/// FrameBuffer under the rotate-drop overflow policy.
#[allow(clippy::too_many_arguments)]
fn capture_main(
    io_factory: IoFactory,
    stream_config: crate::config::StreamConfig,
    frames: Arc<FrameBuffer>,
    sink_tx: Sender<EngineResult<Box<dyn PlaybackSink>>>,
    stop: Arc<AtomicBool>,
    overruns: Arc<AtomicU64>,
    device_failed: Arc<AtomicBool>,
    event_sender: Sender<Event>,
) {
    let (mut source, playback) = match io_factory(&stream_config) {
        Ok(pair) => pair,
        Err(e) => {
            let _ = sink_tx.send(Err(e));
            return;
        }
    };
    let _ = sink_tx.send(Ok(playback));
    info!("Capture actor started");

    while !stop.load(Ordering::SeqCst) {
        match source.next_frame() {
            Ok(Some(frame)) => {
                if frames.push_rotate(frame).is_some() {
                    // Oldest frame evicted: processing is behind. Count it
                    // and keep capturing - never stall the device.
                    let total = overruns.fetch_add(1, Ordering::Relaxed) + 1;
                    warn!(total, "frame buffer overrun, oldest frame dropped");
                    let _ = event_sender.try_send(Event::Overrun { dropped: total });
                }
            }
            Ok(None) => {
                // No frame this period
            }
            Err(e) => {
                error!("capture failed: {e}");
                device_failed.store(true, Ordering::Relaxed);
                let _ = event_sender.try_send(Event::error(e));
                break;
            }
        }
    }

    info!("Capture actor stopped");
    // `source` drops here, releasing the device on the thread that opened it
}
