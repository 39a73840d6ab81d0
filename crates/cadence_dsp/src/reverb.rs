//! Reverb Effect
//!
//! A single feedback comb: the signal is recirculated through a short delay
//! scaled by the room size, decaying by the decay factor per pass. The dry
//! signal passes at unity; only the reflections carry a 0.7 make-up factor,
//! so the summed tail never pushes the level past the dry signal and
//! enabling the stage on a primed (zeroed) line is seamless.
//!
//! Deliberately the simple comb from the interactive rig rather than a full
//! Schroeder network; it reads as "room" at small decay and "cavern" near 1.

use crate::processor::{Effect, ProcessContext};

/// Comb delay at room_size = 0.5 (milliseconds)
const BASE_DELAY_MS: f32 = 50.0;

/// Make-up scaling applied to the reflections (the dry path stays at unity)
const WET_SCALE: f32 = 0.7;

/// Reverb stage configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReverbParams {
    /// Tail persistence per pass, [0, 1)
    pub decay: f32,
    /// Comb delay scale, [0, 1]: 0 is a tight 10ms slap, 1 a 90ms wash
    pub room_size: f32,
    pub enabled: bool,
}

impl Default for ReverbParams {
    fn default() -> Self {
        Self {
            decay: 0.5,
            room_size: 0.5,
            enabled: false,
        }
    }
}

/// Feedback comb over interleaved frames
pub struct Reverb {
    line: Vec<f32>,
    capacity_frames: usize,
    write_pos: usize,
    delay_frames: usize,
    decay: f32,
    channels: usize,
    sample_rate: f32,
}

impl Reverb {
    pub fn new(sample_rate: f32, channels: usize, params: ReverbParams) -> Self {
        // Size the line for the longest room up front; the tap moves freely
        let max_frames = Self::frames_for(sample_rate, 1.0);
        let delay_frames = Self::frames_for(sample_rate, params.room_size);
        Self {
            line: vec![0.0; max_frames * channels],
            capacity_frames: max_frames,
            write_pos: 0,
            delay_frames,
            decay: params.decay.clamp(0.0, 0.99),
            channels,
            sample_rate,
        }
    }

    fn frames_for(sample_rate: f32, room_size: f32) -> usize {
        let delay_ms = BASE_DELAY_MS * (0.2 + 1.6 * room_size.clamp(0.0, 1.0));
        ((delay_ms / 1000.0 * sample_rate).round() as usize).max(1)
    }

    pub fn set_decay(&mut self, decay: f32) {
        self.decay = decay.clamp(0.0, 0.99);
    }

    pub fn set_room_size(&mut self, room_size: f32) {
        self.delay_frames = Self::frames_for(self.sample_rate, room_size);
    }

    pub fn apply_params(&mut self, next: ReverbParams) {
        self.set_decay(next.decay);
        self.set_room_size(next.room_size);
    }
}

impl Effect for Reverb {
    /// # Real-time Safety
    /// No allocations. O(n) where n = buffer length.
    #[inline]
    fn process(&mut self, buffer: &mut [f32], _ctx: &ProcessContext) {
        let channels = self.channels;
        for frame in buffer.chunks_exact_mut(channels) {
            let read_pos =
                (self.write_pos + self.capacity_frames - self.delay_frames) % self.capacity_frames;
            for (ch, sample) in frame.iter_mut().enumerate() {
                let tail = self.decay * self.line[read_pos * channels + ch];
                // Recirculate unscaled so the decay curve is exactly decay^n
                self.line[self.write_pos * channels + ch] = *sample + tail;
                *sample += WET_SCALE * tail;
            }
            self.write_pos = (self.write_pos + 1) % self.capacity_frames;
        }
    }

    fn reset(&mut self) {
        self.line.fill(0.0);
        self.write_pos = 0;
    }

    fn name(&self) -> &'static str {
        "Reverb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ProcessContext {
        ProcessContext::new(44100.0, 1, 1024)
    }

    #[test]
    fn test_tail_at_room_delay() {
        let params = ReverbParams {
            decay: 0.5,
            room_size: 0.5, // 50ms -> 2205 frames
            enabled: true,
        };
        let mut reverb = Reverb::new(44100.0, 1, params);

        let mut signal = vec![0.0; 5000];
        signal[0] = 1.0;
        reverb.process(&mut signal, &ctx());

        assert_eq!(signal[0], 1.0, "dry path must stay at unity");
        let repeat = signal[2205];
        assert!(
            (repeat - 0.5 * WET_SCALE).abs() < 1e-6,
            "comb repeat missing: {repeat}"
        );
    }

    #[test]
    fn test_small_room_shorter_delay() {
        let params = ReverbParams {
            decay: 0.5,
            room_size: 0.0, // 10ms -> 441 frames
            enabled: true,
        };
        let mut reverb = Reverb::new(44100.0, 1, params);

        let mut signal = vec![0.0; 1000];
        signal[0] = 1.0;
        reverb.process(&mut signal, &ctx());

        assert!(signal[441].abs() > 0.0, "small-room repeat missing");
    }

    #[test]
    fn test_zero_decay_no_tail() {
        let params = ReverbParams {
            decay: 0.0,
            room_size: 0.5,
            enabled: true,
        };
        let mut reverb = Reverb::new(44100.0, 1, params);

        let mut signal = vec![0.0; 5000];
        signal[0] = 1.0;
        reverb.process(&mut signal, &ctx());

        assert_eq!(signal[2205], 0.0);
    }

    #[test]
    fn test_decay_shrinks_tail() {
        let mut signal = vec![0.0; 10000];
        signal[0] = 1.0;

        let mut reverb = Reverb::new(
            44100.0,
            1,
            ReverbParams {
                decay: 0.9,
                room_size: 0.5,
                enabled: true,
            },
        );
        reverb.process(&mut signal, &ctx());

        let first = signal[2205].abs();
        let second = signal[4410].abs();
        assert!(second < first, "tail must decay: {first} then {second}");
        assert!(second > 0.0, "tail should still ring at decay 0.9");
    }

    #[test]
    fn test_reset_clears_tail() {
        let params = ReverbParams {
            decay: 0.9,
            room_size: 0.2,
            enabled: true,
        };
        let mut reverb = Reverb::new(44100.0, 1, params);

        let mut signal = vec![1.0; 4000];
        reverb.process(&mut signal, &ctx());

        reverb.reset();
        let mut silence = vec![0.0; 4000];
        reverb.process(&mut silence, &ctx());
        assert!(silence.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_room_change_live_is_safe() {
        let mut reverb = Reverb::new(44100.0, 2, ReverbParams::default());
        let mut buffer = vec![0.5; 2048];
        reverb.process(&mut buffer, &ctx());

        reverb.set_room_size(1.0);
        reverb.process(&mut buffer, &ctx());
        for sample in &buffer {
            assert!(sample.is_finite());
        }
    }
}
