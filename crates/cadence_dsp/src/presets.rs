//! Built-in Effect Presets

use crate::distortion::DistortionParams;
use crate::echo::EchoParams;
use crate::filter::{FilterKind, FilterParams};
use crate::processor::ChainParams;
use crate::reverb::ReverbParams;

/// Named chain configuration
pub type Preset = (&'static str, ChainParams);

const fn chain(
    filter: FilterParams,
    distortion: DistortionParams,
    echo: EchoParams,
    reverb: ReverbParams,
) -> ChainParams {
    ChainParams {
        filter,
        distortion,
        echo,
        reverb,
    }
}

/// List of built-in presets
pub const PRESETS: &[Preset] = &[
    (
        "Flat",
        chain(
            FilterParams { cutoff_hz: 1000.0, kind: FilterKind::LowPass, enabled: false },
            DistortionParams { gain: 2.0, enabled: false },
            EchoParams { delay_ms: 300.0, feedback: 0.4, enabled: false },
            ReverbParams { decay: 0.5, room_size: 0.5, enabled: false },
        ),
    ),
    (
        "Slapback",
        chain(
            FilterParams { cutoff_hz: 1000.0, kind: FilterKind::LowPass, enabled: false },
            DistortionParams { gain: 2.0, enabled: false },
            EchoParams { delay_ms: 90.0, feedback: 0.25, enabled: true },
            ReverbParams { decay: 0.3, room_size: 0.2, enabled: true },
        ),
    ),
    (
        "Cavern",
        chain(
            FilterParams { cutoff_hz: 1000.0, kind: FilterKind::LowPass, enabled: false },
            DistortionParams { gain: 2.0, enabled: false },
            EchoParams { delay_ms: 600.0, feedback: 0.55, enabled: true },
            ReverbParams { decay: 0.85, room_size: 1.0, enabled: true },
        ),
    ),
    (
        "Crunch",
        chain(
            FilterParams { cutoff_hz: 4000.0, kind: FilterKind::LowPass, enabled: true },
            DistortionParams { gain: 12.0, enabled: true },
            EchoParams { delay_ms: 300.0, feedback: 0.4, enabled: false },
            ReverbParams { decay: 0.4, room_size: 0.3, enabled: true },
        ),
    ),
    (
        "Telephone",
        chain(
            FilterParams { cutoff_hz: 1700.0, kind: FilterKind::BandPass, enabled: true },
            DistortionParams { gain: 6.0, enabled: true },
            EchoParams { delay_ms: 300.0, feedback: 0.4, enabled: false },
            ReverbParams { decay: 0.5, room_size: 0.5, enabled: false },
        ),
    ),
];

/// Look up a preset by name (case-insensitive)
pub fn find(name: &str) -> Option<ChainParams> {
    PRESETS
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, p)| *p)
}
