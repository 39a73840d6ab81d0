//! Performance benchmarks for the processing pipeline
//!
//! Run with: cargo bench -p cadence_core
//!
//! The number to watch: a full cycle over a 1024-sample frame must land
//! well under the ~23ms real-time budget at 44.1kHz.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use cadence_core::{
    AudioFrame, EngineConfig, FrameBuffer, Param, ParamSnapshot, ParameterStore, Pipeline, Stage,
    StreamConfig,
};

fn test_frame(config: &StreamConfig, index: usize) -> AudioFrame {
    let len = config.samples_per_frame();
    let samples = (0..len)
        .map(|n| {
            let t = (index * len + n) as f32 / config.sample_rate as f32;
            0.4 * (2.0 * std::f32::consts::PI * 220.0 * t).sin()
        })
        .collect();
    AudioFrame::new(
        samples,
        index as f64 * config.frame_len as f64 / config.sample_rate as f64,
    )
}

fn benchmark_pipeline_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");

    for frame_len in [512_u32, 1024, 2048] {
        let config = EngineConfig {
            stream: StreamConfig {
                frame_len,
                ..StreamConfig::default()
            },
            ..EngineConfig::default()
        };
        group.throughput(Throughput::Elements(frame_len as u64));

        group.bench_function(format!("full_cycle_{}_frame", frame_len), |b| {
            let params = Arc::new(ParameterStore::new(
                config.stream.sample_rate as f32,
                ParamSnapshot::default(),
            ));
            params.set(Param::DistortionGain(8.0)).unwrap();
            params.set_stage_enabled(Stage::Filter, true);
            params.set_stage_enabled(Stage::Distortion, true);
            params.set_stage_enabled(Stage::Echo, true);
            params.set_stage_enabled(Stage::Reverb, true);

            let mut pipeline = Pipeline::new(&config, params).unwrap();
            let mut index = 0usize;

            b.iter(|| {
                let frame = test_frame(&config.stream, index);
                index += 1;
                black_box(pipeline.process(black_box(frame)).unwrap());
            });
        });
    }

    group.finish();
}

fn benchmark_frame_buffer(c: &mut Criterion) {
    c.bench_function("frame_buffer_push_pop", |b| {
        let buffer = FrameBuffer::with_capacity(8);
        let config = StreamConfig::default();

        b.iter(|| {
            buffer.push_rotate(test_frame(&config, 0));
            black_box(buffer.pop());
        });
    });
}

criterion_group!(benches, benchmark_pipeline_cycle, benchmark_frame_buffer);
criterion_main!(benches);
