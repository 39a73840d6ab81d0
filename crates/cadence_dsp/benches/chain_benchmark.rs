//! Performance benchmarks for the DSP module
//!
//! Run with: cargo bench -p cadence_dsp

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use cadence_dsp::{ChainParams, EffectChain, OnsetDetector, SpectralAnalyzer};

const SAMPLE_RATE: f32 = 44100.0;

fn full_chain_params() -> ChainParams {
    let mut params = ChainParams::default();
    params.filter.enabled = true;
    params.distortion.enabled = true;
    params.distortion.gain = 8.0;
    params.echo.enabled = true;
    params.reverb.enabled = true;
    params
}

fn benchmark_chain_processing(c: &mut Criterion) {
    let mut group = c.benchmark_group("effect_chain");

    // Common frame sizes in audio applications
    let frame_sizes = [256, 512, 1024, 2048];

    for size in frame_sizes {
        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("all_stages_{}_frames", size), |b| {
            let mut chain = EffectChain::new(SAMPLE_RATE, 1, size).unwrap();
            chain.apply_params(full_chain_params()).unwrap();
            let mut buffer: Vec<f32> = (0..size).map(|i| (i as f32 * 0.001).sin()).collect();

            b.iter(|| {
                chain.process(black_box(&mut buffer));
            });
        });

        group.bench_function(format!("passthrough_{}_frames", size), |b| {
            let mut chain = EffectChain::new(SAMPLE_RATE, 1, size).unwrap();
            let mut buffer: Vec<f32> = (0..size).map(|i| (i as f32 * 0.001).sin()).collect();

            b.iter(|| {
                chain.process(black_box(&mut buffer));
            });
        });
    }

    group.finish();
}

fn benchmark_analysis(c: &mut Criterion) {
    let frame: Vec<f32> = (0..1024)
        .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / SAMPLE_RATE).sin())
        .collect();

    c.bench_function("spectrum_analyze_1024", |b| {
        let analyzer = SpectralAnalyzer::new(SAMPLE_RATE, 1024);
        b.iter(|| black_box(analyzer.analyze(black_box(&frame))));
    });

    c.bench_function("onset_observe_1024", |b| {
        let analyzer = SpectralAnalyzer::new(SAMPLE_RATE, 1024);
        let spectrum = analyzer.analyze(&frame);
        let mut detector = OnsetDetector::new(64);
        let params = cadence_dsp::DetectorParams::default();
        let mut t = 0.0_f64;

        b.iter(|| {
            t += 1024.0 / SAMPLE_RATE as f64;
            black_box(detector.observe(black_box(&spectrum), t, &params));
        });
    });
}

criterion_group!(benches, benchmark_chain_processing, benchmark_analysis);
criterion_main!(benches);
