use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use wavecnn::acoustics::{FormantSettings, PitchSettings, formants_at, pitch_at};
use wavecnn::config::SynthesisSettings;
use wavecnn::sampling::KlattParams;
use wavecnn::synthesis::{VcvPlan, synthesize};

fn token() -> Vec<f32> {
    let settings = SynthesisSettings::default();
    let row = KlattParams {
        name: "bench_x_b_aa_0".to_string(),
        closure_voicing_dur: 0.03,
        closure_dur: 0.08,
        f1_offset: 450.0,
        f1_steady: 700.0,
        f0_offset: 110.0,
        f0_steady: 120.0,
    };
    let plan = VcvPlan::from_params(&row, &settings).expect("bench plan");
    synthesize(&plan, &settings, 1)
}

fn bench_measurements(c: &mut Criterion) {
    let samples = token();
    let pitch = PitchSettings::default();
    let formants = FormantSettings::default();
    c.bench_function("pitch_at", |b| {
        b.iter(|| pitch_at(black_box(&samples), 16_000, black_box(0.125), &pitch))
    });
    c.bench_function("formants_at", |b| {
        b.iter(|| formants_at(black_box(&samples), 16_000, black_box(0.125), &formants))
    });
}

criterion_group!(benches, bench_measurements);
criterion_main!(benches);
