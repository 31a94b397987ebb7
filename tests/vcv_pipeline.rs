use std::fmt::Write as _;
use std::path::Path;

use tempfile::TempDir;
use wavecnn::audio::{DecodeOptions, decode_audio, write_wav};
use wavecnn::config::{MeasurementSettings, SamplingSettings, SynthesisSettings};
use wavecnn::dataset::read_labels;
use wavecnn::sampling::{
    KlattParams, read_params_table, sample_batch, write_params_table, write_sample_metadata,
};
use wavecnn::summary::{summarize_table, write_histograms};
use wavecnn::synthesis::{VcvPlan, synthesize, synthesize_table};
use wavecnn::vcv::{
    Measure, Position, StopVoicing, VcvDistributions, measure_directory, read_measurements,
    read_tokens_csv, write_tokens_csv,
};

/// `(tier, [(xmin, xmax, text)])` written as a long-format TextGrid.
fn write_textgrid(path: &Path, xmax: f64, tiers: &[(&str, Vec<(f64, f64, &str)>)]) {
    let mut text = String::new();
    writeln!(text, "File type = \"ooTextFile\"\nObject class = \"TextGrid\"\n").unwrap();
    writeln!(text, "xmin = 0\nxmax = {xmax}\ntiers? <exists>").unwrap();
    writeln!(text, "size = {}\nitem []:", tiers.len()).unwrap();
    for (index, (name, intervals)) in tiers.iter().enumerate() {
        writeln!(text, "    item [{}]:", index + 1).unwrap();
        writeln!(text, "        class = \"IntervalTier\"\n        name = \"{name}\"").unwrap();
        writeln!(text, "        xmin = 0\n        xmax = {xmax}").unwrap();
        writeln!(text, "        intervals: size = {}", intervals.len()).unwrap();
        for (i, (start, end, label)) in intervals.iter().enumerate() {
            writeln!(text, "        intervals [{}]:", i + 1).unwrap();
            writeln!(text, "            xmin = {start}\n            xmax = {end}").unwrap();
            writeln!(text, "            text = \"{label}\"").unwrap();
        }
    }
    std::fs::write(path, text).unwrap();
}

fn params(name: &str, voicing: f32, closure: f32) -> KlattParams {
    KlattParams {
        name: name.into(),
        closure_voicing_dur: voicing,
        closure_dur: closure,
        f1_offset: 450.0,
        f1_steady: 700.0,
        f0_offset: 110.0,
        f0_steady: 120.0,
    }
}

/// Synthesize one token into `speaker_dir` with a TextGrid marking its segments.
fn write_annotated_token(speaker_dir: &Path, stem: &str, stop: &str, voicing: f32, closure: f32) {
    let settings = SynthesisSettings::default();
    let row = params(&format!("ref_x_{stop}_aa_0"), voicing, closure);
    let plan = VcvPlan::from_params(&row, &settings).unwrap();
    let samples = synthesize(&plan, &settings, 1);
    write_wav(&speaker_dir.join(format!("{stem}.wav")), &samples, settings.sample_rate).unwrap();

    let v1_end = 0.25;
    let closure_end = v1_end + closure as f64;
    let aspiration = if matches!(stop, "b" | "d" | "g") { 0.01 } else { 0.05 };
    let v2_start = closure_end + 0.008 + aspiration;
    let end = plan.duration();
    let voicing_end = v1_end + voicing as f64;
    write_textgrid(
        &speaker_dir.join(format!("{stem}.TextGrid")),
        end,
        &[
            (
                "voicing",
                vec![(0.0, voicing_end, "v"), (voicing_end, v2_start, ""), (v2_start, end, "v")],
            ),
            (
                "closure",
                vec![(0.0, v1_end, ""), (v1_end, closure_end, stop), (closure_end, end, "")],
            ),
            (
                "vowel",
                vec![(0.0, v1_end, "aa"), (v1_end, v2_start, ""), (v2_start, end, "aa")],
            ),
        ],
    );
}

#[test]
fn synthetic_token_measures_back_to_its_parameters() {
    let dir = TempDir::new().unwrap();
    let speaker = dir.path().join("spk1");
    std::fs::create_dir_all(&speaker).unwrap();
    write_annotated_token(&speaker, "aa_p_01", "p", 0.0, 0.1);

    let token = read_measurements(
        &speaker.join("aa_p_01.TextGrid"),
        &speaker.join("aa_p_01.wav"),
        &MeasurementSettings::default(),
    )
    .unwrap();
    assert_eq!(token.speaker, "spk1");
    assert_eq!(token.stop.label, "p");
    assert_eq!(token.stop.voicing(), StopVoicing::Voiceless);
    assert!((token.stop.closure_dur.unwrap() - 0.1).abs() < 1e-4);
    assert!(token.stop.voicing_dur.unwrap().abs() < 1e-4);
    assert_eq!(token.vowel1.label, "aa");

    let f0 = token.vowel1.get(Measure::F0, Position::Steady).unwrap();
    assert!((f0 - 120.0).abs() < 10.0, "f0 {f0}");
    let f1 = token.vowel1.get(Measure::F1, Position::Steady).unwrap();
    assert!((f1 - 700.0).abs() < 150.0, "F1 {f1}");
    let v2_f0 = token.vowel2.get(Measure::F0, Position::Steady).unwrap();
    assert!((v2_f0 - 120.0).abs() < 10.0, "V2 f0 {v2_f0}");
}

#[test]
fn measured_corpus_feeds_sampling_synthesis_and_summary() {
    let dir = TempDir::new().unwrap();
    let speaker = dir.path().join("spk1");
    std::fs::create_dir_all(&speaker).unwrap();
    write_annotated_token(&speaker, "aa_b_01", "b", 0.04, 0.07);
    write_annotated_token(&speaker, "aa_d_02", "d", 0.05, 0.08);
    write_annotated_token(&speaker, "aa_t_03", "t", 0.0, 0.11);
    write_annotated_token(&speaker, "aa_k_04", "k", 0.0, 0.12);
    // Unannotated audio and a grid without audio are skipped.
    std::fs::copy(speaker.join("aa_b_01.wav"), speaker.join("stray.wav")).unwrap();
    std::fs::copy(speaker.join("aa_b_01.TextGrid"), speaker.join("aa_g_05.TextGrid")).unwrap();

    let distributions = measure_directory(&speaker, &MeasurementSettings::default()).unwrap();
    assert_eq!(distributions.voiced.len(), 2);
    assert_eq!(distributions.voiceless.len(), 2);

    let tokens_csv = dir.path().join("tokens.csv");
    write_tokens_csv(&tokens_csv, distributions.all()).unwrap();
    let mut reread = VcvDistributions::default();
    for token in read_tokens_csv(&tokens_csv).unwrap() {
        reread.push(token);
    }
    assert_eq!(reread.len(), 4);

    let sampling = SamplingSettings {
        voiced_count: 3,
        voiceless_count: 2,
        ..SamplingSettings::default()
    };
    let sampled = sample_batch(&reread, &sampling).unwrap();
    assert_eq!(sampled.len(), 5);
    for token in &sampled {
        assert!(token.params.closure_voicing_dur <= token.params.closure_dur);
        assert!(token.params.f0_steady >= sampling.min_f0);
    }

    let params_csv = dir.path().join("params.csv");
    let rows: Vec<KlattParams> = sampled.iter().map(|t| t.params.clone()).collect();
    write_params_table(&params_csv, &rows).unwrap();
    assert_eq!(read_params_table(&params_csv).unwrap(), rows);
    let meta_csv = dir.path().join("meta.csv");
    write_sample_metadata(&meta_csv, &sampled).unwrap();
    let meta = read_labels(&meta_csv).unwrap();
    assert_eq!(meta.len(), 5);
    assert_eq!(meta.values().filter(|c| *c == "voiced").count(), 3);

    let out = dir.path().join("synth");
    let report = synthesize_table(&params_csv, &out, &SynthesisSettings::default()).unwrap();
    assert_eq!(report.written.len(), 5);
    let clip = decode_audio(
        &report.written[0],
        &DecodeOptions {
            sample_rate: None,
            normalize: false,
            ..DecodeOptions::default()
        },
    )
    .unwrap();
    assert_eq!(clip.sample_rate, 16_000);
    let peak = clip.samples.iter().fold(0.0_f32, |m, v| m.max(v.abs()));
    assert!((peak - 0.9).abs() < 0.01, "peak {peak}");
    let synth_meta = read_labels(&report.metadata).unwrap();
    assert_eq!(synth_meta, meta);

    let summaries = summarize_table(&params_csv, 4).unwrap();
    let hist = dir.path().join("hist.csv");
    write_histograms(&hist, &summaries).unwrap();
    let text = std::fs::read_to_string(hist).unwrap();
    assert!(text.lines().skip(1).all(|line| line.starts_with(char::is_alphabetic)));
    assert!(text.contains("ClosureDur,voiceless,"));
}
