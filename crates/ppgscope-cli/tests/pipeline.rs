use assert_cmd::cargo::cargo_bin_cmd;
use ppgscope_lib::{
    arrhythmia::DetectionResult, features::FeatureSet, io::load_signal, signal::TimeSeries,
};
use std::{error::Error, fs, path::Path};

fn run(args: &[&str]) -> Vec<u8> {
    let mut cmd = cargo_bin_cmd!("ppgscope");
    cmd.args(args);
    cmd.assert().success().get_output().stdout.clone()
}

fn arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

#[test]
fn stage_chain_from_simulation_to_plots() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let raw = dir.path().join("raw.csv");
    let cleaned = dir.path().join("cleaned.csv");
    let features = dir.path().join("features.json");
    let detection = dir.path().join("detection.json");
    let plots = dir.path().join("plots");

    run(&[
        "simulate",
        "--out",
        &arg(&raw),
        "--duration",
        "40",
        "--bpm",
        "75",
        "--pause-at-beat",
        "15",
        "--pause-factor",
        "1.7",
    ]);
    run(&["preprocess", "--input", &arg(&raw), "--out", &arg(&cleaned)]);

    let raw_ts = load_signal(&raw, None)?;
    let cleaned_ts = load_signal(&cleaned, None)?;
    assert_eq!(cleaned_ts.len(), raw_ts.len());
    assert_eq!(cleaned_ts.fs, raw_ts.fs);

    run(&["features", "--input", &arg(&cleaned), "--out", &arg(&features)]);
    let feature_set: FeatureSet = serde_json::from_str(&fs::read_to_string(&features)?)?;
    assert_close(feature_set.heart_rate_bpm, 74.0, 2.0);

    let stdout = run(&["detect", "--features", &arg(&features)]);
    let result: DetectionResult = serde_json::from_slice(&stdout)?;
    assert_eq!(result.irregular_indices(), vec![14]);
    fs::write(&detection, &stdout)?;

    let listing = run(&[
        "plot",
        "--input",
        &arg(&cleaned),
        "--features",
        &arg(&features),
        "--detection",
        &arg(&detection),
        "--out-dir",
        &arg(&plots),
        "--name",
        "pause",
    ]);
    let listing = String::from_utf8(listing)?;
    assert_eq!(listing.lines().count(), 4);
    for line in listing.lines() {
        assert!(fs::metadata(line)?.len() > 0, "{line} is empty");
    }
    assert!(plots.join("pause_signal_plot.png").exists());
    Ok(())
}

#[test]
fn features_reads_plain_samples_from_stdin() -> Result<(), Box<dyn Error>> {
    let fs_hz = 50.0;
    let samples: String = (0..1500)
        .map(|i| {
            let t = i as f64 / fs_hz;
            let phase = (t * 1.25).fract();
            format!("{}\n", (-((phase - 0.3) / 0.08).powi(2) / 2.0).exp())
        })
        .collect();
    let mut cmd = cargo_bin_cmd!("ppgscope");
    cmd.args(["features", "--fs", "50"]).write_stdin(samples);
    let output = cmd.assert().success().get_output().stdout.clone();
    let features: FeatureSet = serde_json::from_slice(&output)?;
    assert_eq!(features.fs, fs_hz);
    assert_eq!(features.sample_count, 1500);
    assert_close(features.heart_rate_bpm, 75.0, 1.0);
    Ok(())
}

#[test]
fn resample_changes_rate_and_keeps_duration() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let raw = dir.path().join("raw.csv");
    let out = dir.path().join("resampled.csv");
    run(&["simulate", "--out", &arg(&raw), "--fs", "200", "--duration", "10"]);
    run(&[
        "resample",
        "--input",
        &arg(&raw),
        "--target-fs",
        "50",
        "--out",
        &arg(&out),
    ]);
    let resampled: TimeSeries = load_signal(&out, None)?;
    assert_eq!(resampled.fs, 50.0);
    assert_eq!(resampled.len(), 500);
    Ok(())
}

#[test]
fn config_file_overrides_defaults() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let raw = dir.path().join("raw.csv");
    let plots = dir.path().join("plots");
    let config = dir.path().join("ppgscope.toml");
    fs::write(&config, "[plot]\nformat = \"svg\"\nwidth = 640\nheight = 360\n")?;
    run(&["simulate", "--out", &arg(&raw), "--duration", "10"]);
    run(&[
        "plot",
        "--config",
        &arg(&config),
        "--input",
        &arg(&raw),
        "--out-dir",
        &arg(&plots),
    ]);
    let svg = fs::read_to_string(plots.join("raw_signal_plot.svg"))?;
    assert!(svg.contains("<svg"));
    Ok(())
}

fn assert_close(a: f64, b: f64, tol: f64) {
    let diff = (a - b).abs();
    assert!(
        diff <= tol,
        "diff {} exceeded tol {} ({} vs {})",
        diff,
        tol,
        a,
        b
    );
}
