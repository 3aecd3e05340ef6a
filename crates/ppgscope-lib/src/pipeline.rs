//! The full chain: preprocess, extract features, detect arrhythmia, then
//! write the report and plots for each recording.

use crate::{
    arrhythmia::{detect_arrhythmia, DetectionResult},
    config::{PipelineConfig, PlotConfig},
    error::Result as PpgResult,
    features::{extract_features, FeatureSet},
    io::{read_recording, summary_rows, write_json, write_summary_csv},
    plot::{
        feature_distribution_figure, heart_rate_figure, rr_figure, signal_figure, FileBackend,
        PlotBackend,
    },
    preprocess::preprocess,
    signal::TimeSeries,
};
use anyhow::{Context, Result};
use log::{debug, info};
use serde::Serialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub name: String,
    pub cleaned: TimeSeries,
    pub features: FeatureSet,
    pub detection: DetectionResult,
}

/// Run every stage on one raw signal.
pub fn analyze_signal(name: &str, raw: &TimeSeries, cfg: &PipelineConfig) -> PpgResult<AnalysisReport> {
    let cleaned = preprocess(raw, &cfg.preprocess)?;
    let features = extract_features(&cleaned, &cfg.features)?;
    let detection = detect_arrhythmia(&features, &cfg.detection)?;
    Ok(AnalysisReport {
        name: name.to_string(),
        cleaned,
        features,
        detection,
    })
}

/// Recordings in `data_dir` named `<prefix>*.csv`, minus `exclude`, sorted.
pub fn discover_recordings(data_dir: &Path, prefix: &str, exclude: &[String]) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(data_dir)
        .with_context(|| format!("failed to list {}", data_dir.display()))?;
    let mut found = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        if path.is_file() && is_csv && name.starts_with(prefix) && !exclude.iter().any(|x| x == name) {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "recording".to_string())
}

/// Render the plot set available from the given inputs into `out_dir`.
pub fn write_plots(
    out_dir: &Path,
    name: &str,
    signal: &TimeSeries,
    features: Option<&FeatureSet>,
    detection: Option<&DetectionResult>,
    cfg: &PlotConfig,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;
    let ext = cfg.format.extension();
    let mut figures = vec![(
        "signal_plot",
        signal_figure(
            "Filtered PPG Signal",
            signal,
            features.map(|f| &f.beats),
            detection,
            cfg.max_points,
        ),
    )];
    if let Some(features) = features {
        figures.push(("heart_rate", heart_rate_figure(features)));
        figures.push(("rr_intervals", rr_figure(&features.rr, detection, cfg.max_points)));
        figures.push(("feature_distribution", feature_distribution_figure(features)));
    }
    let mut written = Vec::with_capacity(figures.len());
    for (suffix, fig) in figures {
        let mut backend = FileBackend {
            path: out_dir.join(format!("{}_{}.{}", name, suffix, ext)),
            size: cfg.size(),
        };
        backend
            .draw(&fig)
            .with_context(|| format!("rendering {}", backend.path.display()))?;
        written.push(backend.path);
    }
    Ok(written)
}

/// Analyse one recording file and write its results into `results_dir`.
pub fn analyze_file(path: &Path, results_dir: &Path, cfg: &PipelineConfig) -> Result<AnalysisReport> {
    let recording = read_recording(path)?;
    debug!(
        "{}: {} samples at {} Hz",
        recording.name,
        recording.signal.len(),
        recording.signal.fs
    );
    let name = stem(path);
    let report = analyze_signal(&name, &recording.signal, cfg)
        .with_context(|| format!("analysing {}", path.display()))?;
    fs::create_dir_all(results_dir)
        .with_context(|| format!("failed to create {}", results_dir.display()))?;

    let rows = summary_rows(&report.features, Some(&report.detection));
    write_summary_csv(&results_dir.join(format!("{}_results.csv", name)), &rows)?;
    write_json(
        &results_dir.join(format!("{}_features.json", name)),
        &report.features,
    )?;
    write_json(
        &results_dir.join(format!("{}_detection.json", name)),
        &report.detection,
    )?;
    write_plots(
        results_dir,
        &name,
        &report.cleaned,
        Some(&report.features),
        Some(&report.detection),
        &cfg.plot,
    )?;
    info!("{}: results written to {}", name, results_dir.display());
    Ok(report)
}
