//! Result files: `Feature,Value` summaries and JSON stage outputs.

use crate::{arrhythmia::DetectionResult, features::FeatureSet};
use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::{fs, path::Path};

fn yes_no(flag: bool) -> String {
    let text = if flag { "Yes" } else { "No" };
    text.to_string()
}

/// Flatten features and detection flags into report rows.
pub fn summary_rows(
    features: &FeatureSet,
    detection: Option<&DetectionResult>,
) -> Vec<(String, String)> {
    let mut rows: Vec<(String, String)> = features
        .scalar_features()
        .into_iter()
        .map(|(name, value)| {
            let value = match value {
                Some(v) => format!("{:.4}", v),
                None => "N/A".to_string(),
            };
            (name.to_string(), value)
        })
        .collect();
    rows.push(("Beats".into(), features.beats.len().to_string()));
    if let Some(det) = detection {
        rows.push(("Arrhythmia Detected".into(), yes_no(det.arrhythmia_detected())));
        rows.push(("Irregular Rhythm".into(), yes_no(det.irregular_rhythm)));
        rows.push(("Abnormal Waveform".into(), yes_no(det.abnormal_waveform)));
        rows.push((
            "Irregular Intervals".into(),
            det.irregular_indices().len().to_string(),
        ));
        let segment = match det.irregular_segment {
            Some((start, end)) => format!("{:.2}-{:.2} s", start, end),
            None => "N/A".to_string(),
        };
        rows.push(("Irregular Segment".into(), segment));
    }
    rows
}

pub fn write_summary_csv(path: &Path, rows: &[(String, String)]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    writer.write_record(["Feature", "Value"])?;
    for (name, value) in rows {
        writer.write_record([name, value])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        arrhythmia::{detect_arrhythmia, DetectionConfig},
        features::{extract_features, FeatureConfig},
        preprocess::{preprocess, PreprocessConfig},
        simulate::{synthesize, SyntheticPpg},
    };

    fn analysed() -> (FeatureSet, DetectionResult) {
        let cleaned = preprocess(
            &synthesize(&SyntheticPpg::default()),
            &PreprocessConfig::default(),
        )
        .unwrap();
        let features = extract_features(&cleaned, &FeatureConfig::default()).unwrap();
        let detection = detect_arrhythmia(&features, &DetectionConfig::default()).unwrap();
        (features, detection)
    }

    #[test]
    fn summary_csv_has_feature_value_rows() {
        let (features, detection) = analysed();
        let rows = summary_rows(&features, Some(&detection));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("PPG-1_results.csv");
        write_summary_csv(&path, &rows).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        assert_eq!(reader.headers().unwrap(), vec!["Feature", "Value"]);
        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), rows.len());
        assert_eq!(&records[0][0], "Heart Rate (BPM)");
        let arrhythmia = records
            .iter()
            .find(|r| &r[0] == "Arrhythmia Detected")
            .unwrap();
        assert_eq!(&arrhythmia[1], "No");
    }

    #[test]
    fn missing_values_are_marked() {
        let (mut features, _) = analysed();
        features.respiratory_rate_bpm = None;
        let rows = summary_rows(&features, None);
        let resp = rows
            .iter()
            .find(|(name, _)| name.starts_with("Respiratory"))
            .unwrap();
        assert_eq!(resp.1, "N/A");
        assert!(rows.iter().all(|(name, _)| name != "Arrhythmia Detected"));
    }

    #[test]
    fn json_preserves_features() {
        let (features, detection) = analysed();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("features.json");
        write_json(&path, &features).unwrap();
        let back: FeatureSet = read_json(&path).unwrap();
        assert_eq!(back.beats, features.beats);
        assert_eq!(back.rr.len(), features.rr.len());

        let det_path = dir.path().join("detection.json");
        write_json(&det_path, &detection).unwrap();
        let back: DetectionResult = read_json(&det_path).unwrap();
        assert_eq!(back.intervals.len(), detection.intervals.len());
    }
}
