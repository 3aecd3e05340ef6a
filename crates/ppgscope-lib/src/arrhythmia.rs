use crate::{
    error::{PpgError, Result},
    features::FeatureSet,
    preprocess::median,
    signal::{Events, RRSeries},
};
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Relative deviation from the median RR above which an interval is irregular.
    pub deviation_threshold: f64,
    /// RR standard deviation (s) above which the whole rhythm is irregular.
    pub sdnn_threshold_s: f64,
    /// Relative deviation from the median pulse amplitude counted as abnormal.
    pub amplitude_tolerance: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            deviation_threshold: 0.2,
            sdnn_threshold_s: 0.15,
            amplitude_tolerance: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeatLabel {
    Normal,
    Irregular,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabeledInterval {
    /// Position in the RR series
    pub index: usize,
    pub start_s: f64,
    pub end_s: f64,
    pub rr_s: f64,
    /// Signed deviation from the median RR, relative to the median
    pub deviation: f64,
    pub label: BeatLabel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub intervals: Vec<LabeledInterval>,
    pub median_rr_s: f64,
    pub irregular_rhythm: bool,
    pub abnormal_waveform: bool,
    /// First to last irregular interval, in seconds
    pub irregular_segment: Option<(f64, f64)>,
}

impl DetectionResult {
    pub fn irregular_indices(&self) -> Vec<usize> {
        self.intervals
            .iter()
            .filter(|iv| iv.label == BeatLabel::Irregular)
            .map(|iv| iv.index)
            .collect()
    }

    pub fn arrhythmia_detected(&self) -> bool {
        self.irregular_rhythm || self.intervals.iter().any(|iv| iv.label == BeatLabel::Irregular)
    }
}

/// Reject empty, non-finite or non-positive RR intervals.
pub fn validate_rr(rr: &RRSeries) -> Result<()> {
    if rr.is_empty() {
        return Err(PpgError::invalid("RR series is empty"));
    }
    if let Some((idx, value)) = rr
        .rr
        .iter()
        .enumerate()
        .find(|(_, v)| !v.is_finite() || **v <= 0.0)
    {
        return Err(PpgError::invalid(format!(
            "RR interval {} is not a positive duration ({})",
            idx, value
        )));
    }
    Ok(())
}

/// Label each interval by its deviation from the median interval.
pub fn classify_intervals(rr: &RRSeries, cfg: &DetectionConfig) -> Result<Vec<(f64, BeatLabel)>> {
    validate_rr(rr)?;
    let med = median(&rr.rr);
    Ok(rr
        .rr
        .iter()
        .map(|&r| {
            let deviation = (r - med) / med;
            let label = if deviation.abs() > cfg.deviation_threshold {
                BeatLabel::Irregular
            } else {
                BeatLabel::Normal
            };
            (deviation, label)
        })
        .collect())
}

/// Population standard deviation of RR above `sdnn_threshold_s`.
pub fn is_irregular_rhythm(rr: &RRSeries, sdnn_threshold_s: f64) -> bool {
    let Some(mean) = rr.mean() else {
        return false;
    };
    let var = rr.rr.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / rr.len() as f64;
    var.sqrt() > sdnn_threshold_s
}

/// Any pulse amplitude further than `tolerance` (relative) from the median amplitude.
pub fn is_abnormal_waveform(amplitudes: &[f64], tolerance: f64) -> bool {
    if amplitudes.is_empty() {
        return false;
    }
    let med = median(amplitudes);
    if med <= 0.0 {
        return false;
    }
    amplitudes
        .iter()
        .any(|a| ((a - med) / med).abs() > tolerance)
}

fn check_beats(beats: &Events, rr: &RRSeries) -> Result<()> {
    if beats.len() != rr.len() + 1 {
        return Err(PpgError::invalid(format!(
            "{} beats cannot produce {} RR intervals",
            beats.len(),
            rr.len()
        )));
    }
    if beats.indices.windows(2).any(|w| w[1] <= w[0]) {
        return Err(PpgError::invalid("beat indices are not strictly increasing"));
    }
    Ok(())
}

/// Classify every RR interval of a feature set and summarise the rhythm.
pub fn detect_arrhythmia(features: &FeatureSet, cfg: &DetectionConfig) -> Result<DetectionResult> {
    if !features.fs.is_finite() || features.fs <= 0.0 {
        return Err(PpgError::invalid(format!(
            "sampling rate must be positive, got {}",
            features.fs
        )));
    }
    let labels = classify_intervals(&features.rr, cfg)?;
    check_beats(&features.beats, &features.rr)?;

    let times = features.beats.times(features.fs);
    let intervals: Vec<LabeledInterval> = labels
        .into_iter()
        .enumerate()
        .map(|(index, (deviation, label))| LabeledInterval {
            index,
            start_s: times[index],
            end_s: times[index + 1],
            rr_s: features.rr.rr[index],
            deviation,
            label,
        })
        .collect();

    let irregular_rhythm = is_irregular_rhythm(&features.rr, cfg.sdnn_threshold_s);
    let abnormal_waveform = is_abnormal_waveform(&features.pulse_amplitudes, cfg.amplitude_tolerance);

    let mut flagged = intervals
        .iter()
        .filter(|iv| iv.label == BeatLabel::Irregular);
    let irregular_segment = match flagged.next() {
        Some(first) => {
            let last = flagged.last().unwrap_or(first);
            Some((first.start_s, last.end_s))
        }
        None if irregular_rhythm => Some((times[0], times[times.len() - 1])),
        None => None,
    };

    let result = DetectionResult {
        median_rr_s: median(&features.rr.rr),
        intervals,
        irregular_rhythm,
        abnormal_waveform,
        irregular_segment,
    };
    debug!(
        "{} of {} intervals irregular, rhythm irregular: {}",
        result.irregular_indices().len(),
        result.intervals.len(),
        irregular_rhythm
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        features::{extract_features, FeatureConfig},
        preprocess::{preprocess, PreprocessConfig},
        signal::TimeSeries,
        simulate::{synthesize, BeatPause, SyntheticPpg},
    };

    fn rr(values: &[f64]) -> RRSeries {
        RRSeries {
            rr: values.to_vec(),
        }
    }

    #[test]
    fn single_outlier_interval_is_flagged() {
        let mut values = vec![0.8; 12];
        values[5] = 1.25;
        let labels = classify_intervals(&rr(&values), &DetectionConfig::default()).unwrap();
        let flagged: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, (_, l))| *l == BeatLabel::Irregular)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(flagged, vec![5]);
    }

    #[test]
    fn malformed_rr_is_rejected() {
        let cfg = DetectionConfig::default();
        for bad in [vec![], vec![0.8, -0.1], vec![0.8, f64::NAN], vec![0.0]] {
            assert!(matches!(
                classify_intervals(&rr(&bad), &cfg),
                Err(PpgError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn rhythm_and_waveform_flags() {
        assert!(!is_irregular_rhythm(&rr(&[0.8, 0.82, 0.79]), 0.15));
        assert!(is_irregular_rhythm(&rr(&[0.4, 1.2, 0.4, 1.2]), 0.15));
        assert!(!is_abnormal_waveform(&[1.0, 0.95, 1.05], 0.5));
        assert!(is_abnormal_waveform(&[1.0, 0.95, 0.2, 1.05], 0.5));
        assert!(!is_abnormal_waveform(&[], 0.5));
    }

    #[test]
    fn injected_pause_flags_exactly_that_interval() {
        let cfg = SyntheticPpg {
            duration_s: 40.0,
            pause: Some(BeatPause {
                beat: 12,
                factor: 1.6,
            }),
            ..SyntheticPpg::default()
        };
        let cleaned = preprocess(&synthesize(&cfg), &PreprocessConfig::default()).unwrap();
        let features = extract_features(&cleaned, &FeatureConfig::default()).unwrap();
        let result = detect_arrhythmia(&features, &DetectionConfig::default()).unwrap();
        assert_eq!(result.irregular_indices(), vec![11]);
        let (start, end) = result.irregular_segment.expect("segment");
        assert!(end > start);
        assert!(result.arrhythmia_detected());
    }

    #[test]
    fn regular_recording_is_clean() {
        let cleaned = preprocess(
            &synthesize(&SyntheticPpg::default()),
            &PreprocessConfig::default(),
        )
        .unwrap();
        let features = extract_features(&cleaned, &FeatureConfig::default()).unwrap();
        let result = detect_arrhythmia(&features, &DetectionConfig::default()).unwrap();
        assert!(result.irregular_indices().is_empty());
        assert!(!result.irregular_rhythm);
        assert!(!result.abnormal_waveform);
        assert_eq!(result.irregular_segment, None);
        assert_eq!(result.intervals.len(), features.rr.len());
    }

    #[test]
    fn regular_signal_starting_near_a_peak_is_not_abnormal() {
        let fs = 100.0;
        let ts = TimeSeries::new(
            fs,
            (0..3000)
                .map(|i| (2.0 * std::f64::consts::PI * 1.2 * (i as f64 / fs - 0.05)).cos())
                .collect(),
        );
        let features = extract_features(&ts, &FeatureConfig::default()).unwrap();
        let result = detect_arrhythmia(&features, &DetectionConfig::default()).unwrap();
        assert!(result.irregular_indices().is_empty());
        assert!(!result.abnormal_waveform, "{:?}", features.pulse_amplitudes);
    }

    #[test]
    fn inconsistent_beats_are_rejected() {
        let cleaned = preprocess(
            &synthesize(&SyntheticPpg::default()),
            &PreprocessConfig::default(),
        )
        .unwrap();
        let mut features = extract_features(&cleaned, &FeatureConfig::default()).unwrap();
        features.beats.indices.pop();
        assert!(matches!(
            detect_arrhythmia(&features, &DetectionConfig::default()),
            Err(PpgError::InvalidInput(_))
        ));
    }
}
