use crate::{
    detectors::{detect_beats, find_peaks, BeatDetectorConfig},
    error::{PpgError, Result},
    filter::SosFilter,
    metrics::{hrv_summary, signal_quality, HrvSummary, SignalQuality},
    preprocess::{median, min_max},
    signal::{Events, RRSeries, TimeSeries},
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Respiratory band and breath spacing used for the respiratory rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RespiratoryConfig {
    pub low_hz: f64,
    pub high_hz: f64,
    /// Minimum spacing between breaths (seconds).
    pub min_breath_interval_s: f64,
    /// Only count breath peaks above the median of the band-passed signal,
    /// which drops small maxima inside the troughs.
    pub above_median: bool,
}

impl Default for RespiratoryConfig {
    fn default() -> Self {
        Self {
            low_hz: 0.1,
            high_hz: 0.5,
            min_breath_interval_s: 2.0,
            above_median: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub beats: BeatDetectorConfig,
    pub respiration: RespiratoryConfig,
}

/// Mean and per-beat heart rate derived from detected beats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartRate {
    pub rr: RRSeries,
    /// 60 / mean RR
    pub mean_bpm: f64,
    /// 60 / RR for every interval
    pub instantaneous_bpm: Vec<f64>,
}

/// Everything derived from one cleaned signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    pub fs: f64,
    pub sample_count: usize,
    pub beats: Events,
    pub rr: RRSeries,
    pub heart_rate_bpm: f64,
    pub instantaneous_bpm: Vec<f64>,
    pub hrv: HrvSummary,
    pub respiratory_rate_bpm: Option<f64>,
    pub systolic_amplitude: f64,
    pub pulse_amplitudes: Vec<f64>,
    pub quality: SignalQuality,
}

impl FeatureSet {
    /// Scalar features as `(name, value)` pairs for reports and bar charts.
    pub fn scalar_features(&self) -> Vec<(&'static str, Option<f64>)> {
        vec![
            ("Heart Rate (BPM)", Some(self.heart_rate_bpm)),
            ("Respiratory Rate (breaths/min)", self.respiratory_rate_bpm),
            ("Systolic Amplitude", Some(self.systolic_amplitude)),
            ("SDNN (s)", Some(self.hrv.sdnn)),
            ("RMSSD (s)", Some(self.hrv.rmssd)),
            ("pNN50", Some(self.hrv.pnn50)),
            ("SNR", Some(self.quality.snr)),
            ("Kurtosis", Some(self.quality.kurtosis)),
            ("Skewness", Some(self.quality.skewness)),
        ]
    }

    pub fn duration(&self) -> f64 {
        self.sample_count as f64 / self.fs
    }
}

/// RR intervals and heart rates from beat positions.
pub fn heart_rate(events: &Events, fs: f64) -> Result<HeartRate> {
    if events.len() < 2 {
        return Err(PpgError::InsufficientData {
            metric: "heart rate",
            needed: 2,
            found: events.len(),
        });
    }
    let rr = RRSeries::from_events(events, fs);
    let mean_rr = rr.mean().unwrap_or(0.0);
    if mean_rr <= 0.0 {
        return Err(PpgError::invalid("beat indices are not increasing"));
    }
    let instantaneous_bpm = rr.rr.iter().map(|r| 60.0 / r).collect();
    Ok(HeartRate {
        mean_bpm: 60.0 / mean_rr,
        instantaneous_bpm,
        rr,
    })
}

/// Breaths per minute from the respiratory band of the signal.
pub fn respiratory_rate(ts: &TimeSeries, cfg: &RespiratoryConfig) -> Result<f64> {
    ts.validate()?;
    let band = SosFilter::butter_bandpass(ts.fs, cfg.low_hz, cfg.high_hz)?.filtfilt(&ts.data);
    let distance = ((cfg.min_breath_interval_s * ts.fs).round() as usize).max(1);
    let height = cfg.above_median.then(|| median(&band));
    let breaths = find_peaks(&band, height, distance);
    if breaths.len() < 2 {
        return Err(PpgError::InsufficientData {
            metric: "respiratory rate",
            needed: 2,
            found: breaths.len(),
        });
    }
    let span = (breaths[breaths.len() - 1] - breaths[0]) as f64 / ts.fs;
    let mean_interval = span / (breaths.len() - 1) as f64;
    Ok(60.0 / mean_interval)
}

/// Peak-to-trough range of the signal.
pub fn systolic_amplitude(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let (lo, hi) = min_max(data);
    hi - lo
}

/// Per beat, peak value minus the lowest sample since the previous beat. The
/// first beat has no previous beat, so it is measured against the trough
/// before the next one; a recording that starts mid-upstroke would
/// otherwise give it a truncated amplitude.
pub fn pulse_amplitudes(data: &[f64], events: &Events) -> Vec<f64> {
    let peaks: Vec<usize> = events
        .indices
        .iter()
        .copied()
        .take_while(|&p| p < data.len())
        .collect();
    peaks
        .iter()
        .enumerate()
        .map(|(i, &peak)| {
            let window = match (i, peaks.get(i + 1)) {
                (0, Some(&next)) => &data[peak..=next],
                (0, None) => &data[..=peak],
                _ => &data[peaks[i - 1]..=peak],
            };
            let (trough, _) = min_max(window);
            data[peak] - trough
        })
        .collect()
}

/// Run beat detection and derive every feature of a cleaned signal.
pub fn extract_features(ts: &TimeSeries, cfg: &FeatureConfig) -> Result<FeatureSet> {
    ts.validate()?;
    let beats = detect_beats(ts, &cfg.beats)?;
    let hr = heart_rate(&beats, ts.fs)?;
    let hrv = hrv_summary(&hr.rr)?;
    let respiratory_rate_bpm = match respiratory_rate(ts, &cfg.respiration) {
        Ok(rate) => Some(rate),
        Err(err) => {
            warn!("respiratory rate unavailable: {}", err);
            None
        }
    };
    let quality = signal_quality(ts, &hr.rr);
    if !quality.is_acceptable() {
        warn!(
            "signal quality below threshold (snr {:.2}, rr cv {:.3}, spikes {:.3})",
            quality.snr, quality.rr_cv, quality.spike_ratio
        );
    }
    debug!(
        "{} beats, mean HR {:.1} bpm, SDNN {:.3} s",
        beats.len(),
        hr.mean_bpm,
        hrv.sdnn
    );
    Ok(FeatureSet {
        fs: ts.fs,
        sample_count: ts.len(),
        pulse_amplitudes: pulse_amplitudes(&ts.data, &beats),
        systolic_amplitude: systolic_amplitude(&ts.data),
        beats,
        rr: hr.rr,
        heart_rate_bpm: hr.mean_bpm,
        instantaneous_bpm: hr.instantaneous_bpm,
        hrv,
        respiratory_rate_bpm,
        quality,
    })
}
