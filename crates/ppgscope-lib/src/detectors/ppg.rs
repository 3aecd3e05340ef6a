use crate::{
    detectors::peaks::find_peaks,
    error::Result,
    filter::SosFilter,
    preprocess::normalize,
    signal::{Events, TimeSeries},
};
use log::debug;
use serde::{Deserialize, Serialize};

/// Configurable parameters for systolic peak detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeatDetectorConfig {
    /// Lower edge of the pulse band (Hz).
    pub pulse_low_hz: f64,
    /// Upper edge of the pulse band (Hz), clamped below Nyquist.
    pub pulse_high_hz: f64,
    /// Minimum peak height on the [0, 1] normalised pulse-band signal.
    pub min_peak_height: f64,
    /// Refractory distance between beats (seconds).
    pub min_beat_interval_s: f64,
}

impl Default for BeatDetectorConfig {
    fn default() -> Self {
        Self {
            pulse_low_hz: 0.5,
            pulse_high_hz: 5.0,
            min_peak_height: 0.5,
            min_beat_interval_s: 0.4,
        }
    }
}

/// Isolate the cardiac component and rescale it to [0, 1].
pub fn pulse_band(ts: &TimeSeries, cfg: &BeatDetectorConfig) -> Result<Vec<f64>> {
    ts.validate()?;
    let mut data = ts.data.clone();
    if cfg.pulse_low_hz > 0.0 && cfg.pulse_low_hz < ts.fs * 0.5 {
        data = SosFilter::butter_highpass(ts.fs, cfg.pulse_low_hz, 2)?.filtfilt(&data);
    }
    let high = cfg.pulse_high_hz.min(ts.fs * 0.45);
    if high > cfg.pulse_low_hz {
        data = SosFilter::butter_lowpass(ts.fs, high, 2)?.filtfilt(&data);
    }
    Ok(normalize(&data))
}

/// Detect systolic peaks in a cleaned PPG signal.
pub fn detect_beats(ts: &TimeSeries, cfg: &BeatDetectorConfig) -> Result<Events> {
    let band = pulse_band(ts, cfg)?;
    let distance = ((cfg.min_beat_interval_s * ts.fs).round() as usize).max(1);
    let peaks = find_peaks(&band, Some(cfg.min_peak_height), distance);
    debug!(
        "detected {} beats in {:.1} s (distance {} samples)",
        peaks.len(),
        ts.duration(),
        distance
    );
    Ok(Events::from_indices(peaks))
}
