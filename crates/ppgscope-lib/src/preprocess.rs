use crate::{
    error::{PpgError, Result},
    filter::SosFilter,
    signal::TimeSeries,
};
use log::debug;
use serde::{Deserialize, Serialize};

/// Parameters of the cleaning chain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Baseline-wander high-pass cutoff (Hz); `0` disables the stage.
    pub highpass_hz: f64,
    pub highpass_order: usize,
    /// Noise low-pass cutoff (Hz); skipped when at or above Nyquist.
    pub lowpass_hz: f64,
    pub lowpass_order: usize,
    /// Winsorise samples further than `k` MADs from the median; `0` disables.
    pub artifact_mad_k: f64,
    /// Rescale the result to [0, 1].
    pub normalize: bool,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            highpass_hz: 0.1,
            highpass_order: 2,
            lowpass_hz: 8.0,
            lowpass_order: 5,
            artifact_mad_k: 6.0,
            normalize: true,
        }
    }
}

/// Clean a raw waveform. The result always has the input's length and rate.
pub fn preprocess(raw: &TimeSeries, cfg: &PreprocessConfig) -> Result<TimeSeries> {
    raw.validate()?;
    let fs = raw.fs;
    let mut data = clip_artifacts(&raw.data, cfg.artifact_mad_k);

    if cfg.highpass_hz > 0.0 && cfg.highpass_hz < fs * 0.5 {
        let hp = SosFilter::butter_highpass(fs, cfg.highpass_hz, cfg.highpass_order)?;
        data = hp.filtfilt(&data);
    } else {
        debug!(
            "high-pass at {} Hz skipped for fs {} Hz",
            cfg.highpass_hz, fs
        );
    }
    if cfg.lowpass_hz > 0.0 && cfg.lowpass_hz < fs * 0.5 {
        let lp = SosFilter::butter_lowpass(fs, cfg.lowpass_hz, cfg.lowpass_order)?;
        data = lp.filtfilt(&data);
    } else {
        debug!(
            "low-pass at {} Hz skipped for fs {} Hz",
            cfg.lowpass_hz, fs
        );
    }
    if cfg.normalize {
        data = normalize(&data);
    }

    debug!(
        "preprocessed {} samples at {} Hz (hp {} Hz, lp {} Hz)",
        data.len(),
        fs,
        cfg.highpass_hz,
        cfg.lowpass_hz
    );
    Ok(raw.with_data(data))
}

/// Shift so the minimum is zero and scale to [0, 1]. A flat signal maps to zeros.
pub fn normalize(data: &[f64]) -> Vec<f64> {
    let (min, max) = min_max(data);
    let range = max - min;
    // Filter round-off on a flat input must not be stretched into a waveform.
    let floor = 1e-12 * min.abs().max(max.abs()).max(1.0);
    if !range.is_finite() || range <= floor {
        return vec![0.0; data.len()];
    }
    data.iter().map(|x| (x - min) / range).collect()
}

/// Winsorise outliers at `median ± k * MAD`.
pub fn clip_artifacts(data: &[f64], k: f64) -> Vec<f64> {
    if k <= 0.0 || data.len() < 3 {
        return data.to_vec();
    }
    let med = median(data);
    let deviations: Vec<f64> = data.iter().map(|x| (x - med).abs()).collect();
    let mad = median(&deviations);
    if mad == 0.0 {
        return data.to_vec();
    }
    let lo = med - k * mad;
    let hi = med + k * mad;
    let clipped = data.iter().filter(|&&x| x < lo || x > hi).count();
    if clipped > 0 {
        debug!("clipped {} artifact samples outside [{:.3}, {:.3}]", clipped, lo, hi);
    }
    data.iter().map(|x| x.clamp(lo, hi)).collect()
}

/// Linear-interpolation resampling to `target_fs`, preserving duration.
pub fn resample(ts: &TimeSeries, target_fs: f64) -> Result<TimeSeries> {
    ts.validate()?;
    if !target_fs.is_finite() || target_fs <= 0.0 {
        return Err(PpgError::invalid(format!(
            "target sampling rate must be positive, got {}",
            target_fs
        )));
    }
    let n = ((ts.len() as f64) * target_fs / ts.fs).round().max(1.0) as usize;
    let last = ts.len() - 1;
    let data = (0..n)
        .map(|i| {
            let pos = i as f64 * ts.fs / target_fs;
            let lo = (pos.floor() as usize).min(last);
            let hi = (lo + 1).min(last);
            let frac = pos - lo as f64;
            ts.data[lo] + (ts.data[hi] - ts.data[lo]) * frac.clamp(0.0, 1.0)
        })
        .collect();
    debug!(
        "resampled {} samples at {} Hz to {} samples at {} Hz",
        ts.len(),
        ts.fs,
        n,
        target_fs
    );
    Ok(TimeSeries::new(target_fs, data))
}

pub(crate) fn min_max(data: &[f64]) -> (f64, f64) {
    data.iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
            (lo.min(x), hi.max(x))
        })
}

pub(crate) fn median(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        0.5 * (sorted[mid - 1] + sorted[mid])
    } else {
        sorted[mid]
    }
}
