use crate::signal::{RRSeries, TimeSeries};
use realfft::RealFftPlanner;
use serde::{Deserialize, Serialize};

/// Signal quality indices of a cleaned PPG recording.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalQuality {
    /// Mean power over variance.
    pub snr: f64,
    /// Excess (Fisher) kurtosis.
    pub kurtosis: f64,
    pub skewness: f64,
    /// Coefficient of variation of the RR series.
    pub rr_cv: f64,
    /// Shannon entropy (bits) of the normalised power spectrum.
    pub spectral_entropy: f64,
    /// Fraction of first differences more than two SDs above their mean.
    pub spike_ratio: f64,
}

impl SignalQuality {
    pub fn is_acceptable(&self) -> bool {
        self.snr >= 1.0 && self.rr_cv <= 0.2 && self.spike_ratio <= 0.1
    }
}

pub fn signal_quality(ts: &TimeSeries, rr: &RRSeries) -> SignalQuality {
    let (skewness, kurtosis) = shape_moments(&ts.data);
    SignalQuality {
        snr: compute_snr(&ts.data),
        kurtosis,
        skewness,
        rr_cv: compute_rr_cv(rr),
        spectral_entropy: compute_spectral_entropy(&ts.data),
        spike_ratio: compute_spike_ratio(&ts.data),
    }
}

pub fn compute_snr(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let n = data.len() as f64;
    let mean = data.iter().sum::<f64>() / n;
    let power = data.iter().map(|x| x * x).sum::<f64>() / n;
    let var = data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    if var > 0.0 {
        power / var
    } else {
        0.0
    }
}

/// Population skewness and excess kurtosis; both zero for a flat signal.
pub fn shape_moments(data: &[f64]) -> (f64, f64) {
    if data.is_empty() {
        return (0.0, 0.0);
    }
    let n = data.len() as f64;
    let mean = data.iter().sum::<f64>() / n;
    let m2 = data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    if m2 == 0.0 {
        return (0.0, 0.0);
    }
    let m3 = data.iter().map(|x| (x - mean).powi(3)).sum::<f64>() / n;
    let m4 = data.iter().map(|x| (x - mean).powi(4)).sum::<f64>() / n;
    (m3 / m2.powf(1.5), m4 / (m2 * m2) - 3.0)
}

pub fn compute_rr_cv(rr: &RRSeries) -> f64 {
    let Some(mean) = rr.mean() else {
        return 0.0;
    };
    if mean == 0.0 {
        return 0.0;
    }
    let sd = (rr.rr.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / rr.rr.len() as f64).sqrt();
    sd / mean
}

pub fn compute_spectral_entropy(data: &[f64]) -> f64 {
    let n = data.len();
    if n == 0 {
        return 0.0;
    }
    let mut planner = RealFftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(n);
    let mut buffer = data.to_vec();
    let mut spectrum = fft.make_output_vec();
    if fft.process(&mut buffer, &mut spectrum).is_err() {
        return 0.0;
    }
    let powers: Vec<f64> = spectrum.iter().map(|c| c.norm_sqr()).collect();
    let total: f64 = powers.iter().sum();
    if total == 0.0 {
        return 0.0;
    }
    powers
        .iter()
        .filter(|&&p| p > 0.0)
        .map(|p| {
            let p = p / total;
            -p * p.log2()
        })
        .sum()
}

pub fn compute_spike_ratio(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let diffs: Vec<f64> = data.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
    let mean = diffs.iter().sum::<f64>() / diffs.len() as f64;
    let sd = (diffs.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / diffs.len() as f64).sqrt();
    if sd == 0.0 {
        return 0.0;
    }
    let threshold = mean + 2.0 * sd;
    diffs.iter().filter(|&&d| d > threshold).count() as f64 / diffs.len() as f64
}
