use crate::{
    error::{PpgError, Result},
    signal::RRSeries,
};
use serde::{Deserialize, Serialize};

/// Time-domain and Poincaré heart-rate variability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HrvSummary {
    /// Number of RR intervals
    pub n: usize,
    /// Mean RR (s)
    pub avnn: f64,
    /// Sample standard deviation of RR (s)
    pub sdnn: f64,
    /// Root mean square of successive differences (s)
    pub rmssd: f64,
    /// Fraction of successive differences above 50 ms
    pub pnn50: f64,
    /// Poincaré short-axis dispersion (s)
    pub sd1: f64,
    /// Poincaré long-axis dispersion (s)
    pub sd2: f64,
}

pub fn hrv_summary(rr: &RRSeries) -> Result<HrvSummary> {
    let n = rr.rr.len();
    if n == 0 {
        return Err(PpgError::InsufficientData {
            metric: "heart-rate variability",
            needed: 1,
            found: 0,
        });
    }
    let avnn = rr.rr.iter().sum::<f64>() / n as f64;
    let sdnn = sample_sd(&rr.rr, avnn);
    let diffs: Vec<f64> = rr.rr.windows(2).map(|w| w[1] - w[0]).collect();
    let (rmssd, pnn50) = if diffs.is_empty() {
        (0.0, 0.0)
    } else {
        let ms = diffs.iter().map(|d| d * d).sum::<f64>() / diffs.len() as f64;
        let over = diffs.iter().filter(|d| d.abs() > 0.050).count();
        (ms.sqrt(), over as f64 / diffs.len() as f64)
    };
    let sd1 = poincare_sd1(&diffs);
    let sd2 = (2.0 * sdnn * sdnn - sd1 * sd1).max(0.0).sqrt();
    Ok(HrvSummary {
        n,
        avnn,
        sdnn,
        rmssd,
        pnn50,
        sd1,
        sd2,
    })
}

fn sample_sd(data: &[f64], mean: f64) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    (data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (data.len() as f64 - 1.0)).sqrt()
}

fn poincare_sd1(diffs: &[f64]) -> f64 {
    if diffs.is_empty() {
        return 0.0;
    }
    let mean = diffs.iter().sum::<f64>() / diffs.len() as f64;
    let var = diffs.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / diffs.len() as f64;
    (0.5 * var).sqrt()
}
