//! Synthetic PPG recordings with known beat timing, used for demos and as
//! test fixtures.

use crate::{
    error::{PpgError, Result},
    signal::TimeSeries,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Stretch one inter-beat interval to model a pause or dropped beat.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeatPause {
    /// The interval following this beat (1-based) is stretched, i.e. RR
    /// interval `beat - 1`.
    pub beat: usize,
    /// Multiplier applied to the nominal interval.
    pub factor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticPpg {
    pub fs: f64,
    pub duration_s: f64,
    pub heart_rate_bpm: f64,
    pub breaths_per_min: f64,
    /// Respiratory baseline modulation relative to pulse amplitude.
    pub respiratory_amplitude: f64,
    /// Standard deviation of additive white noise.
    pub noise_std: f64,
    /// Amplitude of a slow (0.03 Hz) baseline drift.
    pub baseline_drift: f64,
    pub seed: u64,
    pub pause: Option<BeatPause>,
}

impl Default for SyntheticPpg {
    fn default() -> Self {
        Self {
            fs: 100.0,
            duration_s: 30.0,
            heart_rate_bpm: 72.0,
            breaths_per_min: 15.0,
            respiratory_amplitude: 0.3,
            noise_std: 0.02,
            baseline_drift: 0.5,
            seed: 7,
            pause: None,
        }
    }
}

impl SyntheticPpg {
    /// Rejects settings that cannot produce a loadable recording.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("sampling rate", self.fs),
            ("duration", self.duration_s),
            ("heart rate", self.heart_rate_bpm),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(PpgError::invalid(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        if (self.duration_s * self.fs).round() < 1.0 {
            return Err(PpgError::invalid(format!(
                "{} s at {} Hz yields no samples",
                self.duration_s, self.fs
            )));
        }
        if let Some(pause) = self.pause {
            if pause.beat == 0 || !pause.factor.is_finite() || pause.factor <= 0.0 {
                return Err(PpgError::invalid(
                    "pause needs a 1-based beat and a positive factor",
                ));
            }
        }
        Ok(())
    }
}

const FIRST_BEAT_S: f64 = 0.4;
const SYSTOLIC_WIDTH_S: f64 = 0.08;
const DICROTIC_DELAY_S: f64 = 0.28;
const DICROTIC_WIDTH_S: f64 = 0.1;
const DICROTIC_GAIN: f64 = 0.35;

/// Systolic peak times in seconds that fit inside the recording.
pub fn beat_times(cfg: &SyntheticPpg) -> Vec<f64> {
    let rr = 60.0 / cfg.heart_rate_bpm.max(1.0);
    let mut times = Vec::new();
    let mut t = FIRST_BEAT_S;
    let mut beat = 0usize;
    while t < cfg.duration_s - 0.5 {
        times.push(t);
        beat += 1;
        let factor = match cfg.pause {
            Some(p) if p.beat == beat => p.factor,
            _ => 1.0,
        };
        t += rr * factor;
    }
    times
}

/// Render the configured recording as raw samples.
pub fn synthesize(cfg: &SyntheticPpg) -> TimeSeries {
    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let beats = beat_times(cfg);
    let n = (cfg.duration_s * cfg.fs).round().max(0.0) as usize;
    let resp_hz = cfg.breaths_per_min / 60.0;
    let mut data = Vec::with_capacity(n);
    let mut next = 0usize;
    for i in 0..n {
        let t = i as f64 / cfg.fs;
        while next < beats.len() && beats[next] + 1.0 < t {
            next += 1;
        }
        let resp = (2.0 * PI * resp_hz * t).sin();
        let mut v = cfg.respiratory_amplitude * resp
            + cfg.baseline_drift * (2.0 * PI * 0.03 * t).sin();
        let pulse_gain = 1.0 + 0.1 * resp;
        for &bt in beats[next..].iter().take_while(|&&bt| bt < t + 1.0) {
            v += pulse_gain * pulse_shape(t - bt);
        }
        v += cfg.noise_std * gaussian(&mut rng);
        data.push(v);
    }
    TimeSeries::new(cfg.fs, data)
}

fn pulse_shape(dt: f64) -> f64 {
    let systolic = (-0.5 * (dt / SYSTOLIC_WIDTH_S).powi(2)).exp();
    let dicrotic =
        DICROTIC_GAIN * (-0.5 * ((dt - DICROTIC_DELAY_S) / DICROTIC_WIDTH_S).powi(2)).exp();
    systolic + dicrotic
}

// Box-Muller
fn gaussian(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_settings_are_rejected() {
        assert!(SyntheticPpg::default().validate().is_ok());
        for cfg in [
            SyntheticPpg {
                fs: 0.0,
                ..SyntheticPpg::default()
            },
            SyntheticPpg {
                duration_s: -1.0,
                ..SyntheticPpg::default()
            },
            SyntheticPpg {
                fs: 1.0,
                duration_s: 0.2,
                ..SyntheticPpg::default()
            },
            SyntheticPpg {
                heart_rate_bpm: f64::NAN,
                ..SyntheticPpg::default()
            },
            SyntheticPpg {
                pause: Some(BeatPause {
                    beat: 0,
                    factor: 1.5,
                }),
                ..SyntheticPpg::default()
            },
        ] {
            assert!(
                matches!(cfg.validate(), Err(PpgError::InvalidInput(_))),
                "{cfg:?}"
            );
        }
    }

    #[test]
    fn beat_times_follow_heart_rate() {
        let cfg = SyntheticPpg {
            heart_rate_bpm: 60.0,
            duration_s: 10.0,
            ..SyntheticPpg::default()
        };
        let beats = beat_times(&cfg);
        assert_eq!(beats.len(), 10);
        assert!((beats[1] - beats[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn pause_stretches_single_interval() {
        let cfg = SyntheticPpg {
            heart_rate_bpm: 60.0,
            pause: Some(BeatPause {
                beat: 3,
                factor: 1.5,
            }),
            ..SyntheticPpg::default()
        };
        let beats = beat_times(&cfg);
        let rr: Vec<f64> = beats.windows(2).map(|w| w[1] - w[0]).collect();
        let stretched: Vec<usize> = rr
            .iter()
            .enumerate()
            .filter(|(_, &v)| v > 1.2)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(stretched, vec![2]);
    }

    #[test]
    fn synthesize_is_deterministic() {
        let cfg = SyntheticPpg::default();
        let a = synthesize(&cfg);
        let b = synthesize(&cfg);
        assert_eq!(a, b);
        assert_eq!(a.len(), 3000);
    }
}
