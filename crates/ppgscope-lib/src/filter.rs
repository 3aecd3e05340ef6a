//! Butterworth filter design as cascaded biquad sections plus zero-phase
//! (forward-backward) application.

use crate::error::{PpgError, Result};
use biquad::{Biquad, Coefficients, DirectForm2Transposed, ToHertz, Type};
use std::f64::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Low,
    High,
}

/// Cascade of second-order sections applied in series.
#[derive(Debug, Clone)]
pub struct SosFilter {
    sections: Vec<Coefficients<f64>>,
    /// Samples fed at the edge value to bring each section to steady state.
    settle: usize,
    /// Number of poles of the analog prototype.
    order: usize,
}

impl SosFilter {
    /// Butterworth low-pass of the given order.
    pub fn butter_lowpass(fs: f64, cutoff_hz: f64, order: usize) -> Result<Self> {
        check_cutoff(fs, cutoff_hz)?;
        Self::butter(fs, cutoff_hz, order, Pass::Low)
    }

    /// Butterworth high-pass of the given order.
    pub fn butter_highpass(fs: f64, cutoff_hz: f64, order: usize) -> Result<Self> {
        check_cutoff(fs, cutoff_hz)?;
        Self::butter(fs, cutoff_hz, order, Pass::High)
    }

    /// First-order Butterworth band-pass (one second-order section).
    pub fn butter_bandpass(fs: f64, low_hz: f64, high_hz: f64) -> Result<Self> {
        check_cutoff(fs, low_hz)?;
        check_cutoff(fs, high_hz)?;
        if low_hz >= high_hz {
            return Err(PpgError::invalid(format!(
                "band-pass edges must be increasing, got {} Hz..{} Hz",
                low_hz, high_hz
            )));
        }
        let c = 2.0 * fs;
        let wl = c * (PI * low_hz / fs).tan();
        let wh = c * (PI * high_hz / fs).tan();
        let bw = wh - wl;
        let w0_sq = wl * wh;
        let a0 = c * c + bw * c + w0_sq;
        let b0 = bw * c / a0;
        let coeffs = Coefficients {
            a1: 2.0 * (w0_sq - c * c) / a0,
            a2: (c * c - bw * c + w0_sq) / a0,
            b0,
            b1: 0.0,
            b2: -b0,
        };
        Ok(Self {
            sections: vec![coeffs],
            settle: settle_samples(fs, low_hz),
            order: 2,
        })
    }

    fn butter(fs: f64, cutoff_hz: f64, order: usize, pass: Pass) -> Result<Self> {
        if order == 0 {
            return Err(PpgError::invalid("filter order must be at least 1"));
        }
        let mut sections = Vec::with_capacity(order / 2 + 1);
        for k in 0..order / 2 {
            let q = butterworth_q(order, k);
            let kind = match pass {
                Pass::Low => Type::LowPass,
                Pass::High => Type::HighPass,
            };
            let coeffs = Coefficients::<f64>::from_params(kind, fs.hz(), cutoff_hz.hz(), q)
                .map_err(|e| {
                    PpgError::invalid(format!("cannot design {} Hz section: {:?}", cutoff_hz, e))
                })?;
            sections.push(coeffs);
        }
        if order % 2 == 1 {
            sections.push(first_order_section(fs, cutoff_hz, pass));
        }
        Ok(Self {
            sections,
            settle: settle_samples(fs, cutoff_hz),
            order,
        })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Causal filtering with each section primed at the first sample.
    pub fn apply(&self, data: &[f64]) -> Vec<f64> {
        let mut out = data.to_vec();
        for coeffs in &self.sections {
            run_section(*coeffs, &mut out, self.settle);
        }
        out
    }

    /// Zero-phase filtering: odd-extend the edges, filter forward, then
    /// backward, and strip the extension.
    pub fn filtfilt(&self, data: &[f64]) -> Vec<f64> {
        if data.len() < 2 {
            return data.to_vec();
        }
        let pad = (3 * (self.order + 1)).min(data.len() - 1);
        let mut buf = odd_extend(data, pad);
        buf = self.apply(&buf);
        buf.reverse();
        buf = self.apply(&buf);
        buf.reverse();
        buf[pad..pad + data.len()].to_vec()
    }
}

/// Q of the k-th conjugate pole pair of an n-th order Butterworth prototype.
fn butterworth_q(order: usize, k: usize) -> f64 {
    let theta = PI * (2 * k + 1) as f64 / (2 * order) as f64;
    1.0 / (2.0 * theta.sin())
}

fn first_order_section(fs: f64, cutoff_hz: f64, pass: Pass) -> Coefficients<f64> {
    let k = (PI * cutoff_hz / fs).tan();
    let a1 = (k - 1.0) / (k + 1.0);
    let (b0, b1) = match pass {
        Pass::High => {
            let b0 = 1.0 / (1.0 + k);
            (b0, -b0)
        }
        Pass::Low => {
            let b0 = k / (1.0 + k);
            (b0, b0)
        }
    };
    Coefficients {
        a1,
        a2: 0.0,
        b0,
        b1,
        b2: 0.0,
    }
}

fn check_cutoff(fs: f64, cutoff_hz: f64) -> Result<()> {
    if !fs.is_finite() || fs <= 0.0 {
        return Err(PpgError::invalid(format!(
            "sampling rate must be positive, got {}",
            fs
        )));
    }
    if !cutoff_hz.is_finite() || cutoff_hz <= 0.0 || cutoff_hz >= fs * 0.5 {
        return Err(PpgError::invalid(format!(
            "cutoff {} Hz must lie in (0, {}) Hz",
            cutoff_hz,
            fs * 0.5
        )));
    }
    Ok(())
}

fn settle_samples(fs: f64, lowest_hz: f64) -> usize {
    ((8.0 * fs / lowest_hz).ceil() as usize).clamp(16, 400_000)
}

fn run_section(coeffs: Coefficients<f64>, data: &mut [f64], settle: usize) {
    let Some(&first) = data.first() else {
        return;
    };
    let mut section = DirectForm2Transposed::<f64>::new(coeffs);
    for _ in 0..settle {
        section.run(first);
    }
    for sample in data.iter_mut() {
        *sample = section.run(*sample);
    }
}

fn odd_extend(data: &[f64], pad: usize) -> Vec<f64> {
    let n = data.len();
    let first = data[0];
    let last = data[n - 1];
    let mut out = Vec::with_capacity(n + 2 * pad);
    out.extend((1..=pad).rev().map(|i| 2.0 * first - data[i]));
    out.extend_from_slice(data);
    out.extend((1..=pad).map(|i| 2.0 * last - data[n - 1 - i]));
    out
}
