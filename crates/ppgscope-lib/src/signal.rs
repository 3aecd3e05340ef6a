use crate::error::{PpgError, Result};
use serde::{Deserialize, Serialize};

/// Uniformly sampled PPG waveform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    /// Sampling frequency in Hz
    pub fs: f64,
    /// Samples
    pub data: Vec<f64>,
}

impl TimeSeries {
    pub fn new(fs: f64, data: Vec<f64>) -> Self {
        Self { fs, data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn duration(&self) -> f64 {
        self.data.len() as f64 / self.fs
    }

    /// Time in seconds of sample `index`.
    pub fn time_at(&self, index: usize) -> f64 {
        index as f64 / self.fs
    }

    /// Rejects empty signals, non-positive rates and non-finite samples.
    pub fn validate(&self) -> Result<()> {
        if self.data.is_empty() {
            return Err(PpgError::invalid("signal is empty"));
        }
        if !self.fs.is_finite() || self.fs <= 0.0 {
            return Err(PpgError::invalid(format!(
                "sampling rate must be positive, got {}",
                self.fs
            )));
        }
        if let Some(idx) = self.data.iter().position(|x| !x.is_finite()) {
            return Err(PpgError::invalid(format!(
                "sample {} is not finite ({})",
                idx, self.data[idx]
            )));
        }
        Ok(())
    }

    /// Derive a new series with the same rate from transformed samples.
    pub fn with_data(&self, data: Vec<f64>) -> Self {
        Self { fs: self.fs, data }
    }
}

/// Point events on a timeline (e.g., pulse peak indices)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Events {
    pub indices: Vec<usize>,
}

impl Events {
    pub fn from_indices(indices: Vec<usize>) -> Self {
        Self { indices }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn times(&self, fs: f64) -> Vec<f64> {
        self.indices.iter().map(|&i| i as f64 / fs).collect()
    }
}

/// RR intervals (seconds)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RRSeries {
    pub rr: Vec<f64>,
}

impl RRSeries {
    pub fn from_events(events: &Events, fs: f64) -> Self {
        let rr = events
            .indices
            .windows(2)
            .map(|w| (w[1] as f64 - w[0] as f64) / fs)
            .collect();
        Self { rr }
    }

    pub fn len(&self) -> usize {
        self.rr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rr.is_empty()
    }

    pub fn mean(&self) -> Option<f64> {
        if self.rr.is_empty() {
            None
        } else {
            Some(self.rr.iter().sum::<f64>() / self.rr.len() as f64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rr_from_events_uses_sampling_rate() {
        let events = Events::from_indices(vec![10, 110, 230]);
        let rr = RRSeries::from_events(&events, 100.0);
        assert_eq!(rr.rr.len(), 2);
        assert!((rr.rr[0] - 1.0).abs() < 1e-12);
        assert!((rr.rr[1] - 1.2).abs() < 1e-12);
    }

    #[test]
    fn validate_rejects_bad_signals() {
        assert!(matches!(
            TimeSeries::new(100.0, vec![]).validate(),
            Err(PpgError::InvalidInput(_))
        ));
        assert!(matches!(
            TimeSeries::new(0.0, vec![1.0]).validate(),
            Err(PpgError::InvalidInput(_))
        ));
        assert!(matches!(
            TimeSeries::new(-5.0, vec![1.0]).validate(),
            Err(PpgError::InvalidInput(_))
        ));
        assert!(matches!(
            TimeSeries::new(100.0, vec![1.0, f64::NAN]).validate(),
            Err(PpgError::InvalidInput(_))
        ));
        assert!(TimeSeries::new(100.0, vec![1.0, 2.0]).validate().is_ok());
    }
}
