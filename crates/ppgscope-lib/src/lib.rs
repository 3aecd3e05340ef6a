//! PPG analysis: preprocessing, feature extraction, arrhythmia flagging and
//! plotting of photoplethysmography recordings.

pub mod arrhythmia;
pub mod config;
pub mod detectors;
pub mod error;
pub mod features;
pub mod filter;
pub mod io;
pub mod metrics;
pub mod pipeline;
pub mod plot;
pub mod preprocess;
pub mod signal;
pub mod simulate;

pub use arrhythmia::{detect_arrhythmia, BeatLabel, DetectionConfig, DetectionResult};
pub use config::{PipelineConfig, PlotConfig};
pub use detectors::*;
pub use error::{PpgError, Result};
pub use features::{extract_features, FeatureConfig, FeatureSet};
pub use metrics::*;
pub use preprocess::{preprocess, resample, PreprocessConfig};
pub use signal::*;
