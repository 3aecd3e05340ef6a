pub mod peaks;
pub mod ppg;

pub use peaks::find_peaks;
pub use ppg::{detect_beats, pulse_band, BeatDetectorConfig};
