pub mod hrv;
pub mod sqi;

pub use hrv::{hrv_summary, HrvSummary};
pub use sqi::{signal_quality, SignalQuality};
