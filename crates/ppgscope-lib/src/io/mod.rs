pub mod recording;
pub mod report;
pub mod text;

pub use recording::{load_signal, parse_signal, read_recording, write_recording, Recording};
pub use report::{read_json, summary_rows, write_json, write_summary_csv};
