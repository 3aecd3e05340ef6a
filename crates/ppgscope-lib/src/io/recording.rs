//! Recording files: one header line declaring the sampling rate and
//! duration, followed by `Time,PPG` CSV rows.

use crate::{error::PpgError, io::text, signal::TimeSeries};
use anyhow::{Context, Result};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use log::{debug, warn};
use std::{fs, path::Path};

const RATE_KEY: &str = "Sampling Rate : ";
const DURATION_KEY: &str = "Duration : ";

/// A raw signal plus the metadata declared in its file header.
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    pub name: String,
    pub signal: TimeSeries,
    pub declared_duration_s: f64,
}

/// Parse `Sampling Rate : <n>Hz` and `Duration : <secs>` from a header line.
pub fn parse_header(line: &str) -> std::result::Result<(f64, f64), PpgError> {
    let rate_str = line
        .split_once(RATE_KEY)
        .and_then(|(_, rest)| rest.split_once("Hz"))
        .map(|(value, _)| value.trim())
        .ok_or_else(|| PpgError::invalid("unable to extract sampling rate from header"))?;
    let fs: f64 = rate_str
        .parse()
        .map_err(|_| PpgError::invalid(format!("sampling rate '{}' is not numeric", rate_str)))?;
    let duration_str = line
        .split_once(DURATION_KEY)
        .and_then(|(_, rest)| rest.split_whitespace().next())
        .map(|token| token.trim_end_matches(|c: char| !c.is_ascii_digit()))
        .ok_or_else(|| PpgError::invalid("unable to extract duration from header"))?;
    let duration: f64 = duration_str
        .parse()
        .map_err(|_| PpgError::invalid(format!("duration '{}' is not numeric", duration_str)))?;
    if fs <= 0.0 {
        return Err(PpgError::invalid(format!(
            "sampling rate must be positive, got {}",
            fs
        )));
    }
    Ok((fs, duration))
}

/// Parse recording text. Rows whose time or value is not numeric are dropped.
pub fn parse_recording(name: &str, text: &str) -> Result<Recording> {
    let (header, body) = text.split_once('\n').unwrap_or((text, ""));
    let (fs, declared_duration_s) = parse_header(header.trim())?;
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(body.as_bytes());
    let mut data = Vec::new();
    let mut dropped = 0usize;
    for record in reader.records() {
        let record = record.with_context(|| format!("reading rows of {}", name))?;
        let time = record.get(0).and_then(|s| s.parse::<f64>().ok());
        let value = record.get(1).and_then(|s| s.parse::<f64>().ok());
        match (time, value) {
            (Some(t), Some(v)) if t.is_finite() && v.is_finite() => data.push(v),
            _ => dropped += 1,
        }
    }
    if dropped > 0 {
        debug!("{}: dropped {} non-numeric rows", name, dropped);
    }
    let signal = TimeSeries::new(fs, data);
    let actual = signal.duration();
    if declared_duration_s > 0.0 && (actual - declared_duration_s).abs() > 1.0 / fs + 1e-9 {
        warn!(
            "{}: header declares {} s but {} samples at {} Hz span {:.3} s",
            name,
            declared_duration_s,
            signal.len(),
            fs,
            actual
        );
    }
    Ok(Recording {
        name: name.to_string(),
        signal,
        declared_duration_s,
    })
}

pub fn read_recording(path: &Path) -> Result<Recording> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    parse_recording(&name, &text).with_context(|| format!("parsing {}", path.display()))
}

pub fn write_recording(path: &Path, signal: &TimeSeries) -> Result<()> {
    let mut out = format!(
        "{}{}Hz, {}{} s\n",
        RATE_KEY,
        signal.fs,
        DURATION_KEY,
        signal.duration()
    );
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    for (i, value) in signal.data.iter().enumerate() {
        writer.write_record(&[signal.time_at(i).to_string(), value.to_string()])?;
    }
    let rows = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flushing rows: {}", e.error()))?;
    out.push_str(&String::from_utf8_lossy(&rows));
    fs::write(path, out).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Parse either recording text or a bare sample list (which needs `fs`).
pub fn parse_signal(name: &str, text: &str, fs: Option<f64>) -> Result<TimeSeries> {
    let first = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    if first.contains(RATE_KEY.trim_end()) {
        return Ok(parse_recording(name, text.trim_start())?.signal);
    }
    let fs = fs.ok_or_else(|| {
        PpgError::invalid(format!(
            "{} has no header; pass the sampling rate explicitly",
            name
        ))
    })?;
    let data = text::parse_f64_series(text).with_context(|| format!("parsing samples in {}", name))?;
    Ok(TimeSeries::new(fs, data))
}

pub fn load_signal(path: &Path, fs: Option<f64>) -> Result<TimeSeries> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    parse_signal(&path.display().to_string(), &text, fs)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Sampling Rate : 100Hz, Duration : 0.05 s\n\
        0.00,512\n\
        0.01,515\n\
        bad,row\n\
        0.02,520\n\
        0.03,\n\
        0.03,518\n\
        0.04,510\n";

    #[test]
    fn parses_header_and_rows() {
        let rec = parse_recording("PPG-1.csv", SAMPLE).unwrap();
        assert_eq!(rec.signal.fs, 100.0);
        assert_eq!(rec.declared_duration_s, 0.05);
        assert_eq!(rec.signal.data, vec![512.0, 515.0, 520.0, 518.0, 510.0]);
    }

    #[test]
    fn header_variants() {
        assert_eq!(
            parse_header("Sampling Rate : 125 Hz, Duration : 60s").unwrap(),
            (125.0, 60.0)
        );
        assert_eq!(
            parse_header("Duration : 12.5 s ; Sampling Rate : 50Hz").unwrap(),
            (50.0, 12.5)
        );
    }

    #[test]
    fn missing_header_fields_are_invalid() {
        for header in [
            "Time,PPG",
            "Sampling Rate : 100Hz",
            "Duration : 10 s",
            "Sampling Rate : abcHz, Duration : 10",
            "Sampling Rate : 0Hz, Duration : 10",
        ] {
            assert!(
                matches!(parse_header(header), Err(PpgError::InvalidInput(_))),
                "{header}"
            );
        }
        let err = parse_recording("x", "0.0,1.0\n0.1,2.0\n").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PpgError>(),
            Some(PpgError::InvalidInput(_))
        ));
    }

    #[test]
    fn write_then_load_signal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cleaned.csv");
        let ts = TimeSeries::new(62.5, vec![0.0, 0.25, 1.0, 0.5]);
        write_recording(&path, &ts).unwrap();
        let loaded = load_signal(&path, None).unwrap();
        assert_eq!(loaded, ts);
    }

    #[test]
    fn plain_samples_need_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("samples.txt");
        fs::write(&path, "# raw\n1.0\n2.0\n3.0\n").unwrap();
        assert!(load_signal(&path, None).is_err());
        let ts = load_signal(&path, Some(25.0)).unwrap();
        assert_eq!(ts.fs, 25.0);
        assert_eq!(ts.data, vec![1.0, 2.0, 3.0]);
    }
}
