//! Backend-neutral figure description plus builders for the standard PPG
//! plots. Rendering lives in [`render`].

pub mod render;

use crate::{
    arrhythmia::{BeatLabel, DetectionResult},
    features::FeatureSet,
    signal::{Events, RRSeries, TimeSeries},
};
use serde::{Deserialize, Serialize};

pub use render::{render_to_file, FileBackend, ImageFormat, DEFAULT_SIZE};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Axis {
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Style {
    pub width: f32,
    pub color: Color,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub fn channels(self) -> (u8, u8, u8) {
        (
            ((self.0 >> 16) & 0xFF) as u8,
            ((self.0 >> 8) & 0xFF) as u8,
            (self.0 & 0xFF) as u8,
        )
    }
}

pub const SIGNAL_BLUE: Color = Color(0x1F77B4);
pub const BEAT_ORANGE: Color = Color(0xFF7F0E);
pub const ALERT_RED: Color = Color(0xD62728);
pub const RATE_GREEN: Color = Color(0x2CA02C);
pub const RR_PINK: Color = Color(0xFF0077);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub style: Style,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub radius: u32,
    pub color: Color,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarSeries {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    pub color: Color,
}

/// Shaded x-range, e.g. an irregular interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Span {
    pub x0: f64,
    pub x1: f64,
    pub color: Color,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Series {
    Line(LineSeries),
    Markers(MarkerSeries),
    Bars(BarSeries),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Figure {
    pub title: Option<String>,
    pub x: Axis,
    pub y: Axis,
    pub series: Vec<Series>,
    pub spans: Vec<Span>,
}

impl Figure {
    pub fn new(title: impl Into<Option<String>>) -> Self {
        Self {
            title: title.into(),
            x: Axis::default(),
            y: Axis::default(),
            series: Vec::new(),
            spans: Vec::new(),
        }
    }

    pub fn with_axes(mut self, x: &str, y: &str) -> Self {
        self.x.label = Some(x.into());
        self.y.label = Some(y.into());
        self
    }

    pub fn add_series(&mut self, series: Series) {
        self.series.push(series);
    }

    pub fn is_empty(&self) -> bool {
        self.series.iter().all(|s| match s {
            Series::Line(l) => l.points.is_empty(),
            Series::Markers(m) => m.points.is_empty(),
            Series::Bars(b) => b.values.is_empty(),
        })
    }

    /// Bounding box of all point series and spans as `(x_min, x_max, y_min, y_max)`.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let mut b: Option<(f64, f64, f64, f64)> = None;
        let mut grow = |x: f64, y: Option<f64>| {
            if !x.is_finite() {
                return;
            }
            let (x0, x1, y0, y1) = b.get_or_insert((x, x, f64::INFINITY, f64::NEG_INFINITY));
            *x0 = x0.min(x);
            *x1 = x1.max(x);
            if let Some(y) = y.filter(|y| y.is_finite()) {
                *y0 = y0.min(y);
                *y1 = y1.max(y);
            }
        };
        for series in &self.series {
            let points = match series {
                Series::Line(l) => &l.points,
                Series::Markers(m) => &m.points,
                Series::Bars(_) => continue,
            };
            for p in points {
                grow(p[0], Some(p[1]));
            }
        }
        for span in &self.spans {
            grow(span.x0, None);
            grow(span.x1, None);
        }
        b.filter(|(_, _, y0, y1)| y0 <= y1)
    }
}

pub trait PlotBackend {
    fn draw(&mut self, fig: &Figure) -> crate::error::Result<()>;
}

/// Keep at most `max_points` evenly spaced points.
pub fn decimate_points(points: &[[f64; 2]], max_points: usize) -> Vec<[f64; 2]> {
    if points.len() <= max_points || max_points == 0 {
        return points.to_vec();
    }
    let bucket_size = points.len() as f64 / max_points as f64;
    (0..max_points)
        .map(|i| (i as f64 * bucket_size).floor() as usize)
        .take_while(|&start| start < points.len())
        .map(|start| points[start])
        .collect()
}

/// Signal over time, optionally with beat markers and irregular intervals shaded.
pub fn signal_figure(
    title: &str,
    ts: &TimeSeries,
    beats: Option<&Events>,
    detection: Option<&DetectionResult>,
    max_points: usize,
) -> Figure {
    let points: Vec<[f64; 2]> = ts
        .data
        .iter()
        .enumerate()
        .map(|(i, v)| [ts.time_at(i), *v])
        .collect();
    let mut fig = Figure::new(Some(title.to_string())).with_axes("Time (seconds)", "Amplitude");
    fig.add_series(Series::Line(LineSeries {
        name: title.into(),
        points: decimate_points(&points, max_points),
        style: Style {
            width: 1.4,
            color: SIGNAL_BLUE,
        },
    }));
    if let Some(beats) = beats {
        let markers = beats
            .indices
            .iter()
            .filter(|&&i| i < ts.len())
            .map(|&i| [ts.time_at(i), ts.data[i]])
            .collect();
        fig.add_series(Series::Markers(MarkerSeries {
            name: "Beats".into(),
            points: markers,
            radius: 3,
            color: BEAT_ORANGE,
        }));
    }
    if let Some(detection) = detection {
        fig.spans = detection
            .intervals
            .iter()
            .filter(|iv| iv.label == BeatLabel::Irregular)
            .map(|iv| Span {
                x0: iv.start_s,
                x1: iv.end_s,
                color: ALERT_RED,
            })
            .collect();
    }
    fig
}

/// Instantaneous heart rate at the end of each interval.
pub fn heart_rate_figure(features: &FeatureSet) -> Figure {
    let times = features.beats.times(features.fs);
    let points: Vec<[f64; 2]> = features
        .instantaneous_bpm
        .iter()
        .enumerate()
        .filter_map(|(i, bpm)| times.get(i + 1).map(|t| [*t, *bpm]))
        .collect();
    let mut fig = Figure::new(Some("Heart Rate Over Time".to_string()))
        .with_axes("Time (seconds)", "Heart Rate (BPM)");
    fig.add_series(Series::Line(LineSeries {
        name: "Heart Rate (BPM)".into(),
        points,
        style: Style {
            width: 2.0,
            color: RATE_GREEN,
        },
    }));
    fig
}

/// RR tachogram, irregular intervals drawn as red markers.
pub fn rr_figure(rr: &RRSeries, detection: Option<&DetectionResult>, max_points: usize) -> Figure {
    let points: Vec<[f64; 2]> = rr
        .rr
        .iter()
        .enumerate()
        .map(|(i, value)| [i as f64, *value])
        .collect();
    let mut fig =
        Figure::new(Some("RR intervals".to_string())).with_axes("Interval", "RR (seconds)");
    fig.add_series(Series::Line(LineSeries {
        name: "RR".into(),
        points: decimate_points(&points, max_points),
        style: Style {
            width: 2.0,
            color: RR_PINK,
        },
    }));
    if let Some(detection) = detection {
        let flagged: Vec<[f64; 2]> = detection
            .intervals
            .iter()
            .filter(|iv| iv.label == BeatLabel::Irregular)
            .map(|iv| [iv.index as f64, iv.rr_s])
            .collect();
        if !flagged.is_empty() {
            fig.add_series(Series::Markers(MarkerSeries {
                name: "Irregular".into(),
                points: flagged,
                radius: 5,
                color: ALERT_RED,
            }));
        }
    }
    fig
}

/// Bar chart of the scalar features that are available.
pub fn feature_distribution_figure(features: &FeatureSet) -> Figure {
    let (labels, values) = features
        .scalar_features()
        .into_iter()
        .filter_map(|(name, value)| value.filter(|v| v.is_finite()).map(|v| (name.to_string(), v)))
        .unzip();
    let mut fig = Figure::new(Some("Distribution of Extracted Features".to_string()))
        .with_axes("Feature", "Value");
    fig.add_series(Series::Bars(BarSeries {
        labels,
        values,
        color: SIGNAL_BLUE,
    }));
    fig
}
