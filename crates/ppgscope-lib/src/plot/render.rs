use super::{Figure, PlotBackend, Series};
use crate::error::{PpgError, Result};
use log::debug;
use plotters::coord::Shift;
use plotters::prelude::*;
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    str::FromStr,
};

pub const DEFAULT_SIZE: (u32, u32) = (1000, 600);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    Svg,
}

impl ImageFormat {
    /// `.svg` selects SVG; anything else renders PNG.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("svg") => ImageFormat::Svg,
            _ => ImageFormat::Png,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Svg => "svg",
        }
    }
}

impl FromStr for ImageFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "svg" => Ok(ImageFormat::Svg),
            other => Err(format!("unknown image format '{}' (png or svg)", other)),
        }
    }
}

/// Writes every drawn figure to one file path.
pub struct FileBackend {
    pub path: PathBuf,
    pub size: (u32, u32),
}

impl PlotBackend for FileBackend {
    fn draw(&mut self, fig: &Figure) -> Result<()> {
        render_to_file(fig, &self.path, self.size)
    }
}

pub fn render_to_file(fig: &Figure, path: &Path, size: (u32, u32)) -> Result<()> {
    if fig.is_empty() {
        return Err(PpgError::invalid("figure has no data to draw"));
    }
    match ImageFormat::from_path(path) {
        ImageFormat::Png => {
            let root = BitMapBackend::new(path, size).into_drawing_area();
            draw_figure(&root, fig)?;
        }
        ImageFormat::Svg => {
            let root = SVGBackend::new(path, size).into_drawing_area();
            draw_figure(&root, fig)?;
        }
    }
    debug!("wrote {}", path.display());
    Ok(())
}

fn plot_err<E: std::fmt::Display>(err: E) -> PpgError {
    PpgError::Plot(err.to_string())
}

fn rgb(color: &super::Color) -> RGBColor {
    let (r, g, b) = color.channels();
    RGBColor(r, g, b)
}

fn draw_figure<DB>(root: &DrawingArea<DB, Shift>, fig: &Figure) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE).map_err(plot_err)?;
    let bars = fig.series.iter().find_map(|s| match s {
        Series::Bars(b) => Some(b),
        _ => None,
    });
    match bars {
        Some(bars) => draw_bars(root, fig, bars)?,
        None => draw_xy(root, fig)?,
    }
    root.present().map_err(plot_err)
}

fn padded(lo: f64, hi: f64) -> (f64, f64) {
    if hi > lo {
        let pad = (hi - lo) * 0.05;
        (lo - pad, hi + pad)
    } else {
        (lo - 0.5, hi + 0.5)
    }
}

fn draw_xy<DB>(root: &DrawingArea<DB, Shift>, fig: &Figure) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let (x_min, x_max, y_min, y_max) = fig
        .bounds()
        .ok_or_else(|| PpgError::invalid("figure has no finite points"))?;
    let (x_min, x_max) = if x_max > x_min {
        (x_min, x_max)
    } else {
        padded(x_min, x_max)
    };
    let (y_min, y_max) = padded(y_min, y_max);
    let mut chart = ChartBuilder::on(root)
        .margin(10)
        .caption(
            fig.title.clone().unwrap_or_else(|| "Plot".into()),
            ("sans-serif", 24),
        )
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .map_err(plot_err)?;
    chart
        .configure_mesh()
        .x_desc(fig.x.label.clone().unwrap_or_default())
        .y_desc(fig.y.label.clone().unwrap_or_default())
        .draw()
        .map_err(plot_err)?;

    for span in &fig.spans {
        let color = rgb(&span.color);
        chart
            .draw_series(std::iter::once(Rectangle::new(
                [(span.x0, y_min), (span.x1, y_max)],
                color.mix(0.2).filled(),
            )))
            .map_err(plot_err)?;
    }

    for series in &fig.series {
        match series {
            Series::Line(line) => {
                let color = rgb(&line.style.color);
                let style = color.stroke_width(line.style.width.round().max(1.0) as u32);
                chart
                    .draw_series(LineSeries::new(
                        line.points.iter().map(|p| (p[0], p[1])),
                        style,
                    ))
                    .map_err(plot_err)?
                    .label(line.name.clone())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
            }
            Series::Markers(markers) => {
                let color = rgb(&markers.color);
                let radius = markers.radius;
                chart
                    .draw_series(
                        markers
                            .points
                            .iter()
                            .map(|p| Circle::new((p[0], p[1]), radius, color.filled())),
                    )
                    .map_err(plot_err)?
                    .label(markers.name.clone())
                    .legend(move |(x, y)| Circle::new((x + 10, y), radius, color.filled()));
            }
            Series::Bars(_) => {}
        }
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(plot_err)?;
    Ok(())
}

fn draw_bars<DB>(root: &DrawingArea<DB, Shift>, fig: &Figure, bars: &super::BarSeries) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let finite = bars.values.iter().copied().filter(|v| v.is_finite());
    let (lo, hi) = finite.fold((0.0f64, 0.0f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let (y_min, y_max) = padded(lo, hi);
    let n = bars.values.len().max(1);
    let labels = bars.labels.clone();
    let label_for = move |x: &f64| -> String {
        let idx = x.round();
        if idx >= 0.0 && (idx - x).abs() < 1e-6 {
            labels.get(idx as usize).cloned().unwrap_or_default()
        } else {
            String::new()
        }
    };
    let mut chart = ChartBuilder::on(root)
        .margin(10)
        .caption(
            fig.title.clone().unwrap_or_else(|| "Plot".into()),
            ("sans-serif", 24),
        )
        .x_label_area_size(60)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), y_min..y_max)
        .map_err(plot_err)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&label_for)
        .x_desc(fig.x.label.clone().unwrap_or_default())
        .y_desc(fig.y.label.clone().unwrap_or_default())
        .draw()
        .map_err(plot_err)?;
    let color = rgb(&bars.color);
    chart
        .draw_series(
            bars.values
                .iter()
                .enumerate()
                .filter(|(_, v)| v.is_finite())
                .map(|(i, &v)| {
                    let x = i as f64;
                    Rectangle::new([(x - 0.35, 0.0), (x + 0.35, v)], color.filled())
                }),
        )
        .map_err(plot_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plot::signal_figure;
    use crate::signal::{Events, TimeSeries};

    fn sample_figure() -> Figure {
        let data: Vec<f64> = (0..500).map(|i| (i as f64 / 10.0).sin()).collect();
        let ts = TimeSeries::new(50.0, data);
        let beats = Events::from_indices(vec![16, 79, 141]);
        signal_figure("Filtered PPG Signal", &ts, Some(&beats), None, 2048)
    }

    #[test]
    fn renders_non_empty_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signal.png");
        render_to_file(&sample_figure(), &path, DEFAULT_SIZE).unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn renders_non_empty_svg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signal.svg");
        let mut backend = FileBackend {
            path: path.clone(),
            size: (640, 400),
        };
        backend.draw(&sample_figure()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("<svg"));
    }

    #[test]
    fn empty_figure_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.png");
        assert!(matches!(
            render_to_file(&Figure::new(None::<String>), &path, DEFAULT_SIZE),
            Err(PpgError::InvalidInput(_))
        ));
        assert!(!path.exists());
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(ImageFormat::from_path(Path::new("a.SVG")), ImageFormat::Svg);
        assert_eq!(ImageFormat::from_path(Path::new("a.png")), ImageFormat::Png);
        assert_eq!(ImageFormat::from_path(Path::new("a")), ImageFormat::Png);
        assert_eq!("SVG".parse::<ImageFormat>(), Ok(ImageFormat::Svg));
        assert!("gif".parse::<ImageFormat>().is_err());
    }
}
