//! Curve set plotting.
//!
//! One image per channel family: strength on x, logical error rate on y,
//! one line per code with Wilson 95% bars on every point. Images are drawn
//! to a `.partial` file and renamed once complete.

use anyhow::{Context, Result};
use plotters::coord::Shift;
use plotters::prelude::*;
use qler_core::{CurveRenderer, CurveSet, QlerError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const PLOT_SIZE: (u32, u32) = (1024, 768);
const CONFIDENCE_Z: f64 = 1.96;

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum PlotFormat {
    /// Vector output with axis labels and legend text.
    Svg,
    /// Raster output. Text is omitted since no font backend is linked.
    Png,
}

impl PlotFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            PlotFormat::Svg => "svg",
            PlotFormat::Png => "png",
        }
    }
}

/// File name stem for a channel label, e.g. `amplitude damping` ->
/// `amplitude_damping`.
pub fn file_stem_for(label: &str) -> String {
    label
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Writes each curve set to `<out_dir>/<label>.<ext>`.
pub struct PlotRenderer {
    out_dir: PathBuf,
    format: PlotFormat,
    written: Vec<PathBuf>,
}

impl PlotRenderer {
    /// Creates a renderer writing into `out_dir`.
    ///
    /// # Arguments
    ///
    /// * `out_dir` - Directory for the images, created if missing.
    /// * `format` - Image format, which also picks the file extension.
    ///
    /// # Returns
    ///
    /// The renderer, or an error if the directory cannot be created.
    pub fn new(out_dir: impl Into<PathBuf>, format: PlotFormat) -> Result<Self> {
        let out_dir = out_dir.into();
        fs::create_dir_all(&out_dir)
            .with_context(|| format!("Failed to create output directory {}", out_dir.display()))?;
        Ok(Self {
            out_dir,
            format,
            written: Vec::new(),
        })
    }

    pub fn path_for(&self, label: &str) -> PathBuf {
        self.out_dir
            .join(format!("{}.{}", file_stem_for(label), self.format.extension()))
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn write(&self, set: &CurveSet) -> Result<PathBuf> {
        let path = self.path_for(&set.channel_label);
        let partial = path.with_extension(format!("partial.{}", self.format.extension()));

        let drawn = match self.format {
            PlotFormat::Svg => {
                draw_curves(SVGBackend::new(&partial, PLOT_SIZE).into_drawing_area(), set)
            }
            PlotFormat::Png => {
                draw_curves(BitMapBackend::new(&partial, PLOT_SIZE).into_drawing_area(), set)
            }
        };
        let finished = drawn
            .with_context(|| format!("Failed to draw {}", path.display()))
            .and_then(|()| {
                fs::rename(&partial, &path)
                    .with_context(|| format!("Failed to move plot into {}", path.display()))
            });
        if let Err(e) = finished {
            let _ = fs::remove_file(&partial);
            return Err(e);
        }
        Ok(path)
    }
}

impl CurveRenderer for PlotRenderer {
    fn render(&mut self, curves: &CurveSet) -> qler_core::Result<()> {
        let path = self
            .write(curves)
            .map_err(|e| QlerError::Render(format!("{:#}", e)))?;
        info!(path = %path.display(), "plot written");
        self.written.push(path);
        Ok(())
    }
}

fn draw_curves<DB>(root: DrawingArea<DB, Shift>, set: &CurveSet) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("Logical error rate under {}", set.channel_label),
            ("sans-serif", 24),
        )
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0f64..1.0f64, 0.0f64..1.0f64)?;

    chart
        .configure_mesh()
        .x_desc("physical error strength")
        .y_desc("logical error rate")
        .x_labels(11)
        .draw()?;

    for (idx, curve) in set.curves.iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        let line = curve.strengths().into_iter().zip(curve.rates());
        chart
            .draw_series(LineSeries::new(line, color.stroke_width(2)))?
            .label(curve.code_id.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
        chart.draw_series(curve.points.iter().map(|p| {
            let (lo, hi) = p.wilson_interval(CONFIDENCE_Z);
            ErrorBar::new_vertical(p.strength, lo, p.rate, hi, color.filled(), 6)
        }))?;
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Removes leftover `.partial` files in `dir` from an interrupted run.
pub fn clean_partials(dir: &Path) -> Result<usize> {
    let mut removed = 0;
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return Ok(0),
    };
    for entry in entries {
        let path = entry?.path();
        let is_partial = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.contains(".partial."));
        if is_partial {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
            removed += 1;
        }
    }
    Ok(removed)
}
