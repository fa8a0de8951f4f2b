//! Static Chart Renderer
//! Draws the weekly trend chart of the selected scenario metrics with plotters.
//!
//! Layout:
//! 1. Title centered on top
//! 2. Line per metric against `week_end_date`, drawn in selection order (last on top)
//! 3. Legend in the upper-left corner, in selection order

use super::series::ChartSeries;
use super::RenderError;
use crate::data::date_from_epoch_days;
use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use polars::prelude::DataFrame;
use std::path::Path;
use tracing::info;

pub const DEFAULT_TITLE: &str = "Weekly trend – scenario vs. actual";

/// Output size and labels for a rendered chart.
#[derive(Debug, Clone)]
pub struct ChartOptions {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            width: 1400,
            height: 800,
            title: DEFAULT_TITLE.to_string(),
        }
    }
}

pub struct StaticChartRenderer;

impl StaticChartRenderer {
    /// Render the selected metrics of `df` to `path`.
    /// A `.svg` extension writes SVG, anything else a bitmap (PNG).
    pub fn render(
        df: &DataFrame,
        metrics: &[String],
        path: &Path,
        options: &ChartOptions,
    ) -> Result<(), RenderError> {
        let series = ChartSeries::from_table(df, metrics)?;
        let bounds = ChartSeries::bounds(&series).ok_or(RenderError::NoData)?;
        let size = (options.width, options.height);

        let is_svg = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));
        if is_svg {
            let root = SVGBackend::new(path, size).into_drawing_area();
            Self::draw(root, &series, bounds, options)?;
        } else {
            let root = BitMapBackend::new(path, size).into_drawing_area();
            Self::draw(root, &series, bounds, options)?;
        }

        info!(
            chart = %path.display(),
            series = series.len(),
            "rendered chart"
        );
        Ok(())
    }

    fn draw<DB: DrawingBackend>(
        root: DrawingArea<DB, Shift>,
        series: &[ChartSeries],
        ((x_min, x_max), (y_min, y_max)): ((f64, f64), (f64, f64)),
        options: &ChartOptions,
    ) -> Result<(), RenderError> {
        // Half a week either side keeps single-row tables visible.
        let x_range = (x_min - 3.5)..(x_max + 3.5);
        let pad = if y_max > y_min {
            (y_max - y_min) * 0.1
        } else {
            y_min.abs().max(1.0) * 0.1
        };
        let y_range = (y_min - pad)..(y_max + pad);

        root.fill(&WHITE).map_err(drawing_error)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(&options.title, ("sans-serif", 28))
            .margin(20)
            .x_label_area_size(45)
            .y_label_area_size(80)
            .build_cartesian_2d(x_range, y_range)
            .map_err(drawing_error)?;

        chart
            .configure_mesh()
            .x_desc("week_end_date")
            .y_desc("value")
            .x_labels(8)
            .x_label_formatter(&|day| format_day(*day))
            .draw()
            .map_err(drawing_error)?;

        // Selection order; later metrics paint over earlier ones.
        for s in series {
            let color = s.color;
            chart
                .draw_series(LineSeries::new(
                    s.points.iter().copied(),
                    color.stroke_width(2),
                ))
                .map_err(drawing_error)?
                .label(s.name.clone())
                .legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 24, y)], color.stroke_width(2))
                });
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(&WHITE.mix(0.85))
            .border_style(&BLACK)
            .draw()
            .map_err(drawing_error)?;

        root.present().map_err(drawing_error)?;
        Ok(())
    }
}

fn format_day(day: f64) -> String {
    date_from_epoch_days(day.round() as i32)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn drawing_error<E: std::error::Error + Send + Sync>(err: DrawingAreaErrorKind<E>) -> RenderError {
    RenderError::Drawing(err.to_string())
}
