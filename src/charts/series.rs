//! Chart Series Module
//! Extracts the selected metric columns as dated line series.

use super::RenderError;
use crate::data::{DataProcessor, DATE_COLUMN, METRIC_COLUMN, VALUE_COLUMN};
use polars::prelude::*;
use plotters::style::RGBColor;

/// Color palette for metric lines, assigned by selection position.
pub const PALETTE: [RGBColor; 10] = [
    RGBColor(52, 152, 219),  // Blue
    RGBColor(231, 76, 60),   // Red
    RGBColor(46, 204, 113),  // Green
    RGBColor(155, 89, 182),  // Purple
    RGBColor(243, 156, 18),  // Orange
    RGBColor(26, 188, 156),  // Teal
    RGBColor(233, 30, 99),   // Pink
    RGBColor(0, 188, 212),   // Cyan
    RGBColor(255, 87, 34),   // Deep Orange
    RGBColor(96, 125, 139),  // Blue Grey
];

/// One metric line: (days since 1970-01-01, value) points in table order.
#[derive(Debug, Clone)]
pub struct ChartSeries {
    pub name: String,
    pub points: Vec<(f64, f64)>,
    pub color: RGBColor,
}

impl ChartSeries {
    /// Get color for the metric at `index` of the selection.
    pub fn color_for(index: usize) -> RGBColor {
        PALETTE[index % PALETTE.len()]
    }

    /// Build one series per selected metric, in selection order, from the long-format
    /// stack of the table. Rows with a missing date or value are left out of that series.
    pub fn from_table(df: &DataFrame, metrics: &[String]) -> Result<Vec<Self>, RenderError> {
        let metrics = DataProcessor::select_metrics(df, metrics)?;

        let date_column = df.column(DATE_COLUMN)?;
        if date_column.dtype() != &DataType::Date {
            return Err(RenderError::DateAxis(date_column.dtype().to_string()));
        }

        let long = DataProcessor::stack_to_long(df, &metrics)?;
        let mut series: Vec<Self> = metrics
            .into_iter()
            .enumerate()
            .map(|(index, name)| Self {
                name,
                points: Vec::new(),
                color: Self::color_for(index),
            })
            .collect();

        let days = long.column(DATE_COLUMN)?.cast(&DataType::Int32)?;
        let names = long.column(METRIC_COLUMN)?;
        let values = long.column(VALUE_COLUMN)?;
        let rows = days
            .i32()?
            .into_iter()
            .zip(names.str()?.into_iter())
            .zip(values.f64()?.into_iter());

        for ((day, name), value) in rows {
            let (Some(day), Some(name), Some(value)) = (day, name, value) else {
                continue;
            };
            if let Some(line) = series.iter_mut().find(|s| s.name == name) {
                line.points.push((day as f64, value));
            }
        }
        Ok(series)
    }

    /// Bounding box over all points as ((x_min, x_max), (y_min, y_max)).
    pub fn bounds(series: &[Self]) -> Option<((f64, f64), (f64, f64))> {
        let mut points = series.iter().flat_map(|s| s.points.iter()).peekable();
        points.peek()?;

        let mut x = (f64::INFINITY, f64::NEG_INFINITY);
        let mut y = (f64::INFINITY, f64::NEG_INFINITY);
        for &(px, py) in points {
            x = (x.0.min(px), x.1.max(px));
            if py.is_finite() {
                y = (y.0.min(py), y.1.max(py));
            }
        }

        if y.0 > y.1 {
            return None;
        }
        Some((x, y))
    }
}
