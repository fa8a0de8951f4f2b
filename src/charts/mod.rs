//! Charts module - Chart rendering

mod renderer;
mod series;

use crate::data::ProcessorError;
use polars::prelude::PolarsError;
use thiserror::Error;

pub use renderer::{ChartOptions, StaticChartRenderer, DEFAULT_TITLE};
pub use series::{ChartSeries, PALETTE};

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("No data points to chart")]
    NoData,
    #[error(transparent)]
    Metrics(#[from] ProcessorError),
    #[error("Column `week_end_date` must be a date column to chart, found {0}")]
    DateAxis(String),
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Failed to draw chart: {0}")]
    Drawing(String),
}
