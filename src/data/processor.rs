//! Data Processor Module
//! Metric column selection and long-format (stack) transformation for charting.

use super::loader::DATE_COLUMN;
use polars::prelude::*;
use thiserror::Error;

/// Metrics charted when the caller does not pick any.
pub const DEFAULT_METRICS: [&str; 3] = ["wuu_calc", "duu_calc", "installs"];

/// Long-format column holding the metric name.
pub const METRIC_COLUMN: &str = "metric";
/// Long-format column holding the metric value.
pub const VALUE_COLUMN: &str = "value";

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Unknown or non-numeric metric column: {0}")]
    UnknownMetric(String),
    #[error("Select at least one metric to chart")]
    NoMetrics,
}

/// Whether a column type takes part in scenario arithmetic.
pub fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Float32
            | DataType::Float64
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

/// Handles metric selection and transformation operations.
pub struct DataProcessor;

impl DataProcessor {
    /// Numeric columns that can be charted, in table order. The date column is never a metric.
    pub fn metric_columns(df: &DataFrame) -> Vec<String> {
        df.get_columns()
            .iter()
            .filter(|col| col.name().as_str() != DATE_COLUMN && is_numeric(col.dtype()))
            .map(|col| col.name().to_string())
            .collect()
    }

    /// Default chart selection restricted to the metrics the table actually has.
    pub fn default_metrics(df: &DataFrame) -> Vec<String> {
        let available = Self::metric_columns(df);
        DEFAULT_METRICS
            .iter()
            .filter(|m| available.iter().any(|a| a == *m))
            .map(|m| m.to_string())
            .collect()
    }

    /// Validate a caller-ordered metric selection. Order is kept, repeats are dropped.
    pub fn select_metrics(
        df: &DataFrame,
        requested: &[String],
    ) -> Result<Vec<String>, ProcessorError> {
        let available = Self::metric_columns(df);
        let mut selected: Vec<String> = Vec::with_capacity(requested.len());

        for metric in requested {
            if !available.contains(metric) {
                return Err(ProcessorError::UnknownMetric(metric.clone()));
            }
            if !selected.contains(metric) {
                selected.push(metric.clone());
            }
        }

        if selected.is_empty() {
            return Err(ProcessorError::NoMetrics);
        }
        Ok(selected)
    }

    /// Transform the selected metric columns to long format (melt).
    ///
    /// Output columns: [week_end_date, "metric", "value"], metrics in selection order.
    /// Null values are dropped; rows keep their table order within each metric.
    pub fn stack_to_long(df: &DataFrame, metrics: &[String]) -> Result<DataFrame, ProcessorError> {
        let metrics = Self::select_metrics(df, metrics)?;
        let date_series = df.column(DATE_COLUMN)?;

        let mut rows: Vec<IdxSize> = Vec::new();
        let mut names: Vec<&str> = Vec::new();
        let mut values: Vec<f64> = Vec::new();

        for metric in &metrics {
            let value_f64 = df.column(metric)?.cast(&DataType::Float64)?;
            let value_ca = value_f64.f64()?;

            for (i, v) in value_ca.into_iter().enumerate() {
                if let Some(v) = v {
                    rows.push(i as IdxSize);
                    names.push(metric.as_str());
                    values.push(v);
                }
            }
        }

        let idx = IdxCa::from_vec("idx".into(), rows);
        let dates = Column::from(date_series.as_materialized_series().take(&idx)?);

        let df = DataFrame::new(vec![
            dates,
            Column::new(METRIC_COLUMN.into(), names),
            Column::new(VALUE_COLUMN.into(), values),
        ])?;

        Ok(df)
    }

    /// Column totals of the selected metrics, nulls ignored.
    pub fn metric_totals(
        df: &DataFrame,
        metrics: &[String],
    ) -> Result<Vec<(String, f64)>, ProcessorError> {
        Self::select_metrics(df, metrics)?
            .into_iter()
            .map(|metric| -> Result<(String, f64), ProcessorError> {
                let value_f64 = df.column(&metric)?.cast(&DataType::Float64)?;
                let total = value_f64.f64()?.into_iter().flatten().sum::<f64>();
                Ok((metric, total))
            })
            .collect()
    }

    /// First `rows` rows of the table for display.
    pub fn preview(df: &DataFrame, rows: usize) -> DataFrame {
        df.head(Some(rows))
    }
}
