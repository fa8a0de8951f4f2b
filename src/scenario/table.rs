//! Base table construction from raw columns.

use super::engine::RecalcError;
use crate::data::DATE_COLUMN;
use chrono::NaiveDate;
use polars::prelude::*;

/// Builds base tables for callers that hold plain vectors instead of a loaded sheet.
pub struct ScenarioTable;

impl ScenarioTable {
    /// Assemble a base table keyed by `week_end_date`.
    ///
    /// Every column must have exactly one value per date; a short or long column is
    /// rejected instead of being padded or truncated.
    pub fn from_columns(
        dates: &[NaiveDate],
        columns: Vec<(&str, Vec<f64>)>,
    ) -> Result<DataFrame, RecalcError> {
        let expected = dates.len();
        let mut frame = Vec::with_capacity(columns.len() + 1);
        frame.push(Column::new(DATE_COLUMN.into(), dates));

        for (name, values) in columns {
            if values.len() != expected {
                return Err(RecalcError::Misaligned {
                    column: name.to_string(),
                    expected,
                    found: values.len(),
                });
            }
            frame.push(Column::new(name.into(), values));
        }

        Ok(DataFrame::new(frame)?)
    }
}
