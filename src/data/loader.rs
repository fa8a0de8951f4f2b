//! Workbook Loader Module
//! Handles loading the DAU model sheets (CSV exports) and date normalization using Polars.

use chrono::NaiveDate;
use polars::prelude::*;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Date column every sheet is keyed by.
pub const DATE_COLUMN: &str = "week_end_date";

/// `NaiveDate::num_days_from_ce()` of 1970-01-01, the epoch of Polars `Date` values.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("Sheet file not found: {0}")]
    MissingSheet(PathBuf),
    #[error("Column `week_end_date` could not be read as calendar dates: {0}")]
    InvalidDates(String),
    #[error("Unknown sheet `{0}` (expected `basedata` or `model`)")]
    UnknownSheet(String),
}

/// The two sheets of the DAU model workbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sheet {
    /// Raw weekly observations
    Basedata,
    /// Model impact sheet carrying the `*_calc` columns
    #[default]
    Model,
}

impl Sheet {
    /// Sheet identifier inside the workbook.
    pub fn sheet_name(self) -> &'static str {
        match self {
            Sheet::Basedata => "Basedata",
            Sheet::Model => "DAU_Model_imapct",
        }
    }

    fn file_name(self) -> String {
        format!("{}.csv", self.sheet_name())
    }
}

impl fmt::Display for Sheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sheet_name())
    }
}

impl FromStr for Sheet {
    type Err = LoaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "basedata" => Ok(Sheet::Basedata),
            "model" | "dau_model_imapct" => Ok(Sheet::Model),
            _ => Err(LoaderError::UnknownSheet(s.to_string())),
        }
    }
}

/// Both sheets of a loaded workbook.
#[derive(Debug, Clone)]
pub struct Workbook {
    pub basedata: DataFrame,
    pub model: DataFrame,
}

impl Workbook {
    /// Open a workbook exported as one CSV file per sheet:
    /// `<dir>/Basedata.csv` and `<dir>/DAU_Model_imapct.csv`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, LoaderError> {
        let dir = dir.as_ref();
        let basedata = DataLoader::read_sheet(&dir.join(Sheet::Basedata.file_name()))?;
        let model = DataLoader::read_sheet(&dir.join(Sheet::Model.file_name()))?;
        info!(
            workbook = %dir.display(),
            basedata_rows = basedata.height(),
            model_rows = model.height(),
            "loaded workbook"
        );
        Ok(Self { basedata, model })
    }

    pub fn sheet(&self, sheet: Sheet) -> &DataFrame {
        match sheet {
            Sheet::Basedata => &self.basedata,
            Sheet::Model => &self.model,
        }
    }
}

/// Reads sheet CSV exports with Polars.
pub struct DataLoader;

impl DataLoader {
    /// Read one sheet, normalize its `week_end_date` column to `Date` and type blank
    /// columns as numeric.
    pub fn read_sheet(path: &Path) -> Result<DataFrame, LoaderError> {
        if !path.is_file() {
            return Err(LoaderError::MissingSheet(path.to_path_buf()));
        }

        let df = LazyCsvReader::new(path)
            .with_infer_schema_length(Some(10000))
            .with_try_parse_dates(true)
            .finish()?
            .collect()?;

        let df = blank_columns_as_numeric(normalize_dates(df)?)?;
        check_date_order(&df);
        debug!(
            sheet = %path.display(),
            rows = df.height(),
            columns = df.width(),
            "read sheet"
        );
        Ok(df)
    }
}

/// A column with no values at all is inferred as text; it is missing data, so read it as
/// an all-null `Float64` column instead.
pub fn blank_columns_as_numeric(df: DataFrame) -> Result<DataFrame, LoaderError> {
    let blank: Vec<PlSmallStr> = df
        .get_columns()
        .iter()
        .filter(|c| c.name().as_str() != DATE_COLUMN)
        .filter(|c| matches!(c.dtype(), DataType::String | DataType::Null))
        .filter(|c| c.null_count() == c.len())
        .map(|c| c.name().clone())
        .collect();

    if blank.is_empty() {
        return Ok(df);
    }
    debug!(columns = ?blank, "typing blank columns as Float64");

    let casts: Vec<Expr> = blank
        .into_iter()
        .map(|name| col(name).cast(DataType::Float64))
        .collect();
    Ok(df.lazy().with_columns(casts).collect()?)
}

/// Strip any time-of-day from `week_end_date`, parsing text dates when needed.
/// Tables without the column pass through untouched.
pub fn normalize_dates(df: DataFrame) -> Result<DataFrame, LoaderError> {
    let dtype = match df.column(DATE_COLUMN) {
        Ok(column) => column.dtype().clone(),
        Err(_) => return Ok(df),
    };

    let expr = match dtype {
        DataType::Date => return Ok(df),
        DataType::Datetime(_, _) => col(DATE_COLUMN).cast(DataType::Date),
        DataType::String => col(DATE_COLUMN).str().to_date(StrptimeOptions::default()),
        other => {
            return Err(LoaderError::InvalidDates(format!(
                "unsupported column type {other}"
            )))
        }
    };

    df.lazy()
        .with_column(expr)
        .collect()
        .map_err(|e| LoaderError::InvalidDates(e.to_string()))
}

/// Read `week_end_date` as calendar dates, row for row.
pub fn week_end_dates(df: &DataFrame) -> Result<Vec<Option<NaiveDate>>, LoaderError> {
    let column = df.column(DATE_COLUMN)?;
    if column.dtype() != &DataType::Date {
        return Err(LoaderError::InvalidDates(format!(
            "expected Date column, found {}",
            column.dtype()
        )));
    }

    let days = column.cast(&DataType::Int32)?;
    Ok(days
        .i32()?
        .into_iter()
        .map(|d| d.and_then(date_from_epoch_days))
        .collect())
}

/// Convert Polars `Date` physical value (days since 1970-01-01) to a calendar date.
pub fn date_from_epoch_days(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)?)
}

fn check_date_order(df: &DataFrame) {
    let Ok(dates) = week_end_dates(df) else {
        return;
    };

    let dates: Vec<NaiveDate> = dates.into_iter().flatten().collect();
    if let Some(pair) = dates.windows(2).find(|w| w[0] >= w[1]) {
        if pair[0] == pair[1] {
            warn!(date = %pair[0], "duplicate week_end_date rows");
        } else {
            warn!(
                before = %pair[0],
                after = %pair[1],
                "week_end_date is not ascending; charts will read out of order"
            );
        }
    }
}
