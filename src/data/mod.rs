//! Data module - workbook loading and metric processing

mod loader;
mod processor;

pub use loader::{
    blank_columns_as_numeric, date_from_epoch_days, normalize_dates, week_end_dates, DataLoader, LoaderError, Sheet,
    Workbook, DATE_COLUMN,
};
pub use processor::{
    is_numeric, DataProcessor, ProcessorError, DEFAULT_METRICS, METRIC_COLUMN, VALUE_COLUMN,
};
