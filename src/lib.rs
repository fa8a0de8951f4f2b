//! DAU Scenario - DAU model scenario recalculation & weekly trend charts
//!
//! Loads the DAU model workbook, recomputes the derived `*_calc` / `*_new` columns under
//! scenario drivers, and renders the selected metrics as a weekly trend chart.

pub mod charts;
pub mod config;
pub mod data;
pub mod scenario;

pub use data::{DataLoader, DataProcessor, Sheet, Workbook};
pub use scenario::{RecalcError, ScenarioDrivers, ScenarioEngine};
