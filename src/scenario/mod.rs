//! Scenario module - driver parameters and the recalculation engine

mod drivers;
pub mod engine;
mod table;

pub use drivers::{
    ScenarioDrivers, ENGAGEMENT_DELTA_RANGE, INSTALL_MULTIPLIER_RANGE, RETENTION_DELTA_RANGE,
};
pub use engine::{DerivedColumn, RecalcError, ScenarioEngine, DERIVED_COLUMNS};
pub use table::ScenarioTable;
