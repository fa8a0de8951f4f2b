//! Scenario run configuration
//!
//! A JSON file describes which workbook to load, the driver values, the metrics to chart
//! and, for sweeps, a list of named scenarios. Every field is optional; command line flags
//! override whatever the file sets.

use crate::charts::{ChartOptions, DEFAULT_TITLE};
use crate::data::Sheet;
use crate::scenario::ScenarioDrivers;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// A named driver set evaluated by `sweep`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedScenario {
    pub name: String,
    #[serde(flatten)]
    pub drivers: ScenarioDrivers,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Directory holding `Basedata.csv` and `DAU_Model_imapct.csv`
    pub workbook: Option<PathBuf>,

    /// Sheet the scenario is computed on (default: the model impact sheet)
    pub sheet: Sheet,

    pub drivers: ScenarioDrivers,

    /// Metrics to chart, in stacking order (empty: wuu_calc, duu_calc, installs)
    pub metrics: Vec<String>,

    /// Chart output path; `.svg` writes SVG, anything else PNG
    pub output: PathBuf,

    pub width: u32,
    pub height: u32,
    pub title: String,

    pub scenarios: Vec<NamedScenario>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            workbook: None,
            sheet: Sheet::default(),
            drivers: ScenarioDrivers::default(),
            metrics: Vec::new(),
            output: PathBuf::from("scenario.png"),
            width: 1400,
            height: 800,
            title: DEFAULT_TITLE.to_string(),
            scenarios: Vec::new(),
        }
    }
}

impl ScenarioConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Reject unusable settings and pin drivers to their slider ranges.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "chart size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }

        self.drivers = clamp_drivers("drivers", self.drivers);
        for scenario in &mut self.scenarios {
            scenario.drivers = clamp_drivers(&scenario.name, scenario.drivers);
        }
        Ok(self)
    }

    pub fn chart_options(&self) -> ChartOptions {
        ChartOptions {
            width: self.width,
            height: self.height,
            title: self.title.clone(),
        }
    }

    /// Scenarios for a sweep; without any configured, the single `drivers` set.
    pub fn sweep_scenarios(&self) -> Vec<NamedScenario> {
        if self.scenarios.is_empty() {
            vec![NamedScenario {
                name: "scenario".to_string(),
                drivers: self.drivers,
            }]
        } else {
            self.scenarios.clone()
        }
    }
}

fn clamp_drivers(label: &str, drivers: ScenarioDrivers) -> ScenarioDrivers {
    if drivers.is_within_domain() {
        return drivers;
    }
    let clamped = drivers.clamped();
    warn!(scenario = label, from = %drivers, to = %clamped, "driver out of range, clamped");
    clamped
}
