//! Scenario driver parameters.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;

/// Expected operating range of `install_multiplier`.
pub const INSTALL_MULTIPLIER_RANGE: RangeInclusive<f64> = 0.5..=1.5;
/// Expected operating range of `retention_delta`.
pub const RETENTION_DELTA_RANGE: RangeInclusive<f64> = -0.25..=0.25;
/// Expected operating range of `engagement_delta`.
pub const ENGAGEMENT_DELTA_RANGE: RangeInclusive<f64> = -0.25..=0.25;

/// User-tunable scalars that perturb the derived columns.
///
/// The engine accepts any finite or non-finite value; ranges are only enforced by
/// [`ScenarioDrivers::clamped`] for callers that want slider semantics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioDrivers {
    /// Linear scale applied to installs
    pub install_multiplier: f64,
    /// Fractional change to all retention rates (`nurr`, `curr`)
    pub retention_delta: f64,
    /// Fractional change to the engagement percentage
    pub engagement_delta: f64,
}

impl Default for ScenarioDrivers {
    fn default() -> Self {
        Self {
            install_multiplier: 1.0,
            retention_delta: 0.0,
            engagement_delta: 0.0,
        }
    }
}

impl ScenarioDrivers {
    pub fn new(install_multiplier: f64, retention_delta: f64, engagement_delta: f64) -> Self {
        Self {
            install_multiplier,
            retention_delta,
            engagement_delta,
        }
    }

    /// Identity drivers leave every derived column equal to its source.
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }

    pub fn is_within_domain(&self) -> bool {
        INSTALL_MULTIPLIER_RANGE.contains(&self.install_multiplier)
            && RETENTION_DELTA_RANGE.contains(&self.retention_delta)
            && ENGAGEMENT_DELTA_RANGE.contains(&self.engagement_delta)
    }

    /// Clamp each driver into its documented range.
    pub fn clamped(&self) -> Self {
        fn clamp(value: f64, range: &RangeInclusive<f64>) -> f64 {
            value.clamp(*range.start(), *range.end())
        }

        Self {
            install_multiplier: clamp(self.install_multiplier, &INSTALL_MULTIPLIER_RANGE),
            retention_delta: clamp(self.retention_delta, &RETENTION_DELTA_RANGE),
            engagement_delta: clamp(self.engagement_delta, &ENGAGEMENT_DELTA_RANGE),
        }
    }
}

impl fmt::Display for ScenarioDrivers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "installs x{:.2}, retention {:+.2}, engagement {:+.2}",
            self.install_multiplier, self.retention_delta, self.engagement_delta
        )
    }
}
