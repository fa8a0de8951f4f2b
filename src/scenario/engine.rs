//! Scenario Recalculation Engine
//! Recomputes the derived DAU model columns from a base table and scenario drivers.
//!
//! Every derived column is a rule (output name, required columns, formula). Rules run in
//! declaration order, so a rule may read the output of any rule listed before it. A rule
//! whose required columns are absent is skipped and its output is simply missing from the
//! derived table.

use super::drivers::ScenarioDrivers;
use crate::data::is_numeric;
use polars::prelude::*;
use rayon::prelude::*;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, trace};

pub const INSTALLS: &str = "installs";
pub const NURR: &str = "nurr";
pub const CURR: &str = "curr";
pub const ENGAGEMENT: &str = "engagement";
pub const CON_WUU: &str = "con_wuu_calc";
pub const NEW_WUU: &str = "new_wuu_calu";
pub const RET_WUU: &str = "ret_wuu_calulated";
pub const DU_CALC: &str = "du_calc";
pub const TOTAL_GROWTH: &str = "total_growth";
pub const TOTAL_LAPSE: &str = "total_lapse";

pub const INSTALLS_CALCULATED: &str = "Installs_calculated";
pub const NURR_NEW: &str = "nurr_new";
pub const CURR_NEW: &str = "curr_new";
pub const ENGAGEMENT_NEW: &str = "engagement_new";
pub const WUU_CALC: &str = "wuu_calc";
pub const DUU_CALC: &str = "duu_calc";
pub const NET_GROWTH: &str = "net_growth";

#[derive(Error, Debug)]
pub enum RecalcError {
    #[error("Column `{column}` has type {dtype} and cannot be used to compute `{operation}`")]
    NonNumericColumn {
        column: String,
        operation: &'static str,
        dtype: String,
    },
    #[error("Column `{column}` has {found} rows but the table has {expected}")]
    Misaligned {
        column: String,
        expected: usize,
        found: usize,
    },
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

/// One derived column of the scenario table.
pub struct DerivedColumn {
    pub name: &'static str,
    /// Columns that must be present for the rule to run but are not read by the formula.
    pub gate: &'static [&'static str],
    /// Columns the formula reads.
    pub inputs: &'static [&'static str],
    formula: fn(&ScenarioDrivers) -> Expr,
}

impl DerivedColumn {
    /// First required column not in `available`, if any.
    pub fn first_missing(&self, available: &HashSet<String>) -> Option<&'static str> {
        self.gate
            .iter()
            .chain(self.inputs)
            .find(|name| !available.contains(**name))
            .copied()
    }

    pub fn expr(&self, drivers: &ScenarioDrivers) -> Expr {
        (self.formula)(drivers).alias(self.name)
    }
}

/// Derived columns in evaluation order.
///
/// `duu_calc` is gated on `du_calc` even though its formula never reads it. The workbook
/// model has always worked this way; the gate is kept until the intended condition is known.
pub const DERIVED_COLUMNS: &[DerivedColumn] = &[
    DerivedColumn {
        name: INSTALLS_CALCULATED,
        gate: &[],
        inputs: &[INSTALLS],
        formula: installs_calculated,
    },
    DerivedColumn {
        name: NURR_NEW,
        gate: &[],
        inputs: &[NURR],
        formula: nurr_new,
    },
    DerivedColumn {
        name: CURR_NEW,
        gate: &[],
        inputs: &[CURR],
        formula: curr_new,
    },
    DerivedColumn {
        name: ENGAGEMENT_NEW,
        gate: &[],
        inputs: &[ENGAGEMENT],
        formula: engagement_new,
    },
    DerivedColumn {
        name: WUU_CALC,
        gate: &[],
        inputs: &[CON_WUU, NEW_WUU, RET_WUU],
        formula: wuu_calc,
    },
    DerivedColumn {
        name: DUU_CALC,
        gate: &[DU_CALC],
        inputs: &[WUU_CALC, ENGAGEMENT_NEW],
        formula: duu_calc,
    },
    DerivedColumn {
        name: NET_GROWTH,
        gate: &[],
        inputs: &[TOTAL_GROWTH, TOTAL_LAPSE],
        formula: net_growth,
    },
];

fn source(name: &str) -> Expr {
    col(name).cast(DataType::Float64)
}

fn installs_calculated(d: &ScenarioDrivers) -> Expr {
    source(INSTALLS) * lit(d.install_multiplier)
}

fn nurr_new(d: &ScenarioDrivers) -> Expr {
    source(NURR) * lit(1.0 + d.retention_delta)
}

fn curr_new(d: &ScenarioDrivers) -> Expr {
    source(CURR) * lit(1.0 + d.retention_delta)
}

fn engagement_new(d: &ScenarioDrivers) -> Expr {
    source(ENGAGEMENT) * lit(1.0 + d.engagement_delta)
}

fn wuu_calc(_: &ScenarioDrivers) -> Expr {
    source(CON_WUU) + source(NEW_WUU) + source(RET_WUU)
}

fn duu_calc(_: &ScenarioDrivers) -> Expr {
    source(WUU_CALC) * source(ENGAGEMENT_NEW) / lit(100.0)
}

fn net_growth(_: &ScenarioDrivers) -> Expr {
    source(TOTAL_GROWTH) + source(TOTAL_LAPSE)
}

/// Stateless scenario recalculation.
pub struct ScenarioEngine;

impl ScenarioEngine {
    /// Recompute every derived column whose sources are present.
    ///
    /// The result keeps the base rows in order with all base columns, adding (or
    /// overwriting) the derived ones. `base` itself is left untouched.
    pub fn recalculate(
        base: &DataFrame,
        drivers: &ScenarioDrivers,
    ) -> Result<DataFrame, RecalcError> {
        let mut available: HashSet<String> = base
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut computed: Vec<&'static str> = Vec::new();
        let mut lazy = base.clone().lazy();

        for rule in DERIVED_COLUMNS {
            if let Some(missing) = rule.first_missing(&available) {
                debug!(column = rule.name, missing, "skipping derived column");
                continue;
            }

            for input in rule.inputs {
                if !computed.contains(input) {
                    Self::check_numeric(base, input, rule.name)?;
                }
            }

            trace!(column = rule.name, "computing derived column");
            lazy = lazy.with_column(rule.expr(drivers));
            available.insert(rule.name.to_string());
            computed.push(rule.name);
        }

        let derived = lazy.collect()?;
        debug!(
            rows = derived.height(),
            computed = ?computed,
            %drivers,
            "recalculated scenario"
        );
        Ok(derived)
    }

    /// Recalculate one base table under several driver sets in parallel.
    pub fn recalculate_many(
        base: &DataFrame,
        scenarios: &[ScenarioDrivers],
    ) -> Result<Vec<DataFrame>, RecalcError> {
        scenarios
            .par_iter()
            .map(|drivers| Self::recalculate(base, drivers))
            .collect()
    }

    /// Names of all columns the engine can derive, in evaluation order.
    pub fn derived_column_names() -> Vec<&'static str> {
        DERIVED_COLUMNS.iter().map(|rule| rule.name).collect()
    }

    fn check_numeric(
        base: &DataFrame,
        column: &str,
        operation: &'static str,
    ) -> Result<(), RecalcError> {
        let dtype = base.column(column)?.dtype();
        if is_numeric(dtype) {
            Ok(())
        } else {
            Err(RecalcError::NonNumericColumn {
                column: column.to_string(),
                operation,
                dtype: dtype.to_string(),
            })
        }
    }
}
