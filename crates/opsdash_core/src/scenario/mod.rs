//! What-if scenario engine.
//!
//! # Responsibility
//! - Apply named adjustments to a cloned snapshot and compare metrics
//!   between the baseline and the adjusted copy.
//!
//! # Invariants
//! - The baseline snapshot and the record store are never modified.
//! - Every referenced employee/project is checked before any adjustment is
//!   applied; the first unknown identifier fails the whole scenario.
//! - Adjustments that touch disjoint fields commute.

use crate::model::employee::EmployeeId;
use crate::model::project::ProjectId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod engine;

pub use engine::{apply_adjustments, run_scenario, MetricDelta, ProjectDelta, ScenarioOutcome};

/// One hypothetical change to the baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Adjustment {
    /// Scales project `budget_used`, expense amounts, employee hourly rates
    /// and allocation project rates.
    CostMultiplier(f64),
    /// Adds to each listed employee's fte; the result is clamped to `[0, 1]`.
    FteDelta(BTreeMap<EmployeeId, f64>),
    /// Compounds project revenue (actual and projected) by `(1 + rate)^periods`.
    RevenueGrowthRate { rate: f64, periods: u32 },
    /// Moves each listed project's end date by a signed number of days.
    ScheduleShiftDays(BTreeMap<ProjectId, i64>),
}

impl Adjustment {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CostMultiplier(_) => "cost_multiplier",
            Self::FteDelta(_) => "fte_delta",
            Self::RevenueGrowthRate { .. } => "revenue_growth_rate",
            Self::ScheduleShiftDays(_) => "schedule_shift_days",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedAdjustment {
    pub name: String,
    pub adjustment: Adjustment,
}

impl NamedAdjustment {
    pub fn new(name: impl Into<String>, adjustment: Adjustment) -> Self {
        Self {
            name: name.into(),
            adjustment,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScenarioError {
    UnknownEmployee { adjustment: String, id: EmployeeId },
    UnknownProject { adjustment: String, id: ProjectId },
    InvalidAdjustment { adjustment: String, message: String },
}

impl Display for ScenarioError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownEmployee { adjustment, id } => {
                write!(f, "adjustment `{adjustment}` references unknown employee {id}")
            }
            Self::UnknownProject { adjustment, id } => {
                write!(f, "adjustment `{adjustment}` references unknown project {id}")
            }
            Self::InvalidAdjustment {
                adjustment,
                message,
            } => write!(f, "invalid adjustment `{adjustment}`: {message}"),
        }
    }
}

impl Error for ScenarioError {}
