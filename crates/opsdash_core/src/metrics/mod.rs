//! Metric calculator: pure KPI functions over a record snapshot.
//!
//! # Responsibility
//! - Derive utilization, burn rate, health, margin, forecast and portfolio
//!   figures from explicit inputs only.
//!
//! # Invariants
//! - No function reads the clock, the database or any global state; `as_of`
//!   and the reporting period always arrive through `MetricContext`.
//! - Undefined results are `MetricValue::NotApplicable`, never a silent zero
//!   and never a panic.

use crate::config::MetricConfig;
use crate::model::date::DateRange;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub mod capacity;
pub mod financial;
pub mod forecast;
pub mod health;
pub mod period;
pub mod portfolio;
pub mod utilization;

pub use capacity::{fte_requirements, FteRequirement};
pub use financial::{
    average_burn_rate, budget_analysis, burn_rate_series, elapsed_periods, ledger_cost,
    profit_margin, project_costs, BudgetAnalysis, BudgetHealth, BurnPoint, CategoryCost,
    EmployeeCost, ProjectCosts,
};
pub use forecast::{completion_forecast, CompletionForecast};
pub use health::{health_score, project_margin, HealthScore};
pub use period::{Granularity, Period};
pub use portfolio::{portfolio_metrics, PortfolioMetrics};
pub use utilization::{
    average_utilization, display_utilization, employee_utilization, standard_hours,
    utilization_rate, EmployeeUtilization,
};

/// Result of a metric that may be undefined for its inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Value(f64),
    NotApplicable { reason: String },
}

impl MetricValue {
    pub fn not_applicable(reason: impl Into<String>) -> Self {
        Self::NotApplicable {
            reason: reason.into(),
        }
    }

    /// `numerator / denominator`, or `NotApplicable(reason)` when the
    /// denominator is zero or either side is non-finite.
    pub fn ratio(numerator: f64, denominator: f64, reason: &str) -> Self {
        if !numerator.is_finite() || !denominator.is_finite() || denominator == 0.0 {
            return Self::not_applicable(reason);
        }
        Self::Value(numerator / denominator)
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Value(value) => Some(*value),
            Self::NotApplicable { .. } => None,
        }
    }

    pub fn is_applicable(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    pub fn map(self, f: impl FnOnce(f64) -> f64) -> Self {
        match self {
            Self::Value(value) => Self::Value(f(value)),
            other => other,
        }
    }

    /// Numeric value, or `fallback` for undefined metrics.
    pub fn value_or(&self, fallback: f64) -> f64 {
        self.value().unwrap_or(fallback)
    }
}

impl Display for MetricValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(value) => write!(f, "{value}"),
            Self::NotApplicable { .. } => write!(f, "N/A"),
        }
    }
}

/// Mean of the applicable values; `NotApplicable` when there are none.
pub fn mean_of<'a>(values: impl IntoIterator<Item = &'a MetricValue>, reason: &str) -> MetricValue {
    let (sum, count) = values
        .into_iter()
        .filter_map(MetricValue::value)
        .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    MetricValue::ratio(sum, count as f64, reason)
}

/// Explicit inputs shared by every metric call.
#[derive(Debug, Clone, Copy)]
pub struct MetricContext<'a> {
    /// "Today" for schedule and forecast math.
    pub as_of: NaiveDate,
    /// Reporting window for period-scoped aggregates.
    pub period: DateRange,
    pub granularity: Granularity,
    pub config: &'a MetricConfig,
}

impl<'a> MetricContext<'a> {
    /// Context using the configured default granularity.
    pub fn new(as_of: NaiveDate, period: DateRange, config: &'a MetricConfig) -> Self {
        Self {
            as_of,
            period,
            granularity: config.default_granularity,
            config,
        }
    }

    pub fn with_granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = granularity;
        self
    }
}
