//! Named configuration for metric formulas and the dashboard runtime.
//!
//! # Responsibility
//! - Hold every tunable constant the calculator uses (weights, standard
//!   hours, display cap, tolerance tiers) as explicit values.
//! - Load runtime settings from a JSON file with per-field defaults.
//!
//! # Invariants
//! - A config that passed `validate()` never makes a metric divide by a
//!   configured zero.

use crate::metrics::Granularity;
use crate::model::date::DateRange;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Relative weight of each health sub-score. Normalized by their sum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthWeights {
    pub budget: f64,
    pub schedule: f64,
    pub margin: f64,
}

impl Default for HealthWeights {
    fn default() -> Self {
        Self {
            budget: 0.3,
            schedule: 0.3,
            margin: 0.4,
        }
    }
}

impl HealthWeights {
    pub fn total(&self) -> f64 {
        self.budget + self.schedule + self.margin
    }
}

/// Budget-status tolerance applied to projects whose budget is at least
/// `min_budget`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToleranceTier {
    pub min_budget: f64,
    /// Percentage points.
    pub tolerance_percent: f64,
}

fn default_tolerance_tiers() -> Vec<ToleranceTier> {
    vec![
        ToleranceTier {
            min_budget: 1_000_000.0,
            tolerance_percent: 5.0,
        },
        ToleranceTier {
            min_budget: 500_000.0,
            tolerance_percent: 7.5,
        },
        ToleranceTier {
            min_budget: 0.0,
            tolerance_percent: 10.0,
        },
    ]
}

/// Working days of one calendar month, holidays already removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingMonth {
    pub year: i32,
    pub month: u32,
    pub working_days: u32,
    #[serde(default)]
    pub holidays: u32,
}

/// Constants consumed by the metric calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricConfig {
    pub health_weights: HealthWeights,
    pub hours_per_working_day: f64,
    /// Per-month overrides of the Monday-Friday working-day count.
    pub working_calendar: Vec<WorkingMonth>,
    /// Capacity of one full-time employee per month, used for monthly cost.
    pub monthly_standard_hours: f64,
    /// Upper bound for displayed utilization; raw values are never clamped.
    pub utilization_display_cap: f64,
    pub default_granularity: Granularity,
    pub budget_tolerance: Vec<ToleranceTier>,
}

impl Default for MetricConfig {
    fn default() -> Self {
        Self {
            health_weights: HealthWeights::default(),
            hours_per_working_day: 8.0,
            working_calendar: Vec::new(),
            monthly_standard_hours: 160.0,
            utilization_display_cap: 1.0,
            default_granularity: Granularity::Monthly,
            budget_tolerance: default_tolerance_tiers(),
        }
    }
}

impl MetricConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let weights = self.health_weights;
        for (name, value) in [
            ("health_weights.budget", weights.budget),
            ("health_weights.schedule", weights.schedule),
            ("health_weights.margin", weights.margin),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        if weights.total() <= 0.0 {
            return Err(ConfigError::Invalid(
                "health weights must not all be zero".to_string(),
            ));
        }

        for (name, value) in [
            ("hours_per_working_day", self.hours_per_working_day),
            ("monthly_standard_hours", self.monthly_standard_hours),
            ("utilization_display_cap", self.utilization_display_cap),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be finite and positive, got {value}"
                )));
            }
        }

        let mut seen = HashSet::new();
        for entry in &self.working_calendar {
            let Some(month) = DateRange::month(entry.year, entry.month) else {
                return Err(ConfigError::Invalid(format!(
                    "working_calendar has invalid month {}-{}",
                    entry.year, entry.month
                )));
            };
            if i64::from(entry.working_days) + i64::from(entry.holidays) > month.days() {
                return Err(ConfigError::Invalid(format!(
                    "working_calendar {}-{:02}: {} working days and {} holidays exceed {} days",
                    entry.year,
                    entry.month,
                    entry.working_days,
                    entry.holidays,
                    month.days()
                )));
            }
            if !seen.insert((entry.year, entry.month)) {
                return Err(ConfigError::Invalid(format!(
                    "working_calendar lists {}-{:02} twice",
                    entry.year, entry.month
                )));
            }
        }

        if self.budget_tolerance.is_empty() {
            return Err(ConfigError::Invalid(
                "budget_tolerance needs at least one tier".to_string(),
            ));
        }
        for tier in &self.budget_tolerance {
            if !tier.min_budget.is_finite()
                || tier.min_budget < 0.0
                || !tier.tolerance_percent.is_finite()
                || tier.tolerance_percent < 0.0
            {
                return Err(ConfigError::Invalid(format!(
                    "invalid tolerance tier {tier:?}"
                )));
            }
        }
        Ok(())
    }

    pub fn working_month(&self, year: i32, month: u32) -> Option<&WorkingMonth> {
        self.working_calendar
            .iter()
            .find(|entry| entry.year == year && entry.month == month)
    }

    /// Tolerance (percentage points) of the highest tier `budget` reaches.
    ///
    /// Falls back to the lowest tier when no tier threshold is reached.
    pub fn tolerance_for(&self, budget: f64) -> f64 {
        let mut tiers = self.budget_tolerance.clone();
        tiers.sort_by(|a, b| b.min_budget.total_cmp(&a.min_budget));
        tiers
            .iter()
            .find(|tier| budget >= tier.min_budget)
            .or_else(|| tiers.last())
            .map_or(0.0, |tier| tier.tolerance_percent)
    }
}

/// Runtime settings for the CLI and services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub db_path: PathBuf,
    /// Absolute log directory; logging stays off when unset.
    pub log_dir: Option<PathBuf>,
    pub log_level: String,
    pub metrics: MetricConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("opsdash.db"),
            log_dir: None,
            log_level: crate::logging::default_log_level().to_string(),
            metrics: MetricConfig::default(),
        }
    }
}

impl DashboardConfig {
    /// Reads and validates a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("db_path cannot be empty".to_string()));
        }
        if let Some(dir) = &self.log_dir {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid(format!(
                    "log_dir must be absolute, got `{}`",
                    dir.display()
                )));
            }
        }
        self.metrics.validate()
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "malformed config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}
