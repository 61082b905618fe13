//! Project record.
//!
//! # Responsibility
//! - Define the canonical project shape with budget and revenue figures.
//! - Provide lifecycle helpers for soft-delete semantics.
//!
//! # Invariants
//! - `id` is stable and never reused for another project.
//! - `end_date` is never earlier than `start_date` when both are set.
//! - Money fields are finite and non-negative.
//! - `budget_used`/`revenue_actual` are expected to grow monotonically over
//!   the project life; this is not enforced.

use crate::model::validation::{
    require_date_window, require_non_negative, require_text, ValidationError,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Stable identifier for a project.
pub type ProjectId = Uuid;

/// Project lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Planned,
    Active,
    OnHold,
    Completed,
    Cancelled,
}

impl ProjectStatus {
    pub const ALL: [ProjectStatus; 5] = [
        ProjectStatus::Planned,
        ProjectStatus::Active,
        ProjectStatus::OnHold,
        ProjectStatus::Completed,
        ProjectStatus::Cancelled,
    ];

    /// Storage/CSV spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::Active => "active",
            Self::OnHold => "on_hold",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl Display for ProjectStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = String;

    /// Accepts canonical values plus common spellings (`On Hold`, `on-hold`).
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "planned" | "planning" => Ok(Self::Planned),
            "active" => Ok(Self::Active),
            "on_hold" | "onhold" => Ok(Self::OnHold),
            "completed" | "complete" => Ok(Self::Completed),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(format!(
                "unknown project status `{}`; expected planned|active|on_hold|completed|cancelled",
                value.trim()
            )),
        }
    }
}

/// Canonical project record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub description: String,
    pub status: ProjectStatus,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub budget_allocated: f64,
    pub budget_used: f64,
    pub revenue_projected: f64,
    pub revenue_actual: f64,
    pub client: String,
    pub project_manager: String,
    /// Soft delete tombstone.
    pub is_deleted: bool,
}

impl Project {
    /// Creates a new project with a generated id and zeroed financials.
    pub fn new(name: impl Into<String>, status: ProjectStatus) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            status,
            start_date: None,
            end_date: None,
            budget_allocated: 0.0,
            budget_used: 0.0,
            revenue_projected: 0.0,
            revenue_actual: 0.0,
            client: String::new(),
            project_manager: String::new(),
            is_deleted: false,
        }
    }

    /// Creates a project with a caller-provided id.
    ///
    /// # Errors
    /// - Returns `ValidationError::NilId` for the nil UUID.
    pub fn with_id(
        id: ProjectId,
        name: impl Into<String>,
        status: ProjectStatus,
    ) -> Result<Self, ValidationError> {
        if id.is_nil() {
            return Err(ValidationError::NilId);
        }
        let mut project = Self::new(name, status);
        project.id = id;
        Ok(project)
    }

    /// Validates record-level invariants.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_nil() {
            return Err(ValidationError::NilId);
        }
        require_text("name", &self.name)?;
        require_non_negative("budget_allocated", self.budget_allocated)?;
        require_non_negative("budget_used", self.budget_used)?;
        require_non_negative("revenue_projected", self.revenue_projected)?;
        require_non_negative("revenue_actual", self.revenue_actual)?;
        require_date_window(self.start_date, self.end_date)
    }

    /// Marks this project as softly deleted.
    pub fn soft_delete(&mut self) {
        self.is_deleted = true;
    }

    /// Returns whether this project should be considered visible.
    pub fn is_visible(&self) -> bool {
        !self.is_deleted
    }

    /// Remaining budget against recorded spend; negative when over budget.
    pub fn budget_variance(&self) -> f64 {
        self.budget_allocated - self.budget_used
    }
}

#[cfg(test)]
mod tests {
    use super::{Project, ProjectStatus};
    use crate::model::validation::ValidationError;
    use chrono::NaiveDate;

    #[test]
    fn status_parses_legacy_spellings() {
        assert_eq!("On Hold".parse::<ProjectStatus>(), Ok(ProjectStatus::OnHold));
        assert_eq!("on-hold".parse::<ProjectStatus>(), Ok(ProjectStatus::OnHold));
        assert_eq!("Active".parse::<ProjectStatus>(), Ok(ProjectStatus::Active));
        assert!("paused".parse::<ProjectStatus>().is_err());
    }

    #[test]
    fn status_display_round_trips() {
        for status in ProjectStatus::ALL {
            assert_eq!(status.to_string().parse::<ProjectStatus>(), Ok(status));
        }
    }

    #[test]
    fn validate_rejects_reversed_window_and_negative_budget() {
        let mut project = Project::new("Apollo", ProjectStatus::Active);
        project.start_date = NaiveDate::from_ymd_opt(2024, 6, 1);
        project.end_date = NaiveDate::from_ymd_opt(2024, 1, 1);
        assert!(matches!(
            project.validate(),
            Err(ValidationError::InvalidDateWindow { .. })
        ));

        project.end_date = None;
        project.budget_used = -5.0;
        assert!(matches!(
            project.validate(),
            Err(ValidationError::Negative {
                field: "budget_used",
                ..
            })
        ));
    }
}
