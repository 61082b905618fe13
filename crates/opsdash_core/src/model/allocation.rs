//! Project ↔ employee allocation record.
//!
//! # Invariants
//! - `allocation_percent` lies within `[0, 100]`.
//! - Combined allocation per employee above 100% is allowed in storage but is
//!   surfaced by utilization metrics as over-allocation.

use crate::model::employee::EmployeeId;
use crate::model::project::ProjectId;
use crate::model::validation::{
    require_date_window, require_non_negative, require_range, ValidationError,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type AllocationId = Uuid;

/// Links one employee to one project for a share of their schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub id: AllocationId,
    pub project_id: ProjectId,
    pub employee_id: EmployeeId,
    pub allocation_percent: f64,
    pub hours_projected: f64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Role on this project, when it differs from the employee's title.
    pub role: Option<String>,
    /// Project-specific hourly rate; overrides the employee rate when set.
    pub project_rate: Option<f64>,
}

impl Allocation {
    pub fn new(project_id: ProjectId, employee_id: EmployeeId, allocation_percent: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            employee_id,
            allocation_percent,
            hours_projected: 0.0,
            start_date: None,
            end_date: None,
            role: None,
            project_rate: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_nil() || self.project_id.is_nil() || self.employee_id.is_nil() {
            return Err(ValidationError::NilId);
        }
        require_range("allocation_percent", self.allocation_percent, 0.0, 100.0)?;
        require_non_negative("hours_projected", self.hours_projected)?;
        if let Some(rate) = self.project_rate {
            require_non_negative("project_rate", rate)?;
        }
        require_date_window(self.start_date, self.end_date)
    }

    /// Allocation expressed as FTE share (`percent / 100`).
    pub fn fte_share(&self) -> f64 {
        self.allocation_percent / 100.0
    }
}
