//! Append-only ledgers: logged hours and project expenses.

use crate::model::employee::EmployeeId;
use crate::model::project::ProjectId;
use crate::model::validation::{require_non_negative, require_text, ValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type TimeEntryId = Uuid;
pub type ExpenseId = Uuid;

/// Hours one employee logged (or plans to log) against one project on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeEntry {
    pub id: TimeEntryId,
    pub employee_id: EmployeeId,
    pub project_id: ProjectId,
    pub date: NaiveDate,
    pub hours: f64,
    pub description: String,
    pub billable: bool,
    /// Planned hours; excluded from actual cost and utilization.
    #[serde(default)]
    pub projected: bool,
}

impl TimeEntry {
    /// Creates an actual billable entry with a generated id.
    pub fn new(employee_id: EmployeeId, project_id: ProjectId, date: NaiveDate, hours: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            employee_id,
            project_id,
            date,
            hours,
            description: String::new(),
            billable: true,
            projected: false,
        }
    }

    /// Creates a planned entry with a generated id.
    pub fn projected(
        employee_id: EmployeeId,
        project_id: ProjectId,
        date: NaiveDate,
        hours: f64,
    ) -> Self {
        Self {
            projected: true,
            ..Self::new(employee_id, project_id, date, hours)
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_nil() || self.employee_id.is_nil() || self.project_id.is_nil() {
            return Err(ValidationError::NilId);
        }
        require_non_negative("hours", self.hours)?;
        if self.hours == 0.0 {
            return Err(ValidationError::NotPositive {
                field: "hours",
                value: self.hours,
            });
        }
        Ok(())
    }
}

/// Project-scoped expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub project_id: ProjectId,
    pub category: String,
    pub description: String,
    pub amount: f64,
    pub date: NaiveDate,
    pub approved: bool,
}

impl Expense {
    pub fn new(
        project_id: ProjectId,
        category: impl Into<String>,
        amount: f64,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            category: category.into(),
            description: String::new(),
            amount,
            date,
            approved: false,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_nil() || self.project_id.is_nil() {
            return Err(ValidationError::NilId);
        }
        require_text("category", &self.category)?;
        require_non_negative("amount", self.amount)
    }
}
