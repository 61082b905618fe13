//! Employee record.
//!
//! # Invariants
//! - `fte` lies within `[0, 1]`.
//! - `hourly_rate` and stored `utilization` are finite and non-negative.
//! - Skills are a set of trimmed, non-empty names without `,`.
//! - `EmployeeRole::Other` never holds a known role name or padded text.

use crate::model::validation::{
    require_non_negative, require_range, require_text, ValidationError,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Stable identifier for an employee.
pub type EmployeeId = Uuid;

/// Separator used when a skill set is flattened into one text cell.
pub const SKILL_SEPARATOR: char = ',';

/// Employee role.
///
/// Known roles get their own variant; anything else is kept verbatim in
/// `Other` so imported titles are never lost.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum EmployeeRole {
    ProjectManager,
    Developer,
    Designer,
    QaEngineer,
    DataAnalyst,
    DevOpsEngineer,
    Other(String),
}

impl EmployeeRole {
    pub fn as_str(&self) -> &str {
        match self {
            Self::ProjectManager => "Project Manager",
            Self::Developer => "Developer",
            Self::Designer => "Designer",
            Self::QaEngineer => "QA Engineer",
            Self::DataAnalyst => "Data Analyst",
            Self::DevOpsEngineer => "DevOps Engineer",
            Self::Other(value) => value.as_str(),
        }
    }
}

impl From<&str> for EmployeeRole {
    fn from(value: &str) -> Self {
        let trimmed = value.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "project manager" => Self::ProjectManager,
            "developer" => Self::Developer,
            "designer" => Self::Designer,
            "qa engineer" => Self::QaEngineer,
            "data analyst" => Self::DataAnalyst,
            "devops engineer" => Self::DevOpsEngineer,
            _ => Self::Other(trimmed.to_string()),
        }
    }
}

impl From<String> for EmployeeRole {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<EmployeeRole> for String {
    fn from(value: EmployeeRole) -> Self {
        value.as_str().to_string()
    }
}

impl FromStr for EmployeeRole {
    type Err = std::convert::Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(value))
    }
}

impl Display for EmployeeRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical employee record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    pub email: String,
    pub department: String,
    pub role: EmployeeRole,
    pub hourly_rate: f64,
    /// Fraction of a full-time schedule (1.0 = full-time).
    pub fte: f64,
    /// Last recorded utilization figure (0..1, may exceed 1 when over-allocated).
    pub utilization: f64,
    pub skills: BTreeSet<String>,
    pub hire_date: Option<NaiveDate>,
}

impl Employee {
    /// Creates a full-time employee with a generated id.
    pub fn new(name: impl Into<String>, role: EmployeeRole, hourly_rate: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: String::new(),
            department: String::new(),
            role,
            hourly_rate,
            fte: 1.0,
            utilization: 0.0,
            skills: BTreeSet::new(),
            hire_date: None,
        }
    }

    /// Validates record-level invariants.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_nil() {
            return Err(ValidationError::NilId);
        }
        require_text("name", &self.name)?;
        require_non_negative("hourly_rate", self.hourly_rate)?;
        require_range("fte", self.fte, 0.0, 1.0)?;
        require_non_negative("utilization", self.utilization)?;
        if let EmployeeRole::Other(text) = &self.role {
            if EmployeeRole::from(text.as_str()) != self.role {
                return Err(ValidationError::NonCanonicalRole(text.clone()));
            }
        }
        for skill in &self.skills {
            if skill.trim().is_empty()
                || skill.trim() != skill
                || skill.contains(SKILL_SEPARATOR)
            {
                return Err(ValidationError::InvalidSkill(skill.clone()));
            }
        }
        Ok(())
    }

    /// Flattens skills into one `a,b,c` cell (sorted).
    pub fn skills_cell(&self) -> String {
        self.skills
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(&SKILL_SEPARATOR.to_string())
    }
}

/// Splits a flattened skill cell into a normalized skill set.
pub fn parse_skills(cell: &str) -> BTreeSet<String> {
    cell.split(SKILL_SEPARATOR)
        .map(str::trim)
        .filter(|skill| !skill.is_empty())
        .map(str::to_string)
        .collect()
}
