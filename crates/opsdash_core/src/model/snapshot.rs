//! In-memory record snapshots and the shared record filter.
//!
//! # Responsibility
//! - Define the `RecordFilter` read contract used by storage and reports.
//! - Hold one materialized, referentially closed set of records.
//!
//! # Invariants
//! - After `restrict`, every allocation/time entry/expense references a
//!   project (and employee, where applicable) present in the snapshot.
//! - Soft-deleted projects never appear in a restricted snapshot.
//! - `restrict_with_history` differs from `restrict` only in ledger rows
//!   dated outside `filter.date_range`.

use crate::model::allocation::Allocation;
use crate::model::date::DateRange;
use crate::model::employee::{Employee, EmployeeId};
use crate::model::ledger::{Expense, TimeEntry};
use crate::model::project::{Project, ProjectId, ProjectStatus};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Caller-supplied selection criteria.
///
/// Empty id/status lists mean "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordFilter {
    pub date_range: Option<DateRange>,
    pub project_ids: Vec<ProjectId>,
    pub employee_ids: Vec<EmployeeId>,
    /// Case-insensitive department match.
    pub department: Option<String>,
    pub statuses: Vec<ProjectStatus>,
}

impl RecordFilter {
    /// Filter that keeps everything visible.
    pub fn all() -> Self {
        Self::default()
    }

    /// Projects whose window overlaps the range; undated projects always match.
    pub fn matches_project(&self, project: &Project) -> bool {
        if !project.is_visible() {
            return false;
        }
        if !self.project_ids.is_empty() && !self.project_ids.contains(&project.id) {
            return false;
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&project.status) {
            return false;
        }
        self.date_range
            .map_or(true, |range| range.overlaps(project.start_date, project.end_date))
    }

    pub fn matches_employee(&self, employee: &Employee) -> bool {
        if !self.employee_ids.is_empty() && !self.employee_ids.contains(&employee.id) {
            return false;
        }
        match self.department.as_deref().map(str::trim) {
            Some(department) if !department.is_empty() => {
                employee.department.trim().eq_ignore_ascii_case(department)
            }
            _ => true,
        }
    }

    pub fn matches_date(&self, date: chrono::NaiveDate) -> bool {
        self.date_range.map_or(true, |range| range.contains(date))
    }

    /// Same selection with the date constraint removed.
    pub fn without_date_range(&self) -> Self {
        Self {
            date_range: None,
            ..self.clone()
        }
    }
}

/// Materialized record set handed to metric, report and scenario code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub projects: Vec<Project>,
    pub employees: Vec<Employee>,
    pub allocations: Vec<Allocation>,
    pub time_entries: Vec<TimeEntry>,
    pub expenses: Vec<Expense>,
}

impl Snapshot {
    /// Applies `filter` and drops any ledger/allocation row whose owner was
    /// filtered out.
    pub fn restrict(&self, filter: &RecordFilter) -> Snapshot {
        self.restrict_ledger(filter, true)
    }

    /// Like `restrict`, but keeps every ledger row of the selected projects
    /// and employees whatever `filter.date_range` says.
    ///
    /// Cost to date and average burn need spend from before the reporting
    /// window; period figures window the ledger themselves.
    pub fn restrict_with_history(&self, filter: &RecordFilter) -> Snapshot {
        self.restrict_ledger(filter, false)
    }

    fn restrict_ledger(&self, filter: &RecordFilter, window_ledger: bool) -> Snapshot {
        let in_window =
            |date: chrono::NaiveDate| !window_ledger || filter.matches_date(date);
        let projects: Vec<Project> = self
            .projects
            .iter()
            .filter(|project| filter.matches_project(project))
            .cloned()
            .collect();
        let employees: Vec<Employee> = self
            .employees
            .iter()
            .filter(|employee| filter.matches_employee(employee))
            .cloned()
            .collect();

        let project_ids: HashSet<ProjectId> = projects.iter().map(|p| p.id).collect();
        let employee_ids: HashSet<EmployeeId> = employees.iter().map(|e| e.id).collect();

        let allocations = self
            .allocations
            .iter()
            .filter(|allocation| {
                project_ids.contains(&allocation.project_id)
                    && employee_ids.contains(&allocation.employee_id)
                    && filter.date_range.map_or(true, |range| {
                        range.overlaps(allocation.start_date, allocation.end_date)
                    })
            })
            .cloned()
            .collect();
        let time_entries = self
            .time_entries
            .iter()
            .filter(|entry| {
                project_ids.contains(&entry.project_id)
                    && employee_ids.contains(&entry.employee_id)
                    && in_window(entry.date)
            })
            .cloned()
            .collect();
        let expenses = self
            .expenses
            .iter()
            .filter(|expense| {
                project_ids.contains(&expense.project_id) && in_window(expense.date)
            })
            .cloned()
            .collect();

        Snapshot {
            projects,
            employees,
            allocations,
            time_entries,
            expenses,
        }
    }

    pub fn project(&self, id: ProjectId) -> Option<&Project> {
        self.projects.iter().find(|project| project.id == id)
    }

    pub fn employee(&self, id: EmployeeId) -> Option<&Employee> {
        self.employees.iter().find(|employee| employee.id == id)
    }

    pub fn employee_index(&self) -> HashMap<EmployeeId, &Employee> {
        self.employees
            .iter()
            .map(|employee| (employee.id, employee))
            .collect()
    }

    /// Hourly rate charged for `employee_id` on `project_id`.
    ///
    /// An allocation `project_rate` wins over the employee's own rate.
    pub fn effective_rate(&self, project_id: ProjectId, employee_id: EmployeeId) -> Option<f64> {
        self.allocations
            .iter()
            .find(|allocation| {
                allocation.project_id == project_id
                    && allocation.employee_id == employee_id
                    && allocation.project_rate.is_some()
            })
            .and_then(|allocation| allocation.project_rate)
            .or_else(|| self.employee(employee_id).map(|employee| employee.hourly_rate))
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty() && self.employees.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{RecordFilter, Snapshot};
    use crate::model::allocation::Allocation;
    use crate::model::date::DateRange;
    use crate::model::employee::{Employee, EmployeeRole};
    use crate::model::ledger::{Expense, TimeEntry};
    use crate::model::project::{Project, ProjectStatus};
    use chrono::NaiveDate;

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn sample() -> Snapshot {
        let active = Project::new("Active", ProjectStatus::Active);
        let done = Project::new("Done", ProjectStatus::Completed);
        let mut eng = Employee::new("Eng", EmployeeRole::Developer, 100.0);
        eng.department = "Engineering".to_string();
        let mut design = Employee::new("Des", EmployeeRole::Designer, 90.0);
        design.department = "Design".to_string();

        let mut rated = Allocation::new(active.id, eng.id, 50.0);
        rated.project_rate = Some(150.0);

        Snapshot {
            time_entries: vec![
                TimeEntry::new(eng.id, active.id, day(3, 4), 6.0),
                TimeEntry::new(design.id, active.id, day(3, 5), 4.0),
                TimeEntry::new(eng.id, done.id, day(5, 1), 2.0),
            ],
            expenses: vec![
                Expense::new(active.id, "travel", 300.0, day(3, 10)),
                Expense::new(done.id, "software", 50.0, day(3, 11)),
            ],
            allocations: vec![rated, Allocation::new(done.id, design.id, 20.0)],
            projects: vec![active, done],
            employees: vec![eng, design],
        }
    }

    #[test]
    fn status_filter_drops_dependent_rows() {
        let snapshot = sample();
        let filter = RecordFilter {
            statuses: vec![ProjectStatus::Active],
            ..RecordFilter::default()
        };
        let restricted = snapshot.restrict(&filter);

        assert_eq!(restricted.projects.len(), 1);
        assert_eq!(restricted.expenses.len(), 1);
        assert_eq!(restricted.time_entries.len(), 2);
        assert_eq!(restricted.allocations.len(), 1);
    }

    #[test]
    fn department_and_date_filters_compose() {
        let snapshot = sample();
        let filter = RecordFilter {
            department: Some("engineering".to_string()),
            date_range: DateRange::new(day(3, 1), day(3, 31)),
            ..RecordFilter::default()
        };
        let restricted = snapshot.restrict(&filter);

        assert_eq!(restricted.employees.len(), 1);
        assert_eq!(restricted.time_entries.len(), 1);
        assert_eq!(restricted.time_entries[0].hours, 6.0);
    }

    #[test]
    fn history_restriction_keeps_out_of_window_ledger_rows() {
        let snapshot = sample();
        let filter = RecordFilter {
            statuses: vec![ProjectStatus::Active],
            date_range: DateRange::new(day(4, 1), day(4, 30)),
            ..RecordFilter::default()
        };

        let windowed = snapshot.restrict(&filter);
        assert!(windowed.time_entries.is_empty());
        assert!(windowed.expenses.is_empty());

        let history = snapshot.restrict_with_history(&filter);
        assert_eq!(history.projects, windowed.projects);
        assert_eq!(history.employees, windowed.employees);
        assert_eq!(history.allocations, windowed.allocations);
        assert_eq!(history.time_entries.len(), 2);
        assert_eq!(history.expenses.len(), 1);
    }

    #[test]
    fn effective_rate_prefers_allocation_override() {
        let snapshot = sample();
        let active = snapshot.projects[0].id;
        let eng = snapshot.employees[0].id;
        let design = snapshot.employees[1].id;

        assert_eq!(snapshot.effective_rate(active, eng), Some(150.0));
        assert_eq!(snapshot.effective_rate(active, design), Some(90.0));
    }
}
