//! CSV import use cases.
//!
//! # Responsibility
//! - Parse an import file and persist the accepted rows.
//!
//! # Invariants
//! - Each file is persisted in one transaction: a storage failure leaves
//!   the record store untouched.
//! - Row-level rejections never abort the import; they are returned.

use crate::io::{read_employees, read_projects, read_timesheet, RowError, TimesheetSummary};
use crate::logging::timed;
use crate::model::employee::EmployeeId;
use crate::model::project::ProjectId;
use crate::repo::employee_repo::{EmployeeListQuery, EmployeeRepository, SqliteEmployeeRepository};
use crate::repo::ledger_repo::{LedgerRepository, SqliteLedgerRepository};
use crate::repo::project_repo::{ProjectListQuery, ProjectRepository, SqliteProjectRepository};
use crate::service::{ServiceError, ServiceResult};
use rusqlite::Connection;
use std::collections::HashMap;
use std::io::Read;

/// Result of a record import.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportOutcome {
    pub inserted: usize,
    pub rejected: Vec<RowError>,
}

/// Result of a timesheet import.
#[derive(Debug, Clone, PartialEq)]
pub struct TimesheetOutcome {
    pub summary: TimesheetSummary,
    pub projects_created: usize,
    pub employees_created: usize,
    pub time_entries_inserted: usize,
    pub rejected: Vec<RowError>,
}

/// Imports a project CSV.
pub fn import_projects<R: Read>(conn: &mut Connection, reader: R) -> ServiceResult<ImportOutcome> {
    timed("csv_import", "import", "kind=projects", || {
        let report = read_projects(reader)?;
        let tx = conn.transaction()?;
        {
            let repo = SqliteProjectRepository::try_new(&tx)?;
            for project in &report.accepted {
                repo.create_project(project)?;
            }
        }
        tx.commit()?;
        Ok::<_, ServiceError>(ImportOutcome {
            inserted: report.accepted.len(),
            rejected: report.rejected,
        })
    })
}

/// Imports an employee CSV.
pub fn import_employees<R: Read>(
    conn: &mut Connection,
    reader: R,
) -> ServiceResult<ImportOutcome> {
    timed("csv_import", "import", "kind=employees", || {
        let report = read_employees(reader)?;
        let tx = conn.transaction()?;
        {
            let repo = SqliteEmployeeRepository::try_new(&tx)?;
            for employee in &report.accepted {
                repo.create_employee(employee)?;
            }
        }
        tx.commit()?;
        Ok::<_, ServiceError>(ImportOutcome {
            inserted: report.accepted.len(),
            rejected: report.rejected,
        })
    })
}

/// Imports a timesheet export.
///
/// Projects are matched to stored projects by name and employees by name;
/// only unmatched ones are created. Time entries are always appended.
pub fn import_timesheet<R: Read>(
    conn: &mut Connection,
    reader: R,
) -> ServiceResult<TimesheetOutcome> {
    timed("csv_import", "import", "kind=timesheet", || {
        let import = read_timesheet(reader)?;
        let tx = conn.transaction()?;
        let (projects_created, employees_created) = {
            let projects = SqliteProjectRepository::try_new(&tx)?;
            let employees = SqliteEmployeeRepository::try_new(&tx)?;
            let ledger = SqliteLedgerRepository::try_new(&tx)?;

            let stored_projects: HashMap<String, ProjectId> = projects
                .list_projects(&ProjectListQuery::default())?
                .into_iter()
                .map(|project| (project.name, project.id))
                .collect();
            let stored_employees: HashMap<String, EmployeeId> = employees
                .list_employees(&EmployeeListQuery::default())?
                .into_iter()
                .map(|employee| (employee.name, employee.id))
                .collect();

            let mut project_ids: HashMap<ProjectId, ProjectId> = HashMap::new();
            let mut projects_created = 0;
            for project in &import.projects {
                let stored_id = match stored_projects.get(&project.name) {
                    Some(id) => *id,
                    None => {
                        projects_created += 1;
                        projects.create_project(project)?
                    }
                };
                project_ids.insert(project.id, stored_id);
            }

            let mut employee_ids: HashMap<EmployeeId, EmployeeId> = HashMap::new();
            let mut employees_created = 0;
            for employee in &import.employees {
                let stored_id = match stored_employees.get(&employee.name) {
                    Some(id) => *id,
                    None => {
                        employees_created += 1;
                        employees.create_employee(employee)?
                    }
                };
                employee_ids.insert(employee.id, stored_id);
            }

            for entry in &import.time_entries {
                let mut entry = entry.clone();
                if let Some(id) = project_ids.get(&entry.project_id) {
                    entry.project_id = *id;
                }
                if let Some(id) = employee_ids.get(&entry.employee_id) {
                    entry.employee_id = *id;
                }
                ledger.append_time_entry(&entry)?;
            }
            (projects_created, employees_created)
        };
        tx.commit()?;

        Ok::<_, ServiceError>(TimesheetOutcome {
            time_entries_inserted: import.time_entries.len(),
            summary: import.summary,
            projects_created,
            employees_created,
            rejected: import.rejected,
        })
    })
}
