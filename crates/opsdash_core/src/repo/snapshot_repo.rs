//! Filtered snapshot loading across all record kinds.
//!
//! SQL narrows each table coarsely; `Snapshot::restrict` then applies the
//! exact filter and drops rows whose owner was filtered out.

use crate::model::snapshot::{RecordFilter, Snapshot};
use crate::repo::allocation_repo::{
    AllocationListQuery, AllocationRepository, SqliteAllocationRepository,
};
use crate::repo::employee_repo::{EmployeeListQuery, EmployeeRepository, SqliteEmployeeRepository};
use crate::repo::ledger_repo::{LedgerQuery, LedgerRepository, SqliteLedgerRepository};
use crate::repo::project_repo::{ProjectListQuery, ProjectRepository, SqliteProjectRepository};
use crate::repo::RepoResult;
use rusqlite::Connection;

/// Loads the records selected by `filter` as one consistent snapshot.
pub fn load_snapshot(conn: &Connection, filter: &RecordFilter) -> RepoResult<Snapshot> {
    let projects = SqliteProjectRepository::try_new(conn)?.list_projects(&ProjectListQuery {
        ids: filter.project_ids.clone(),
        statuses: filter.statuses.clone(),
        date_range: filter.date_range,
        ..ProjectListQuery::default()
    })?;

    let employees = SqliteEmployeeRepository::try_new(conn)?.list_employees(&EmployeeListQuery {
        ids: filter.employee_ids.clone(),
        department: filter.department.clone(),
    })?;

    let allocations =
        SqliteAllocationRepository::try_new(conn)?.list_allocations(&AllocationListQuery {
            project_ids: filter.project_ids.clone(),
            employee_ids: filter.employee_ids.clone(),
        })?;

    let ledger = SqliteLedgerRepository::try_new(conn)?;
    let ledger_query = LedgerQuery {
        date_range: filter.date_range,
        project_ids: filter.project_ids.clone(),
        employee_ids: filter.employee_ids.clone(),
    };
    let time_entries = ledger.list_time_entries(&ledger_query)?;
    let expenses = ledger.list_expenses(&ledger_query)?;

    let snapshot = Snapshot {
        projects,
        employees,
        allocations,
        time_entries,
        expenses,
    };
    Ok(snapshot.restrict(filter))
}
