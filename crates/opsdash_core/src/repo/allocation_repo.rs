//! Allocation repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Writes reject allocations whose project or employee is not stored.
//! - Allocations are removed together with their owning project/employee.

use crate::model::allocation::{Allocation, AllocationId};
use crate::model::date::format_iso_date;
use crate::model::employee::EmployeeId;
use crate::model::project::ProjectId;
use crate::repo::{
    ensure_connection_ready, parse_optional_date_column, parse_uuid_column, placeholders,
    row_exists, RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const ALLOCATION_SELECT_SQL: &str = "SELECT
    uuid,
    project_uuid,
    employee_uuid,
    allocation_percent,
    hours_projected,
    start_date,
    end_date,
    role,
    project_rate
FROM allocations";

/// Query options for listing allocations.
#[derive(Debug, Clone, Default)]
pub struct AllocationListQuery {
    pub project_ids: Vec<ProjectId>,
    pub employee_ids: Vec<EmployeeId>,
}

pub trait AllocationRepository {
    fn create_allocation(&self, allocation: &Allocation) -> RepoResult<AllocationId>;
    fn update_allocation(&self, allocation: &Allocation) -> RepoResult<()>;
    fn get_allocation(&self, id: AllocationId) -> RepoResult<Option<Allocation>>;
    fn list_allocations(&self, query: &AllocationListQuery) -> RepoResult<Vec<Allocation>>;
    fn delete_allocation(&self, id: AllocationId) -> RepoResult<()>;
}

/// SQLite-backed allocation repository.
pub struct SqliteAllocationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAllocationRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "allocations")?;
        Ok(Self { conn })
    }

    fn ensure_references(&self, allocation: &Allocation) -> RepoResult<()> {
        if !row_exists(self.conn, "projects", allocation.project_id)? {
            return Err(RepoError::MissingReference {
                kind: "project",
                id: allocation.project_id,
            });
        }
        if !row_exists(self.conn, "employees", allocation.employee_id)? {
            return Err(RepoError::MissingReference {
                kind: "employee",
                id: allocation.employee_id,
            });
        }
        Ok(())
    }
}

impl AllocationRepository for SqliteAllocationRepository<'_> {
    fn create_allocation(&self, allocation: &Allocation) -> RepoResult<AllocationId> {
        allocation.validate()?;
        self.ensure_references(allocation)?;

        self.conn.execute(
            "INSERT INTO allocations (
                uuid,
                project_uuid,
                employee_uuid,
                allocation_percent,
                hours_projected,
                start_date,
                end_date,
                role,
                project_rate
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                allocation.id.to_string(),
                allocation.project_id.to_string(),
                allocation.employee_id.to_string(),
                allocation.allocation_percent,
                allocation.hours_projected,
                allocation.start_date.map(format_iso_date),
                allocation.end_date.map(format_iso_date),
                allocation.role.as_deref(),
                allocation.project_rate,
            ],
        )?;

        Ok(allocation.id)
    }

    fn update_allocation(&self, allocation: &Allocation) -> RepoResult<()> {
        allocation.validate()?;
        self.ensure_references(allocation)?;

        let changed = self.conn.execute(
            "UPDATE allocations
             SET
                project_uuid = ?1,
                employee_uuid = ?2,
                allocation_percent = ?3,
                hours_projected = ?4,
                start_date = ?5,
                end_date = ?6,
                role = ?7,
                project_rate = ?8,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?9;",
            params![
                allocation.project_id.to_string(),
                allocation.employee_id.to_string(),
                allocation.allocation_percent,
                allocation.hours_projected,
                allocation.start_date.map(format_iso_date),
                allocation.end_date.map(format_iso_date),
                allocation.role.as_deref(),
                allocation.project_rate,
                allocation.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                kind: "allocation",
                id: allocation.id,
            });
        }

        Ok(())
    }

    fn get_allocation(&self, id: AllocationId) -> RepoResult<Option<Allocation>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ALLOCATION_SELECT_SQL} WHERE uuid = ?1;"))?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_allocation_row(row)?));
        }

        Ok(None)
    }

    fn list_allocations(&self, query: &AllocationListQuery) -> RepoResult<Vec<Allocation>> {
        let mut sql = format!("{ALLOCATION_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if !query.project_ids.is_empty() {
            sql.push_str(&format!(
                " AND project_uuid IN ({})",
                placeholders(query.project_ids.len())
            ));
            bind_values.extend(
                query
                    .project_ids
                    .iter()
                    .map(|id| Value::Text(id.to_string())),
            );
        }

        if !query.employee_ids.is_empty() {
            sql.push_str(&format!(
                " AND employee_uuid IN ({})",
                placeholders(query.employee_ids.len())
            ));
            bind_values.extend(
                query
                    .employee_ids
                    .iter()
                    .map(|id| Value::Text(id.to_string())),
            );
        }

        sql.push_str(" ORDER BY project_uuid ASC, employee_uuid ASC, uuid ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut allocations = Vec::new();

        while let Some(row) = rows.next()? {
            allocations.push(parse_allocation_row(row)?);
        }

        Ok(allocations)
    }

    fn delete_allocation(&self, id: AllocationId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM allocations WHERE uuid = ?1;", [id.to_string()])?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                kind: "allocation",
                id,
            });
        }

        Ok(())
    }
}

fn parse_allocation_row(row: &Row<'_>) -> RepoResult<Allocation> {
    let uuid_text: String = row.get("uuid")?;
    let project_text: String = row.get("project_uuid")?;
    let employee_text: String = row.get("employee_uuid")?;

    let allocation = Allocation {
        id: parse_uuid_column(&uuid_text, "allocations.uuid")?,
        project_id: parse_uuid_column(&project_text, "allocations.project_uuid")?,
        employee_id: parse_uuid_column(&employee_text, "allocations.employee_uuid")?,
        allocation_percent: row.get("allocation_percent")?,
        hours_projected: row.get("hours_projected")?,
        start_date: parse_optional_date_column(row.get("start_date")?, "allocations.start_date")?,
        end_date: parse_optional_date_column(row.get("end_date")?, "allocations.end_date")?,
        role: row.get("role")?,
        project_rate: row.get("project_rate")?,
    };
    allocation.validate()?;
    Ok(allocation)
}
