//! Time-entry and expense ledgers.
//!
//! # Responsibility
//! - Append validated ledger rows and query them by date window and owner.
//!
//! # Invariants
//! - Appends reject rows whose project (and employee, for time entries) is
//!   not stored.
//! - Ledger rows are never edited in place; corrections are new rows or a
//!   delete followed by an append.

use crate::model::date::{format_iso_date, DateRange};
use crate::model::employee::EmployeeId;
use crate::model::ledger::{Expense, ExpenseId, TimeEntry, TimeEntryId};
use crate::model::project::ProjectId;
use crate::repo::{
    bool_to_int, ensure_connection_ready, parse_bool_column, parse_date_column,
    parse_uuid_column, placeholders, row_exists, RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

/// Query options shared by both ledgers.
///
/// `employee_ids` is ignored for expenses.
#[derive(Debug, Clone, Default)]
pub struct LedgerQuery {
    pub date_range: Option<DateRange>,
    pub project_ids: Vec<ProjectId>,
    pub employee_ids: Vec<EmployeeId>,
}

pub trait LedgerRepository {
    fn append_time_entry(&self, entry: &TimeEntry) -> RepoResult<TimeEntryId>;
    fn append_expense(&self, expense: &Expense) -> RepoResult<ExpenseId>;
    fn list_time_entries(&self, query: &LedgerQuery) -> RepoResult<Vec<TimeEntry>>;
    fn list_expenses(&self, query: &LedgerQuery) -> RepoResult<Vec<Expense>>;
    fn delete_time_entry(&self, id: TimeEntryId) -> RepoResult<()>;
    fn delete_expense(&self, id: ExpenseId) -> RepoResult<()>;
}

/// SQLite-backed ledger repository.
pub struct SqliteLedgerRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteLedgerRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "time_entries")?;
        ensure_connection_ready(conn, "expenses")?;
        Ok(Self { conn })
    }

    fn ensure_project(&self, id: ProjectId) -> RepoResult<()> {
        if !row_exists(self.conn, "projects", id)? {
            return Err(RepoError::MissingReference { kind: "project", id });
        }
        Ok(())
    }
}

impl LedgerRepository for SqliteLedgerRepository<'_> {
    fn append_time_entry(&self, entry: &TimeEntry) -> RepoResult<TimeEntryId> {
        entry.validate()?;
        self.ensure_project(entry.project_id)?;
        if !row_exists(self.conn, "employees", entry.employee_id)? {
            return Err(RepoError::MissingReference {
                kind: "employee",
                id: entry.employee_id,
            });
        }

        self.conn.execute(
            "INSERT INTO time_entries (
                uuid,
                employee_uuid,
                project_uuid,
                entry_date,
                hours,
                description,
                billable,
                is_projected
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                entry.id.to_string(),
                entry.employee_id.to_string(),
                entry.project_id.to_string(),
                format_iso_date(entry.date),
                entry.hours,
                entry.description.as_str(),
                bool_to_int(entry.billable),
                bool_to_int(entry.projected),
            ],
        )?;

        Ok(entry.id)
    }

    fn append_expense(&self, expense: &Expense) -> RepoResult<ExpenseId> {
        expense.validate()?;
        self.ensure_project(expense.project_id)?;

        self.conn.execute(
            "INSERT INTO expenses (
                uuid,
                project_uuid,
                category,
                description,
                amount,
                expense_date,
                approved
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                expense.id.to_string(),
                expense.project_id.to_string(),
                expense.category.as_str(),
                expense.description.as_str(),
                expense.amount,
                format_iso_date(expense.date),
                bool_to_int(expense.approved),
            ],
        )?;

        Ok(expense.id)
    }

    fn list_time_entries(&self, query: &LedgerQuery) -> RepoResult<Vec<TimeEntry>> {
        let mut sql = String::from(
            "SELECT uuid, employee_uuid, project_uuid, entry_date, hours, description, billable,
                    is_projected
             FROM time_entries
             WHERE 1 = 1",
        );
        let mut bind_values = ledger_conditions(&mut sql, query, "entry_date");

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

        sql.push_str(" ORDER BY entry_date ASC, uuid ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(parse_time_entry_row(row)?);
        }
        Ok(entries)
    }

    fn list_expenses(&self, query: &LedgerQuery) -> RepoResult<Vec<Expense>> {
        let mut sql = String::from(
            "SELECT uuid, project_uuid, category, description, amount, expense_date, approved
             FROM expenses
             WHERE 1 = 1",
        );
        let bind_values = ledger_conditions(&mut sql, query, "expense_date");
        sql.push_str(" ORDER BY expense_date ASC, uuid ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut expenses = Vec::new();
        while let Some(row) = rows.next()? {
            expenses.push(parse_expense_row(row)?);
        }
        Ok(expenses)
    }

    fn delete_time_entry(&self, id: TimeEntryId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM time_entries WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                kind: "time entry",
                id,
            });
        }
        Ok(())
    }

    fn delete_expense(&self, id: ExpenseId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM expenses WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound { kind: "expense", id });
        }
        Ok(())
    }
}

/// Appends date-window and project constraints; returns their bind values.
fn ledger_conditions(sql: &mut String, query: &LedgerQuery, date_column: &str) -> Vec<Value> {
    let mut bind_values = Vec::new();

    if let Some(range) = query.date_range {
        // ISO text compares in calendar order.
        sql.push_str(&format!(" AND {date_column} >= ? AND {date_column} <= ?"));
        bind_values.push(Value::Text(format_iso_date(range.start)));
        bind_values.push(Value::Text(format_iso_date(range.end)));
    }

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

    bind_values
}

fn parse_time_entry_row(row: &Row<'_>) -> RepoResult<TimeEntry> {
    let uuid_text: String = row.get("uuid")?;
    let employee_text: String = row.get("employee_uuid")?;
    let project_text: String = row.get("project_uuid")?;
    let date_text: String = row.get("entry_date")?;

    let entry = TimeEntry {
        id: parse_uuid_column(&uuid_text, "time_entries.uuid")?,
        employee_id: parse_uuid_column(&employee_text, "time_entries.employee_uuid")?,
        project_id: parse_uuid_column(&project_text, "time_entries.project_uuid")?,
        date: parse_date_column(&date_text, "time_entries.entry_date")?,
        hours: row.get("hours")?,
        description: row.get("description")?,
        billable: parse_bool_column(row.get("billable")?, "time_entries.billable")?,
        projected: parse_bool_column(row.get("is_projected")?, "time_entries.is_projected")?,
    };
    entry.validate()?;
    Ok(entry)
}

fn parse_expense_row(row: &Row<'_>) -> RepoResult<Expense> {
    let uuid_text: String = row.get("uuid")?;
    let project_text: String = row.get("project_uuid")?;
    let date_text: String = row.get("expense_date")?;

    let expense = Expense {
        id: parse_uuid_column(&uuid_text, "expenses.uuid")?,
        project_id: parse_uuid_column(&project_text, "expenses.project_uuid")?,
        category: row.get("category")?,
        description: row.get("description")?,
        amount: row.get("amount")?,
        date: parse_date_column(&date_text, "expenses.expense_date")?,
        approved: parse_bool_column(row.get("approved")?, "expenses.approved")?,
    };
    expense.validate()?;
    Ok(expense)
}
