//! Employee repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Write paths call `Employee::validate()` before SQL mutations.
//! - Skills persist as one sorted `a,b,c` text cell.
//! - Deleting an employee cascades to allocations and time entries.

use crate::model::date::format_iso_date;
use crate::model::employee::{parse_skills, Employee, EmployeeId, EmployeeRole};
use crate::repo::{
    ensure_connection_ready, parse_optional_date_column, parse_uuid_column, placeholders,
    RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const EMPLOYEE_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    email,
    department,
    role,
    hourly_rate,
    fte,
    utilization,
    skills,
    hire_date
FROM employees";

/// Query options for listing employees.
#[derive(Debug, Clone, Default)]
pub struct EmployeeListQuery {
    pub ids: Vec<EmployeeId>,
    /// Case-insensitive exact department match.
    pub department: Option<String>,
}

/// Repository interface for employee CRUD operations.
pub trait EmployeeRepository {
    fn create_employee(&self, employee: &Employee) -> RepoResult<EmployeeId>;
    fn update_employee(&self, employee: &Employee) -> RepoResult<()>;
    fn get_employee(&self, id: EmployeeId) -> RepoResult<Option<Employee>>;
    fn list_employees(&self, query: &EmployeeListQuery) -> RepoResult<Vec<Employee>>;
    fn delete_employee(&self, id: EmployeeId) -> RepoResult<()>;
}

/// SQLite-backed employee repository.
pub struct SqliteEmployeeRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEmployeeRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "employees")?;
        Ok(Self { conn })
    }
}

impl EmployeeRepository for SqliteEmployeeRepository<'_> {
    fn create_employee(&self, employee: &Employee) -> RepoResult<EmployeeId> {
        employee.validate()?;

        self.conn.execute(
            "INSERT INTO employees (
                uuid,
                name,
                email,
                department,
                role,
                hourly_rate,
                fte,
                utilization,
                skills,
                hire_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
            params![
                employee.id.to_string(),
                employee.name.as_str(),
                employee.email.as_str(),
                employee.department.as_str(),
                employee.role.as_str(),
                employee.hourly_rate,
                employee.fte,
                employee.utilization,
                employee.skills_cell(),
                employee.hire_date.map(format_iso_date),
            ],
        )?;

        Ok(employee.id)
    }

    fn update_employee(&self, employee: &Employee) -> RepoResult<()> {
        employee.validate()?;

        let changed = self.conn.execute(
            "UPDATE employees
             SET
                name = ?1,
                email = ?2,
                department = ?3,
                role = ?4,
                hourly_rate = ?5,
                fte = ?6,
                utilization = ?7,
                skills = ?8,
                hire_date = ?9,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?10;",
            params![
                employee.name.as_str(),
                employee.email.as_str(),
                employee.department.as_str(),
                employee.role.as_str(),
                employee.hourly_rate,
                employee.fte,
                employee.utilization,
                employee.skills_cell(),
                employee.hire_date.map(format_iso_date),
                employee.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                kind: "employee",
                id: employee.id,
            });
        }

        Ok(())
    }

    fn get_employee(&self, id: EmployeeId) -> RepoResult<Option<Employee>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{EMPLOYEE_SELECT_SQL} WHERE uuid = ?1;"))?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_employee_row(row)?));
        }

        Ok(None)
    }

    fn list_employees(&self, query: &EmployeeListQuery) -> RepoResult<Vec<Employee>> {
        let mut sql = format!("{EMPLOYEE_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if !query.ids.is_empty() {
            sql.push_str(&format!(" AND uuid IN ({})", placeholders(query.ids.len())));
            bind_values.extend(query.ids.iter().map(|id| Value::Text(id.to_string())));
        }

        if let Some(department) = query
            .department
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
        {
            sql.push_str(" AND TRIM(department) = ? COLLATE NOCASE");
            bind_values.push(Value::Text(department.to_string()));
        }

        sql.push_str(" ORDER BY name COLLATE NOCASE ASC, uuid ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut employees = Vec::new();

        while let Some(row) = rows.next()? {
            employees.push(parse_employee_row(row)?);
        }

        Ok(employees)
    }

    fn delete_employee(&self, id: EmployeeId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM employees WHERE uuid = ?1;", [id.to_string()])?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                kind: "employee",
                id,
            });
        }

        Ok(())
    }
}

fn parse_employee_row(row: &Row<'_>) -> RepoResult<Employee> {
    let uuid_text: String = row.get("uuid")?;
    let skills_text: String = row.get("skills")?;
    let role_text: String = row.get("role")?;

    let employee = Employee {
        id: parse_uuid_column(&uuid_text, "employees.uuid")?,
        name: row.get("name")?,
        email: row.get("email")?,
        department: row.get("department")?,
        role: EmployeeRole::from(role_text),
        hourly_rate: row.get("hourly_rate")?,
        fte: row.get("fte")?,
        utilization: row.get("utilization")?,
        skills: parse_skills(&skills_text),
        hire_date: parse_optional_date_column(row.get("hire_date")?, "employees.hire_date")?,
    };
    employee.validate()?;
    Ok(employee)
}
