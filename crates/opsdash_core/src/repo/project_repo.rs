//! Project repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD over the `projects` table, including soft and hard delete.
//! - Keep SQL details inside the record-store boundary.
//!
//! # Invariants
//! - Write paths call `Project::validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Hard delete cascades to allocations, time entries and expenses.

use crate::model::date::{format_iso_date, DateRange};
use crate::model::project::{Project, ProjectId, ProjectStatus};
use crate::repo::{
    bool_to_int, ensure_connection_ready, parse_bool_column, parse_optional_date_column,
    parse_uuid_column, placeholders, RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const PROJECT_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    description,
    status,
    start_date,
    end_date,
    budget_allocated,
    budget_used,
    revenue_projected,
    revenue_actual,
    client,
    project_manager,
    is_deleted
FROM projects";

/// Query options for listing projects.
#[derive(Debug, Clone, Default)]
pub struct ProjectListQuery {
    pub ids: Vec<ProjectId>,
    pub statuses: Vec<ProjectStatus>,
    /// Keep projects whose window overlaps this range; undated projects match.
    pub date_range: Option<DateRange>,
    pub include_deleted: bool,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for project CRUD operations.
pub trait ProjectRepository {
    fn create_project(&self, project: &Project) -> RepoResult<ProjectId>;
    fn update_project(&self, project: &Project) -> RepoResult<()>;
    fn get_project(&self, id: ProjectId, include_deleted: bool) -> RepoResult<Option<Project>>;
    fn list_projects(&self, query: &ProjectListQuery) -> RepoResult<Vec<Project>>;
    fn soft_delete_project(&self, id: ProjectId) -> RepoResult<()>;
    fn delete_project(&self, id: ProjectId) -> RepoResult<()>;
}

/// SQLite-backed project repository.
pub struct SqliteProjectRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProjectRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "projects")?;
        Ok(Self { conn })
    }
}

impl ProjectRepository for SqliteProjectRepository<'_> {
    fn create_project(&self, project: &Project) -> RepoResult<ProjectId> {
        project.validate()?;

        self.conn.execute(
            "INSERT INTO projects (
                uuid,
                name,
                description,
                status,
                start_date,
                end_date,
                budget_allocated,
                budget_used,
                revenue_projected,
                revenue_actual,
                client,
                project_manager,
                is_deleted
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13);",
            params![
                project.id.to_string(),
                project.name.as_str(),
                project.description.as_str(),
                project.status.as_str(),
                project.start_date.map(format_iso_date),
                project.end_date.map(format_iso_date),
                project.budget_allocated,
                project.budget_used,
                project.revenue_projected,
                project.revenue_actual,
                project.client.as_str(),
                project.project_manager.as_str(),
                bool_to_int(project.is_deleted),
            ],
        )?;

        Ok(project.id)
    }

    fn update_project(&self, project: &Project) -> RepoResult<()> {
        project.validate()?;

        let changed = self.conn.execute(
            "UPDATE projects
             SET
                name = ?1,
                description = ?2,
                status = ?3,
                start_date = ?4,
                end_date = ?5,
                budget_allocated = ?6,
                budget_used = ?7,
                revenue_projected = ?8,
                revenue_actual = ?9,
                client = ?10,
                project_manager = ?11,
                is_deleted = ?12,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?13;",
            params![
                project.name.as_str(),
                project.description.as_str(),
                project.status.as_str(),
                project.start_date.map(format_iso_date),
                project.end_date.map(format_iso_date),
                project.budget_allocated,
                project.budget_used,
                project.revenue_projected,
                project.revenue_actual,
                project.client.as_str(),
                project.project_manager.as_str(),
                bool_to_int(project.is_deleted),
                project.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                kind: "project",
                id: project.id,
            });
        }

        Ok(())
    }

    fn get_project(&self, id: ProjectId, include_deleted: bool) -> RepoResult<Option<Project>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PROJECT_SELECT_SQL}
             WHERE uuid = ?1
               AND (?2 = 1 OR is_deleted = 0);"
        ))?;

        let mut rows = stmt.query(params![id.to_string(), bool_to_int(include_deleted)])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_project_row(row)?));
        }

        Ok(None)
    }

    fn list_projects(&self, query: &ProjectListQuery) -> RepoResult<Vec<Project>> {
        let mut sql = format!("{PROJECT_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if !query.include_deleted {
            sql.push_str(" AND is_deleted = 0");
        }

        if !query.ids.is_empty() {
            sql.push_str(&format!(" AND uuid IN ({})", placeholders(query.ids.len())));
            bind_values.extend(query.ids.iter().map(|id| Value::Text(id.to_string())));
        }

        if !query.statuses.is_empty() {
            sql.push_str(&format!(
                " AND status IN ({})",
                placeholders(query.statuses.len())
            ));
            bind_values.extend(
                query
                    .statuses
                    .iter()
                    .map(|status| Value::Text(status.as_str().to_string())),
            );
        }

        if let Some(range) = query.date_range {
            sql.push_str(" AND (start_date IS NULL OR start_date <= ?)");
            sql.push_str(" AND (end_date IS NULL OR end_date >= ?)");
            bind_values.push(Value::Text(format_iso_date(range.end)));
            bind_values.push(Value::Text(format_iso_date(range.start)));
        }

        sql.push_str(" ORDER BY name COLLATE NOCASE ASC, uuid ASC");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut projects = Vec::new();

        while let Some(row) = rows.next()? {
            projects.push(parse_project_row(row)?);
        }

        Ok(projects)
    }

    fn soft_delete_project(&self, id: ProjectId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE projects
             SET
                is_deleted = 1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            [id.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound { kind: "project", id });
        }

        Ok(())
    }

    fn delete_project(&self, id: ProjectId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM projects WHERE uuid = ?1;", [id.to_string()])?;

        if changed == 0 {
            return Err(RepoError::NotFound { kind: "project", id });
        }

        Ok(())
    }
}

fn parse_project_row(row: &Row<'_>) -> RepoResult<Project> {
    let uuid_text: String = row.get("uuid")?;
    let id = parse_uuid_column(&uuid_text, "projects.uuid")?;

    let status_text: String = row.get("status")?;
    let status = status_text.parse::<ProjectStatus>().map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid project status `{status_text}` in projects.status"
        ))
    })?;

    let project = Project {
        id,
        name: row.get("name")?,
        description: row.get("description")?,
        status,
        start_date: parse_optional_date_column(row.get("start_date")?, "projects.start_date")?,
        end_date: parse_optional_date_column(row.get("end_date")?, "projects.end_date")?,
        budget_allocated: row.get("budget_allocated")?,
        budget_used: row.get("budget_used")?,
        revenue_projected: row.get("revenue_projected")?,
        revenue_actual: row.get("revenue_actual")?,
        client: row.get("client")?,
        project_manager: row.get("project_manager")?,
        is_deleted: parse_bool_column(row.get("is_deleted")?, "projects.is_deleted")?,
    };
    project.validate()?;
    Ok(project)
}
