use chrono::NaiveDate;
use opsdash_core::db::open_db_in_memory;
use opsdash_core::repo::allocation_repo::{
    AllocationListQuery, AllocationRepository, SqliteAllocationRepository,
};
use opsdash_core::repo::employee_repo::{
    EmployeeListQuery, EmployeeRepository, SqliteEmployeeRepository,
};
use opsdash_core::repo::ledger_repo::{LedgerQuery, LedgerRepository, SqliteLedgerRepository};
use opsdash_core::repo::project_repo::{
    ProjectListQuery, ProjectRepository, SqliteProjectRepository,
};
use opsdash_core::{
    Allocation, DateRange, Employee, EmployeeRole, Expense, Project, ProjectStatus, RepoError,
    TimeEntry, ValidationError,
};
use rusqlite::Connection;
use uuid::Uuid;

fn day(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, m, d).unwrap()
}

#[test]
fn project_create_update_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProjectRepository::try_new(&conn).unwrap();

    let mut project = Project::new("Apollo", ProjectStatus::Planned);
    project.start_date = Some(day(1, 1));
    project.end_date = Some(day(12, 31));
    project.budget_allocated = 100_000.0;
    let id = repo.create_project(&project).unwrap();

    project.status = ProjectStatus::Active;
    project.budget_used = 40_000.0;
    project.client = "Acme".to_string();
    repo.update_project(&project).unwrap();

    let loaded = repo.get_project(id, false).unwrap().unwrap();
    assert_eq!(loaded, project);
}

#[test]
fn update_missing_project_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProjectRepository::try_new(&conn).unwrap();

    let project = Project::new("Ghost", ProjectStatus::Active);
    assert!(matches!(
        repo.update_project(&project),
        Err(RepoError::NotFound { kind: "project", .. })
    ));
}

#[test]
fn validation_failure_blocks_create() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProjectRepository::try_new(&conn).unwrap();

    let mut project = Project::new("Apollo", ProjectStatus::Active);
    project.start_date = Some(day(6, 1));
    project.end_date = Some(day(1, 1));
    assert!(matches!(
        repo.create_project(&project),
        Err(RepoError::Validation(ValidationError::InvalidDateWindow { .. }))
    ));
    assert!(repo
        .list_projects(&ProjectListQuery::default())
        .unwrap()
        .is_empty());
}

#[test]
fn list_excludes_soft_deleted_and_filters_by_status_and_window() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProjectRepository::try_new(&conn).unwrap();

    let mut early = Project::new("Early", ProjectStatus::Completed);
    early.start_date = Some(day(1, 1));
    early.end_date = Some(day(2, 28));
    let mut late = Project::new("Late", ProjectStatus::Active);
    late.start_date = Some(day(7, 1));
    let undated = Project::new("Undated", ProjectStatus::Active);
    let gone = Project::new("Gone", ProjectStatus::Active);
    for project in [&early, &late, &undated, &gone] {
        repo.create_project(project).unwrap();
    }
    repo.soft_delete_project(gone.id).unwrap();

    let visible = repo.list_projects(&ProjectListQuery::default()).unwrap();
    let names: Vec<_> = visible.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Early", "Late", "Undated"]);

    let active = repo
        .list_projects(&ProjectListQuery {
            statuses: vec![ProjectStatus::Active],
            include_deleted: true,
            ..ProjectListQuery::default()
        })
        .unwrap();
    assert_eq!(active.len(), 3);

    let summer = repo
        .list_projects(&ProjectListQuery {
            date_range: DateRange::new(day(6, 1), day(8, 31)),
            ..ProjectListQuery::default()
        })
        .unwrap();
    let names: Vec<_> = summer.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Late", "Undated"]);
}

#[test]
fn employee_roundtrip_and_department_filter() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteEmployeeRepository::try_new(&conn).unwrap();

    let mut ada = Employee::new("Ada", EmployeeRole::Developer, 120.0);
    ada.department = "Engineering".to_string();
    ada.skills = ["Rust".to_string(), "SQL".to_string()].into_iter().collect();
    ada.hire_date = Some(day(3, 1));
    let mut bob = Employee::new("Bob", EmployeeRole::from("Account Lead"), 80.0);
    bob.department = "Sales".to_string();
    bob.fte = 0.5;
    repo.create_employee(&ada).unwrap();
    repo.create_employee(&bob).unwrap();

    assert_eq!(repo.get_employee(ada.id).unwrap(), Some(ada.clone()));
    assert_eq!(repo.get_employee(bob.id).unwrap(), Some(bob.clone()));

    let engineering = repo
        .list_employees(&EmployeeListQuery {
            department: Some(" engineering ".to_string()),
            ..EmployeeListQuery::default()
        })
        .unwrap();
    assert_eq!(engineering, vec![ada]);
}

#[test]
fn writes_referencing_unknown_records_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    let projects = SqliteProjectRepository::try_new(&conn).unwrap();
    let allocations = SqliteAllocationRepository::try_new(&conn).unwrap();
    let ledger = SqliteLedgerRepository::try_new(&conn).unwrap();

    let project = Project::new("Apollo", ProjectStatus::Active);
    projects.create_project(&project).unwrap();
    let stranger = Uuid::new_v4();

    match allocations.create_allocation(&Allocation::new(project.id, stranger, 50.0)) {
        Err(RepoError::MissingReference { kind, id }) => {
            assert_eq!(kind, "employee");
            assert_eq!(id, stranger);
        }
        other => panic!("unexpected result: {other:?}"),
    }

    let orphan = Expense::new(stranger, "travel", 10.0, day(1, 5));
    assert!(matches!(
        ledger.append_expense(&orphan),
        Err(RepoError::MissingReference { kind: "project", .. })
    ));
}

#[test]
fn hard_delete_cascades_to_allocations_and_ledger() {
    let conn = open_db_in_memory().unwrap();
    let projects = SqliteProjectRepository::try_new(&conn).unwrap();
    let employees = SqliteEmployeeRepository::try_new(&conn).unwrap();
    let allocations = SqliteAllocationRepository::try_new(&conn).unwrap();
    let ledger = SqliteLedgerRepository::try_new(&conn).unwrap();

    let project = Project::new("Apollo", ProjectStatus::Active);
    let employee = Employee::new("Ada", EmployeeRole::Developer, 100.0);
    projects.create_project(&project).unwrap();
    employees.create_employee(&employee).unwrap();
    allocations
        .create_allocation(&Allocation::new(project.id, employee.id, 50.0))
        .unwrap();
    ledger
        .append_time_entry(&TimeEntry::new(employee.id, project.id, day(2, 1), 6.0))
        .unwrap();
    ledger
        .append_expense(&Expense::new(project.id, "software", 250.0, day(2, 2)))
        .unwrap();

    projects.delete_project(project.id).unwrap();

    assert!(allocations
        .list_allocations(&AllocationListQuery::default())
        .unwrap()
        .is_empty());
    assert!(ledger
        .list_time_entries(&LedgerQuery::default())
        .unwrap()
        .is_empty());
    assert!(ledger.list_expenses(&LedgerQuery::default()).unwrap().is_empty());
    assert_eq!(employees.get_employee(employee.id).unwrap(), Some(employee));
}

#[test]
fn ledger_queries_filter_by_date_range() {
    let conn = open_db_in_memory().unwrap();
    let projects = SqliteProjectRepository::try_new(&conn).unwrap();
    let employees = SqliteEmployeeRepository::try_new(&conn).unwrap();
    let ledger = SqliteLedgerRepository::try_new(&conn).unwrap();

    let project = Project::new("Apollo", ProjectStatus::Active);
    let employee = Employee::new("Ada", EmployeeRole::Developer, 100.0);
    projects.create_project(&project).unwrap();
    employees.create_employee(&employee).unwrap();
    for (date, hours) in [(day(1, 31), 4.0), (day(2, 1), 8.0), (day(3, 1), 2.0)] {
        ledger
            .append_time_entry(&TimeEntry::new(employee.id, project.id, date, hours))
            .unwrap();
    }

    let february = ledger
        .list_time_entries(&LedgerQuery {
            date_range: DateRange::new(day(2, 1), day(2, 29)),
            ..LedgerQuery::default()
        })
        .unwrap();
    assert_eq!(february.len(), 1);
    assert_eq!(february[0].hours, 8.0);
}

#[test]
fn planned_time_entries_keep_their_flag() {
    let conn = open_db_in_memory().unwrap();
    let projects = SqliteProjectRepository::try_new(&conn).unwrap();
    let employees = SqliteEmployeeRepository::try_new(&conn).unwrap();
    let ledger = SqliteLedgerRepository::try_new(&conn).unwrap();

    let project = Project::new("Apollo", ProjectStatus::Active);
    let employee = Employee::new("Ada", EmployeeRole::Developer, 100.0);
    projects.create_project(&project).unwrap();
    employees.create_employee(&employee).unwrap();
    let actual = TimeEntry::new(employee.id, project.id, day(4, 1), 6.0);
    let planned = TimeEntry::projected(employee.id, project.id, day(4, 22), 40.0);
    ledger.append_time_entry(&actual).unwrap();
    ledger.append_time_entry(&planned).unwrap();

    let stored = ledger.list_time_entries(&LedgerQuery::default()).unwrap();
    assert_eq!(stored.len(), 2);
    let flag_of = |id: Uuid| stored.iter().find(|entry| entry.id == id).map(|entry| entry.projected);
    assert_eq!(flag_of(actual.id), Some(false));
    assert_eq!(flag_of(planned.id), Some(true));
}

#[test]
fn repository_rejects_uninitialized_connection() {
    let conn = Connection::open_in_memory().unwrap();
    let result = SqliteProjectRepository::try_new(&conn);

    assert!(matches!(
        result,
        Err(RepoError::UninitializedConnection {
            actual_version: 0,
            ..
        })
    ));
}
