use opsdash_core::db::migrations::{latest_version, schema_version};
use opsdash_core::db::{open_db, open_db_in_memory, DbError, RECORD_TABLES};
use opsdash_core::repo::ledger_repo::{LedgerQuery, LedgerRepository, SqliteLedgerRepository};
use rusqlite::Connection;
use std::path::Path;

const INIT_SQL: &str = include_str!("../src/db/migrations/0001_init.sql");
const INDEX_SQL: &str = include_str!("../src/db/migrations/0002_indexes.sql");

const PROJECT_ID: &str = "7d9f3f0e-4a52-4c1e-9a55-0d7a5e3e8b01";
const EMPLOYEE_ID: &str = "1c2b6a4e-9f0d-4b8e-8f5a-3e2d1c0b9a87";

/// Creates a file store at schema v2, before projected hours existed.
fn seed_version_two(path: &Path) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(INIT_SQL).unwrap();
    conn.execute_batch(INDEX_SQL).unwrap();
    conn.execute_batch("PRAGMA user_version = 2;").unwrap();
    insert_parents(&conn);
    conn.execute(
        "INSERT INTO time_entries (uuid, employee_uuid, project_uuid, entry_date, hours)
         VALUES ('5f0c1d2e-3b4a-4c5d-8e6f-708192a3b4c5', ?1, ?2, '2024-03-04', 7.5);",
        [EMPLOYEE_ID, PROJECT_ID],
    )
    .unwrap();
}

fn insert_parents(conn: &Connection) {
    conn.execute(
        "INSERT INTO projects (uuid, name, status) VALUES (?1, 'Apollo', 'active');",
        [PROJECT_ID],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO employees (uuid, name, fte) VALUES (?1, 'Ada', 0.5);",
        [EMPLOYEE_ID],
    )
    .unwrap();
}

fn sqlite_object_exists(conn: &Connection, kind: &str, name: &str) -> bool {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = ?1 AND name = ?2);",
        [kind, name],
        |row| row.get::<_, i64>(0),
    )
    .unwrap()
        == 1
}

#[test]
fn fresh_store_has_record_tables_and_lookup_indexes() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn).unwrap(), latest_version());
    for table in RECORD_TABLES {
        assert!(sqlite_object_exists(&conn, "table", table), "table {table}");
    }
    for index in [
        "idx_projects_status",
        "idx_employees_department",
        "idx_allocations_project",
        "idx_allocations_employee",
        "idx_time_entries_date",
        "idx_time_entries_project",
        "idx_time_entries_projected",
        "idx_expenses_project",
    ] {
        assert!(sqlite_object_exists(&conn, "index", index), "index {index}");
    }
}

#[test]
fn check_constraints_reject_out_of_range_rows() {
    let conn = open_db_in_memory().unwrap();
    insert_parents(&conn);

    let rejected = [
        "INSERT INTO projects (uuid, name, status)
         VALUES ('a0000000-0000-4000-8000-000000000001', 'Bad', 'archived');",
        "INSERT INTO employees (uuid, name, fte)
         VALUES ('a0000000-0000-4000-8000-000000000002', 'Over', 1.5);",
        "INSERT INTO time_entries (uuid, employee_uuid, project_uuid, entry_date, hours)
         VALUES ('a0000000-0000-4000-8000-000000000003',
                 '1c2b6a4e-9f0d-4b8e-8f5a-3e2d1c0b9a87',
                 '7d9f3f0e-4a52-4c1e-9a55-0d7a5e3e8b01', '2024-01-02', 0);",
        "INSERT INTO time_entries (uuid, employee_uuid, project_uuid, entry_date, hours, is_projected)
         VALUES ('a0000000-0000-4000-8000-000000000004',
                 '1c2b6a4e-9f0d-4b8e-8f5a-3e2d1c0b9a87',
                 '7d9f3f0e-4a52-4c1e-9a55-0d7a5e3e8b01', '2024-01-02', 4, 2);",
        "INSERT INTO expenses (uuid, project_uuid, category, amount, expense_date)
         VALUES ('a0000000-0000-4000-8000-000000000005',
                 '7d9f3f0e-4a52-4c1e-9a55-0d7a5e3e8b01', 'travel', -1, '2024-01-02');",
        "INSERT INTO allocations (uuid, project_uuid, employee_uuid)
         VALUES ('a0000000-0000-4000-8000-000000000006',
                 '7d9f3f0e-4a52-4c1e-9a55-0d7a5e3e8b01',
                 'ffffffff-ffff-4fff-8fff-ffffffffffff');",
    ];
    for sql in rejected {
        assert!(conn.execute(sql, []).is_err(), "accepted: {sql}");
    }

    let stored: i64 = conn
        .query_row(
            "SELECT (SELECT COUNT(*) FROM projects) + (SELECT COUNT(*) FROM employees)
                  + (SELECT COUNT(*) FROM time_entries) + (SELECT COUNT(*) FROM expenses)
                  + (SELECT COUNT(*) FROM allocations);",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(stored, 2);
}

#[test]
fn upgrade_from_version_two_keeps_hours_as_actuals() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("v2.db");
    seed_version_two(&path);

    let conn = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn).unwrap(), latest_version());
    let entries = SqliteLedgerRepository::try_new(&conn)
        .unwrap()
        .list_time_entries(&LedgerQuery::default())
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].hours, 7.5);
    assert!(!entries[0].projected);
    drop(conn);

    // A second open finds nothing pending.
    let reopened = open_db(&path).unwrap();
    assert_eq!(schema_version(&reopened).unwrap(), latest_version());
}

#[test]
fn failed_step_rolls_back_the_whole_batch() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clash.db");
    seed_version_two(&path);
    {
        // Column added out of band makes step 3 fail.
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch("ALTER TABLE time_entries ADD COLUMN is_projected INTEGER;")
            .unwrap();
    }

    match open_db(&path) {
        Err(DbError::Migration { version, name, .. }) => {
            assert_eq!(version, 3);
            assert_eq!(name, "projected_hours");
        }
        other => panic!("unexpected result: {other:?}"),
    }

    let conn = Connection::open(&path).unwrap();
    assert_eq!(schema_version(&conn).unwrap(), 2);
    assert!(!sqlite_object_exists(&conn, "index", "idx_time_entries_projected"));
}

#[test]
fn store_written_by_newer_build_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");
    Connection::open(&path)
        .unwrap()
        .execute_batch("PRAGMA user_version = 999;")
        .unwrap();

    match open_db(&path) {
        Err(DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        }) => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected result: {other:?}"),
    }
}
