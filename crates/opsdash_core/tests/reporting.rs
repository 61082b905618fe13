use chrono::NaiveDate;
use opsdash_core::db::open_db_in_memory;
use opsdash_core::metrics::{employee_utilization, health_score, profit_margin};
use opsdash_core::repo::allocation_repo::{AllocationRepository, SqliteAllocationRepository};
use opsdash_core::repo::employee_repo::{EmployeeRepository, SqliteEmployeeRepository};
use opsdash_core::repo::ledger_repo::{LedgerRepository, SqliteLedgerRepository};
use opsdash_core::repo::project_repo::{ProjectRepository, SqliteProjectRepository};
use opsdash_core::repo::snapshot_repo::load_snapshot;
use opsdash_core::{
    Adjustment, Allocation, CustomReportSpec, DateRange, Employee, EmployeeRole, Expense,
    MetricConfig, MetricContext, MetricValue, NamedAdjustment, Project, ProjectStatus,
    RecordFilter, ReportError, ReportKind, ReportRequest, ReportingService, ScenarioError,
    ServiceError, TimeEntry,
};
use rusqlite::Connection;
use std::collections::BTreeMap;
use uuid::Uuid;

fn day(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, m, d).unwrap()
}

struct Seeded {
    conn: Connection,
    apollo: Project,
    ada: Employee,
    bob: Employee,
}

fn seeded() -> Seeded {
    let conn = open_db_in_memory().unwrap();

    let mut apollo = Project::new("Apollo", ProjectStatus::Active);
    apollo.start_date = Some(day(1, 1));
    apollo.end_date = Some(day(12, 31));
    apollo.budget_allocated = 100_000.0;
    apollo.budget_used = 40_000.0;
    apollo.revenue_actual = 50_000.0;
    let mut hermes = Project::new("Hermes", ProjectStatus::Completed);
    hermes.budget_allocated = 20_000.0;
    hermes.budget_used = 10_000.0;

    let mut ada = Employee::new("Ada", EmployeeRole::Developer, 100.0);
    ada.department = "Engineering".to_string();
    ada.fte = 0.5;
    let mut bob = Employee::new("Bob", EmployeeRole::Designer, 80.0);
    bob.department = "Design".to_string();

    {
        let projects = SqliteProjectRepository::try_new(&conn).unwrap();
        let employees = SqliteEmployeeRepository::try_new(&conn).unwrap();
        let allocations = SqliteAllocationRepository::try_new(&conn).unwrap();
        let ledger = SqliteLedgerRepository::try_new(&conn).unwrap();

        projects.create_project(&apollo).unwrap();
        projects.create_project(&hermes).unwrap();
        employees.create_employee(&ada).unwrap();
        employees.create_employee(&bob).unwrap();
        allocations
            .create_allocation(&Allocation::new(apollo.id, ada.id, 50.0))
            .unwrap();
        // 30 hours for Ada during the first two weeks of July.
        for (date, hours) in [(day(7, 1), 10.0), (day(7, 3), 12.0), (day(7, 10), 8.0)] {
            ledger
                .append_time_entry(&TimeEntry::new(ada.id, apollo.id, date, hours))
                .unwrap();
        }
        ledger
            .append_time_entry(&TimeEntry::new(bob.id, hermes.id, day(3, 4), 5.0))
            .unwrap();
        ledger
            .append_expense(&Expense::new(apollo.id, "travel", 1_200.0, day(7, 2)))
            .unwrap();
    }

    Seeded {
        conn,
        apollo,
        ada,
        bob,
    }
}

#[test]
fn health_example_matches_documented_figures() {
    let seeded = seeded();
    let config = MetricConfig::default();
    let period = DateRange::year_to_date(day(7, 1));
    let ctx = MetricContext::new(day(7, 1), period, &config);

    let health = health_score(&seeded.apollo, &ctx);
    assert_eq!(health.budget_adherence, MetricValue::Value(0.6));
    let elapsed = health.schedule_elapsed.value().unwrap();
    assert!((elapsed - 0.5).abs() < 0.01, "elapsed = {elapsed}");
    assert!((0.0..=1.0).contains(&health.score));
}

#[test]
fn utilization_example_over_two_working_weeks() {
    let seeded = seeded();
    let config = MetricConfig::default();
    let period = DateRange::new(day(7, 1), day(7, 14)).unwrap();
    let ctx = MetricContext::new(day(7, 14), period, &config);

    let snapshot = load_snapshot(&seeded.conn, &RecordFilter::default()).unwrap();
    let rows = employee_utilization(&snapshot, &ctx);
    let ada = rows.iter().find(|row| row.employee_id == seeded.ada.id).unwrap();
    assert_eq!(ada.capacity_hours, 40.0);
    assert_eq!(ada.utilization, MetricValue::Value(0.75));

    let bob = rows.iter().find(|row| row.employee_id == seeded.bob.id).unwrap();
    assert_eq!(bob.utilization, MetricValue::Value(0.0));
}

#[test]
fn margin_without_revenue_is_not_applicable() {
    assert!(!profit_margin(0.0, 500.0).is_applicable());
    assert_eq!(profit_margin(0.0, 0.0).to_string(), "N/A");
}

#[test]
fn snapshot_filter_drops_orphaned_ledger_rows() {
    let seeded = seeded();
    let filter = RecordFilter {
        department: Some("engineering".to_string()),
        ..RecordFilter::default()
    };
    let snapshot = load_snapshot(&seeded.conn, &filter).unwrap();

    assert_eq!(snapshot.employees.len(), 1);
    assert_eq!(snapshot.projects.len(), 2);
    assert!(snapshot
        .time_entries
        .iter()
        .all(|entry| entry.employee_id == seeded.ada.id));
    assert_eq!(snapshot.time_entries.len(), 3);
}

#[test]
fn executive_report_has_fixed_sections() {
    let seeded = seeded();
    let service = ReportingService::new(&seeded.conn, MetricConfig::default());
    let report = service
        .report(&ReportRequest::new(ReportKind::Executive, day(7, 1)))
        .unwrap();

    assert_eq!(
        report.section_names(),
        vec!["key_metrics", "project_summary", "project_health"]
    );
    let key_metrics = report.section("key_metrics").unwrap();
    assert_eq!(
        key_metrics.headline("total_revenue"),
        Some(&MetricValue::Value(50_000.0))
    );
    assert_eq!(
        key_metrics.headline("total_cost"),
        Some(&MetricValue::Value(50_000.0))
    );
    assert_eq!(report.section("project_summary").unwrap().table.rows.len(), 2);
}

#[test]
fn status_filter_scopes_the_report() {
    let seeded = seeded();
    let service = ReportingService::new(&seeded.conn, MetricConfig::default());
    let mut request = ReportRequest::new(ReportKind::Executive, day(7, 1));
    request.filter.statuses = vec![ProjectStatus::Active];
    let report = service.report(&request).unwrap();

    assert_eq!(
        report
            .section("key_metrics")
            .unwrap()
            .headline("total_cost"),
        Some(&MetricValue::Value(40_000.0))
    );
}

#[test]
fn custom_report_with_unknown_metric_is_aborted() {
    let seeded = seeded();
    let service = ReportingService::new(&seeded.conn, MetricConfig::default());
    let spec = CustomReportSpec {
        metrics: vec!["total_revenue".to_string(), "nonexistent_metric".to_string()],
        ..CustomReportSpec::default()
    };
    let err = service
        .report(&ReportRequest::new(ReportKind::Custom(spec), day(7, 1)))
        .unwrap_err();

    match err {
        ServiceError::Report(ReportError::MalformedInput { identifiers }) => {
            assert_eq!(identifiers, vec!["nonexistent_metric".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn custom_report_lists_requested_columns_in_order() {
    let seeded = seeded();
    let service = ReportingService::new(&seeded.conn, MetricConfig::default());
    let spec = CustomReportSpec {
        metrics: vec!["headcount".to_string()],
        project_columns: vec!["name".to_string(), "profit_margin".to_string()],
        series: vec![],
    };
    let report = service
        .report(&ReportRequest::new(ReportKind::Custom(spec), day(7, 1)))
        .unwrap();

    let projects = report.section("projects").unwrap();
    assert_eq!(projects.table.columns, vec!["name", "profit_margin"]);
    assert_eq!(
        report.section("metrics").unwrap().headline("headcount"),
        Some(&MetricValue::Value(2.0))
    );
}

#[test]
fn scenario_compares_without_touching_storage() {
    let seeded = seeded();
    let service = ReportingService::new(&seeded.conn, MetricConfig::default());
    let adjustments = [NamedAdjustment::new(
        "cost +20%",
        Adjustment::CostMultiplier(1.2),
    )];

    let outcome = service
        .scenario(&RecordFilter::default(), day(7, 1), None, &adjustments)
        .unwrap();
    let total_cost = outcome.portfolio_delta("total_cost").unwrap();
    assert_eq!(total_cost.baseline, MetricValue::Value(50_000.0));
    let adjusted = total_cost.adjusted.value().unwrap();
    assert!((adjusted - 60_000.0).abs() < 1e-6);
    let percent = total_cost.percent.value().unwrap();
    assert!((percent - 20.0).abs() < 1e-6);

    let stored = load_snapshot(&seeded.conn, &RecordFilter::default()).unwrap();
    let apollo = stored.project(seeded.apollo.id).unwrap();
    assert_eq!(apollo.budget_used, 40_000.0);
}

#[test]
fn scenario_with_unknown_employee_fails_fast() {
    let seeded = seeded();
    let service = ReportingService::new(&seeded.conn, MetricConfig::default());
    let stranger = Uuid::new_v4();
    let adjustments = [
        NamedAdjustment::new("cost", Adjustment::CostMultiplier(1.1)),
        NamedAdjustment::new(
            "staffing",
            Adjustment::FteDelta(BTreeMap::from([(stranger, -0.5)])),
        ),
    ];

    match service.scenario(&RecordFilter::default(), day(7, 1), None, &adjustments) {
        Err(ServiceError::Scenario(ScenarioError::UnknownEmployee { adjustment, id })) => {
            assert_eq!(adjustment, "staffing");
            assert_eq!(id, stranger);
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn date_filtered_status_report_keeps_cost_to_date_cumulative() {
    let conn = open_db_in_memory().unwrap();
    let mut ceres = Project::new("Ceres", ProjectStatus::Active);
    ceres.start_date = Some(day(1, 1));
    ceres.end_date = Some(day(12, 31));
    ceres.budget_allocated = 100_000.0;
    ceres.budget_used = 60_000.0;
    SqliteProjectRepository::try_new(&conn)
        .unwrap()
        .create_project(&ceres)
        .unwrap();
    let ledger = SqliteLedgerRepository::try_new(&conn).unwrap();
    ledger
        .append_expense(&Expense::new(ceres.id, "hardware", 60_000.0, day(1, 15)))
        .unwrap();

    let service = ReportingService::new(&conn, MetricConfig::default());
    let mut request = ReportRequest::new(ReportKind::ProjectStatus(ceres.id), day(7, 1));
    request.filter.date_range = DateRange::new(day(6, 1), day(6, 30));
    let cost_to_date = |service: &ReportingService<'_>| {
        service
            .report(&request)
            .unwrap()
            .section("forecast")
            .unwrap()
            .headline("cost_to_date")
            .cloned()
    };

    assert_eq!(cost_to_date(&service), Some(MetricValue::Value(60_000.0)));

    // New spend inside the window can only raise cost to date.
    ledger
        .append_expense(&Expense::new(ceres.id, "travel", 100.0, day(6, 12)))
        .unwrap();
    assert_eq!(cost_to_date(&service), Some(MetricValue::Value(60_100.0)));

    let report = service.report(&request).unwrap();
    assert_eq!(
        report.section("budget_status").unwrap().headline("spent"),
        Some(&MetricValue::Value(60_100.0))
    );
    // Period series still cover June only.
    let burn = report.section("burn_rate").unwrap();
    let june = &burn.series[0].points;
    assert_eq!(june.len(), 1);
    assert_eq!(june[0].value, MetricValue::Value(100.0));
}
