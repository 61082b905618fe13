//! Core domain logic for the operations dashboard.
//! This crate is the single source of truth for business invariants.

pub mod config;
pub mod db;
pub mod io;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod repo;
pub mod report;
pub mod scenario;
pub mod service;

pub use config::{ConfigError, DashboardConfig, HealthWeights, MetricConfig, ToleranceTier};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use io::{ExportError, ImportError, ImportReport, RowError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use metrics::{Granularity, MetricContext, MetricValue};
pub use model::allocation::{Allocation, AllocationId};
pub use model::date::DateRange;
pub use model::employee::{Employee, EmployeeId, EmployeeRole};
pub use model::ledger::{Expense, ExpenseId, TimeEntry, TimeEntryId};
pub use model::project::{Project, ProjectId, ProjectStatus};
pub use model::snapshot::{RecordFilter, Snapshot};
pub use model::validation::ValidationError;
pub use repo::{RepoError, RepoResult};
pub use report::{
    build_report, CustomReportSpec, Report, ReportError, ReportKind, ReportRequest,
    ReportSection,
};
pub use scenario::{
    apply_adjustments, run_scenario, Adjustment, NamedAdjustment, ScenarioError,
    ScenarioOutcome,
};
pub use service::{ReportingService, ServiceError, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
