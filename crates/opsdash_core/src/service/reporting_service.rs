//! Read-side use cases: reports, scenarios and exports.
//!
//! # Invariants
//! - Every call works on one snapshot loaded at call time; nothing here
//!   writes to the record store.

use crate::config::MetricConfig;
use crate::io::{write_employees, write_projects};
use crate::metrics::MetricContext;
use crate::model::date::DateRange;
use crate::model::snapshot::{RecordFilter, Snapshot};
use crate::report::{build_report, Report, ReportRequest};
use crate::repo::snapshot_repo::load_snapshot;
use crate::scenario::{run_scenario, NamedAdjustment, ScenarioOutcome};
use crate::service::ServiceResult;
use chrono::NaiveDate;
use rusqlite::Connection;
use std::io::Write;

/// Use-case service over one open connection.
pub struct ReportingService<'conn> {
    conn: &'conn Connection,
    config: MetricConfig,
}

impl<'conn> ReportingService<'conn> {
    pub fn new(conn: &'conn Connection, config: MetricConfig) -> Self {
        Self { conn, config }
    }

    pub fn config(&self) -> &MetricConfig {
        &self.config
    }

    /// Loads the records selected by `filter`.
    pub fn snapshot(&self, filter: &RecordFilter) -> ServiceResult<Snapshot> {
        Ok(load_snapshot(self.conn, filter)?)
    }

    /// Builds a report over the records matching the request filter.
    pub fn report(&self, request: &ReportRequest) -> ServiceResult<Report> {
        let snapshot = self.snapshot_with_history(&request.filter)?;
        Ok(build_report(&snapshot, request, &self.config)?)
    }

    /// Runs a what-if scenario; `period` defaults to the year to date.
    pub fn scenario(
        &self,
        filter: &RecordFilter,
        as_of: NaiveDate,
        period: Option<DateRange>,
        adjustments: &[NamedAdjustment],
    ) -> ServiceResult<ScenarioOutcome> {
        let baseline = self.snapshot_with_history(filter)?;
        let ctx = self.context(as_of, period.or(filter.date_range));
        Ok(run_scenario(&baseline, adjustments, &ctx)?)
    }

    /// Writes matching projects as CSV; `as_of` adds derived metric columns.
    pub fn export_projects<W: Write>(
        &self,
        writer: W,
        filter: &RecordFilter,
        as_of: Option<NaiveDate>,
    ) -> ServiceResult<usize> {
        let snapshot = self.snapshot(filter)?;
        let ctx = as_of.map(|day| self.context(day, filter.date_range));
        write_projects(writer, &snapshot.projects, ctx.as_ref())?;
        Ok(snapshot.projects.len())
    }

    /// Writes matching employees as CSV; `as_of` adds derived metric columns.
    pub fn export_employees<W: Write>(
        &self,
        writer: W,
        filter: &RecordFilter,
        as_of: Option<NaiveDate>,
    ) -> ServiceResult<usize> {
        let snapshot = self.snapshot(filter)?;
        let ctx = as_of.map(|day| self.context(day, filter.date_range));
        write_employees(writer, &snapshot, ctx.as_ref())?;
        Ok(snapshot.employees.len())
    }

    /// Records matching `filter`, keeping their ledger rows from any date.
    fn snapshot_with_history(&self, filter: &RecordFilter) -> ServiceResult<Snapshot> {
        let unbounded = load_snapshot(self.conn, &filter.without_date_range())?;
        Ok(unbounded.restrict_with_history(filter))
    }

    fn context(&self, as_of: NaiveDate, period: Option<DateRange>) -> MetricContext<'_> {
        let period = period.unwrap_or_else(|| DateRange::year_to_date(as_of));
        MetricContext::new(as_of, period, &self.config)
    }
}
