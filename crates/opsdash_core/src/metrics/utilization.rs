//! Employee utilization and capacity figures.
//!
//! # Invariants
//! - Raw utilization is never clamped; only `display_utilization` caps it.
//! - Zero logged hours with positive fte is utilization 0, for any period.
//! - Projected time entries never count as logged hours.

use crate::config::MetricConfig;
use crate::metrics::period::Granularity;
use crate::metrics::{mean_of, MetricContext, MetricValue};
use crate::model::date::DateRange;
use crate::model::employee::{Employee, EmployeeId};
use crate::model::snapshot::Snapshot;
use chrono::Datelike;
use serde::{Deserialize, Serialize};

/// Working days inside `range`.
///
/// Months listed in `config.working_calendar` contribute their configured
/// working days, prorated by the share of the month's calendar days that
/// `range` covers. Other months count Monday to Friday.
pub fn working_days(range: DateRange, config: &MetricConfig) -> f64 {
    if config.working_calendar.is_empty() {
        return range.weekdays() as f64;
    }

    Granularity::Monthly
        .buckets(range)
        .iter()
        .map(|period| {
            let chunk = period.range;
            let configured = config.working_month(chunk.start.year(), chunk.start.month());
            match (configured, DateRange::month(chunk.start.year(), chunk.start.month())) {
                (Some(entry), Some(month)) => {
                    f64::from(entry.working_days) * chunk.days() as f64 / month.days() as f64
                }
                _ => chunk.weekdays() as f64,
            }
        })
        .sum()
}

/// Standard working hours of one full-time employee inside `range`.
pub fn standard_hours(range: DateRange, config: &MetricConfig) -> f64 {
    working_days(range, config) * config.hours_per_working_day
}

/// `hours / (fte * standard_hours)`.
pub fn utilization_rate(hours: f64, fte: f64, standard_hours: f64) -> MetricValue {
    if !hours.is_finite() || !fte.is_finite() || !standard_hours.is_finite() {
        return MetricValue::not_applicable("non-finite utilization input");
    }
    if hours == 0.0 && fte > 0.0 {
        return MetricValue::Value(0.0);
    }
    let capacity = fte * standard_hours;
    if capacity <= 0.0 {
        return MetricValue::not_applicable("no capacity in period");
    }
    MetricValue::Value(hours / capacity)
}

/// Clamps a raw utilization into `[0, cap]` for display.
pub fn display_utilization(raw: &MetricValue, cap: f64) -> MetricValue {
    raw.clone().map(|value| value.clamp(0.0, cap))
}

/// Per-employee utilization row for one reporting period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeUtilization {
    pub employee_id: EmployeeId,
    pub name: String,
    pub department: String,
    pub role: String,
    pub fte: f64,
    pub hours: f64,
    pub billable_hours: f64,
    /// Planned hours inside the period, kept apart from `hours`.
    pub projected_hours: f64,
    pub capacity_hours: f64,
    pub utilization: MetricValue,
    pub display_utilization: MetricValue,
    /// Billable share of logged hours.
    pub billable_rate: MetricValue,
    /// Sum of allocation percentages active in the period.
    pub allocation_percent: f64,
    pub over_allocated: bool,
    pub monthly_cost: f64,
    pub revenue_generated: f64,
}

/// Builds one utilization row per employee in the snapshot.
pub fn employee_utilization(snapshot: &Snapshot, ctx: &MetricContext<'_>) -> Vec<EmployeeUtilization> {
    let period_hours = standard_hours(ctx.period, ctx.config);

    snapshot
        .employees
        .iter()
        .map(|employee| utilization_row(snapshot, employee, period_hours, ctx))
        .collect()
}

fn utilization_row(
    snapshot: &Snapshot,
    employee: &Employee,
    period_hours: f64,
    ctx: &MetricContext<'_>,
) -> EmployeeUtilization {
    let mut hours = 0.0;
    let mut billable_hours = 0.0;
    let mut projected_hours = 0.0;
    let mut revenue_generated = 0.0;

    for entry in snapshot
        .time_entries
        .iter()
        .filter(|entry| entry.employee_id == employee.id && ctx.period.contains(entry.date))
    {
        if entry.projected {
            projected_hours += entry.hours;
            continue;
        }
        hours += entry.hours;
        if entry.billable {
            billable_hours += entry.hours;
            let rate = snapshot
                .effective_rate(entry.project_id, employee.id)
                .unwrap_or(employee.hourly_rate);
            revenue_generated += entry.hours * rate;
        }
    }

    let allocation_percent: f64 = snapshot
        .allocations
        .iter()
        .filter(|allocation| {
            allocation.employee_id == employee.id
                && ctx.period.overlaps(allocation.start_date, allocation.end_date)
        })
        .map(|allocation| allocation.allocation_percent)
        .sum();

    let utilization = utilization_rate(hours, employee.fte, period_hours);
    let display = display_utilization(&utilization, ctx.config.utilization_display_cap);
    let over_allocated = allocation_percent > 100.0 || utilization.value_or(0.0) > 1.0;

    EmployeeUtilization {
        employee_id: employee.id,
        name: employee.name.clone(),
        department: employee.department.clone(),
        role: employee.role.as_str().to_string(),
        fte: employee.fte,
        hours,
        billable_hours,
        projected_hours,
        capacity_hours: employee.fte * period_hours,
        utilization,
        display_utilization: display,
        billable_rate: MetricValue::ratio(billable_hours, hours, "no hours logged"),
        allocation_percent,
        over_allocated,
        monthly_cost: employee.hourly_rate * employee.fte * ctx.config.monthly_standard_hours,
        revenue_generated,
    }
}

/// Mean raw utilization over rows with a defined value.
pub fn average_utilization(rows: &[EmployeeUtilization]) -> MetricValue {
    mean_of(rows.iter().map(|row| &row.utilization), "no employee capacity")
}

#[cfg(test)]
mod tests {
    use super::{
        display_utilization, employee_utilization, standard_hours, utilization_rate, working_days,
    };
    use crate::config::{MetricConfig, WorkingMonth};
    use crate::metrics::{MetricContext, MetricValue};
    use crate::model::allocation::Allocation;
    use crate::model::date::DateRange;
    use crate::model::employee::{Employee, EmployeeRole};
    use crate::model::ledger::TimeEntry;
    use crate::model::project::{Project, ProjectStatus};
    use crate::model::snapshot::Snapshot;
    use chrono::NaiveDate;

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    #[test]
    fn half_fte_with_thirty_hours_is_three_quarters() {
        assert_eq!(utilization_rate(30.0, 0.5, 80.0), MetricValue::Value(0.75));
    }

    #[test]
    fn zero_hours_is_zero_for_any_period() {
        assert_eq!(utilization_rate(0.0, 0.8, 160.0), MetricValue::Value(0.0));
        assert_eq!(utilization_rate(0.0, 0.8, 0.0), MetricValue::Value(0.0));
    }

    #[test]
    fn zero_capacity_is_not_applicable() {
        assert!(!utilization_rate(10.0, 0.0, 160.0).is_applicable());
        assert!(!utilization_rate(10.0, 1.0, 0.0).is_applicable());
    }

    #[test]
    fn display_clamps_but_raw_keeps_over_allocation() {
        let raw = utilization_rate(120.0, 1.0, 80.0);
        assert_eq!(raw, MetricValue::Value(1.5));
        assert_eq!(display_utilization(&raw, 1.0), MetricValue::Value(1.0));
    }

    #[test]
    fn two_weeks_have_eighty_standard_hours() {
        let range = DateRange::new(day(7, 1), day(7, 14)).unwrap();
        assert_eq!(standard_hours(range, &MetricConfig::default()), 80.0);
    }

    #[test]
    fn working_calendar_overrides_weekday_count() {
        let mut config = MetricConfig::default();
        config.working_calendar = vec![
            WorkingMonth {
                year: 2024,
                month: 12,
                working_days: 19,
                holidays: 3,
            },
            WorkingMonth {
                year: 2024,
                month: 4,
                working_days: 21,
                holidays: 1,
            },
        ];

        let december = DateRange::month(2024, 12).unwrap();
        assert_eq!(standard_hours(december, &config), 19.0 * 8.0);

        // Half of April is half of its configured working days.
        let first_half = DateRange::new(day(4, 1), day(4, 15)).unwrap();
        assert_eq!(working_days(first_half, &config), 10.5);

        // Months without an entry keep counting Monday to Friday.
        let july = DateRange::new(day(7, 1), day(7, 14)).unwrap();
        assert_eq!(standard_hours(july, &config), 80.0);
    }

    #[test]
    fn employee_rows_aggregate_period_entries() {
        let project = Project::new("Apollo", ProjectStatus::Active);
        let mut employee = Employee::new("Ada", EmployeeRole::Developer, 100.0);
        employee.fte = 0.5;

        let mut non_billable = TimeEntry::new(employee.id, project.id, day(7, 3), 10.0);
        non_billable.billable = false;
        let mut heavy = Allocation::new(project.id, employee.id, 80.0);
        heavy.project_rate = Some(120.0);
        let second = Allocation::new(project.id, employee.id, 40.0);
        let mut planned = TimeEntry::new(employee.id, project.id, day(7, 9), 16.0);
        planned.projected = true;

        let snapshot = Snapshot {
            time_entries: vec![
                TimeEntry::new(employee.id, project.id, day(7, 2), 20.0),
                non_billable,
                planned,
                TimeEntry::new(employee.id, project.id, day(8, 1), 99.0),
            ],
            allocations: vec![heavy, second],
            projects: vec![project],
            employees: vec![employee],
            ..Snapshot::default()
        };
        let config = MetricConfig::default();
        let ctx = MetricContext::new(
            day(7, 15),
            DateRange::new(day(7, 1), day(7, 14)).unwrap(),
            &config,
        );

        let rows = employee_utilization(&snapshot, &ctx);
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.hours, 30.0);
        assert_eq!(row.billable_hours, 20.0);
        assert_eq!(row.projected_hours, 16.0);
        assert_eq!(row.capacity_hours, 40.0);
        assert_eq!(row.utilization, MetricValue::Value(0.75));
        assert_eq!(row.revenue_generated, 2400.0);
        assert_eq!(row.allocation_percent, 120.0);
        assert!(row.over_allocated);
        assert_eq!(row.monthly_cost, 100.0 * 0.5 * 160.0);
    }
}
