//! Cost, burn rate, margin and budget-status calculations.
//!
//! # Responsibility
//! - Price ledger rows (hours at the effective rate, plus expenses).
//! - Bucket costs into period series and classify projected budget use.
//!
//! # Invariants
//! - Labor is priced with the allocation `project_rate` when present,
//!   otherwise the employee's `hourly_rate`.
//! - Breakdown vectors are ordered by name/category for stable output.
//! - Projected time entries are planned spend: they are priced apart and
//!   never enter labor, total or to-date cost.

use crate::metrics::health::schedule_elapsed;
use crate::metrics::period::Granularity;
use crate::metrics::utilization::working_days;
use crate::metrics::{MetricContext, MetricValue};
use crate::model::date::{shift_days, DateRange};
use crate::model::employee::EmployeeId;
use crate::model::project::{Project, ProjectId};
use crate::model::snapshot::Snapshot;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `(revenue - cost) / revenue`; undefined for zero or non-finite revenue.
pub fn profit_margin(revenue: f64, cost: f64) -> MetricValue {
    if !revenue.is_finite() || revenue == 0.0 {
        return MetricValue::not_applicable("no revenue");
    }
    if !cost.is_finite() {
        return MetricValue::not_applicable("non-finite cost");
    }
    MetricValue::Value((revenue - cost) / revenue)
}

/// Labor cost of one employee on one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeCost {
    pub employee_id: EmployeeId,
    pub name: String,
    pub hours: f64,
    pub rate: f64,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCost {
    pub category: String,
    pub amount: f64,
}

/// Ledger cost of one project with labor and expense breakdowns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectCosts {
    pub project_id: ProjectId,
    pub hours: f64,
    pub labor_cost: f64,
    pub expense_cost: f64,
    pub total_cost: f64,
    pub projected_hours: f64,
    pub projected_cost: f64,
    pub by_employee: Vec<EmployeeCost>,
    pub by_category: Vec<CategoryCost>,
}

/// Prices the ledger rows of `project_id` dated inside `window` (all rows
/// when `window` is `None`).
pub fn project_costs(
    snapshot: &Snapshot,
    project_id: ProjectId,
    window: Option<DateRange>,
) -> ProjectCosts {
    let in_window = |date: NaiveDate| window.map_or(true, |range| range.contains(date));

    let mut per_employee: BTreeMap<EmployeeId, (f64, f64)> = BTreeMap::new();
    let mut projected_hours = 0.0;
    let mut projected_cost = 0.0;
    for entry in snapshot
        .time_entries
        .iter()
        .filter(|entry| entry.project_id == project_id && in_window(entry.date))
    {
        let rate = snapshot
            .effective_rate(project_id, entry.employee_id)
            .unwrap_or(0.0);
        if entry.projected {
            projected_hours += entry.hours;
            projected_cost += entry.hours * rate;
            continue;
        }
        let slot = per_employee.entry(entry.employee_id).or_insert((0.0, rate));
        slot.0 += entry.hours;
    }

    let mut by_employee: Vec<EmployeeCost> = per_employee
        .into_iter()
        .map(|(employee_id, (hours, rate))| EmployeeCost {
            employee_id,
            name: snapshot
                .employee(employee_id)
                .map(|employee| employee.name.clone())
                .unwrap_or_default(),
            hours,
            rate,
            cost: hours * rate,
        })
        .collect();
    by_employee.sort_by(|a, b| a.name.cmp(&b.name).then(a.employee_id.cmp(&b.employee_id)));

    let mut per_category: BTreeMap<String, f64> = BTreeMap::new();
    for expense in snapshot
        .expenses
        .iter()
        .filter(|expense| expense.project_id == project_id && in_window(expense.date))
    {
        *per_category.entry(expense.category.clone()).or_insert(0.0) += expense.amount;
    }
    let by_category: Vec<CategoryCost> = per_category
        .into_iter()
        .map(|(category, amount)| CategoryCost { category, amount })
        .collect();

    let hours = by_employee.iter().map(|row| row.hours).sum();
    let labor_cost: f64 = by_employee.iter().map(|row| row.cost).sum();
    let expense_cost: f64 = by_category.iter().map(|row| row.amount).sum();

    ProjectCosts {
        project_id,
        hours,
        labor_cost,
        expense_cost,
        total_cost: labor_cost + expense_cost,
        projected_hours,
        projected_cost,
        by_employee,
        by_category,
    }
}

/// Ledger cost of a project up to and including `as_of`.
///
/// Returns `None` when the project has no actual ledger rows at all.
pub fn ledger_cost(snapshot: &Snapshot, project_id: ProjectId, as_of: NaiveDate) -> Option<f64> {
    let has_rows = snapshot
        .time_entries
        .iter()
        .any(|entry| entry.project_id == project_id && !entry.projected)
        || snapshot
            .expenses
            .iter()
            .any(|expense| expense.project_id == project_id);
    if !has_rows {
        return None;
    }

    let earliest = NaiveDate::MIN;
    let window = DateRange::new(earliest, as_of);
    Some(project_costs(snapshot, project_id, window).total_cost)
}

/// One bucket of a burn-rate series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BurnPoint {
    pub label: String,
    pub range: DateRange,
    pub labor_cost: f64,
    pub expense_cost: f64,
    pub total_cost: f64,
    pub cumulative_cost: f64,
    /// Planned labor in the bucket; not part of `total_cost`.
    pub projected_cost: f64,
}

/// Cost per period over `ctx.period`, for one project or the whole snapshot.
pub fn burn_rate_series(
    snapshot: &Snapshot,
    project_id: Option<ProjectId>,
    ctx: &MetricContext<'_>,
) -> Vec<BurnPoint> {
    let project_ids: Vec<ProjectId> = match project_id {
        Some(id) => vec![id],
        None => snapshot.projects.iter().map(|project| project.id).collect(),
    };

    let mut cumulative = 0.0;
    ctx.granularity
        .buckets(ctx.period)
        .into_iter()
        .map(|period| {
            let (labor_cost, expense_cost, projected_cost) = project_ids.iter().fold(
                (0.0, 0.0, 0.0),
                |(labor, expense, projected), id| {
                    let costs = project_costs(snapshot, *id, Some(period.range));
                    (
                        labor + costs.labor_cost,
                        expense + costs.expense_cost,
                        projected + costs.projected_cost,
                    )
                },
            );
            let total_cost = labor_cost + expense_cost;
            cumulative += total_cost;
            BurnPoint {
                label: period.label,
                range: period.range,
                labor_cost,
                expense_cost,
                total_cost,
                cumulative_cost: cumulative,
                projected_cost,
            }
        })
        .collect()
}

/// Cost per elapsed period.
pub fn average_burn_rate(cumulative_cost: f64, elapsed_periods: f64) -> MetricValue {
    if !elapsed_periods.is_finite() || elapsed_periods <= 0.0 {
        return MetricValue::not_applicable("no period has elapsed");
    }
    MetricValue::ratio(cumulative_cost, elapsed_periods, "no period has elapsed")
}

/// Fractional number of `granularity` periods between `start` and `as_of`.
pub fn elapsed_periods(start: NaiveDate, as_of: NaiveDate, granularity: Granularity) -> f64 {
    let days = (as_of - start).num_days();
    if days <= 0 {
        return 0.0;
    }
    days as f64 / granularity.nominal_days()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetHealth {
    Healthy,
    Warning,
    Critical,
}

impl BudgetHealth {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }

    /// Classifies projected final spend (percent of budget).
    ///
    /// Healthy inside `[90 - t, 100 + t]`, warning inside
    /// `[80 - t, 100 + 1.5t]`, critical otherwise.
    pub fn classify(projected_percent: f64, tolerance: f64) -> Self {
        if (90.0 - tolerance..=100.0 + tolerance).contains(&projected_percent) {
            Self::Healthy
        } else if (80.0 - tolerance..=100.0 + tolerance * 1.5).contains(&projected_percent) {
            Self::Warning
        } else {
            Self::Critical
        }
    }
}

/// Spend to date and projected final spend against a project budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetAnalysis {
    pub project_id: ProjectId,
    pub budget: f64,
    pub spent: f64,
    /// Labor still expected from current allocations after `as_of`.
    pub remaining_allocated_cost: f64,
    /// Projected time entries dated after `as_of`, priced.
    pub remaining_planned_cost: f64,
    /// `spent` plus planned cost when any is recorded, else allocated cost.
    pub projected_spend: f64,
    pub spent_percent: MetricValue,
    pub projected_percent: MetricValue,
    pub timeline_elapsed_percent: MetricValue,
    pub tolerance_percent: f64,
    /// `None` when the project has no budget to measure against.
    pub status: Option<BudgetHealth>,
}

/// Budget status of one project as of `ctx.as_of`.
pub fn budget_analysis(
    snapshot: &Snapshot,
    project: &Project,
    ctx: &MetricContext<'_>,
) -> BudgetAnalysis {
    let spent = ledger_cost(snapshot, project.id, ctx.as_of).unwrap_or(project.budget_used);
    let remaining_allocated_cost = remaining_allocated_cost(snapshot, project, ctx);
    let remaining_planned_cost = shift_days(ctx.as_of, 1)
        .and_then(|tomorrow| DateRange::new(tomorrow, NaiveDate::MAX))
        .map_or(0.0, |after| {
            project_costs(snapshot, project.id, Some(after)).projected_cost
        });
    let projected_spend = if remaining_planned_cost > 0.0 {
        spent + remaining_planned_cost
    } else {
        spent + remaining_allocated_cost
    };
    let budget = project.budget_allocated;

    let spent_percent = MetricValue::ratio(spent * 100.0, budget, "no budget allocated");
    let projected_percent =
        MetricValue::ratio(projected_spend * 100.0, budget, "no budget allocated");
    let tolerance_percent = ctx.config.tolerance_for(budget);
    let status = projected_percent
        .value()
        .map(|percent| BudgetHealth::classify(percent, tolerance_percent));

    BudgetAnalysis {
        project_id: project.id,
        budget,
        spent,
        remaining_allocated_cost,
        remaining_planned_cost,
        projected_spend,
        spent_percent,
        projected_percent,
        timeline_elapsed_percent: schedule_elapsed(project, ctx.as_of).map(|fraction| fraction * 100.0),
        tolerance_percent,
        status,
    }
}

/// Future labor implied by allocations: remaining working days after `as_of`
/// within each allocation window (falling back to the project window),
/// times standard daily hours, employee fte, allocation share and rate.
fn remaining_allocated_cost(
    snapshot: &Snapshot,
    project: &Project,
    ctx: &MetricContext<'_>,
) -> f64 {
    let Some(tomorrow) = shift_days(ctx.as_of, 1) else {
        return 0.0;
    };

    snapshot
        .allocations
        .iter()
        .filter(|allocation| allocation.project_id == project.id)
        .filter_map(|allocation| {
            let employee = snapshot.employee(allocation.employee_id)?;
            let start = allocation.start_date.or(project.start_date)?;
            let end = allocation.end_date.or(project.end_date)?;
            let remaining = DateRange::new(start.max(tomorrow), end)?;
            let rate = allocation.project_rate.unwrap_or(employee.hourly_rate);
            let hours = working_days(remaining, ctx.config)
                * ctx.config.hours_per_working_day
                * employee.fte
                * allocation.fte_share();
            Some(hours * rate)
        })
        .sum()
}
