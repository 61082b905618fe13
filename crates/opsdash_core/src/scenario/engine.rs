//! Adjustment application and baseline/adjusted comparison.

use crate::logging::timed;
use crate::metrics::{
    budget_analysis, health_score, portfolio_metrics, project_costs, project_margin,
    MetricContext, MetricValue, PortfolioMetrics,
};
use crate::model::date::shift_days;
use crate::model::project::{Project, ProjectId};
use crate::model::snapshot::Snapshot;
use crate::scenario::{Adjustment, NamedAdjustment, ScenarioError};
use serde::Serialize;

/// Baseline vs adjusted value of one metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricDelta {
    pub metric: String,
    pub baseline: MetricValue,
    pub adjusted: MetricValue,
    pub absolute: MetricValue,
    /// Change relative to the baseline, in percent; undefined for a zero baseline.
    pub percent: MetricValue,
}

impl MetricDelta {
    pub fn between(metric: &str, baseline: MetricValue, adjusted: MetricValue) -> Self {
        let (absolute, percent) = match (baseline.value(), adjusted.value()) {
            (Some(before), Some(after)) => {
                let change = after - before;
                (
                    MetricValue::Value(change),
                    MetricValue::ratio(change * 100.0, before.abs(), "baseline is zero"),
                )
            }
            _ => (
                MetricValue::not_applicable("metric undefined on one side"),
                MetricValue::not_applicable("metric undefined on one side"),
            ),
        };
        Self {
            metric: metric.to_string(),
            baseline,
            adjusted,
            absolute,
            percent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectDelta {
    pub project_id: ProjectId,
    pub name: String,
    pub deltas: Vec<MetricDelta>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioOutcome {
    /// Adjustment names in application order.
    pub applied: Vec<String>,
    pub adjusted: Snapshot,
    pub portfolio: Vec<MetricDelta>,
    pub projects: Vec<ProjectDelta>,
}

impl ScenarioOutcome {
    pub fn portfolio_delta(&self, metric: &str) -> Option<&MetricDelta> {
        self.portfolio.iter().find(|delta| delta.metric == metric)
    }
}

/// Applies `adjustments` to `baseline` and compares the two.
pub fn run_scenario(
    baseline: &Snapshot,
    adjustments: &[NamedAdjustment],
    ctx: &MetricContext<'_>,
) -> Result<ScenarioOutcome, ScenarioError> {
    let fields = format!("adjustments={}", adjustments.len());
    timed("scenario_run", "scenario", &fields, || {
        let adjusted = apply_adjustments(baseline, adjustments)?;
        let portfolio = portfolio_deltas(baseline, &adjusted, ctx);
        let projects = baseline
            .projects
            .iter()
            .filter_map(|before| {
                let after = adjusted.project(before.id)?;
                Some(ProjectDelta {
                    project_id: before.id,
                    name: before.name.clone(),
                    deltas: project_deltas(baseline, before, &adjusted, after, ctx),
                })
            })
            .collect();

        Ok(ScenarioOutcome {
            applied: adjustments.iter().map(|named| named.name.clone()).collect(),
            adjusted,
            portfolio,
            projects,
        })
    })
}

/// Returns an adjusted copy of `baseline`; validates every adjustment first.
pub fn apply_adjustments(
    baseline: &Snapshot,
    adjustments: &[NamedAdjustment],
) -> Result<Snapshot, ScenarioError> {
    for named in adjustments {
        validate(baseline, named)?;
    }

    let mut adjusted = baseline.clone();
    for named in adjustments {
        apply(&mut adjusted, &named.adjustment);
    }
    Ok(adjusted)
}

fn validate(baseline: &Snapshot, named: &NamedAdjustment) -> Result<(), ScenarioError> {
    let invalid = |message: String| ScenarioError::InvalidAdjustment {
        adjustment: named.name.clone(),
        message,
    };

    match &named.adjustment {
        Adjustment::CostMultiplier(factor) => {
            if !factor.is_finite() || *factor < 0.0 {
                return Err(invalid(format!(
                    "cost multiplier must be finite and non-negative, got {factor}"
                )));
            }
        }
        Adjustment::FteDelta(deltas) => {
            for (id, delta) in deltas {
                if baseline.employee(*id).is_none() {
                    return Err(ScenarioError::UnknownEmployee {
                        adjustment: named.name.clone(),
                        id: *id,
                    });
                }
                if !delta.is_finite() {
                    return Err(invalid(format!("fte delta for {id} is not finite")));
                }
            }
        }
        Adjustment::RevenueGrowthRate { rate, .. } => {
            if !rate.is_finite() || *rate < -1.0 {
                return Err(invalid(format!(
                    "revenue growth rate must be finite and at least -1, got {rate}"
                )));
            }
        }
        Adjustment::ScheduleShiftDays(shifts) => {
            for (id, days) in shifts {
                let Some(project) = baseline.project(*id) else {
                    return Err(ScenarioError::UnknownProject {
                        adjustment: named.name.clone(),
                        id: *id,
                    });
                };
                if let Some(end) = project.end_date {
                    if shift_days(end, *days).is_none() {
                        return Err(invalid(format!("shift of {days} days overflows the calendar")));
                    }
                }
            }
        }
    }
    Ok(())
}

fn apply(snapshot: &mut Snapshot, adjustment: &Adjustment) {
    match adjustment {
        Adjustment::CostMultiplier(factor) => {
            for project in &mut snapshot.projects {
                project.budget_used *= factor;
            }
            for expense in &mut snapshot.expenses {
                expense.amount *= factor;
            }
            for employee in &mut snapshot.employees {
                employee.hourly_rate *= factor;
            }
            for allocation in &mut snapshot.allocations {
                if let Some(rate) = allocation.project_rate.as_mut() {
                    *rate *= factor;
                }
            }
        }
        Adjustment::FteDelta(deltas) => {
            for employee in &mut snapshot.employees {
                if let Some(delta) = deltas.get(&employee.id) {
                    employee.fte = (employee.fte + delta).clamp(0.0, 1.0);
                }
            }
        }
        Adjustment::RevenueGrowthRate { rate, periods } => {
            let factor = (1.0 + rate).powi(i32::try_from(*periods).unwrap_or(i32::MAX));
            for project in &mut snapshot.projects {
                project.revenue_actual *= factor;
                project.revenue_projected *= factor;
            }
        }
        Adjustment::ScheduleShiftDays(shifts) => {
            for project in &mut snapshot.projects {
                let Some(days) = shifts.get(&project.id) else {
                    continue;
                };
                let Some(shifted) = project.end_date.and_then(|end| shift_days(end, *days)) else {
                    continue;
                };
                // The window never inverts.
                project.end_date = Some(project.start_date.map_or(shifted, |start| shifted.max(start)));
            }
        }
    }
}

fn portfolio_deltas(
    baseline: &Snapshot,
    adjusted: &Snapshot,
    ctx: &MetricContext<'_>,
) -> Vec<MetricDelta> {
    let before = portfolio_metrics(baseline, ctx);
    let after = portfolio_metrics(adjusted, ctx);

    let numeric: [(&str, fn(&PortfolioMetrics) -> f64); 6] = [
        ("total_revenue", |m| m.total_revenue),
        ("total_cost", |m| m.total_cost),
        ("net_profit", |m| m.net_profit),
        ("total_fte", |m| m.total_fte),
        ("capacity_hours", |m| m.capacity_hours),
        ("monthly_labor_cost", |m| m.monthly_labor_cost),
    ];
    let mut deltas: Vec<MetricDelta> = numeric
        .iter()
        .map(|(name, read)| {
            MetricDelta::between(
                name,
                MetricValue::Value(read(&before)),
                MetricValue::Value(read(&after)),
            )
        })
        .collect();

    deltas.push(MetricDelta::between(
        "profit_margin",
        before.margin,
        after.margin,
    ));
    deltas.push(MetricDelta::between(
        "average_health",
        before.average_health,
        after.average_health,
    ));
    deltas.push(MetricDelta::between(
        "average_utilization",
        before.average_utilization,
        after.average_utilization,
    ));
    deltas.push(MetricDelta::between(
        "period_cost",
        MetricValue::Value(period_cost(baseline, ctx)),
        MetricValue::Value(period_cost(adjusted, ctx)),
    ));
    deltas
}

fn period_cost(snapshot: &Snapshot, ctx: &MetricContext<'_>) -> f64 {
    snapshot
        .projects
        .iter()
        .map(|project| project_costs(snapshot, project.id, Some(ctx.period)).total_cost)
        .sum()
}

fn project_deltas(
    baseline: &Snapshot,
    before: &Project,
    adjusted: &Snapshot,
    after: &Project,
    ctx: &MetricContext<'_>,
) -> Vec<MetricDelta> {
    let health_before = health_score(before, ctx);
    let health_after = health_score(after, ctx);
    let budget_before = budget_analysis(baseline, before, ctx);
    let budget_after = budget_analysis(adjusted, after, ctx);

    vec![
        MetricDelta::between(
            "revenue_actual",
            MetricValue::Value(before.revenue_actual),
            MetricValue::Value(after.revenue_actual),
        ),
        MetricDelta::between(
            "budget_used",
            MetricValue::Value(before.budget_used),
            MetricValue::Value(after.budget_used),
        ),
        MetricDelta::between("profit_margin", project_margin(before), project_margin(after)),
        MetricDelta::between(
            "health_score",
            MetricValue::Value(health_before.score),
            MetricValue::Value(health_after.score),
        ),
        MetricDelta::between(
            "schedule_adherence",
            health_before.schedule_adherence,
            health_after.schedule_adherence,
        ),
        MetricDelta::between(
            "period_cost",
            MetricValue::Value(project_costs(baseline, before.id, Some(ctx.period)).total_cost),
            MetricValue::Value(project_costs(adjusted, after.id, Some(ctx.period)).total_cost),
        ),
        MetricDelta::between(
            "projected_spend",
            MetricValue::Value(budget_before.projected_spend),
            MetricValue::Value(budget_after.projected_spend),
        ),
    ]
}
