//! Project health score.
//!
//! # Invariants
//! - The composite score always lies in `[0, 1]`, including over-budget,
//!   overdue and negative-margin projects.
//! - An undefined sub-score is reported as `NotApplicable` and contributes 0.

use crate::config::HealthWeights;
use crate::metrics::financial::profit_margin;
use crate::metrics::{MetricContext, MetricValue};
use crate::model::project::{Project, ProjectId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Health composite with its sub-scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthScore {
    pub project_id: ProjectId,
    /// `max(0, 1 - used / allocated)`.
    pub budget_adherence: MetricValue,
    /// Share of the planned duration already elapsed, in `[0, 1]`.
    pub schedule_elapsed: MetricValue,
    /// `1 - schedule_elapsed`.
    pub schedule_adherence: MetricValue,
    /// Profit margin clamped to `[0, 1]`.
    pub margin: MetricValue,
    pub score: f64,
}

/// Stored-figure margin: `(revenue_actual - budget_used) / revenue_actual`.
pub fn project_margin(project: &Project) -> MetricValue {
    profit_margin(project.revenue_actual, project.budget_used)
}

/// Fraction of `[start_date, end_date]` elapsed at `as_of`, clamped to `[0, 1]`.
pub fn schedule_elapsed(project: &Project, as_of: NaiveDate) -> MetricValue {
    let (Some(start), Some(end)) = (project.start_date, project.end_date) else {
        return MetricValue::not_applicable("project is undated");
    };
    let planned = (end - start).num_days();
    if planned <= 0 {
        return MetricValue::not_applicable("project has no planned duration");
    }
    let elapsed = (as_of - start).num_days() as f64 / planned as f64;
    MetricValue::Value(elapsed.clamp(0.0, 1.0))
}

pub fn health_score(project: &Project, ctx: &MetricContext<'_>) -> HealthScore {
    let budget_adherence = if project.budget_allocated > 0.0 {
        MetricValue::ratio(project.budget_used, project.budget_allocated, "no budget allocated")
            .map(|used| (1.0 - used).max(0.0))
    } else {
        MetricValue::not_applicable("no budget allocated")
    };
    let schedule_elapsed = schedule_elapsed(project, ctx.as_of);
    let schedule_adherence = schedule_elapsed.clone().map(|elapsed| (1.0 - elapsed).max(0.0));
    let margin = project_margin(project).map(|value| value.clamp(0.0, 1.0));

    let score = blend(
        ctx.config.health_weights,
        &budget_adherence,
        &schedule_adherence,
        &margin,
    );

    HealthScore {
        project_id: project.id,
        budget_adherence,
        schedule_elapsed,
        schedule_adherence,
        margin,
        score,
    }
}

fn blend(
    weights: HealthWeights,
    budget: &MetricValue,
    schedule: &MetricValue,
    margin: &MetricValue,
) -> f64 {
    let total = weights.total();
    if !total.is_finite() || total <= 0.0 {
        return 0.0;
    }
    let weighted = weights.budget * budget.value_or(0.0)
        + weights.schedule * schedule.value_or(0.0)
        + weights.margin * margin.value_or(0.0);
    let score = weighted / total;
    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
