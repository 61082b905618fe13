//! FTE demand per project per period, derived from allocations.

use crate::metrics::MetricContext;
use crate::model::date::DateRange;
use crate::model::project::ProjectId;
use crate::model::snapshot::Snapshot;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FteRequirement {
    pub project_id: ProjectId,
    pub project_name: String,
    pub label: String,
    pub range: DateRange,
    pub fte: f64,
}

/// One row per project and period of `ctx.period`.
///
/// Each allocation contributes `employee fte * allocation share`, weighted by
/// the fraction of the period its window covers. Missing allocation bounds
/// fall back to the project window, then to open-ended.
pub fn fte_requirements(snapshot: &Snapshot, ctx: &MetricContext<'_>) -> Vec<FteRequirement> {
    let periods = ctx.granularity.buckets(ctx.period);
    let mut rows = Vec::with_capacity(periods.len() * snapshot.projects.len());

    for project in &snapshot.projects {
        for period in &periods {
            let fte = snapshot
                .allocations
                .iter()
                .filter(|allocation| allocation.project_id == project.id)
                .filter_map(|allocation| {
                    let employee = snapshot.employee(allocation.employee_id)?;
                    let start = allocation
                        .start_date
                        .or(project.start_date)
                        .unwrap_or(period.range.start);
                    let end = allocation
                        .end_date
                        .or(project.end_date)
                        .unwrap_or(period.range.end);
                    let covered = DateRange::new(start, end)?.intersect(&period.range)?;
                    let coverage = covered.days() as f64 / period.range.days() as f64;
                    Some(employee.fte * allocation.fte_share() * coverage)
                })
                .sum();

            rows.push(FteRequirement {
                project_id: project.id,
                project_name: project.name.clone(),
                label: period.label.clone(),
                range: period.range,
                fte,
            });
        }
    }

    rows
}
