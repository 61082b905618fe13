//! Linear completion forecast.

use crate::metrics::financial::{average_burn_rate, elapsed_periods, ledger_cost};
use crate::metrics::{MetricContext, MetricValue};
use crate::model::date::shift_days;
use crate::model::project::{Project, ProjectId};
use crate::model::snapshot::Snapshot;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionForecast {
    pub project_id: ProjectId,
    pub cost_to_date: f64,
    pub remaining_budget: f64,
    /// Cost per `ctx.granularity` period.
    pub average_burn_rate: MetricValue,
    pub remaining_periods: MetricValue,
    pub estimated_completion: Option<NaiveDate>,
    /// Whether the estimate lands on or before `end_date`.
    pub on_track: Option<bool>,
}

/// Extrapolates `remaining_budget / average_burn_rate` periods past `as_of`.
///
/// Cost to date is ledger cost through `as_of`, or the stored `budget_used`
/// when the project has no ledger rows.
pub fn completion_forecast(
    snapshot: &Snapshot,
    project: &Project,
    ctx: &MetricContext<'_>,
) -> CompletionForecast {
    let cost_to_date = ledger_cost(snapshot, project.id, ctx.as_of).unwrap_or(project.budget_used);
    let remaining_budget = (project.budget_allocated - cost_to_date).max(0.0);

    let average = match project.start_date {
        None => MetricValue::not_applicable("project has no start date"),
        Some(start) if ctx.as_of <= start => MetricValue::not_applicable("project has not started"),
        Some(start) => average_burn_rate(
            cost_to_date,
            elapsed_periods(start, ctx.as_of, ctx.granularity),
        ),
    };

    let remaining_periods = match average.value() {
        Some(rate) if rate > 0.0 => MetricValue::Value(remaining_budget / rate),
        Some(_) => MetricValue::not_applicable("no spend to extrapolate"),
        None => average.clone(),
    };

    let estimated_completion = remaining_periods.value().and_then(|periods| {
        let days = (periods * ctx.granularity.nominal_days()).ceil();
        if days.is_finite() && days <= i64::MAX as f64 {
            shift_days(ctx.as_of, days as i64)
        } else {
            None
        }
    });
    let on_track = estimated_completion
        .zip(project.end_date)
        .map(|(estimate, end)| estimate <= end);

    CompletionForecast {
        project_id: project.id,
        cost_to_date,
        remaining_budget,
        average_burn_rate: average,
        remaining_periods,
        estimated_completion,
        on_track,
    }
}

#[cfg(test)]
mod tests {
    use super::completion_forecast;
    use crate::config::MetricConfig;
    use crate::metrics::period::Granularity;
    use crate::metrics::{MetricContext, MetricValue};
    use crate::model::date::DateRange;
    use crate::model::project::{Project, ProjectStatus};
    use crate::model::snapshot::Snapshot;
    use chrono::NaiveDate;

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn context(config: &MetricConfig, as_of: NaiveDate) -> MetricContext<'_> {
        MetricContext::new(as_of, DateRange::new(day(1, 1), day(12, 31)).unwrap(), config)
            .with_granularity(Granularity::Weekly)
    }

    #[test]
    fn extrapolates_from_stored_spend() {
        let mut project = Project::new("Orion", ProjectStatus::Active);
        project.budget_allocated = 10_000.0;
        project.budget_used = 4_000.0;
        project.start_date = Some(day(1, 1));
        project.end_date = Some(day(3, 31));
        let snapshot = Snapshot {
            projects: vec![project.clone()],
            ..Snapshot::default()
        };
        let config = MetricConfig::default();

        // Four weeks elapsed at 1000 per week leaves six weeks.
        let forecast = completion_forecast(&snapshot, &project, &context(&config, day(1, 29)));
        assert_eq!(forecast.average_burn_rate, MetricValue::Value(1000.0));
        assert_eq!(forecast.remaining_periods, MetricValue::Value(6.0));
        assert_eq!(forecast.estimated_completion, Some(day(3, 11)));
        assert_eq!(forecast.on_track, Some(true));
    }

    #[test]
    fn undefined_without_spend_or_start() {
        let config = MetricConfig::default();
        let mut project = Project::new("Idle", ProjectStatus::Planned);
        project.budget_allocated = 5_000.0;
        let snapshot = Snapshot::default();

        let undated = completion_forecast(&snapshot, &project, &context(&config, day(6, 1)));
        assert!(!undated.remaining_periods.is_applicable());
        assert_eq!(undated.estimated_completion, None);

        project.start_date = Some(day(1, 1));
        let idle = completion_forecast(&snapshot, &project, &context(&config, day(6, 1)));
        assert!(!idle.remaining_periods.is_applicable());

        project.start_date = Some(day(7, 1));
        let future = completion_forecast(&snapshot, &project, &context(&config, day(6, 1)));
        assert!(!future.average_burn_rate.is_applicable());
    }
}
