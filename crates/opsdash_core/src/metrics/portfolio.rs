//! Portfolio-level aggregates over a whole snapshot.

use crate::metrics::financial::profit_margin;
use crate::metrics::health::health_score;
use crate::metrics::utilization::{average_utilization, employee_utilization, standard_hours};
use crate::metrics::{mean_of, MetricContext, MetricValue};
use crate::model::project::ProjectStatus;
use crate::model::snapshot::Snapshot;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioMetrics {
    pub project_count: usize,
    pub active_projects: usize,
    pub total_budget: f64,
    pub total_revenue: f64,
    pub total_cost: f64,
    pub net_profit: f64,
    pub margin: MetricValue,
    pub average_health: MetricValue,
    pub average_utilization: MetricValue,
    pub headcount: usize,
    pub total_fte: f64,
    /// Standard hours of the whole team over `ctx.period`.
    pub capacity_hours: f64,
    pub monthly_labor_cost: f64,
}

/// Revenue and cost come from the stored project figures
/// (`revenue_actual`, `budget_used`).
pub fn portfolio_metrics(snapshot: &Snapshot, ctx: &MetricContext<'_>) -> PortfolioMetrics {
    let total_budget: f64 = snapshot.projects.iter().map(|p| p.budget_allocated).sum();
    let total_revenue: f64 = snapshot.projects.iter().map(|p| p.revenue_actual).sum();
    let total_cost: f64 = snapshot.projects.iter().map(|p| p.budget_used).sum();

    let health: Vec<MetricValue> = snapshot
        .projects
        .iter()
        .map(|project| MetricValue::Value(health_score(project, ctx).score))
        .collect();
    let utilization = employee_utilization(snapshot, ctx);

    let total_fte: f64 = snapshot.employees.iter().map(|e| e.fte).sum();
    let period_hours = standard_hours(ctx.period, ctx.config);

    PortfolioMetrics {
        project_count: snapshot.projects.len(),
        active_projects: snapshot
            .projects
            .iter()
            .filter(|project| project.status == ProjectStatus::Active)
            .count(),
        total_budget,
        total_revenue,
        total_cost,
        net_profit: total_revenue - total_cost,
        margin: profit_margin(total_revenue, total_cost),
        average_health: mean_of(&health, "no projects"),
        average_utilization: average_utilization(&utilization),
        headcount: snapshot.employees.len(),
        total_fte,
        capacity_hours: total_fte * period_hours,
        monthly_labor_cost: utilization.iter().map(|row| row.monthly_cost).sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::portfolio_metrics;
    use crate::config::MetricConfig;
    use crate::metrics::{MetricContext, MetricValue};
    use crate::model::date::DateRange;
    use crate::model::employee::{Employee, EmployeeRole};
    use crate::model::project::{Project, ProjectStatus};
    use crate::model::snapshot::Snapshot;
    use chrono::NaiveDate;

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    #[test]
    fn empty_snapshot_is_all_not_applicable() {
        let config = MetricConfig::default();
        let ctx = MetricContext::new(day(7, 1), DateRange::new(day(7, 1), day(7, 31)).unwrap(), &config);
        let metrics = portfolio_metrics(&Snapshot::default(), &ctx);

        assert_eq!(metrics.project_count, 0);
        assert!(!metrics.margin.is_applicable());
        assert!(!metrics.average_health.is_applicable());
        assert!(!metrics.average_utilization.is_applicable());
    }

    #[test]
    fn totals_follow_stored_figures() {
        let mut alpha = Project::new("Alpha", ProjectStatus::Active);
        alpha.revenue_actual = 300.0;
        alpha.budget_used = 200.0;
        let mut beta = Project::new("Beta", ProjectStatus::Completed);
        beta.revenue_actual = 100.0;
        beta.budget_used = 100.0;
        let snapshot = Snapshot {
            projects: vec![alpha, beta],
            employees: vec![Employee::new("Eve", EmployeeRole::DataAnalyst, 50.0)],
            ..Snapshot::default()
        };
        let config = MetricConfig::default();
        // July 2024 has 23 weekdays.
        let ctx = MetricContext::new(day(7, 1), DateRange::new(day(7, 1), day(7, 31)).unwrap(), &config);
        let metrics = portfolio_metrics(&snapshot, &ctx);

        assert_eq!(metrics.active_projects, 1);
        assert_eq!(metrics.net_profit, 100.0);
        assert_eq!(metrics.margin, MetricValue::Value(0.25));
        assert_eq!(metrics.capacity_hours, 23.0 * 8.0);
        assert_eq!(metrics.monthly_labor_cost, 50.0 * 160.0);
        assert_eq!(metrics.average_utilization, MetricValue::Value(0.0));
    }
}
