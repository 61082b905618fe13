//! Named report building blocks shared by built-in and custom reports.
//!
//! Every identifier a caller can request lives here with its stable text
//! form; built-in reports are fixed lists of the same identifiers.

use crate::metrics::{
    budget_analysis, completion_forecast, health_score, portfolio_metrics, project_costs,
    project_margin, BudgetAnalysis, CompletionForecast, EmployeeUtilization, HealthScore,
    MetricContext, MetricValue, PortfolioMetrics, ProjectCosts,
};
use crate::model::project::Project;
use crate::model::snapshot::Snapshot;
use crate::report::{Cell, CustomReportSpec, ReportError};
use std::str::FromStr;

macro_rules! identifier_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                let normalized = value.trim().to_ascii_lowercase();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|candidate| candidate.as_str() == normalized)
                    .ok_or_else(|| value.trim().to_string())
            }
        }
    };
}

identifier_enum! {
    /// Portfolio-level headline metrics.
    MetricId {
        ProjectCount => "project_count",
        ActiveProjects => "active_projects",
        TotalBudget => "total_budget",
        TotalRevenue => "total_revenue",
        TotalCost => "total_cost",
        NetProfit => "net_profit",
        ProfitMargin => "profit_margin",
        AverageHealth => "average_health",
        AverageUtilization => "average_utilization",
        Headcount => "headcount",
        TotalFte => "total_fte",
        CapacityHours => "capacity_hours",
        MonthlyLaborCost => "monthly_labor_cost",
        PeriodLaborCost => "period_labor_cost",
        PeriodExpenseCost => "period_expense_cost",
        PeriodCost => "period_cost",
        OverAllocatedEmployees => "over_allocated_employees",
    }
}

identifier_enum! {
    /// Columns of the per-project table.
    ProjectColumn {
        Name => "name",
        Status => "status",
        Client => "client",
        ProjectManager => "project_manager",
        StartDate => "start_date",
        EndDate => "end_date",
        BudgetAllocated => "budget_allocated",
        BudgetUsed => "budget_used",
        BudgetVariance => "budget_variance",
        RevenueProjected => "revenue_projected",
        RevenueActual => "revenue_actual",
        HealthScore => "health_score",
        BudgetAdherence => "budget_adherence",
        ScheduleAdherence => "schedule_adherence",
        ProfitMargin => "profit_margin",
        Hours => "hours",
        LaborCost => "labor_cost",
        ExpenseCost => "expense_cost",
        TotalCost => "total_cost",
        BudgetStatus => "budget_status",
        EstimatedCompletion => "estimated_completion",
        OnTrack => "on_track",
    }
}

identifier_enum! {
    /// Period or per-entity series.
    SeriesId {
        BurnRate => "burn_rate",
        CumulativeCost => "cumulative_cost",
        ProjectedBurn => "projected_burn",
        Health => "health",
        Utilization => "utilization",
        FteRequirements => "fte_requirements",
    }
}

/// Portfolio figures that headline metrics are read from.
pub(crate) struct Overview {
    pub portfolio: PortfolioMetrics,
    pub period_labor_cost: f64,
    pub period_expense_cost: f64,
    pub over_allocated: usize,
}

impl Overview {
    pub fn compute(
        snapshot: &Snapshot,
        utilization: &[EmployeeUtilization],
        ctx: &MetricContext<'_>,
    ) -> Self {
        let (period_labor_cost, period_expense_cost) =
            snapshot
                .projects
                .iter()
                .fold((0.0, 0.0), |(labor, expense), project| {
                    let costs = project_costs(snapshot, project.id, Some(ctx.period));
                    (labor + costs.labor_cost, expense + costs.expense_cost)
                });

        Self {
            portfolio: portfolio_metrics(snapshot, ctx),
            period_labor_cost,
            period_expense_cost,
            over_allocated: utilization.iter().filter(|row| row.over_allocated).count(),
        }
    }
}

impl MetricId {
    pub(crate) fn evaluate(self, overview: &Overview) -> MetricValue {
        let portfolio = &overview.portfolio;
        match self {
            Self::ProjectCount => MetricValue::Value(portfolio.project_count as f64),
            Self::ActiveProjects => MetricValue::Value(portfolio.active_projects as f64),
            Self::TotalBudget => MetricValue::Value(portfolio.total_budget),
            Self::TotalRevenue => MetricValue::Value(portfolio.total_revenue),
            Self::TotalCost => MetricValue::Value(portfolio.total_cost),
            Self::NetProfit => MetricValue::Value(portfolio.net_profit),
            Self::ProfitMargin => portfolio.margin.clone(),
            Self::AverageHealth => portfolio.average_health.clone(),
            Self::AverageUtilization => portfolio.average_utilization.clone(),
            Self::Headcount => MetricValue::Value(portfolio.headcount as f64),
            Self::TotalFte => MetricValue::Value(portfolio.total_fte),
            Self::CapacityHours => MetricValue::Value(portfolio.capacity_hours),
            Self::MonthlyLaborCost => MetricValue::Value(portfolio.monthly_labor_cost),
            Self::PeriodLaborCost => MetricValue::Value(overview.period_labor_cost),
            Self::PeriodExpenseCost => MetricValue::Value(overview.period_expense_cost),
            Self::PeriodCost => {
                MetricValue::Value(overview.period_labor_cost + overview.period_expense_cost)
            }
            Self::OverAllocatedEmployees => MetricValue::Value(overview.over_allocated as f64),
        }
    }
}

/// All calculator output for one project.
pub(crate) struct ProjectFigures {
    pub project: Project,
    pub health: HealthScore,
    pub margin: MetricValue,
    /// Ledger costs inside the reporting period.
    pub costs: ProjectCosts,
    pub budget: BudgetAnalysis,
    pub forecast: CompletionForecast,
}

impl ProjectFigures {
    pub fn compute(snapshot: &Snapshot, project: &Project, ctx: &MetricContext<'_>) -> Self {
        Self {
            project: project.clone(),
            health: health_score(project, ctx),
            margin: project_margin(project),
            costs: project_costs(snapshot, project.id, Some(ctx.period)),
            budget: budget_analysis(snapshot, project, ctx),
            forecast: completion_forecast(snapshot, project, ctx),
        }
    }

    pub fn compute_all(snapshot: &Snapshot, ctx: &MetricContext<'_>) -> Vec<Self> {
        snapshot
            .projects
            .iter()
            .map(|project| Self::compute(snapshot, project, ctx))
            .collect()
    }
}

impl ProjectColumn {
    pub(crate) fn cell(self, figures: &ProjectFigures) -> Cell {
        let project = &figures.project;
        match self {
            Self::Name => Cell::Text(project.name.clone()),
            Self::Status => Cell::Text(project.status.as_str().to_string()),
            Self::Client => Cell::Text(project.client.clone()),
            Self::ProjectManager => Cell::Text(project.project_manager.clone()),
            Self::StartDate => Cell::Date(project.start_date),
            Self::EndDate => Cell::Date(project.end_date),
            Self::BudgetAllocated => Cell::Number(project.budget_allocated),
            Self::BudgetUsed => Cell::Number(project.budget_used),
            Self::BudgetVariance => Cell::Number(project.budget_variance()),
            Self::RevenueProjected => Cell::Number(project.revenue_projected),
            Self::RevenueActual => Cell::Number(project.revenue_actual),
            Self::HealthScore => Cell::Number(figures.health.score),
            Self::BudgetAdherence => Cell::Metric(figures.health.budget_adherence.clone()),
            Self::ScheduleAdherence => Cell::Metric(figures.health.schedule_adherence.clone()),
            Self::ProfitMargin => Cell::Metric(figures.margin.clone()),
            Self::Hours => Cell::Number(figures.costs.hours),
            Self::LaborCost => Cell::Number(figures.costs.labor_cost),
            Self::ExpenseCost => Cell::Number(figures.costs.expense_cost),
            Self::TotalCost => Cell::Number(figures.costs.total_cost),
            Self::BudgetStatus => Cell::Text(
                figures
                    .budget
                    .status
                    .map_or("N/A", |status| status.as_str())
                    .to_string(),
            ),
            Self::EstimatedCompletion => Cell::Date(figures.forecast.estimated_completion),
            Self::OnTrack => match figures.forecast.on_track {
                Some(value) => Cell::Bool(value),
                None => Cell::Metric(MetricValue::not_applicable("no forecast")),
            },
        }
    }
}

/// Parsed content of a custom report.
pub(crate) struct CustomSelection {
    pub metrics: Vec<MetricId>,
    pub project_columns: Vec<ProjectColumn>,
    pub series: Vec<SeriesId>,
}

impl CustomSelection {
    /// Parses every identifier; fails with all unknown ones at once.
    pub fn parse(spec: &CustomReportSpec) -> Result<Self, ReportError> {
        let mut unknown = Vec::new();
        let metrics = parse_all::<MetricId>(&spec.metrics, &mut unknown);
        let project_columns = parse_all::<ProjectColumn>(&spec.project_columns, &mut unknown);
        let series = parse_all::<SeriesId>(&spec.series, &mut unknown);

        if !unknown.is_empty() {
            return Err(ReportError::MalformedInput {
                identifiers: unknown,
            });
        }
        if metrics.is_empty() && project_columns.is_empty() && series.is_empty() {
            return Err(ReportError::EmptyCustomReport);
        }
        Ok(Self {
            metrics,
            project_columns,
            series,
        })
    }
}

fn parse_all<T: FromStr<Err = String>>(values: &[String], unknown: &mut Vec<String>) -> Vec<T> {
    values
        .iter()
        .filter_map(|value| match value.parse::<T>() {
            Ok(parsed) => Some(parsed),
            Err(identifier) => {
                unknown.push(identifier);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{CustomSelection, MetricId, ProjectColumn, SeriesId};
    use crate::report::{CustomReportSpec, ReportError};

    #[test]
    fn identifiers_round_trip_through_text() {
        for id in MetricId::ALL {
            assert_eq!(id.as_str().parse::<MetricId>(), Ok(*id));
        }
        for column in ProjectColumn::ALL {
            assert_eq!(column.as_str().parse::<ProjectColumn>(), Ok(*column));
        }
        assert_eq!(" Burn_Rate ".parse::<SeriesId>(), Ok(SeriesId::BurnRate));
    }

    #[test]
    fn every_unknown_identifier_is_reported() {
        let spec = CustomReportSpec {
            metrics: vec!["total_revenue".into(), "nonexistent_metric".into()],
            project_columns: vec!["name".into(), "colour".into()],
            series: vec![],
        };
        let err = CustomSelection::parse(&spec).err().expect("must fail");
        assert_eq!(
            err,
            ReportError::MalformedInput {
                identifiers: vec!["nonexistent_metric".into(), "colour".into()]
            }
        );
    }

    #[test]
    fn empty_custom_report_is_rejected() {
        let err = CustomSelection::parse(&CustomReportSpec::default()).err();
        assert_eq!(err, Some(ReportError::EmptyCustomReport));
    }
}
