//! Report assembly per report kind.

use crate::config::MetricConfig;
use crate::logging::timed;
use crate::metrics::{
    burn_rate_series, employee_utilization, fte_requirements, project_costs, EmployeeUtilization,
    MetricContext, MetricValue,
};
use crate::model::date::DateRange;
use crate::model::project::ProjectId;
use crate::model::snapshot::Snapshot;
use crate::report::catalog::{CustomSelection, Overview, ProjectFigures};
use crate::report::{
    Cell, HeadlineMetric, MetricId, ProjectColumn, Report, ReportError, ReportKind, ReportRequest,
    ReportSection, Series, SeriesId, SeriesPoint, Table,
};
use std::collections::BTreeMap;

const EXECUTIVE_METRICS: &[MetricId] = &[
    MetricId::TotalRevenue,
    MetricId::TotalCost,
    MetricId::NetProfit,
    MetricId::ProfitMargin,
    MetricId::ActiveProjects,
    MetricId::AverageHealth,
    MetricId::AverageUtilization,
    MetricId::Headcount,
];

const EXECUTIVE_COLUMNS: &[ProjectColumn] = &[
    ProjectColumn::Name,
    ProjectColumn::Status,
    ProjectColumn::Client,
    ProjectColumn::BudgetAllocated,
    ProjectColumn::BudgetUsed,
    ProjectColumn::BudgetVariance,
    ProjectColumn::RevenueActual,
    ProjectColumn::ProfitMargin,
    ProjectColumn::HealthScore,
];

const FINANCIAL_METRICS: &[MetricId] = &[
    MetricId::TotalBudget,
    MetricId::TotalRevenue,
    MetricId::TotalCost,
    MetricId::NetProfit,
    MetricId::ProfitMargin,
    MetricId::PeriodLaborCost,
    MetricId::PeriodExpenseCost,
    MetricId::PeriodCost,
];

const FINANCIAL_COLUMNS: &[ProjectColumn] = &[
    ProjectColumn::Name,
    ProjectColumn::BudgetAllocated,
    ProjectColumn::BudgetUsed,
    ProjectColumn::RevenueProjected,
    ProjectColumn::RevenueActual,
    ProjectColumn::LaborCost,
    ProjectColumn::ExpenseCost,
    ProjectColumn::ProfitMargin,
    ProjectColumn::BudgetStatus,
];

const RESOURCE_METRICS: &[MetricId] = &[
    MetricId::Headcount,
    MetricId::TotalFte,
    MetricId::CapacityHours,
    MetricId::AverageUtilization,
    MetricId::OverAllocatedEmployees,
    MetricId::MonthlyLaborCost,
];

const EMPLOYEE_COLUMNS: &[&str] = &[
    "name",
    "department",
    "role",
    "fte",
    "hours",
    "billable_hours",
    "capacity_hours",
    "utilization",
    "display_utilization",
    "billable_rate",
    "allocation_percent",
    "over_allocated",
    "monthly_cost",
    "revenue_generated",
];

/// Builds the requested report over `snapshot` restricted to the request filter.
///
/// Ledger rows dated before the filter's date range still feed cost to date,
/// budget status and forecasts; period sections only read the reporting
/// period.
pub fn build_report(
    snapshot: &Snapshot,
    request: &ReportRequest,
    config: &MetricConfig,
) -> Result<Report, ReportError> {
    let fields = format!("kind={}", request.kind.name());
    timed("report_build", "report", &fields, || {
        build_report_inner(snapshot, request, config)
    })
}

fn build_report_inner(
    snapshot: &Snapshot,
    request: &ReportRequest,
    config: &MetricConfig,
) -> Result<Report, ReportError> {
    let scoped = snapshot.restrict_with_history(&request.filter);
    let period = reporting_period(request);
    let ctx = MetricContext {
        as_of: request.as_of,
        period,
        granularity: request.granularity.unwrap_or(config.default_granularity),
        config,
    };

    let sections = match &request.kind {
        ReportKind::Executive => executive_sections(&scoped, &ctx),
        ReportKind::Financial => financial_sections(&scoped, &ctx),
        ReportKind::Resource => resource_sections(&scoped, &ctx),
        ReportKind::ProjectStatus(id) => project_status_sections(&scoped, *id, &ctx)?,
        ReportKind::Custom(spec) => custom_sections(&scoped, &CustomSelection::parse(spec)?, &ctx),
    };

    Ok(Report {
        kind: request.kind.name().to_string(),
        as_of: request.as_of,
        period,
        granularity: ctx.granularity,
        sections,
    })
}

fn reporting_period(request: &ReportRequest) -> DateRange {
    request
        .period
        .or(request.filter.date_range)
        .unwrap_or_else(|| DateRange::year_to_date(request.as_of))
}

fn headline_section(name: &str, metrics: &[MetricId], overview: &Overview) -> ReportSection {
    let mut section = ReportSection::new(name);
    section.headline = metrics
        .iter()
        .map(|id| HeadlineMetric {
            id: id.as_str().to_string(),
            value: id.evaluate(overview),
        })
        .collect();
    section
}

fn project_table(figures: &[ProjectFigures], columns: &[ProjectColumn]) -> Table {
    let mut table = Table::new(columns.iter().map(|column| column.as_str()));
    table.rows = figures
        .iter()
        .map(|row| columns.iter().map(|column| column.cell(row)).collect())
        .collect();
    table
}

fn executive_sections(snapshot: &Snapshot, ctx: &MetricContext<'_>) -> Vec<ReportSection> {
    let utilization = employee_utilization(snapshot, ctx);
    let overview = Overview::compute(snapshot, &utilization, ctx);
    let figures = ProjectFigures::compute_all(snapshot, ctx);

    let mut summary = ReportSection::new("project_summary");
    summary.table = project_table(&figures, EXECUTIVE_COLUMNS);

    let mut health = ReportSection::new("project_health");
    health.series.push(health_series(&figures));

    vec![
        headline_section("key_metrics", EXECUTIVE_METRICS, &overview),
        summary,
        health,
    ]
}

fn financial_sections(snapshot: &Snapshot, ctx: &MetricContext<'_>) -> Vec<ReportSection> {
    let utilization = employee_utilization(snapshot, ctx);
    let overview = Overview::compute(snapshot, &utilization, ctx);
    let figures = ProjectFigures::compute_all(snapshot, ctx);

    let mut projects = ReportSection::new("project_financials");
    projects.table = project_table(&figures, FINANCIAL_COLUMNS);

    let mut categories: BTreeMap<String, f64> = BTreeMap::new();
    for row in &figures {
        for category in &row.costs.by_category {
            *categories.entry(category.category.clone()).or_insert(0.0) += category.amount;
        }
    }
    let mut expenses = ReportSection::new("expense_breakdown");
    expenses.table = Table::new(["category", "amount"]);
    expenses.table.rows = categories
        .into_iter()
        .map(|(category, amount)| vec![Cell::Text(category), Cell::Number(amount)])
        .collect();

    let mut burn = ReportSection::new("burn_rate");
    burn.series = burn_series(snapshot, None, ctx);

    vec![
        headline_section("financial_summary", FINANCIAL_METRICS, &overview),
        projects,
        expenses,
        burn,
    ]
}

fn resource_sections(snapshot: &Snapshot, ctx: &MetricContext<'_>) -> Vec<ReportSection> {
    let utilization = employee_utilization(snapshot, ctx);
    let overview = Overview::compute(snapshot, &utilization, ctx);

    let mut detail = ReportSection::new("employee_detail");
    detail.table = employee_table(&utilization);
    detail.series.push(utilization_series(&utilization));

    let mut demand = ReportSection::new("fte_requirements");
    demand.table = Table::new(["project", "period", "fte"]);
    let requirements = fte_requirements(snapshot, ctx);
    demand.table.rows = requirements
        .iter()
        .map(|row| {
            vec![
                Cell::Text(row.project_name.clone()),
                Cell::Text(row.label.clone()),
                Cell::Number(row.fte),
            ]
        })
        .collect();
    demand.series = fte_series(snapshot, ctx);

    vec![
        headline_section("utilization_summary", RESOURCE_METRICS, &overview),
        detail,
        demand,
    ]
}

fn project_status_sections(
    snapshot: &Snapshot,
    project_id: ProjectId,
    ctx: &MetricContext<'_>,
) -> Result<Vec<ReportSection>, ReportError> {
    let project = snapshot
        .project(project_id)
        .ok_or(ReportError::UnknownProject(project_id))?;
    let figures = ProjectFigures::compute(snapshot, project, ctx);

    let mut overview = ReportSection::new("overview");
    overview.headline = vec![
        headline("budget_allocated", MetricValue::Value(project.budget_allocated)),
        headline("budget_used", MetricValue::Value(project.budget_used)),
        headline(
            "budget_progress",
            MetricValue::ratio(project.budget_used, project.budget_allocated, "no budget allocated"),
        ),
        headline(
            "revenue_progress",
            MetricValue::ratio(
                project.revenue_actual,
                project.revenue_projected,
                "no revenue projected",
            ),
        ),
        headline("time_progress", figures.health.schedule_elapsed.clone()),
        headline("health_score", MetricValue::Value(figures.health.score)),
        headline("profit_margin", figures.margin.clone()),
    ];

    let mut budget = ReportSection::new("budget_status");
    budget.headline = vec![
        headline("spent", MetricValue::Value(figures.budget.spent)),
        headline("projected_spend", MetricValue::Value(figures.budget.projected_spend)),
        headline("spent_percent", figures.budget.spent_percent.clone()),
        headline("projected_percent", figures.budget.projected_percent.clone()),
        headline("tolerance_percent", MetricValue::Value(figures.budget.tolerance_percent)),
    ];
    budget.table = project_table(std::slice::from_ref(&figures), &[ProjectColumn::BudgetStatus]);

    let mut forecast = ReportSection::new("forecast");
    forecast.headline = vec![
        headline("cost_to_date", MetricValue::Value(figures.forecast.cost_to_date)),
        headline("remaining_budget", MetricValue::Value(figures.forecast.remaining_budget)),
        headline("average_burn_rate", figures.forecast.average_burn_rate.clone()),
        headline("remaining_periods", figures.forecast.remaining_periods.clone()),
    ];
    forecast.table = project_table(
        std::slice::from_ref(&figures),
        &[
            ProjectColumn::EndDate,
            ProjectColumn::EstimatedCompletion,
            ProjectColumn::OnTrack,
        ],
    );

    let mut team = ReportSection::new("team");
    team.table = Table::new(["name", "role", "allocation_percent", "hours", "rate", "cost"]);
    let all_time = project_costs(snapshot, project_id, None).by_employee;
    for allocation in snapshot
        .allocations
        .iter()
        .filter(|allocation| allocation.project_id == project_id)
    {
        let Some(employee) = snapshot.employee(allocation.employee_id) else {
            continue;
        };
        let logged = all_time
            .iter()
            .find(|row| row.employee_id == employee.id)
            .map_or(0.0, |row| row.hours);
        let rate = allocation.project_rate.unwrap_or(employee.hourly_rate);
        team.table.rows.push(vec![
            Cell::Text(employee.name.clone()),
            Cell::Text(
                allocation
                    .role
                    .clone()
                    .unwrap_or_else(|| employee.role.as_str().to_string()),
            ),
            Cell::Number(allocation.allocation_percent),
            Cell::Number(logged),
            Cell::Number(rate),
            Cell::Number(logged * rate),
        ]);
    }

    let mut burn = ReportSection::new("burn_rate");
    burn.series = burn_series(snapshot, Some(project_id), ctx);

    Ok(vec![overview, budget, forecast, team, burn])
}

fn custom_sections(
    snapshot: &Snapshot,
    selection: &CustomSelection,
    ctx: &MetricContext<'_>,
) -> Vec<ReportSection> {
    let mut sections = Vec::new();

    if !selection.metrics.is_empty() {
        let utilization = employee_utilization(snapshot, ctx);
        let overview = Overview::compute(snapshot, &utilization, ctx);
        sections.push(headline_section("metrics", &selection.metrics, &overview));
    }

    if !selection.project_columns.is_empty() {
        let figures = ProjectFigures::compute_all(snapshot, ctx);
        let mut projects = ReportSection::new("projects");
        projects.table = project_table(&figures, &selection.project_columns);
        sections.push(projects);
    }

    for series_id in &selection.series {
        let mut section = ReportSection::new(series_id.as_str());
        section.series = match series_id {
            SeriesId::BurnRate | SeriesId::CumulativeCost | SeriesId::ProjectedBurn => {
                let mut all = burn_series(snapshot, None, ctx);
                let keep = series_id.as_str();
                all.retain(|series| series.name == keep);
                all
            }
            SeriesId::Health => {
                vec![health_series(&ProjectFigures::compute_all(snapshot, ctx))]
            }
            SeriesId::Utilization => {
                vec![utilization_series(&employee_utilization(snapshot, ctx))]
            }
            SeriesId::FteRequirements => fte_series(snapshot, ctx),
        };
        sections.push(section);
    }

    sections
}

fn headline(id: &str, value: MetricValue) -> HeadlineMetric {
    HeadlineMetric {
        id: id.to_string(),
        value,
    }
}

/// `burn_rate` (cost per period), `cumulative_cost` and `projected_burn`
/// (planned labor per period) series.
fn burn_series(
    snapshot: &Snapshot,
    project_id: Option<ProjectId>,
    ctx: &MetricContext<'_>,
) -> Vec<Series> {
    let points = burn_rate_series(snapshot, project_id, ctx);
    vec![
        Series {
            name: SeriesId::BurnRate.as_str().to_string(),
            points: points
                .iter()
                .map(|point| SeriesPoint {
                    label: point.label.clone(),
                    value: MetricValue::Value(point.total_cost),
                })
                .collect(),
        },
        Series {
            name: SeriesId::CumulativeCost.as_str().to_string(),
            points: points
                .iter()
                .map(|point| SeriesPoint {
                    label: point.label.clone(),
                    value: MetricValue::Value(point.cumulative_cost),
                })
                .collect(),
        },
        Series {
            name: SeriesId::ProjectedBurn.as_str().to_string(),
            points: points
                .iter()
                .map(|point| SeriesPoint {
                    label: point.label.clone(),
                    value: MetricValue::Value(point.projected_cost),
                })
                .collect(),
        },
    ]
}

fn health_series(figures: &[ProjectFigures]) -> Series {
    Series {
        name: SeriesId::Health.as_str().to_string(),
        points: figures
            .iter()
            .map(|row| SeriesPoint {
                label: row.project.name.clone(),
                value: MetricValue::Value(row.health.score),
            })
            .collect(),
    }
}

fn utilization_series(rows: &[EmployeeUtilization]) -> Series {
    Series {
        name: SeriesId::Utilization.as_str().to_string(),
        points: rows
            .iter()
            .map(|row| SeriesPoint {
                label: row.name.clone(),
                value: row.display_utilization.clone(),
            })
            .collect(),
    }
}

/// One series per project, one point per period.
fn fte_series(snapshot: &Snapshot, ctx: &MetricContext<'_>) -> Vec<Series> {
    let requirements = fte_requirements(snapshot, ctx);
    snapshot
        .projects
        .iter()
        .map(|project| Series {
            name: project.name.clone(),
            points: requirements
                .iter()
                .filter(|row| row.project_id == project.id)
                .map(|row| SeriesPoint {
                    label: row.label.clone(),
                    value: MetricValue::Value(row.fte),
                })
                .collect(),
        })
        .collect()
}

fn employee_table(rows: &[EmployeeUtilization]) -> Table {
    let mut table = Table::new(EMPLOYEE_COLUMNS.iter().copied());
    table.rows = rows
        .iter()
        .map(|row| {
            vec![
                Cell::Text(row.name.clone()),
                Cell::Text(row.department.clone()),
                Cell::Text(row.role.clone()),
                Cell::Number(row.fte),
                Cell::Number(row.hours),
                Cell::Number(row.billable_hours),
                Cell::Number(row.capacity_hours),
                Cell::Metric(row.utilization.clone()),
                Cell::Metric(row.display_utilization.clone()),
                Cell::Metric(row.billable_rate.clone()),
                Cell::Number(row.allocation_percent),
                Cell::Bool(row.over_allocated),
                Cell::Number(row.monthly_cost),
                Cell::Number(row.revenue_generated),
            ]
        })
        .collect();
    table
}
