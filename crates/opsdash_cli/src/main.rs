//! Command-line entry point for the operations dashboard.
//!
//! # Responsibility
//! - Open the record store, import and export CSV files.
//! - Print reports and scenario comparisons as JSON on stdout.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use opsdash_core::io::write_section;
use opsdash_core::service::{import_employees, import_projects, import_timesheet};
use opsdash_core::{
    init_logging, open_db, Adjustment, CustomReportSpec, DashboardConfig, DateRange, EmployeeId,
    Granularity, NamedAdjustment, ProjectId, ProjectStatus, RecordFilter, ReportKind,
    ReportRequest, ReportingService,
};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "opsdash")]
#[command(about = "Business operations dashboard: records, metrics, reports and what-if scenarios")]
#[command(version)]
struct Cli {
    /// SQLite database file (overrides the config file)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or migrate the database
    Init,

    /// Import a CSV file
    Import {
        #[arg(value_enum)]
        kind: ImportKind,
        file: PathBuf,
    },

    /// Export records as CSV
    Export {
        #[arg(value_enum)]
        kind: ExportKind,
        file: PathBuf,

        /// Append derived metric columns
        #[arg(long)]
        with_metrics: bool,

        #[command(flatten)]
        scope: Scope,
    },

    /// Build a report and print it as JSON
    Report {
        #[command(subcommand)]
        kind: ReportCommand,

        #[command(flatten)]
        scope: Scope,

        /// Reporting granularity (daily, weekly, monthly, quarterly, yearly)
        #[arg(long)]
        granularity: Option<Granularity>,

        /// Also write each section as `<dir>/<section>.csv`
        #[arg(long)]
        csv_dir: Option<PathBuf>,
    },

    /// Run a what-if scenario and print the comparison as JSON
    Scenario {
        /// Scale every cost figure (e.g. 1.1 for +10%)
        #[arg(long)]
        cost_multiplier: Option<f64>,

        /// Per-period revenue growth rate (e.g. 0.05)
        #[arg(long)]
        revenue_growth: Option<f64>,

        /// Number of periods the growth rate compounds over
        #[arg(long, default_value_t = 1)]
        periods: u32,

        /// Employee FTE change, as `<employee-id>=<delta>`
        #[arg(long, value_parser = parse_assignment::<f64>)]
        fte_delta: Vec<(EmployeeId, f64)>,

        /// Project end-date shift, as `<project-id>=<days>`
        #[arg(long, value_parser = parse_assignment::<i64>)]
        shift: Vec<(ProjectId, i64)>,

        #[command(flatten)]
        scope: Scope,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ImportKind {
    Projects,
    Employees,
    Timesheet,
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportKind {
    Projects,
    Employees,
}

#[derive(Subcommand)]
enum ReportCommand {
    Executive,
    Financial,
    Resource,
    /// Status report for one project
    Project { id: ProjectId },
    /// Report made of the listed identifiers
    Custom {
        #[arg(long, value_delimiter = ',')]
        metrics: Vec<String>,
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,
        #[arg(long, value_delimiter = ',')]
        series: Vec<String>,
    },
}

/// Record selection and reference date shared by read commands.
#[derive(Args)]
struct Scope {
    /// Reference date (default: today)
    #[arg(long)]
    as_of: Option<NaiveDate>,

    /// Period start (YYYY-MM-DD)
    #[arg(long, requires = "to")]
    from: Option<NaiveDate>,

    /// Period end (YYYY-MM-DD)
    #[arg(long, requires = "from")]
    to: Option<NaiveDate>,

    #[arg(long)]
    department: Option<String>,

    #[arg(long = "status")]
    statuses: Vec<ProjectStatus>,

    #[arg(long = "project")]
    project_ids: Vec<ProjectId>,
}

impl Scope {
    fn as_of(&self) -> NaiveDate {
        self.as_of
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    fn filter(&self) -> Result<RecordFilter> {
        let date_range = match (self.from, self.to) {
            (Some(start), Some(end)) => Some(
                DateRange::new(start, end)
                    .with_context(|| format!("--to {end} is before --from {start}"))?,
            ),
            _ => None,
        };
        Ok(RecordFilter {
            date_range,
            project_ids: self.project_ids.clone(),
            department: self.department.clone(),
            statuses: self.statuses.clone(),
            ..RecordFilter::default()
        })
    }
}

fn parse_assignment<T: std::str::FromStr>(value: &str) -> Result<(uuid::Uuid, T), String> {
    let (id, amount) = value
        .split_once('=')
        .ok_or_else(|| format!("expected `<id>=<value>`, got `{value}`"))?;
    let id = id
        .trim()
        .parse::<uuid::Uuid>()
        .map_err(|err| format!("invalid id `{}`: {err}", id.trim()))?;
    let amount = amount
        .trim()
        .parse::<T>()
        .map_err(|_| format!("invalid value `{}`", amount.trim()))?;
    Ok((id, amount))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => DashboardConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => DashboardConfig::default(),
    };
    if let Some(db) = &cli.db {
        config.db_path = db.clone();
    }
    if let Some(dir) = &config.log_dir {
        init_logging(&config.log_level, dir).context("failed to initialize logging")?;
    }

    match cli.command {
        Commands::Init => cmd_init(&config),
        Commands::Import { kind, file } => cmd_import(&config, kind, &file),
        Commands::Export {
            kind,
            file,
            with_metrics,
            scope,
        } => cmd_export(&config, kind, &file, with_metrics, &scope),
        Commands::Report {
            kind,
            scope,
            granularity,
            csv_dir,
        } => cmd_report(&config, kind, &scope, granularity, csv_dir.as_deref()),
        Commands::Scenario {
            cost_multiplier,
            revenue_growth,
            periods,
            fte_delta,
            shift,
            scope,
        } => {
            let mut adjustments = Vec::new();
            if let Some(factor) = cost_multiplier {
                adjustments.push(NamedAdjustment::new(
                    "cost_multiplier",
                    Adjustment::CostMultiplier(factor),
                ));
            }
            if let Some(rate) = revenue_growth {
                adjustments.push(NamedAdjustment::new(
                    "revenue_growth",
                    Adjustment::RevenueGrowthRate { rate, periods },
                ));
            }
            if !fte_delta.is_empty() {
                adjustments.push(NamedAdjustment::new(
                    "fte_delta",
                    Adjustment::FteDelta(fte_delta.into_iter().collect::<BTreeMap<_, _>>()),
                ));
            }
            if !shift.is_empty() {
                adjustments.push(NamedAdjustment::new(
                    "schedule_shift",
                    Adjustment::ScheduleShiftDays(shift.into_iter().collect::<BTreeMap<_, _>>()),
                ));
            }
            cmd_scenario(&config, &adjustments, &scope)
        }
    }
}

fn cmd_init(config: &DashboardConfig) -> Result<()> {
    open_db(&config.db_path)
        .with_context(|| format!("failed to open {}", config.db_path.display()))?;
    println!("database ready: {}", config.db_path.display());
    Ok(())
}

fn cmd_import(config: &DashboardConfig, kind: ImportKind, file: &Path) -> Result<()> {
    let mut conn = open_db(&config.db_path)?;
    let reader = BufReader::new(
        File::open(file).with_context(|| format!("failed to open {}", file.display()))?,
    );

    let rejected = match kind {
        ImportKind::Projects => {
            let outcome = import_projects(&mut conn, reader)?;
            println!("imported {} projects", outcome.inserted);
            outcome.rejected
        }
        ImportKind::Employees => {
            let outcome = import_employees(&mut conn, reader)?;
            println!("imported {} employees", outcome.inserted);
            outcome.rejected
        }
        ImportKind::Timesheet => {
            let outcome = import_timesheet(&mut conn, reader)?;
            println!(
                "imported {} time entries ({} new projects, {} new employees)",
                outcome.time_entries_inserted, outcome.projects_created, outcome.employees_created
            );
            println!("{}", serde_json::to_string_pretty(&outcome.summary)?);
            outcome.rejected
        }
    };

    for row in &rejected {
        eprintln!("rejected {row}");
    }
    Ok(())
}

fn cmd_export(
    config: &DashboardConfig,
    kind: ExportKind,
    file: &Path,
    with_metrics: bool,
    scope: &Scope,
) -> Result<()> {
    let conn = open_db(&config.db_path)?;
    let service = ReportingService::new(&conn, config.metrics.clone());
    let filter = scope.filter()?;
    let as_of = with_metrics.then(|| scope.as_of());
    let writer = BufWriter::new(
        File::create(file).with_context(|| format!("failed to create {}", file.display()))?,
    );

    let count = match kind {
        ExportKind::Projects => service.export_projects(writer, &filter, as_of)?,
        ExportKind::Employees => service.export_employees(writer, &filter, as_of)?,
    };
    println!("exported {count} rows to {}", file.display());
    Ok(())
}

fn cmd_report(
    config: &DashboardConfig,
    kind: ReportCommand,
    scope: &Scope,
    granularity: Option<Granularity>,
    csv_dir: Option<&Path>,
) -> Result<()> {
    let kind = match kind {
        ReportCommand::Executive => ReportKind::Executive,
        ReportCommand::Financial => ReportKind::Financial,
        ReportCommand::Resource => ReportKind::Resource,
        ReportCommand::Project { id } => ReportKind::ProjectStatus(id),
        ReportCommand::Custom {
            metrics,
            columns,
            series,
        } => ReportKind::Custom(CustomReportSpec {
            metrics,
            project_columns: columns,
            series,
        }),
    };

    let conn = open_db(&config.db_path)?;
    let service = ReportingService::new(&conn, config.metrics.clone());
    let mut request = ReportRequest::new(kind, scope.as_of());
    request.filter = scope.filter()?;
    request.granularity = granularity;
    let report = service.report(&request)?;

    if let Some(dir) = csv_dir {
        if !dir.is_dir() {
            bail!("{} is not a directory", dir.display());
        }
        for section in &report.sections {
            let path = dir.join(format!("{}.csv", section.name));
            let writer = BufWriter::new(
                File::create(&path)
                    .with_context(|| format!("failed to create {}", path.display()))?,
            );
            write_section(writer, section)?;
        }
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cmd_scenario(
    config: &DashboardConfig,
    adjustments: &[NamedAdjustment],
    scope: &Scope,
) -> Result<()> {
    if adjustments.is_empty() {
        bail!("no adjustments given; pass at least one of --cost-multiplier, --revenue-growth, --fte-delta, --shift");
    }
    let conn = open_db(&config.db_path)?;
    let service = ReportingService::new(&conn, config.metrics.clone());
    let filter = scope.filter()?;
    let outcome = service.scenario(&filter, scope.as_of(), filter.date_range, adjustments)?;

    let summary = serde_json::json!({
        "applied": outcome.applied,
        "portfolio": outcome.portfolio,
        "projects": outcome.projects,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
