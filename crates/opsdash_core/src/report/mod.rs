//! Report builder: assembles calculator output into ordered sections.
//!
//! # Responsibility
//! - Restrict a snapshot with the request filter, run the calculator, and
//!   lay the results out as headline metrics, tables and series.
//!
//! # Invariants
//! - Building a report never touches storage.
//! - A custom report with any unknown identifier is rejected as a whole.
//! - Section order is fixed per report kind.

use crate::metrics::{Granularity, MetricValue};
use crate::model::date::{format_iso_date, DateRange};
use crate::model::project::ProjectId;
use crate::model::snapshot::RecordFilter;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod builder;
pub mod catalog;

pub use builder::build_report;
pub use catalog::{MetricId, ProjectColumn, SeriesId};

/// Which report to build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum ReportKind {
    Executive,
    Financial,
    Resource,
    ProjectStatus(ProjectId),
    Custom(CustomReportSpec),
}

impl ReportKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Executive => "executive",
            Self::Financial => "financial",
            Self::Resource => "resource",
            Self::ProjectStatus(_) => "project_status",
            Self::Custom(_) => "custom",
        }
    }
}

/// Caller-chosen content of a custom report, as raw identifiers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomReportSpec {
    pub metrics: Vec<String>,
    pub project_columns: Vec<String>,
    pub series: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportRequest {
    pub kind: ReportKind,
    pub filter: RecordFilter,
    pub as_of: NaiveDate,
    /// Reporting window; defaults to the filter range, then to the calendar
    /// year of `as_of` up to `as_of`.
    pub period: Option<DateRange>,
    /// Defaults to the configured granularity.
    pub granularity: Option<Granularity>,
}

impl ReportRequest {
    pub fn new(kind: ReportKind, as_of: NaiveDate) -> Self {
        Self {
            kind,
            filter: RecordFilter::default(),
            as_of,
            period: None,
            granularity: None,
        }
    }
}

/// One table cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Number(f64),
    Metric(MetricValue),
    Date(Option<NaiveDate>),
    Bool(bool),
}

impl Display for Cell {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(value) => f.write_str(value),
            Self::Number(value) => write!(f, "{value}"),
            Self::Metric(value) => write!(f, "{value}"),
            Self::Date(Some(date)) => f.write_str(&format_iso_date(*date)),
            Self::Date(None) => Ok(()),
            Self::Bool(value) => write!(f, "{value}"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadlineMetric {
    pub id: String,
    pub value: MetricValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub label: String,
    pub value: MetricValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub points: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSection {
    pub name: String,
    pub headline: Vec<HeadlineMetric>,
    pub table: Table,
    pub series: Vec<Series>,
}

impl ReportSection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            headline: Vec::new(),
            table: Table::default(),
            series: Vec::new(),
        }
    }

    pub fn headline(&self, id: &str) -> Option<&MetricValue> {
        self.headline
            .iter()
            .find(|metric| metric.id == id)
            .map(|metric| &metric.value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub kind: String,
    pub as_of: NaiveDate,
    pub period: DateRange,
    pub granularity: Granularity,
    pub sections: Vec<ReportSection>,
}

impl Report {
    pub fn section(&self, name: &str) -> Option<&ReportSection> {
        self.sections.iter().find(|section| section.name == name)
    }

    pub fn section_names(&self) -> Vec<&str> {
        self.sections.iter().map(|section| section.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReportError {
    /// Every identifier the builder did not recognize.
    MalformedInput { identifiers: Vec<String> },
    EmptyCustomReport,
    UnknownProject(ProjectId),
}

impl Display for ReportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedInput { identifiers } => {
                write!(f, "unknown report identifiers: {}", identifiers.join(", "))
            }
            Self::EmptyCustomReport => write!(f, "custom report requests no content"),
            Self::UnknownProject(id) => write!(f, "project not in report scope: {id}"),
        }
    }
}

impl Error for ReportError {}
