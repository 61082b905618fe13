//! Project CSV reader and writer.

use crate::io::{
    checked_reader, format_number, parse_number, record_line, ExportError, ImportError,
    ImportReport, RowError,
};
use crate::metrics::{health_score, project_margin, MetricContext};
use crate::model::date::{format_iso_date, parse_optional_iso_date};
use crate::model::project::{Project, ProjectStatus};
use serde::Deserialize;
use std::io::{Read, Write};

/// Project columns, in file order.
pub const PROJECT_COLUMNS: [&str; 11] = [
    "name",
    "description",
    "status",
    "start_date",
    "end_date",
    "budget_allocated",
    "budget_used",
    "revenue_projected",
    "revenue_actual",
    "client",
    "project_manager",
];

/// Derived columns appended by `write_projects` when a context is given.
pub const PROJECT_METRIC_COLUMNS: [&str; 4] = [
    "health_score",
    "profit_margin",
    "budget_adherence",
    "schedule_adherence",
];

#[derive(Debug, Deserialize)]
struct ProjectRow {
    name: String,
    description: String,
    status: String,
    start_date: String,
    end_date: String,
    budget_allocated: String,
    budget_used: String,
    revenue_projected: String,
    revenue_actual: String,
    client: String,
    project_manager: String,
}

impl ProjectRow {
    fn into_project(self) -> Result<Project, String> {
        let status = self.status.parse::<ProjectStatus>()?;
        let mut project = Project::new(self.name, status);
        project.description = self.description;
        project.start_date =
            parse_optional_iso_date(&self.start_date).map_err(|err| format!("start_date: {err}"))?;
        project.end_date =
            parse_optional_iso_date(&self.end_date).map_err(|err| format!("end_date: {err}"))?;
        project.budget_allocated = parse_number("budget_allocated", &self.budget_allocated, 0.0)?;
        project.budget_used = parse_number("budget_used", &self.budget_used, 0.0)?;
        project.revenue_projected =
            parse_number("revenue_projected", &self.revenue_projected, 0.0)?;
        project.revenue_actual = parse_number("revenue_actual", &self.revenue_actual, 0.0)?;
        project.client = self.client;
        project.project_manager = self.project_manager;
        project.validate().map_err(|err| err.to_string())?;
        Ok(project)
    }
}

/// Reads project rows, rejecting malformed rows individually.
///
/// # Errors
/// - `HeaderMismatch` when the header does not start with [`PROJECT_COLUMNS`].
/// - `AllRowsRejected` when the file has rows and none is valid.
pub fn read_projects<R: Read>(reader: R) -> Result<ImportReport<Project>, ImportError> {
    let (mut csv_reader, headers) = checked_reader(reader, &PROJECT_COLUMNS)?;
    let mut report = ImportReport::default();

    for (index, record) in csv_reader.records().enumerate() {
        let fallback_line = index as u64 + 2;
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                report.rejected.push(RowError {
                    line: fallback_line,
                    message: err.to_string(),
                });
                continue;
            }
        };
        let line = record_line(&record, fallback_line);
        let parsed = record
            .deserialize::<ProjectRow>(Some(&headers))
            .map_err(|err| err.to_string())
            .and_then(ProjectRow::into_project);
        match parsed {
            Ok(project) => report.accepted.push(project),
            Err(message) => report.rejected.push(RowError { line, message }),
        }
    }

    report.finish()
}

/// Writes projects; with a context, derived metric columns are appended.
pub fn write_projects<W: Write>(
    writer: W,
    projects: &[Project],
    metrics: Option<&MetricContext<'_>>,
) -> Result<(), ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header: Vec<&str> = PROJECT_COLUMNS.to_vec();
    if metrics.is_some() {
        header.extend(PROJECT_METRIC_COLUMNS);
    }
    csv_writer.write_record(&header)?;

    for project in projects {
        let mut row = vec![
            project.name.clone(),
            project.description.clone(),
            project.status.as_str().to_string(),
            project.start_date.map(format_iso_date).unwrap_or_default(),
            project.end_date.map(format_iso_date).unwrap_or_default(),
            format_number(project.budget_allocated),
            format_number(project.budget_used),
            format_number(project.revenue_projected),
            format_number(project.revenue_actual),
            project.client.clone(),
            project.project_manager.clone(),
        ];
        if let Some(ctx) = metrics {
            let health = health_score(project, ctx);
            row.push(format_number(health.score));
            row.push(project_margin(project).to_string());
            row.push(health.budget_adherence.to_string());
            row.push(health.schedule_adherence.to_string());
        }
        csv_writer.write_record(&row)?;
    }

    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{read_projects, write_projects, PROJECT_COLUMNS};
    use crate::config::MetricConfig;
    use crate::io::ImportError;
    use crate::metrics::MetricContext;
    use crate::model::date::DateRange;
    use crate::model::project::{Project, ProjectStatus};
    use chrono::NaiveDate;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn malformed_rows_are_rejected_with_line_numbers() {
        let input = format!(
            "{}\n\
             Apollo,,active,2024-01-01,2024-12-31,100000,40000,150000,60000,Acme,Ada\n\
             Broken,,active,2024-13-01,,1,0,0,0,,\n\
             Negative,,active,,,-5,0,0,0,,\n\
             Zeus,,on hold,,,,,,,,\n",
            PROJECT_COLUMNS.join(",")
        );
        let report = read_projects(input.as_bytes()).unwrap();

        let names: Vec<_> = report.accepted.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Apollo", "Zeus"]);
        assert_eq!(report.accepted[1].status, ProjectStatus::OnHold);
        let lines: Vec<_> = report.rejected.iter().map(|row| row.line).collect();
        assert_eq!(lines, vec![3, 4]);
        assert!(report.rejected[0].message.contains("start_date"));
    }

    #[test]
    fn wrong_header_is_a_file_level_error() {
        let input = "title,status\nApollo,active\n";
        assert!(matches!(
            read_projects(input.as_bytes()),
            Err(ImportError::HeaderMismatch { .. })
        ));
    }

    #[test]
    fn all_rows_rejected_fails_the_import() {
        let input = format!("{}\n,,active,,,,,,,,\n", PROJECT_COLUMNS.join(","));
        match read_projects(input.as_bytes()) {
            Err(ImportError::AllRowsRejected { rejected }) => assert_eq!(rejected.len(), 1),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn enriched_export_reimports_plain_fields() {
        let mut project = Project::new("Apollo, Phase \"2\"", ProjectStatus::Active);
        project.start_date = Some(day(2024, 1, 1));
        project.end_date = Some(day(2024, 12, 31));
        project.budget_allocated = 100_000.0;
        project.budget_used = 40_000.0;
        project.revenue_actual = 0.1 + 0.2;

        let config = MetricConfig::default();
        let period = DateRange::new(day(2024, 1, 1), day(2024, 6, 30)).unwrap();
        let ctx = MetricContext::new(day(2024, 6, 30), period, &config);

        let mut buffer = Vec::new();
        write_projects(&mut buffer, std::slice::from_ref(&project), Some(&ctx)).unwrap();
        let text = String::from_utf8(buffer.clone()).unwrap();
        assert!(text.lines().next().unwrap().ends_with("schedule_adherence"));

        let report = read_projects(buffer.as_slice()).unwrap();
        let mut imported = report.accepted[0].clone();
        imported.id = project.id;
        assert_eq!(imported, project);
    }
}
