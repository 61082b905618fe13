//! Employee CSV reader and writer.

use crate::io::{
    checked_reader, format_number, parse_number, record_line, ExportError, ImportError,
    ImportReport, RowError,
};
use crate::metrics::{employee_utilization, EmployeeUtilization, MetricContext};
use crate::model::date::{format_iso_date, parse_optional_iso_date};
use crate::model::employee::{parse_skills, Employee, EmployeeRole};
use crate::model::snapshot::Snapshot;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::{Read, Write};

/// Employee columns, in file order.
pub const EMPLOYEE_COLUMNS: [&str; 9] = [
    "name",
    "email",
    "department",
    "role",
    "hourly_rate",
    "fte",
    "utilization",
    "skills",
    "hire_date",
];

/// Derived columns appended by `write_employees` when a context is given.
pub const EMPLOYEE_METRIC_COLUMNS: [&str; 2] = ["utilization_rate", "over_allocated"];

#[derive(Debug, Deserialize)]
struct EmployeeRow {
    name: String,
    email: String,
    department: String,
    role: String,
    hourly_rate: String,
    fte: String,
    utilization: String,
    skills: String,
    hire_date: String,
}

impl EmployeeRow {
    fn into_employee(self) -> Result<Employee, String> {
        let hourly_rate = parse_number("hourly_rate", &self.hourly_rate, 0.0)?;
        let mut employee = Employee::new(self.name, EmployeeRole::from(self.role), hourly_rate);
        employee.email = self.email;
        employee.department = self.department;
        employee.fte = parse_number("fte", &self.fte, 1.0)?;
        employee.utilization = parse_number("utilization", &self.utilization, 0.0)?;
        employee.skills = parse_skills(&self.skills);
        employee.hire_date =
            parse_optional_iso_date(&self.hire_date).map_err(|err| format!("hire_date: {err}"))?;
        employee.validate().map_err(|err| err.to_string())?;
        Ok(employee)
    }
}

/// Reads employee rows, rejecting malformed rows individually.
///
/// # Errors
/// - `HeaderMismatch` when the header does not start with [`EMPLOYEE_COLUMNS`].
/// - `AllRowsRejected` when the file has rows and none is valid.
pub fn read_employees<R: Read>(reader: R) -> Result<ImportReport<Employee>, ImportError> {
    let (mut csv_reader, headers) = checked_reader(reader, &EMPLOYEE_COLUMNS)?;
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
            .deserialize::<EmployeeRow>(Some(&headers))
            .map_err(|err| err.to_string())
            .and_then(EmployeeRow::into_employee);
        match parsed {
            Ok(employee) => report.accepted.push(employee),
            Err(message) => report.rejected.push(RowError { line, message }),
        }
    }

    report.finish()
}

/// Writes the snapshot's employees; with a context, the period utilization
/// and over-allocation flag are appended.
pub fn write_employees<W: Write>(
    writer: W,
    snapshot: &Snapshot,
    metrics: Option<&MetricContext<'_>>,
) -> Result<(), ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header: Vec<&str> = EMPLOYEE_COLUMNS.to_vec();
    if metrics.is_some() {
        header.extend(EMPLOYEE_METRIC_COLUMNS);
    }
    csv_writer.write_record(&header)?;

    let utilization: HashMap<_, EmployeeUtilization> = metrics
        .map(|ctx| {
            employee_utilization(snapshot, ctx)
                .into_iter()
                .map(|row| (row.employee_id, row))
                .collect()
        })
        .unwrap_or_default();

    for employee in &snapshot.employees {
        let mut row = vec![
            employee.name.clone(),
            employee.email.clone(),
            employee.department.clone(),
            employee.role.as_str().to_string(),
            format_number(employee.hourly_rate),
            format_number(employee.fte),
            format_number(employee.utilization),
            employee.skills_cell(),
            employee.hire_date.map(format_iso_date).unwrap_or_default(),
        ];
        if metrics.is_some() {
            match utilization.get(&employee.id) {
                Some(derived) => {
                    row.push(derived.utilization.to_string());
                    row.push(derived.over_allocated.to_string());
                }
                None => {
                    row.push(String::new());
                    row.push(String::new());
                }
            }
        }
        csv_writer.write_record(&row)?;
    }

    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{read_employees, write_employees, EMPLOYEE_COLUMNS};
    use crate::model::employee::{parse_skills, Employee, EmployeeRole};
    use crate::model::snapshot::Snapshot;
    use chrono::NaiveDate;

    #[test]
    fn blank_fte_defaults_to_full_time_and_bad_rate_is_rejected() {
        let input = format!(
            "{}\n\
             Ada,ada@example.com,Engineering,Developer,120,,0.8,\"Rust,SQL\",2021-03-01\n\
             Bob,,Sales,Account Lead,abc,1,0,,\n",
            EMPLOYEE_COLUMNS.join(",")
        );
        let report = read_employees(input.as_bytes()).unwrap();

        assert_eq!(report.accepted.len(), 1);
        let ada = &report.accepted[0];
        assert_eq!(ada.fte, 1.0);
        assert_eq!(ada.role, EmployeeRole::Developer);
        assert_eq!(ada.skills, parse_skills("Rust,SQL"));
        assert_eq!(report.rejected[0].line, 3);
        assert!(report.rejected[0].message.contains("hourly_rate"));
    }

    #[test]
    fn export_reimports_identical_fields() {
        let mut employee = Employee::new("Grace Hopper", EmployeeRole::from("Rear Admiral"), 95.5);
        employee.email = "grace@example.com".into();
        employee.department = "Research".into();
        employee.fte = 0.5;
        employee.utilization = 1.25;
        employee.skills = parse_skills("COBOL, compilers");
        employee.hire_date = NaiveDate::from_ymd_opt(1944, 7, 2);

        let snapshot = Snapshot {
            employees: vec![employee.clone()],
            ..Snapshot::default()
        };
        let mut buffer = Vec::new();
        write_employees(&mut buffer, &snapshot, None).unwrap();

        let report = read_employees(buffer.as_slice()).unwrap();
        let mut imported = report.accepted[0].clone();
        imported.id = employee.id;
        assert_eq!(imported, employee);
    }
}
