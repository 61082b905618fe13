//! Report tables as CSV.

use crate::io::ExportError;
use crate::report::{Cell, ReportSection, Table};
use std::io::Write;

/// Writes a table with its column header. Cells use their display form.
pub fn write_table<W: Write>(writer: W, table: &Table) -> Result<(), ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(&table.columns)?;
    for row in &table.rows {
        csv_writer.write_record(row.iter().map(Cell::to_string))?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Writes one report section.
///
/// The section's table is written when it has columns; otherwise headline
/// metrics become `metric,value` rows, and a series-only section becomes
/// `series,label,value` rows.
pub fn write_section<W: Write>(writer: W, section: &ReportSection) -> Result<(), ExportError> {
    if !section.table.is_empty() {
        return write_table(writer, &section.table);
    }

    let mut table;
    if !section.headline.is_empty() || section.series.is_empty() {
        table = Table::new(["metric", "value"]);
        table.rows = section
            .headline
            .iter()
            .map(|metric| {
                vec![
                    Cell::Text(metric.id.clone()),
                    Cell::Metric(metric.value.clone()),
                ]
            })
            .collect();
    } else {
        table = Table::new(["series", "label", "value"]);
        for series in &section.series {
            for point in &series.points {
                table.rows.push(vec![
                    Cell::Text(series.name.clone()),
                    Cell::Text(point.label.clone()),
                    Cell::Metric(point.value.clone()),
                ]);
            }
        }
    }
    write_table(writer, &table)
}

#[cfg(test)]
mod tests {
    use super::{write_section, write_table};
    use crate::metrics::MetricValue;
    use crate::report::{Cell, HeadlineMetric, ReportSection, Series, SeriesPoint, Table};

    #[test]
    fn table_cells_use_display_form() {
        let mut table = Table::new(["name", "margin", "on_track"]);
        table.rows.push(vec![
            Cell::Text("Apollo, Inc".into()),
            Cell::Metric(MetricValue::not_applicable("no revenue")),
            Cell::Bool(true),
        ]);
        let mut buffer = Vec::new();
        write_table(&mut buffer, &table).unwrap();
        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "name,margin,on_track\n\"Apollo, Inc\",N/A,true\n"
        );
    }

    #[test]
    fn headline_only_section_becomes_metric_rows() {
        let mut section = ReportSection::new("key_metrics");
        section.headline.push(HeadlineMetric {
            id: "total_revenue".into(),
            value: MetricValue::Value(1500.0),
        });
        let mut buffer = Vec::new();
        write_section(&mut buffer, &section).unwrap();
        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "metric,value\ntotal_revenue,1500\n"
        );
    }

    #[test]
    fn series_only_section_is_flattened() {
        let mut section = ReportSection::new("burn_rate");
        section.series.push(Series {
            name: "cumulative_cost".into(),
            points: vec![SeriesPoint {
                label: "2024-01".into(),
                value: MetricValue::Value(250.5),
            }],
        });
        let mut buffer = Vec::new();
        write_section(&mut buffer, &section).unwrap();
        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "series,label,value\ncumulative_cost,2024-01,250.5\n"
        );
    }
}
