//! JSON and plain-text rendering of a [`QcReport`].

use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use qcwatch_core::results::{failed_samples_by_description, sorted_for_report};
use qcwatch_core::QcReport;
use serde_json::{json, Map, Value};

/// Build the exported JSON document.
///
/// Incidents are grouped by system and variable; times are written as
/// `YYYY-MM-DD HH:MM:SS`.
pub fn report_json(report: &QcReport) -> Value {
    let mut export = Map::new();

    let mut summary = Map::new();
    summary.insert("incidents".to_string(), json!(report.incidents.len()));
    summary.insert("failed_samples".to_string(), json!(report.total_failed_samples()));
    summary.insert(
        "failed_samples_by_error".to_string(),
        json!(failed_samples_by_description(&report.incidents)),
    );
    if let Some(overall) = report.overall_index {
        summary.insert("qci".to_string(), json!(overall));
    }
    export.insert("summary".to_string(), Value::Object(summary));

    if !report.daily_index.is_empty() {
        let days: Vec<Value> = report
            .daily_index
            .iter()
            .map(|d| {
                json!({
                    "day": d.day.to_naive().map(|dt| dt.date().to_string()),
                    "qci": d.value
                })
            })
            .collect();
        export.insert("daily_qci".to_string(), Value::Array(days));
    }

    let incidents: Vec<Value> = sorted_for_report(&report.incidents)
        .iter()
        .map(|r| {
            json!({
                "system": r.system_name,
                "variable": r.variable_name,
                "start_time": r.start_time.to_string(),
                "end_time": r.end_time.to_string(),
                "timesteps": r.run_length,
                "error": r.error_description
            })
        })
        .collect();
    export.insert("incidents".to_string(), Value::Array(incidents));

    export.insert("notes".to_string(), json!(report.notes));
    export.insert("version".to_string(), json!(report.version.to_string()));
    export.insert("generated_ms".to_string(), json!(report.timestamp_ms));

    Value::Object(export)
}

/// Write the JSON report to a file.
pub fn export_to_file(report: &QcReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&report_json(report))?;
    let mut file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(json.as_bytes())?;
    Ok(())
}

/// Write a short human-readable summary.
pub fn write_summary<W: Write>(report: &QcReport, out: &mut W) -> Result<()> {
    match report.overall_index {
        Some(overall) => writeln!(out, "QCI: {:.4}", overall)?,
        None => {
            for day in &report.daily_index {
                let label = day.day.to_naive().map(|dt| dt.date().to_string()).unwrap_or_default();
                writeln!(out, "QCI {}: {:.4}", label, day.value)?;
            }
        }
    }

    writeln!(out, "{} incidents, {} failed samples", report.len(), report.total_failed_samples())?;
    for r in sorted_for_report(&report.incidents) {
        writeln!(
            out,
            "  {:<12} {:<20} {} .. {} ({:>4})  {}",
            r.system_name, r.variable_name, r.start_time, r.end_time, r.run_length, r.error_description
        )?;
    }

    for note in &report.notes {
        writeln!(out, "note: {}", note)?;
    }
    Ok(())
}
