//! Report text and audit output of a generated batch.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use medreport_core::BatchReport;
use medreport_model::{IssueKind, RenderIssue, ReportSection};
use serde::Serialize;

/// One audit line: a render issue with the record it was raised for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEntry {
    pub record_index: usize,
    pub subject_id: Option<i64>,
    pub section: ReportSection,
    pub kind: IssueKind,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
}

pub fn audit_entries(batch: &BatchReport) -> Vec<AuditEntry> {
    batch
        .issues
        .iter()
        .map(|(record_index, issue)| AuditEntry {
            record_index: *record_index,
            subject_id: batch
                .report(*record_index)
                .and_then(|report| report.subject_id),
            section: issue.section,
            kind: issue.kind,
            subject: issue.subject.clone(),
            table: issue.table.clone(),
        })
        .collect()
}

/// Short human-readable description of what an issue refers to.
pub fn issue_detail(issue: &RenderIssue) -> String {
    match (&issue.kind, &issue.table) {
        (IssueKind::UnknownLabel, Some(table)) => format!("'{}' in {table}", issue.subject),
        _ => issue.subject.clone(),
    }
}

/// Writes every report, one blank line between reports.
pub fn write_reports<W: Write>(batch: &BatchReport, mut out: W) -> io::Result<()> {
    for (idx, report) in batch.reports.iter().enumerate() {
        if idx > 0 {
            writeln!(out)?;
        }
        writeln!(out, "{}", report.text().trim_end())?;
    }
    out.flush()
}

/// Writes reports to `path`, or to stdout when no path is given.
pub fn emit_reports(batch: &BatchReport, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("create report file {}", path.display()))?;
            write_reports(batch, BufWriter::new(file))
                .with_context(|| format!("write reports to {}", path.display()))
        }
        None => write_reports(batch, io::stdout().lock()).context("write reports to stdout"),
    }
}

pub fn write_audit(batch: &BatchReport, path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("create audit file {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &audit_entries(batch))
        .with_context(|| format!("write audit to {}", path.display()))?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
