//! Report assembly: build records, render each section, substitute values.

use medreport_ingest::SourceRow;
use medreport_model::{Record, RenderIssue, ReportSection};
use medreport_rules::RuleSet;
use serde::Serialize;
use tracing::{debug, info, info_span, warn};

use crate::sections::{SubjectRecords, build_records};
use crate::substitute::{ScopedValues, substitute_into};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedSection {
    pub section: ReportSection,
    pub text: String,
}

/// The rendered report of one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedReport {
    pub subject_id: Option<i64>,
    /// Section texts in report order.
    pub sections: Vec<RenderedSection>,
    /// Faults recovered while building and rendering this report.
    pub issues: Vec<RenderIssue>,
}

impl GeneratedReport {
    /// All section texts concatenated in report order.
    pub fn text(&self) -> String {
        self.sections
            .iter()
            .map(|rendered| rendered.text.as_str())
            .collect()
    }

    pub fn section_text(&self, section: ReportSection) -> &str {
        self.sections
            .iter()
            .find(|rendered| rendered.section == section)
            .map_or("", |rendered| rendered.text.as_str())
    }

    /// Non-empty section texts without surrounding whitespace.
    pub fn paragraphs(&self) -> impl Iterator<Item = &str> {
        self.sections
            .iter()
            .map(|rendered| rendered.text.trim())
            .filter(|text| !text.is_empty())
    }
}

/// Renders reports against one loaded rule set.
#[derive(Debug, Clone, Copy)]
pub struct ReportGenerator<'r> {
    rules: &'r RuleSet,
}

impl<'r> ReportGenerator<'r> {
    pub fn new(rules: &'r RuleSet) -> Self {
        Self { rules }
    }

    /// Builds the subject's records and renders every section.
    pub fn generate(&self, row: &SourceRow) -> GeneratedReport {
        let mut issues = Vec::new();
        let records = build_records(self.rules, row, &mut issues);
        let sections = self.render_records(&records, &mut issues);
        debug!(
            sections = sections.iter().filter(|s| !s.text.is_empty()).count(),
            issues = issues.len(),
            "report generated"
        );
        GeneratedReport {
            subject_id: row.subject_id(),
            sections,
            issues,
        }
    }

    /// Renders all sections of already built records.
    pub fn render_records(
        &self,
        records: &SubjectRecords,
        issues: &mut Vec<RenderIssue>,
    ) -> Vec<RenderedSection> {
        let values = ScopedValues::from_record(&records.display);
        ReportSection::ALL
            .into_iter()
            .map(|section| {
                let text = if records.is_suppressed(section) {
                    debug!(section = %section, "section suppressed by thrombectomy transport");
                    String::new()
                } else {
                    self.render_section(section, &records.condition, &values, issues)
                };
                RenderedSection { section, text }
            })
            .collect()
    }

    /// Renders one section's block against `condition`, then fills placeholders from `values`.
    pub fn render_section(
        &self,
        section: ReportSection,
        condition: &Record,
        values: &ScopedValues,
        issues: &mut Vec<RenderIssue>,
    ) -> String {
        let Some(block) = self.rules.block(section) else {
            return String::new();
        };
        let mut unresolved = Vec::new();
        let text = block.render_into(condition, &mut unresolved);
        issues.extend(
            unresolved
                .iter()
                .map(|error| RenderIssue::unresolved_scope(section, error.scope().to_string())),
        );

        let mut missing = Vec::new();
        let text = substitute_into(&text, values, &mut missing);
        for placeholder in missing {
            warn!(section = %section, placeholder = %placeholder, "placeholder has no value; left as written");
            issues.push(RenderIssue::unresolved_scope(section, placeholder));
        }
        text
    }
}

/// Reports of a batch plus every recovered fault, keyed by 1-based record index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Record index of `reports[0]` in the source file.
    pub first_index: usize,
    pub reports: Vec<GeneratedReport>,
    pub issues: Vec<(usize, RenderIssue)>,
}

impl BatchReport {
    pub fn new(first_index: usize) -> Self {
        Self {
            first_index,
            reports: Vec::new(),
            issues: Vec::new(),
        }
    }

    /// Reports with their source record index.
    pub fn indexed_reports(&self) -> impl Iterator<Item = (usize, &GeneratedReport)> {
        (self.first_index..).zip(&self.reports)
    }

    pub fn report(&self, record_index: usize) -> Option<&GeneratedReport> {
        record_index
            .checked_sub(self.first_index)
            .and_then(|offset| self.reports.get(offset))
    }

    /// Record indices that had at least one issue, ascending.
    pub fn records_with_issues(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self.issues.iter().map(|(index, _)| *index).collect();
        indices.dedup();
        indices
    }
}

/// Renders every row; faults never abort the batch.
pub fn generate_batch(rules: &RuleSet, rows: &[SourceRow]) -> BatchReport {
    generate_batch_from(rules, rows, 1)
}

/// Like [`generate_batch`] for rows that start at record `first_index` of their file.
pub fn generate_batch_from(
    rules: &RuleSet,
    rows: &[SourceRow],
    first_index: usize,
) -> BatchReport {
    let generator = ReportGenerator::new(rules);
    let mut batch = BatchReport::new(first_index);
    for (record_index, row) in (first_index..).zip(rows) {
        let span = info_span!("record", record_index);
        let _guard = span.enter();
        let report = generator.generate(row);
        batch
            .issues
            .extend(report.issues.iter().cloned().map(|issue| (record_index, issue)));
        batch.reports.push(report);
    }
    info!(
        first_index,
        records = batch.reports.len(),
        issues = batch.issues.len(),
        records_with_issues = batch.records_with_issues().len(),
        "batch generated"
    );
    batch
}
