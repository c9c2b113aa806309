use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ReportSection;

/// Kind of recoverable fault met while rendering one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// A condition or placeholder referenced a section/field the record lacks.
    UnresolvedScope,
    /// A label table has no entry for a code or flag.
    UnknownLabel,
    /// The rule file has no label table with the requested name.
    MissingLabelTable,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::UnresolvedScope => "unresolved scope",
            IssueKind::UnknownLabel => "unknown label",
            IssueKind::MissingLabelTable => "missing label table",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A render fault that was recovered locally.
///
/// The offending clause contributed empty text; the rest of the record was
/// still rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderIssue {
    pub section: ReportSection,
    pub kind: IssueKind,
    /// Scope, label key or table name the fault refers to.
    pub subject: String,
    /// Label table involved, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
}

impl RenderIssue {
    pub fn unresolved_scope(section: ReportSection, scope: impl Into<String>) -> Self {
        Self {
            section,
            kind: IssueKind::UnresolvedScope,
            subject: scope.into(),
            table: None,
        }
    }

    pub fn unknown_label(
        section: ReportSection,
        table: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            section,
            kind: IssueKind::UnknownLabel,
            subject: key.into(),
            table: Some(table.into()),
        }
    }

    pub fn missing_table(section: ReportSection, table: impl Into<String>) -> Self {
        let table = table.into();
        Self {
            section,
            kind: IssueKind::MissingLabelTable,
            subject: table.clone(),
            table: Some(table),
        }
    }
}

impl fmt::Display for RenderIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) if self.kind == IssueKind::UnknownLabel => {
                write!(f, "{}: {} '{}' in '{}'", self.section, self.kind, self.subject, table)
            }
            _ => write!(f, "{}: {} '{}'", self.section, self.kind, self.subject),
        }
    }
}
