use std::path::PathBuf;

use crate::schema::FieldKind;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("row {row}, column {column}: '{value}' is not a valid {kind}")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
        kind: FieldKind,
    },

    #[error("subject {subject} not found: the input has {available} rows (subjects are numbered from 1)")]
    SubjectNotFound { subject: usize, available: usize },
}

impl IngestError {
    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }
}
