use std::path::PathBuf;

use medreport_model::{Scope, ScopeError};

/// Fatal problems found while loading a rule file.
///
/// Document errors carry the dotted location of the offending node, e.g.
/// `treatment.variants[2].condition.conditions[0]`.
#[derive(Debug, thiserror::Error)]
pub enum RuleParseError {
    #[error("failed to read rule file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse rule file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{location}: missing required field '{field}'")]
    MissingField { location: String, field: String },

    #[error("{location}: invalid field '{field}': {message}")]
    InvalidField {
        location: String,
        field: String,
        message: String,
    },

    #[error("{location}: {source}")]
    MalformedScope {
        location: String,
        #[source]
        source: ScopeError,
    },

    #[error("{location}: unknown condition type '{kind}'")]
    UnknownConditionType { location: String, kind: String },

    #[error("{location}: invalid variant: {message}")]
    InvalidVariant { location: String, message: String },

    #[error("rule file is missing required section '{section}'")]
    MissingSection { section: String },

    #[error("{location}: invalid setting: {message}")]
    InvalidSetting { location: String, message: String },

    #[error("no rule file for language '{language}' or the default under {dir}")]
    MissingLanguage { dir: PathBuf, language: String },
}

impl RuleParseError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn missing(location: &str, field: &str) -> Self {
        Self::MissingField {
            location: location.to_string(),
            field: field.to_string(),
        }
    }

    pub(crate) fn invalid(location: &str, field: &str, message: impl Into<String>) -> Self {
        Self::InvalidField {
            location: location.to_string(),
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Dotted location inside the rule document, when the error has one.
    pub fn location(&self) -> Option<&str> {
        match self {
            Self::MissingField { location, .. }
            | Self::InvalidField { location, .. }
            | Self::MalformedScope { location, .. }
            | Self::UnknownConditionType { location, .. }
            | Self::InvalidVariant { location, .. }
            | Self::InvalidSetting { location, .. } => Some(location),
            Self::MissingSection { section } => Some(section),
            Self::Io { .. } | Self::Json { .. } | Self::MissingLanguage { .. } => None,
        }
    }
}

/// Failure to evaluate a condition against a record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvalError {
    #[error("unresolved scope '{scope}': section or field not present in record")]
    UnresolvedScope { scope: Scope },
}

impl EvalError {
    pub fn scope(&self) -> &Scope {
        match self {
            Self::UnresolvedScope { scope } => scope,
        }
    }
}

/// Appends `key` to a dotted document location.
pub(crate) fn child(location: &str, key: &str) -> String {
    if location.is_empty() {
        key.to_string()
    } else {
        format!("{location}.{key}")
    }
}

/// Appends an array index to a dotted document location.
pub(crate) fn indexed(location: &str, key: &str, index: usize) -> String {
    format!("{}[{index}]", child(location, key))
}
