use std::collections::BTreeMap;
use std::fmt::{self, Write as _};
use std::path::Path;

use chrono::format::{Item, StrftimeItems};
use chrono::{NaiveDate, NaiveTime};
use medreport_model::ReportSection;
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, info};

use crate::block::Block;
use crate::condition::json_kind;
use crate::error::{RuleParseError, child};

const VARIABLES_KEY: &str = "variables";
const SETTINGS_KEY: &str = "settings";

/// Code to display-label mapping from the rule file's `variables` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelTable {
    labels: BTreeMap<String, String>,
}

impl LabelTable {
    pub fn get(&self, code: &str) -> Option<&str> {
        self.labels.get(code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.labels
            .iter()
            .map(|(code, label)| (code.as_str(), label.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for LabelTable
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            labels: iter
                .into_iter()
                .map(|(code, label)| (code.into(), label.into()))
                .collect(),
        }
    }
}

/// Formatting settings. Date and time patterns are strftime strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub date_format: String,
    pub time_format: String,
    extra: BTreeMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            date_format: "%Y-%m-%d".to_string(),
            time_format: "%H:%M".to_string(),
            extra: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Every string setting, date and time formats first.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        [
            ("date_format", self.date_format.as_str()),
            ("time_format", self.time_format.as_str()),
        ]
        .into_iter()
        .chain(
            self.extra
                .iter()
                .map(|(key, value)| (key.as_str(), value.as_str())),
        )
    }

    /// `date` in `date_format`, `None` if the pattern cannot format a date.
    pub fn format_date(&self, date: NaiveDate) -> Option<String> {
        render(date.format(&self.date_format))
    }

    /// `time` in `time_format`, `None` if the pattern cannot format a time.
    pub fn format_time(&self, time: NaiveTime) -> Option<String> {
        render(time.format(&self.time_format))
    }

    fn parse(node: &JsonValue) -> Result<Self, RuleParseError> {
        let Some(object) = node.as_object() else {
            return Err(RuleParseError::InvalidSetting {
                location: SETTINGS_KEY.to_string(),
                message: format!("expected an object, found {}", json_kind(node)),
            });
        };
        let date_format = format_setting(object, "date_format", |pattern| {
            render(NaiveDate::default().format(pattern))
        })?;
        let time_format = format_setting(object, "time_format", |pattern| {
            render(NaiveTime::default().format(pattern))
        })?;
        let mut extra = BTreeMap::new();
        for (key, value) in object {
            if key == "date_format" || key == "time_format" {
                continue;
            }
            match value {
                JsonValue::String(text) => {
                    extra.insert(key.clone(), text.clone());
                }
                other => debug!(setting = %key, kind = json_kind(other), "ignoring non-string setting"),
            }
        }
        Ok(Self {
            date_format,
            time_format,
            extra,
        })
    }
}

/// Writes a chrono formatter into a string; `None` when the pattern names
/// fields the value lacks.
fn render(formatted: impl fmt::Display) -> Option<String> {
    let mut text = String::new();
    write!(text, "{formatted}").ok()?;
    Some(text)
}

fn format_setting(
    object: &Map<String, JsonValue>,
    key: &str,
    sample: impl Fn(&str) -> Option<String>,
) -> Result<String, RuleParseError> {
    let location = child(SETTINGS_KEY, key);
    let pattern = match object.get(key) {
        None => return Err(RuleParseError::missing(SETTINGS_KEY, key)),
        Some(JsonValue::String(pattern)) => pattern,
        Some(other) => {
            return Err(RuleParseError::InvalidSetting {
                location,
                message: format!("expected a format string, found {}", json_kind(other)),
            });
        }
    };
    if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
        return Err(RuleParseError::InvalidSetting {
            location,
            message: format!("'{pattern}' is not a valid strftime pattern"),
        });
    }
    if sample(pattern).is_none() {
        return Err(RuleParseError::InvalidSetting {
            location,
            message: format!("'{pattern}' names fields this setting's values do not have"),
        });
    }
    Ok(pattern.clone())
}

/// A loaded rule file: one block per report section, label tables and settings.
///
/// Immutable once loaded; share it by reference across renders.
#[derive(Debug, Clone)]
pub struct RuleSet {
    language: String,
    blocks: BTreeMap<ReportSection, Block>,
    variables: BTreeMap<String, LabelTable>,
    settings: Settings,
}

impl RuleSet {
    /// Loads a rule file; the language is taken from the file stem.
    pub fn load(path: &Path) -> Result<Self, RuleParseError> {
        let text = std::fs::read_to_string(path).map_err(|e| RuleParseError::io(path, e))?;
        let document: JsonValue =
            serde_json::from_str(&text).map_err(|source| RuleParseError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        let language = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let rule_set = Self::from_json(language, &document)?;
        info!(
            path = %path.display(),
            language = %rule_set.language,
            clauses = rule_set.clause_count(),
            "loaded rule file"
        );
        Ok(rule_set)
    }

    pub fn from_json_str(language: impl Into<String>, text: &str) -> Result<Self, RuleParseError> {
        let document: JsonValue =
            serde_json::from_str(text).map_err(|source| RuleParseError::Json {
                path: "<inline>".into(),
                source,
            })?;
        Self::from_json(language, &document)
    }

    pub fn from_json(language: impl Into<String>, document: &JsonValue) -> Result<Self, RuleParseError> {
        let Some(root) = document.as_object() else {
            return Err(RuleParseError::invalid(
                "",
                "document",
                format!("expected an object, found {}", json_kind(document)),
            ));
        };

        let mut blocks = BTreeMap::new();
        for section in ReportSection::ALL {
            let key = section.as_str();
            let node = root.get(key).ok_or_else(|| RuleParseError::MissingSection {
                section: key.to_string(),
            })?;
            blocks.insert(section, Block::parse(key, node, key)?);
        }

        let variables = root
            .get(VARIABLES_KEY)
            .ok_or_else(|| RuleParseError::MissingSection {
                section: VARIABLES_KEY.to_string(),
            })
            .and_then(parse_variables)?;
        let settings = root
            .get(SETTINGS_KEY)
            .ok_or_else(|| RuleParseError::MissingSection {
                section: SETTINGS_KEY.to_string(),
            })
            .and_then(Settings::parse)?;

        for key in root.keys() {
            let known = key == VARIABLES_KEY
                || key == SETTINGS_KEY
                || key.parse::<ReportSection>().is_ok();
            if !known {
                debug!(key = %key, "ignoring unknown top-level key in rule file");
            }
        }

        Ok(Self {
            language: language.into(),
            blocks,
            variables,
            settings,
        })
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn block(&self, section: ReportSection) -> Option<&Block> {
        self.blocks.get(&section)
    }

    pub fn blocks(&self) -> impl Iterator<Item = (ReportSection, &Block)> {
        self.blocks.iter().map(|(section, block)| (*section, block))
    }

    pub fn labels(&self, table: &str) -> Option<&LabelTable> {
        self.variables.get(table)
    }

    pub fn label_tables(&self) -> impl Iterator<Item = (&str, &LabelTable)> {
        self.variables
            .iter()
            .map(|(name, table)| (name.as_str(), table))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Total number of variants across all sections, nested ones included.
    pub fn clause_count(&self) -> usize {
        self.blocks.values().map(Block::clause_count).sum()
    }
}

fn parse_variables(node: &JsonValue) -> Result<BTreeMap<String, LabelTable>, RuleParseError> {
    let Some(tables) = node.as_object() else {
        return Err(RuleParseError::invalid(
            "",
            VARIABLES_KEY,
            format!("expected an object, found {}", json_kind(node)),
        ));
    };
    let mut variables = BTreeMap::new();
    for (name, table) in tables {
        let location = child(VARIABLES_KEY, name);
        let Some(entries) = table.as_object() else {
            return Err(RuleParseError::invalid(
                VARIABLES_KEY,
                name,
                format!("expected a label table, found {}", json_kind(table)),
            ));
        };
        let mut labels = BTreeMap::new();
        for (code, label) in entries {
            match label {
                JsonValue::String(label) => {
                    labels.insert(code.clone(), label.clone());
                }
                other => {
                    return Err(RuleParseError::invalid(
                        &location,
                        code,
                        format!("labels must be strings, found {}", json_kind(other)),
                    ));
                }
            }
        }
        variables.insert(name.clone(), LabelTable { labels });
    }
    Ok(variables)
}
