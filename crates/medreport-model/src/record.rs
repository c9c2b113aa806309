//! Nested report records: section name -> field name -> value.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ScopeError;
use crate::value::Value;

/// The fields of one report section, in insertion order.
///
/// Order matters: enumerated clauses list their labels in the order the
/// flags were inserted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Section {
    fields: Vec<(String, Value)>,
}

impl Section {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field. An existing field keeps its position and returns its previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.fields.iter_mut().find(|(key, _)| *key == name) {
            return Some(std::mem::replace(&mut slot.1, value));
        }
        self.fields.push((name, value));
        None
    }

    /// Builder-style variant of [`Section::insert`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Section
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut section = Section::new();
        for (key, value) in iter {
            section.insert(key, value);
        }
        section
    }
}

/// A full patient record, keyed by section name.
///
/// Built once per report subject and read-only while rendering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    sections: BTreeMap<String, Section>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_section(&mut self, name: impl Into<String>, section: Section) {
        self.sections.insert(name.into(), section);
    }

    #[must_use]
    pub fn with_section(mut self, name: impl Into<String>, section: Section) -> Self {
        self.insert_section(name, section);
        self
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }

    /// Looks up the value a scope points at.
    pub fn get(&self, scope: &Scope) -> Option<&Value> {
        self.sections
            .get(&scope.section)
            .and_then(|section| section.get(&scope.field))
    }

    pub fn sections(&self) -> impl Iterator<Item = (&str, &Section)> {
        self.sections
            .iter()
            .map(|(name, section)| (name.as_str(), section))
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// A `section.field` address inside a [`Record`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Scope {
    pub section: String,
    pub field: String,
}

impl Scope {
    pub fn new(section: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            field: field.into(),
        }
    }

    /// Splits `raw` on `.` into exactly two non-empty parts.
    pub fn parse(raw: &str) -> Result<Self, ScopeError> {
        let mut parts = raw.split('.');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(section), Some(field), None) if !section.is_empty() && !field.is_empty() => {
                Ok(Self::new(section, field))
            }
            _ => Err(ScopeError::Malformed {
                scope: raw.to_string(),
            }),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.section, self.field)
    }
}

impl FromStr for Scope {
    type Err = ScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scope::parse(s)
    }
}
