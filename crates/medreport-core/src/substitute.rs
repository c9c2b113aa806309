//! Safe `${section.field}` substitution against a flattened record.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use medreport_model::Record;
use regex::{Captures, Regex};
use tracing::debug;

/// `$$`, `${id}` or `$id`, where identifiers may contain dots.
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(?:(\$)|\{([._a-zA-Z][._a-zA-Z0-9]*)\}|([._a-zA-Z][._a-zA-Z0-9]*))")
        .expect("placeholder regex")
});

/// A record flattened to `"section.field"` keys and display strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopedValues {
    values: BTreeMap<String, String>,
}

impl ScopedValues {
    pub fn from_record(record: &Record) -> Self {
        let mut values = BTreeMap::new();
        for (section_name, section) in record.sections() {
            for (field, value) in section.iter() {
                values.insert(format!("{section_name}.{field}"), value.to_string());
            }
        }
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for ScopedValues
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

/// Replaces every placeholder that has a value; others are left as written.
pub fn substitute(text: &str, values: &ScopedValues) -> String {
    let mut missing = Vec::new();
    substitute_into(text, values, &mut missing)
}

/// Like [`substitute`], collecting the identifiers that had no value.
pub fn substitute_into(text: &str, values: &ScopedValues, missing: &mut Vec<String>) -> String {
    PLACEHOLDER
        .replace_all(text, |caps: &Captures<'_>| {
            if caps.get(1).is_some() {
                return "$".to_string();
            }
            let Some(name) = caps.get(2).or_else(|| caps.get(3)) else {
                return caps[0].to_string();
            };
            match values.get(name.as_str()) {
                Some(value) => value.to_string(),
                None => {
                    debug!(placeholder = name.as_str(), "no value for placeholder");
                    missing.push(name.as_str().to_string());
                    caps[0].to_string()
                }
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use medreport_model::{Section, Value};
    use proptest::prelude::*;

    fn values() -> ScopedValues {
        let record = Record::new()
            .with_section(
                "treatment",
                Section::new()
                    .with("dtn", 14)
                    .with("ivt_dose", 50.0)
                    .with("ivt_treatment", "alteplase")
                    .with("dio", Value::Null),
            )
            .with_section("patient", Section::new().with("age", 67));
        ScopedValues::from_record(&record)
    }

    #[test]
    fn flattens_sections_into_dotted_keys() {
        let values = values();
        assert_eq!(values.len(), 5);
        assert_eq!(values.get("treatment.dtn"), Some("14"));
        assert_eq!(values.get("treatment.ivt_dose"), Some("50"));
        assert_eq!(values.get("treatment.dio"), Some(""));
        assert_eq!(values.get("dtn"), None);
    }

    #[test]
    fn substitutes_braced_and_bare_forms() {
        let text = "${treatment.ivt_treatment} (${treatment.ivt_dose} mg), DTN $treatment.dtn min";
        assert_eq!(
            substitute(text, &values()),
            "alteplase (50 mg), DTN 14 min"
        );
    }

    #[test]
    fn unknown_placeholders_are_left_verbatim() {
        let mut missing = Vec::new();
        let text = substitute_into("Hello ${missing.key}!", &ScopedValues::default(), &mut missing);
        assert_eq!(text, "Hello ${missing.key}!");
        assert_eq!(missing, vec!["missing.key".to_string()]);
    }

    #[test]
    fn dollar_escapes_and_strays() {
        assert_eq!(substitute("costs $$5 and $ 3", &values()), "costs $5 and $ 3");
        assert_eq!(substitute("${unterminated", &values()), "${unterminated");
    }

    #[test]
    fn bare_form_takes_trailing_dot() {
        // The identifier pattern accepts dots, so a full stop right after a
        // bare placeholder becomes part of the name.
        assert_eq!(substitute("Age $patient.age.", &values()), "Age $patient.age.");
        assert_eq!(substitute("Age ${patient.age}.", &values()), "Age 67.");
    }

    proptest! {
        #[test]
        fn text_without_dollar_is_unchanged(text in "[^$]{0,64}") {
            prop_assert_eq!(substitute(&text, &values()), text);
        }
    }
}
