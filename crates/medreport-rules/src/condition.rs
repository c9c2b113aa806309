//! Boolean condition DSL over scoped record fields.
//!
//! Rule documents describe conditions as tagged JSON objects:
//!
//! ```json
//! {"type": "AND", "conditions": [
//!     {"type": "VALUE", "scope": "diagnosis.stroke_type", "value": "ischemic"},
//!     {"type": "EXISTENCE", "scope": "diagnosis.aspects_score", "value": true}
//! ]}
//! ```
//!
//! An empty object is the empty condition and always holds.

use chrono::NaiveTime;
use medreport_model::{Record, Scope, Value};
use serde_json::{Map, Value as JsonValue};

use crate::error::{EvalError, RuleParseError, child, indexed};

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// No predicate.
    Empty,
    /// The field equals `expected` exactly; no coercion between kinds.
    Value { scope: Scope, expected: Value },
    /// The field's presence matches `want_present` (see [`existence_holds`]).
    Existence { scope: Scope, want_present: bool },
    And(Vec<Condition>),
    Or(Vec<Condition>),
    /// Holds when every child is false.
    Not(Vec<Condition>),
}

impl Condition {
    /// Parses a condition node found at `location` in a rule document.
    pub fn parse(node: &JsonValue, location: &str) -> Result<Self, RuleParseError> {
        let Some(object) = node.as_object() else {
            return Err(RuleParseError::invalid(
                location,
                "condition",
                format!("expected an object, found {}", json_kind(node)),
            ));
        };
        if object.is_empty() {
            return Ok(Condition::Empty);
        }

        let kind = match object.get("type") {
            None => return Err(RuleParseError::missing(location, "type")),
            Some(JsonValue::String(kind)) => kind.as_str(),
            Some(other) => {
                return Err(RuleParseError::invalid(
                    location,
                    "type",
                    format!("expected a string, found {}", json_kind(other)),
                ));
            }
        };

        match kind {
            "VALUE" => {
                let scope = parse_scope(object, location)?;
                let expected = parse_expected(object, location)?;
                Ok(Condition::Value { scope, expected })
            }
            "EXISTENCE" => {
                let scope = parse_scope(object, location)?;
                let want_present = match object.get("value") {
                    None | Some(JsonValue::Null) => {
                        return Err(RuleParseError::missing(location, "value"));
                    }
                    Some(JsonValue::Bool(flag)) => *flag,
                    Some(other) => {
                        return Err(RuleParseError::invalid(
                            location,
                            "value",
                            format!("EXISTENCE expects true or false, found {}", json_kind(other)),
                        ));
                    }
                };
                Ok(Condition::Existence {
                    scope,
                    want_present,
                })
            }
            "AND" => Ok(Condition::And(parse_children(object, location)?)),
            "OR" => Ok(Condition::Or(parse_children(object, location)?)),
            "NOT" => Ok(Condition::Not(parse_children(object, location)?)),
            other => Err(RuleParseError::UnknownConditionType {
                location: location.to_string(),
                kind: other.to_string(),
            }),
        }
    }

    /// Evaluates the condition against `record`.
    ///
    /// `AND` and `NOT` stop at the first deciding child. `OR` evaluates every
    /// child, so a missing field in any branch is reported even when an
    /// earlier branch already held.
    pub fn evaluate(&self, record: &Record) -> Result<bool, EvalError> {
        match self {
            Condition::Empty => Ok(true),
            Condition::Value { scope, expected } => Ok(lookup(record, scope)? == expected),
            Condition::Existence {
                scope,
                want_present,
            } => Ok(existence_holds(lookup(record, scope)?, *want_present)),
            Condition::And(children) => {
                for condition in children {
                    if !condition.evaluate(record)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Condition::Or(children) => {
                let mut any = false;
                for condition in children {
                    any |= condition.evaluate(record)?;
                }
                Ok(any)
            }
            Condition::Not(children) => {
                for condition in children {
                    if condition.evaluate(record)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
        }
    }

    /// Every scope the condition reads, in document order.
    pub fn scopes(&self) -> Vec<&Scope> {
        let mut scopes = Vec::new();
        self.collect_scopes(&mut scopes);
        scopes
    }

    fn collect_scopes<'a>(&'a self, out: &mut Vec<&'a Scope>) {
        match self {
            Condition::Empty => {}
            Condition::Value { scope, .. } | Condition::Existence { scope, .. } => out.push(scope),
            Condition::And(children) | Condition::Or(children) | Condition::Not(children) => {
                for condition in children {
                    condition.collect_scopes(out);
                }
            }
        }
    }
}

/// Presence test used by `EXISTENCE` conditions.
///
/// A falsy value (null, zero, empty text, `false`, midnight) counts as
/// absent. Any other value is compared by kind: numbers and dates are
/// present, times are present when after midnight, text when non-empty,
/// and a boolean is compared to the wanted flag directly.
pub fn existence_holds(actual: &Value, want_present: bool) -> bool {
    if !actual.is_truthy() {
        return !want_present;
    }
    match actual {
        Value::Int(_) | Value::Float(_) | Value::Date(_) | Value::DateTime(_) => want_present,
        Value::Time(time) => want_present == (*time > NaiveTime::MIN),
        Value::Bool(flag) => want_present == *flag,
        Value::Text(text) => want_present == !text.is_empty(),
        Value::Null => !want_present,
    }
}

fn lookup<'r>(record: &'r Record, scope: &Scope) -> Result<&'r Value, EvalError> {
    record
        .get(scope)
        .ok_or_else(|| EvalError::UnresolvedScope {
            scope: scope.clone(),
        })
}

fn parse_scope(object: &Map<String, JsonValue>, location: &str) -> Result<Scope, RuleParseError> {
    match object.get("scope") {
        None | Some(JsonValue::Null) => Err(RuleParseError::missing(location, "scope")),
        Some(JsonValue::String(raw)) => {
            Scope::parse(raw).map_err(|source| RuleParseError::MalformedScope {
                location: location.to_string(),
                source,
            })
        }
        Some(other) => Err(RuleParseError::invalid(
            location,
            "scope",
            format!("expected a string, found {}", json_kind(other)),
        )),
    }
}

fn parse_expected(object: &Map<String, JsonValue>, location: &str) -> Result<Value, RuleParseError> {
    match object.get("value") {
        None | Some(JsonValue::Null) => Err(RuleParseError::missing(location, "value")),
        Some(JsonValue::Bool(flag)) => Ok(Value::Bool(*flag)),
        Some(JsonValue::String(text)) => Ok(Value::Text(text.clone())),
        Some(JsonValue::Number(number)) => {
            if let Some(int) = number.as_i64() {
                Ok(Value::Int(int))
            } else if let Some(float) = number.as_f64() {
                Ok(Value::Float(float))
            } else {
                Err(RuleParseError::invalid(
                    location,
                    "value",
                    format!("number {number} is out of range"),
                ))
            }
        }
        Some(other) => Err(RuleParseError::invalid(
            location,
            "value",
            format!("expected a scalar, found {}", json_kind(other)),
        )),
    }
}

fn parse_children(
    object: &Map<String, JsonValue>,
    location: &str,
) -> Result<Vec<Condition>, RuleParseError> {
    let children = match object.get("conditions") {
        None => return Err(RuleParseError::missing(location, "conditions")),
        Some(JsonValue::Array(children)) => children,
        Some(other) => {
            return Err(RuleParseError::invalid(
                location,
                "conditions",
                format!("expected a list, found {}", json_kind(other)),
            ));
        }
    };
    children
        .iter()
        .enumerate()
        .map(|(index, node)| Condition::parse(node, &indexed(location, "conditions", index)))
        .collect()
}

pub(crate) fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "a list",
        JsonValue::Object(_) => "an object",
    }
}

/// Location of a variant's condition node.
pub(crate) fn condition_location(variant_location: &str) -> String {
    child(variant_location, "condition")
}
