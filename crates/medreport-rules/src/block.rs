//! Variant blocks: ordered lists of conditional clauses.

use medreport_model::{Record, Scope};
use serde_json::Value as JsonValue;
use tracing::{trace, warn};

use crate::condition::{Condition, condition_location, json_kind};
use crate::error::{EvalError, RuleParseError, child, indexed};

/// What a variant contributes when its condition holds.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Block(Block),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    pub condition: Condition,
    pub payload: Payload,
}

/// A named, ordered list of variants.
///
/// Rendering concatenates the payload of every variant whose condition
/// holds, in declaration order. Several variants may fire.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub name: String,
    pub variants: Vec<Variant>,
}

impl Block {
    pub fn new(name: impl Into<String>, variants: Vec<Variant>) -> Self {
        Self {
            name: name.into(),
            variants,
        }
    }

    /// Parses `{"variants": [...]}` found at `location`.
    pub fn parse(name: &str, node: &JsonValue, location: &str) -> Result<Self, RuleParseError> {
        let Some(object) = node.as_object() else {
            return Err(RuleParseError::invalid(
                location,
                name,
                format!("expected a block object, found {}", json_kind(node)),
            ));
        };
        let variants = match object.get("variants") {
            None => return Err(RuleParseError::missing(location, "variants")),
            Some(JsonValue::Array(variants)) => variants,
            Some(other) => {
                return Err(RuleParseError::invalid(
                    location,
                    "variants",
                    format!("expected a list, found {}", json_kind(other)),
                ));
            }
        };
        let variants = variants
            .iter()
            .enumerate()
            .map(|(index, node)| Variant::parse(node, &indexed(location, "variants", index)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(name, variants))
    }

    /// Renders the block, skipping clauses whose condition cannot be evaluated.
    pub fn render(&self, record: &Record) -> String {
        let mut unresolved = Vec::new();
        self.render_into(record, &mut unresolved)
    }

    /// Renders the block and collects the evaluation errors that were skipped.
    ///
    /// A variant whose condition fails contributes nothing; the remaining
    /// variants still render.
    pub fn render_into(&self, record: &Record, unresolved: &mut Vec<EvalError>) -> String {
        let mut out = String::new();
        for (index, variant) in self.variants.iter().enumerate() {
            match variant.condition.evaluate(record) {
                Ok(true) => {
                    trace!(block = %self.name, variant = index, "variant selected");
                    match &variant.payload {
                        Payload::Text(text) => out.push_str(text),
                        Payload::Block(block) => out.push_str(&block.render_into(record, unresolved)),
                    }
                }
                Ok(false) => {
                    trace!(block = %self.name, variant = index, "variant skipped");
                }
                Err(error) => {
                    warn!(
                        block = %self.name,
                        variant = index,
                        scope = %error.scope(),
                        "condition references a missing field; clause skipped"
                    );
                    unresolved.push(error);
                }
            }
        }
        out
    }

    /// Scopes read by any condition of the block or its nested blocks.
    pub fn scopes(&self) -> Vec<&Scope> {
        let mut scopes = Vec::new();
        for variant in &self.variants {
            scopes.extend(variant.condition.scopes());
            if let Payload::Block(block) = &variant.payload {
                scopes.extend(block.scopes());
            }
        }
        scopes
    }

    /// Number of variants including those of nested blocks.
    pub fn clause_count(&self) -> usize {
        self.variants
            .iter()
            .map(|variant| match &variant.payload {
                Payload::Text(_) => 1,
                Payload::Block(block) => 1 + block.clause_count(),
            })
            .sum()
    }
}

impl Variant {
    pub fn text(condition: Condition, text: impl Into<String>) -> Self {
        Self {
            condition,
            payload: Payload::Text(text.into()),
        }
    }

    pub fn block(condition: Condition, block: Block) -> Self {
        Self {
            condition,
            payload: Payload::Block(block),
        }
    }

    /// Parses `{"condition": ..., "text": "..."}` or
    /// `{"condition": ..., "<block name>": {"variants": [...]}}`.
    pub fn parse(node: &JsonValue, location: &str) -> Result<Self, RuleParseError> {
        let Some(object) = node.as_object() else {
            return Err(RuleParseError::InvalidVariant {
                location: location.to_string(),
                message: format!("expected an object, found {}", json_kind(node)),
            });
        };
        let condition = match object.get("condition") {
            Some(node) => Condition::parse(node, &condition_location(location))?,
            None => return Err(RuleParseError::missing(location, "condition")),
        };

        let mut payloads = object.iter().filter(|(key, _)| key.as_str() != "condition");
        let (key, node) = match (payloads.next(), payloads.next()) {
            (Some(payload), None) => payload,
            (None, _) => {
                return Err(RuleParseError::InvalidVariant {
                    location: location.to_string(),
                    message: "expected a 'text' or nested block payload".to_string(),
                });
            }
            (Some((first, _)), Some((second, _))) => {
                return Err(RuleParseError::InvalidVariant {
                    location: location.to_string(),
                    message: format!("expected one payload, found '{first}' and '{second}'"),
                });
            }
        };

        let payload = if key == "text" {
            match node {
                JsonValue::String(text) => Payload::Text(text.clone()),
                other => {
                    return Err(RuleParseError::invalid(
                        location,
                        "text",
                        format!("expected a string, found {}", json_kind(other)),
                    ));
                }
            }
        } else {
            Payload::Block(Block::parse(key, node, &child(location, key))?)
        };
        Ok(Self { condition, payload })
    }
}
