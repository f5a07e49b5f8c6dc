// src/normalize/entry.rs
//! Classification of raw ruleset entries.
//!
//! A raw description is an object (`{"integer": true, "range": [1, 3]}`), an
//! array of bare names and objects (`["integer", {"range": [1, 3]}]`) or a
//! single bare name. Object keys made only of digits with a string value are
//! bare names at an ordinal position (`{"0": "integer"}`).
use serde_json::{Map, Value};

use crate::error::{DefinitionError, Location};

/// Argument of a bare name.
static TRUE: Value = Value::Bool(true);

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum RawEntry<'a> {
    Optional(&'a Value),
    Nullable(&'a Value),
    Empty(&'a Value),
    NonEmpty(&'a Value),
    Enum(&'a Value),
    AlternativeEnum(&'a Value),
    AlternativeRuleSet(&'a Value),
    TableElements(&'a Value),
    ListItems(&'a Value),
    /// Anything else: a rule the provider has to know about.
    Provider { name: &'a str, arg: &'a Value },
}

impl<'a> RawEntry<'a> {
    fn classify(name: &'a str, arg: &'a Value) -> Self {
        match name {
            "optional" => RawEntry::Optional(arg),
            "nullable" => RawEntry::Nullable(arg),
            "empty" => RawEntry::Empty(arg),
            "nonEmpty" => RawEntry::NonEmpty(arg),
            "enum" => RawEntry::Enum(arg),
            "alternativeEnum" => RawEntry::AlternativeEnum(arg),
            "alternativeRuleSet" => RawEntry::AlternativeRuleSet(arg),
            "tableElements" => RawEntry::TableElements(arg),
            "listItems" => RawEntry::ListItems(arg),
            name => RawEntry::Provider { name, arg },
        }
    }

    /// Key of an engine-level entry; `None` for provider rules.
    pub(crate) fn core_key(&self) -> Option<&'static str> {
        Some(match self {
            RawEntry::Optional(_) => "optional",
            RawEntry::Nullable(_) => "nullable",
            RawEntry::Empty(_) => "empty",
            RawEntry::NonEmpty(_) => "nonEmpty",
            RawEntry::Enum(_) => "enum",
            RawEntry::AlternativeEnum(_) => "alternativeEnum",
            RawEntry::AlternativeRuleSet(_) => "alternativeRuleSet",
            RawEntry::TableElements(_) => "tableElements",
            RawEntry::ListItems(_) => "listItems",
            RawEntry::Provider { .. } => return None,
        })
    }
}

fn is_ordinal(key: &str) -> bool {
    !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit())
}

fn push_object<'a>(map: &'a Map<String, Value>, out: &mut Vec<RawEntry<'a>>) {
    for (key, arg) in map {
        match arg {
            Value::String(name) if is_ordinal(key) => out.push(RawEntry::classify(name, &TRUE)),
            _ => out.push(RawEntry::classify(key, arg)),
        }
    }
}

/// Flattens a raw description into entries, in declaration order.
pub(crate) fn classify<'a>(raw: &'a Value, at: &Location) -> Result<Vec<RawEntry<'a>>, DefinitionError> {
    let mut out = Vec::new();
    match raw {
        Value::Object(map) => push_object(map, &mut out),
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::String(name) => out.push(RawEntry::classify(name, &TRUE)),
                    Value::Object(map) => push_object(map, &mut out),
                    _ => {
                        return Err(DefinitionError::BadChildShape {
                            name: "ruleset",
                            expected: "a list of rule names and objects",
                            at: at.clone(),
                        });
                    }
                }
            }
        }
        Value::String(name) => out.push(RawEntry::classify(name, &TRUE)),
        _ => {
            return Err(DefinitionError::BadChildShape {
                name: "ruleset",
                expected: "an object, a list or a rule name",
                at: at.clone(),
            });
        }
    }
    Ok(out)
}
