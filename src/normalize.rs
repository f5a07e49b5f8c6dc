// src/normalize.rs
//! Raw rule descriptions → canonical [`Ruleset`].
//!
//! Pipeline per ruleset:
//! 1) classify raw entries (`entry`),
//! 2) resolve provider rules (renames, duplicates, arity),
//! 3) partition type-checking rules ahead of pattern rules,
//! 4) inject a type guard when none was declared,
//! 5) recurse into `alternativeRuleSet` / `tableElements` / `listItems`.
mod entry;

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::descriptor::{RuleDescriptor, RuleProvider};
use crate::error::{DefinitionError, Location, ProviderError, MAX_DEPTH};
use crate::ruleset::{Emptiness, ListItems, Membership, Rule, RuleArgs, RuleKind, Ruleset, TableElements};
use crate::tag::TypeTag;

use entry::RawEntry;

/// Key path of a top-level subject.
pub const ROOT: &str = "root";

/// Legacy names may chain; a longer chain is treated as a cycle.
const MAX_RENAME_STEPS: usize = 8;

const TABLE_KEYS: &[&str] = &["rulesByElements", "exclusive", "whitelist", "blacklist"];
const LIST_KEYS: &[&str] = &["itemRules", "minOccur", "maxOccur"];

pub struct Normalizer<'p, P: RuleProvider + ?Sized> {
    provider: &'p P,
}

/// Everything collected from one raw description before the guard pass.
#[derive(Default)]
struct Draft {
    type_rules: Vec<Rule>,
    pattern_rules: Vec<Rule>,
    /// Semantic type of the first pattern rule, for guard inference.
    first_pattern: Option<(TypeTag, &'static str)>,
    optional: bool,
    nullable: bool,
    empty: bool,
    non_empty: bool,
    alternative_enum: Option<Vec<Value>>,
    alternative_rule_set: Option<Arc<Ruleset>>,
    table_elements: Option<TableElements>,
    list_items: Option<ListItems>,
}

impl<'p, P: RuleProvider + ?Sized> Normalizer<'p, P> {
    pub fn new(provider: &'p P) -> Self {
        Self { provider }
    }

    pub fn normalize(&self, raw: &Value) -> Result<Ruleset, DefinitionError> {
        self.normalize_at(raw, 0, ROOT)
    }

    pub fn normalize_at(&self, raw: &Value, depth: usize, key_path: &str) -> Result<Ruleset, DefinitionError> {
        let at = Location::new(depth, key_path);
        if depth > MAX_DEPTH {
            return Err(DefinitionError::RecursionLimit { at });
        }

        let mut draft = Draft::default();
        let mut seen: HashSet<&'static str> = HashSet::new();

        for raw_entry in entry::classify(raw, &at)? {
            if let Some(key) = raw_entry.core_key() {
                if !seen.insert(key) {
                    return Err(duplicate(key, Vec::new(), &at));
                }
            }
            match raw_entry {
                RawEntry::Optional(v) => draft.optional = flag("optional", v, &at)?,
                RawEntry::Nullable(v) => draft.nullable |= flag("nullable", v, &at)?,
                RawEntry::Empty(v) => draft.empty = flag("empty", v, &at)?,
                RawEntry::NonEmpty(v) => draft.non_empty = flag("nonEmpty", v, &at)?,
                RawEntry::Enum(v) => {
                    let values = enum_values("enum", v, false, &at)?;
                    let tag = enum_tag(&values);
                    draft.first_pattern.get_or_insert((tag, "enum"));
                    draft
                        .pattern_rules
                        .push(Rule::new("enum", RuleArgs::List(values), RuleKind::Enum));
                }
                RawEntry::AlternativeEnum(v) => {
                    let (values, has_null): (Vec<Value>, Vec<Value>) = enum_values("alternativeEnum", v, true, &at)?
                        .into_iter()
                        .partition(|v| !v.is_null());
                    if !has_null.is_empty() {
                        draft.nullable = true;
                    }
                    draft.alternative_enum = (!values.is_empty()).then_some(values);
                }
                RawEntry::AlternativeRuleSet(v) => {
                    let alt = self.normalize_at(v, depth + 1, key_path)?;
                    let nested = if alt.alternative_rule_set.is_some() {
                        Some("alternativeRuleSet")
                    } else if alt.table_elements.is_some() {
                        Some("tableElements")
                    } else if alt.list_items.is_some() {
                        Some("listItems")
                    } else {
                        None
                    };
                    if let Some(found) = nested {
                        return Err(DefinitionError::NestedAlternative { found, at });
                    }
                    draft.alternative_rule_set = Some(Arc::new(alt));
                }
                RawEntry::TableElements(v) => {
                    draft.table_elements = Some(self.table_elements(v, depth, key_path)?);
                }
                RawEntry::ListItems(v) => {
                    draft.list_items = Some(self.list_items(v, depth, key_path)?);
                }
                RawEntry::Provider { name, arg } => {
                    let (descriptor, renamed_from) = self.resolve(name, &at)?;
                    if !seen.insert(descriptor.name) {
                        return Err(duplicate(descriptor.name, renamed_from, &at));
                    }
                    let args = rule_args(&descriptor, arg, &renamed_from, &at)?;
                    self.provider
                        .prepare(descriptor.name, args.as_slice())
                        .map_err(|error| bad_argument(&descriptor, &renamed_from, error, &at))?;
                    let kind = if descriptor.type_checking { RuleKind::TypeCheck } else { RuleKind::Pattern };
                    let rule = Rule { name: descriptor.name, args, kind, renamed_from };
                    if descriptor.type_checking {
                        draft.type_rules.push(rule);
                    } else {
                        draft.first_pattern.get_or_insert((descriptor.semantic_type, descriptor.name));
                        draft.pattern_rules.push(rule);
                    }
                }
            }
        }

        self.finish(draft, at)
    }

    /// Follows the provider's rename table until a current name is reached.
    /// Returns the descriptor and the legacy names passed through, newest first.
    fn resolve(&self, name: &str, at: &Location) -> Result<(RuleDescriptor, Vec<String>), DefinitionError> {
        let mut current = name;
        let mut chain: Vec<String> = Vec::new();
        for _ in 0..=MAX_RENAME_STEPS {
            if let Some(descriptor) = self.provider.descriptor(current) {
                if !chain.is_empty() {
                    trace!(legacy = name, current = descriptor.name, "resolved renamed rule");
                }
                chain.reverse();
                return Ok((*descriptor, chain));
            }
            match self.provider.renamed(current) {
                Some(next) => {
                    chain.push(current.to_string());
                    current = next;
                }
                None => break,
            }
        }
        chain.reverse();
        Err(DefinitionError::UnknownRule { name: current.to_string(), renamed_from: chain, at: at.clone() })
    }

    fn finish(&self, draft: Draft, at: Location) -> Result<Ruleset, DefinitionError> {
        let emptiness = match (draft.empty, draft.non_empty) {
            (true, true) => return Err(DefinitionError::ContradictoryFlags { at }),
            (true, false) => Some(Emptiness::Empty),
            (false, true) => Some(Emptiness::NonEmpty),
            (false, false) => None,
        };

        let mut type_rules = draft.type_rules;
        if type_rules.is_empty() {
            let guard = if draft.table_elements.is_some() || draft.list_items.is_some() {
                Some(self.provider.container_guard())
            } else if let Some((tag, name)) = draft.first_pattern {
                let guard = self.provider.type_guard(tag).ok_or_else(|| DefinitionError::NoTypeGuard {
                    name: name.to_string(),
                    at: at.clone(),
                })?;
                Some(guard)
            } else if emptiness.is_some() {
                None
            } else {
                return Err(DefinitionError::EmptyRuleset { at });
            };
            if let Some(guard) = guard {
                debug!(guard, at = %at, "injected type guard");
                type_rules.push(Rule::new(guard, RuleArgs::None, RuleKind::TypeCheck));
            }
        }

        Ok(Ruleset {
            type_rules,
            pattern_rules: draft.pattern_rules,
            optional: draft.optional,
            nullable: draft.nullable,
            emptiness,
            alternative_enum: draft.alternative_enum,
            alternative_rule_set: draft.alternative_rule_set,
            table_elements: draft.table_elements,
            list_items: draft.list_items,
        })
    }

    // -------------------- child specifications --------------------

    fn table_elements(&self, raw: &Value, depth: usize, key_path: &str) -> Result<TableElements, DefinitionError> {
        let at = Location::new(depth, key_path);
        let Value::Object(map) = raw else {
            return Err(DefinitionError::BadChildShape { name: "tableElements", expected: "an object", at });
        };

        let wrapped = TABLE_KEYS.iter().any(|k| map.contains_key(*k));
        let elements = if wrapped {
            reject_unexpected("tableElements", map, TABLE_KEYS, &at)?;
            match map.get("rulesByElements") {
                Some(Value::Object(elements)) => elements,
                Some(_) => {
                    return Err(DefinitionError::BadChildShape { name: "rulesByElements", expected: "an object", at });
                }
                None => return Err(DefinitionError::EmptyTableElements { at }),
            }
        } else {
            map
        };
        if elements.is_empty() {
            return Err(DefinitionError::EmptyTableElements { at });
        }

        let mut rules_by_elements = IndexMap::with_capacity(elements.len());
        for (key, child) in elements {
            let path = format!("{key_path}.{key}");
            rules_by_elements.insert(key.clone(), Arc::new(self.normalize_at(child, depth + 1, &path)?));
        }

        let membership = if wrapped {
            membership(map, &rules_by_elements, &at)?
        } else {
            Membership::Open
        };
        Ok(TableElements { rules_by_elements, membership })
    }

    fn list_items(&self, raw: &Value, depth: usize, key_path: &str) -> Result<ListItems, DefinitionError> {
        let at = Location::new(depth, key_path);
        let item_path = format!("{key_path}[*]");

        let wrapped = match raw {
            Value::Object(map) if LIST_KEYS.iter().any(|k| map.contains_key(*k)) => Some(map),
            _ => None,
        };
        let Some(map) = wrapped else {
            let item_rules = self.normalize_at(raw, depth + 1, &item_path)?;
            return Ok(ListItems { min_occur: 0, max_occur: 0, item_rules: Arc::new(item_rules) });
        };

        reject_unexpected("listItems", map, LIST_KEYS, &at)?;
        let raw_items = map.get("itemRules").ok_or_else(|| DefinitionError::BadChildShape {
            name: "listItems",
            expected: "an object with `itemRules`",
            at: at.clone(),
        })?;
        let min_occur = occurrence("minOccur", map.get("minOccur"), &at)?;
        let max_occur = occurrence("maxOccur", map.get("maxOccur"), &at)?;
        if max_occur != 0 && max_occur < min_occur {
            return Err(DefinitionError::Occurrence {
                reason: format!("`maxOccur` {max_occur} is below `minOccur` {min_occur}"),
                at,
            });
        }
        let item_rules = self.normalize_at(raw_items, depth + 1, &item_path)?;
        Ok(ListItems { min_occur, max_occur, item_rules: Arc::new(item_rules) })
    }
}

// -------------------- helpers --------------------

fn duplicate(name: &str, renamed_from: Vec<String>, at: &Location) -> DefinitionError {
    DefinitionError::DuplicateRule { name: name.to_string(), renamed_from, at: at.clone() }
}

fn flag(name: &'static str, v: &Value, at: &Location) -> Result<bool, DefinitionError> {
    v.as_bool().ok_or_else(|| DefinitionError::BadFlag { name, at: at.clone() })
}

/// `true` → no arguments; a list is checked against the declared arity; any
/// other value is the single argument of a rule taking exactly one parameter.
fn rule_args(
    d: &RuleDescriptor,
    arg: &Value,
    renamed_from: &[String],
    at: &Location,
) -> Result<RuleArgs, DefinitionError> {
    let mismatch = |given: usize| DefinitionError::Arity {
        name: d.name.to_string(),
        renamed_from: renamed_from.to_vec(),
        required: d.params_required,
        allowed: d.params_allowed,
        given,
        at: at.clone(),
    };
    let arity = |given: usize| {
        if (d.params_required..=d.params_allowed).contains(&given) {
            Ok(())
        } else {
            Err(mismatch(given))
        }
    };
    match arg {
        Value::Bool(true) => arity(0).map(|()| RuleArgs::None),
        Value::Array(values) if values.is_empty() && d.params_allowed == 0 => Ok(RuleArgs::None),
        Value::Array(values) => arity(values.len()).map(|()| RuleArgs::List(values.clone())),
        Value::Bool(false) if d.params_allowed == 0 => Err(DefinitionError::BadArgument {
            name: d.name.to_string(),
            renamed_from: renamed_from.to_vec(),
            reason: "`false` does not switch a rule off, leave it out instead".into(),
            at: at.clone(),
        }),
        other if d.params_allowed == 1 => Ok(RuleArgs::List(vec![other.clone()])),
        _ => Err(mismatch(1)),
    }
}

fn bad_argument(d: &RuleDescriptor, renamed_from: &[String], error: ProviderError, at: &Location) -> DefinitionError {
    let reason = match error {
        ProviderError::BadArgument { reason, .. } => reason,
        other => other.to_string(),
    };
    DefinitionError::BadArgument { name: d.name.to_string(), renamed_from: renamed_from.to_vec(), reason, at: at.clone() }
}

/// Accepts `[a, b]` and the wrapped `[[a, b]]`.
fn enum_values(name: &'static str, v: &Value, allow_null: bool, at: &Location) -> Result<Vec<Value>, DefinitionError> {
    let bad = |reason: String| DefinitionError::BadEnum { name, reason, at: at.clone() };
    let Value::Array(list) = v else {
        return Err(bad("expects a list of values".into()));
    };
    let list = match list.as_slice() {
        [Value::Array(inner)] => inner,
        _ => list,
    };
    if list.is_empty() {
        return Err(bad("lists no values".into()));
    }
    for value in list {
        match value {
            Value::Bool(_) | Value::Number(_) | Value::String(_) => {}
            Value::Null if allow_null => {}
            Value::Null => return Err(bad("`null` is not a value, use `nullable`".into())),
            other => return Err(bad(format!("values must be scalars, got {other}"))),
        }
    }
    Ok(list.clone())
}

/// Narrowest tag covering every enum value.
fn enum_tag(values: &[Value]) -> TypeTag {
    let all = |f: fn(&Value) -> bool| values.iter().all(f);
    if all(|v| matches!(v, Value::Number(n) if !n.is_f64())) {
        TypeTag::INTEGER
    } else if all(Value::is_string) {
        TypeTag::STRING
    } else if all(Value::is_boolean) {
        TypeTag::BOOLEAN
    } else if all(Value::is_number) {
        TypeTag::NUMBER
    } else {
        TypeTag::SCALAR
    }
}

fn reject_unexpected(
    name: &'static str,
    map: &Map<String, Value>,
    allowed: &[&str],
    at: &Location,
) -> Result<(), DefinitionError> {
    match map.keys().find(|k| !allowed.contains(&k.as_str())) {
        Some(key) => Err(DefinitionError::UnexpectedKey { name, key: key.clone(), at: at.clone() }),
        None => Ok(()),
    }
}

fn occurrence(name: &str, v: Option<&Value>, at: &Location) -> Result<usize, DefinitionError> {
    let Some(v) = v else { return Ok(0) };
    v.as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| DefinitionError::Occurrence {
            reason: format!("`{name}` must be a non-negative integer, got {v}"),
            at: at.clone(),
        })
}

/// Reads the membership modifiers next to `rulesByElements`. `exclusive:
/// false` and empty lists count as absent.
fn membership(
    map: &Map<String, Value>,
    declared: &IndexMap<String, Arc<Ruleset>>,
    at: &Location,
) -> Result<Membership, DefinitionError> {
    let exclusive = match map.get("exclusive") {
        None => false,
        Some(v) => flag("exclusive", v, at)?,
    };
    let whitelist = key_set("whitelist", map.get("whitelist"), declared, at)?;
    let blacklist = key_set("blacklist", map.get("blacklist"), declared, at)?;

    match (exclusive, whitelist, blacklist) {
        (false, None, None) => Ok(Membership::Open),
        (true, None, None) => Ok(Membership::Exclusive),
        (false, Some(keys), None) => Ok(Membership::Whitelist(keys)),
        (false, None, Some(keys)) => Ok(Membership::Blacklist(keys)),
        _ => Err(DefinitionError::Membership {
            reason: "at most one of `exclusive`, `whitelist` and `blacklist` may be set".into(),
            at: at.clone(),
        }),
    }
}

fn key_set(
    name: &str,
    v: Option<&Value>,
    declared: &IndexMap<String, Arc<Ruleset>>,
    at: &Location,
) -> Result<Option<IndexSet<String>>, DefinitionError> {
    let bad = |reason: String| DefinitionError::Membership { reason, at: at.clone() };
    let Some(v) = v else { return Ok(None) };
    let Value::Array(items) = v else {
        return Err(bad(format!("`{name}` must be a list of keys")));
    };
    let mut keys = IndexSet::with_capacity(items.len());
    for item in items {
        let key = item
            .as_str()
            .ok_or_else(|| bad(format!("`{name}` entries must be strings, got {item}")))?;
        if declared.contains_key(key) {
            return Err(bad(format!("`{name}` lists declared key `{key}`")));
        }
        keys.insert(key.to_string());
    }
    Ok((!keys.is_empty()).then_some(keys))
}
