// src/ruleset.rs
//! Canonical ruleset tree.
//!
//! Built once by [`crate::normalize::Normalizer`] and read-only afterwards.
//! Child rulesets sit behind `Arc`, so the `with_*` builders return copies that
//! share every untouched subtree.
use std::fmt;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use serde_json::{Map, Value};

use crate::record::clip;

// -------------------- rules --------------------

/// Arguments rendered before the display of a rule is cut short.
const SHOWN_ARGS: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub enum RuleArgs {
    /// Flag-only (`"rule": true`).
    None,
    List(Vec<Value>),
}

impl RuleArgs {
    pub fn as_slice(&self) -> &[Value] {
        match self {
            RuleArgs::None => &[],
            RuleArgs::List(values) => values,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    TypeCheck,
    Pattern,
    /// `enum`, answered by the provider's strict membership test.
    Enum,
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub(crate) name: &'static str,
    pub(crate) args: RuleArgs,
    pub(crate) kind: RuleKind,
    /// Legacy names this rule was reached through, oldest last.
    pub(crate) renamed_from: Vec<String>,
}

impl Rule {
    pub(crate) fn new(name: &'static str, args: RuleArgs, kind: RuleKind) -> Self {
        Self { name, args, kind, renamed_from: Vec::new() }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
    pub fn args(&self) -> &RuleArgs {
        &self.args
    }
    pub fn kind(&self) -> RuleKind {
        self.kind
    }
    pub fn renamed_from(&self) -> &[String] {
        &self.renamed_from
    }

    fn raw_args(&self) -> Value {
        match &self.args {
            RuleArgs::None => Value::Bool(true),
            RuleArgs::List(values) => Value::Array(values.clone()),
        }
    }
}

/// Rename history is diagnostic only.
impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.kind == other.kind && self.args == other.args
    }
}

impl fmt::Display for Rule {
    /// `range(1, 3)`, or the bare name for flag-only rules.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)?;
        if let RuleArgs::List(values) = &self.args {
            f.write_str("(")?;
            for (i, v) in values.iter().take(SHOWN_ARGS).enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                f.write_str(&clip(&v.to_string()))?;
            }
            if values.len() > SHOWN_ARGS {
                write!(f, ", … {} more", values.len() - SHOWN_ARGS)?;
            }
            f.write_str(")")?;
        }
        if !self.renamed_from.is_empty() {
            write!(f, " (renamed from {})", self.renamed_from.join(" <- "))?;
        }
        Ok(())
    }
}

// -------------------- ruleset --------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emptiness {
    /// An empty subject passes without looking further.
    Empty,
    /// An empty subject fails the main rules.
    NonEmpty,
}

impl Emptiness {
    pub fn key(self) -> &'static str {
        match self {
            Emptiness::Empty => "empty",
            Emptiness::NonEmpty => "nonEmpty",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ruleset {
    pub(crate) type_rules: Vec<Rule>,
    pub(crate) pattern_rules: Vec<Rule>,
    pub(crate) optional: bool,
    pub(crate) nullable: bool,
    pub(crate) emptiness: Option<Emptiness>,
    pub(crate) alternative_enum: Option<Vec<Value>>,
    pub(crate) alternative_rule_set: Option<Arc<Ruleset>>,
    pub(crate) table_elements: Option<TableElements>,
    pub(crate) list_items: Option<ListItems>,
}

impl Ruleset {
    pub fn type_rules(&self) -> &[Rule] {
        &self.type_rules
    }
    pub fn pattern_rules(&self) -> &[Rule] {
        &self.pattern_rules
    }
    /// All rules in evaluation order.
    pub fn rules(&self) -> impl Iterator<Item = &Rule> + '_ {
        self.type_rules.iter().chain(&self.pattern_rules)
    }
    pub fn is_optional(&self) -> bool {
        self.optional
    }
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }
    pub fn emptiness(&self) -> Option<Emptiness> {
        self.emptiness
    }
    pub fn alternative_enum(&self) -> Option<&[Value]> {
        self.alternative_enum.as_deref()
    }
    pub fn alternative_rule_set(&self) -> Option<&Ruleset> {
        self.alternative_rule_set.as_deref()
    }
    pub fn table_elements(&self) -> Option<&TableElements> {
        self.table_elements.as_ref()
    }
    pub fn list_items(&self) -> Option<&ListItems> {
        self.list_items.as_ref()
    }
    pub fn has_child_specs(&self) -> bool {
        self.table_elements.is_some() || self.list_items.is_some()
    }

    /// Copy with `tableElements` replaced. The subject is still checked for
    /// loopability at evaluation time, so a missing container guard is safe.
    pub fn with_table_elements(&self, elements: TableElements) -> Self {
        Self { table_elements: Some(elements), ..self.clone() }
    }

    pub fn with_list_items(&self, items: ListItems) -> Self {
        Self { list_items: Some(items), ..self.clone() }
    }

    /// Canonical raw form. Normalizing it yields an equal ruleset.
    pub fn to_raw(&self) -> Value {
        let mut out = Map::new();
        for rule in &self.type_rules {
            out.insert(rule.name.to_string(), rule.raw_args());
        }
        if self.optional {
            out.insert("optional".into(), Value::Bool(true));
        }
        if self.nullable {
            out.insert("nullable".into(), Value::Bool(true));
        }
        if let Some(emptiness) = self.emptiness {
            out.insert(emptiness.key().into(), Value::Bool(true));
        }
        for rule in &self.pattern_rules {
            out.insert(rule.name.to_string(), rule.raw_args());
        }
        if let Some(values) = &self.alternative_enum {
            out.insert("alternativeEnum".into(), Value::Array(values.clone()));
        }
        if let Some(alt) = &self.alternative_rule_set {
            out.insert("alternativeRuleSet".into(), alt.to_raw());
        }
        if let Some(table) = &self.table_elements {
            out.insert("tableElements".into(), table.to_raw());
        }
        if let Some(items) = &self.list_items {
            out.insert("listItems".into(), items.to_raw());
        }
        Value::Object(out)
    }
}

// -------------------- tableElements --------------------

/// Policy for keys a `tableElements` block does not declare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Membership {
    Open,
    Exclusive,
    Whitelist(IndexSet<String>),
    Blacklist(IndexSet<String>),
}

impl Membership {
    pub fn admits(&self, key: &str) -> bool {
        match self {
            Membership::Open => true,
            Membership::Exclusive => false,
            Membership::Whitelist(keys) => keys.contains(key),
            Membership::Blacklist(keys) => !keys.contains(key),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Membership::Open => "open",
            Membership::Exclusive => "exclusive",
            Membership::Whitelist(_) => "whitelist",
            Membership::Blacklist(_) => "blacklist",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableElements {
    pub(crate) rules_by_elements: IndexMap<String, Arc<Ruleset>>,
    pub(crate) membership: Membership,
}

impl TableElements {
    /// Declared keys, in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.rules_by_elements.keys().map(String::as_str)
    }
    pub fn get(&self, key: &str) -> Option<&Ruleset> {
        self.rules_by_elements.get(key).map(Arc::as_ref)
    }
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Ruleset)> + '_ {
        self.rules_by_elements
            .iter()
            .map(|(k, rs)| (k.as_str(), rs.as_ref()))
    }
    pub fn membership(&self) -> &Membership {
        &self.membership
    }

    /// Copy with `key` declared (or redeclared) as `rules`. The key leaves any
    /// whitelist/blacklist, since those only cover undeclared keys. An emptied
    /// whitelist admits nothing and becomes `Exclusive`; an emptied blacklist
    /// becomes `Open`.
    pub fn with_element(&self, key: impl Into<String>, rules: Ruleset) -> Self {
        let key = key.into();
        let membership = match &self.membership {
            Membership::Whitelist(keys) => match without(keys, &key) {
                rest if rest.is_empty() => Membership::Exclusive,
                rest => Membership::Whitelist(rest),
            },
            Membership::Blacklist(keys) => match without(keys, &key) {
                rest if rest.is_empty() => Membership::Open,
                rest => Membership::Blacklist(rest),
            },
            other => other.clone(),
        };
        let mut rules_by_elements = self.rules_by_elements.clone();
        rules_by_elements.insert(key, Arc::new(rules));
        Self { rules_by_elements, membership }
    }

    fn to_raw(&self) -> Value {
        let elements: Map<String, Value> = self
            .rules_by_elements
            .iter()
            .map(|(k, rs)| (k.clone(), rs.to_raw()))
            .collect();
        let mut out = Map::new();
        out.insert("rulesByElements".into(), Value::Object(elements));
        match &self.membership {
            Membership::Open => {}
            Membership::Exclusive => {
                out.insert("exclusive".into(), Value::Bool(true));
            }
            Membership::Whitelist(keys) => {
                out.insert("whitelist".into(), key_list(keys));
            }
            Membership::Blacklist(keys) => {
                out.insert("blacklist".into(), key_list(keys));
            }
        }
        Value::Object(out)
    }
}

fn without(keys: &IndexSet<String>, key: &str) -> IndexSet<String> {
    keys.iter().filter(|k| k.as_str() != key).cloned().collect()
}

fn key_list(keys: &IndexSet<String>) -> Value {
    Value::Array(keys.iter().cloned().map(Value::String).collect())
}

// -------------------- listItems --------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ListItems {
    pub(crate) min_occur: usize,
    /// 0 = unbounded.
    pub(crate) max_occur: usize,
    pub(crate) item_rules: Arc<Ruleset>,
}

impl ListItems {
    pub fn min_occur(&self) -> usize {
        self.min_occur
    }
    pub fn max_occur(&self) -> Option<usize> {
        (self.max_occur > 0).then_some(self.max_occur)
    }
    pub fn item_rules(&self) -> &Ruleset {
        &self.item_rules
    }

    pub fn with_item_rules(&self, rules: Ruleset) -> Self {
        Self { item_rules: Arc::new(rules), ..self.clone() }
    }

    fn to_raw(&self) -> Value {
        let mut out = Map::new();
        out.insert("itemRules".into(), self.item_rules.to_raw());
        if self.min_occur > 0 {
            out.insert("minOccur".into(), Value::from(self.min_occur));
        }
        if self.max_occur > 0 {
            out.insert("maxOccur".into(), Value::from(self.max_occur));
        }
        Value::Object(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn leaf(name: &'static str) -> Ruleset {
        Ruleset {
            type_rules: vec![Rule::new(name, RuleArgs::None, RuleKind::TypeCheck)],
            pattern_rules: vec![],
            optional: false,
            nullable: false,
            emptiness: None,
            alternative_enum: None,
            alternative_rule_set: None,
            table_elements: None,
            list_items: None,
        }
    }

    #[test]
    fn rule_display_lists_arguments() {
        let mut rule = Rule::new("range", RuleArgs::List(vec![json!(1), json!(3)]), RuleKind::Pattern);
        assert_eq!(rule.to_string(), "range(1, 3)");
        rule.renamed_from = vec!["between".into()];
        assert_eq!(rule.to_string(), "range(1, 3) (renamed from between)");
        assert_eq!(Rule::new("integer", RuleArgs::None, RuleKind::TypeCheck).to_string(), "integer");
    }

    #[test]
    fn rule_display_is_bounded() {
        let values = (0..300).map(|i| json!(i)).collect();
        let rule = Rule::new("enum", RuleArgs::List(values), RuleKind::Enum);
        assert_eq!(rule.to_string(), "enum(0, 1, 2, 3, 4, … 295 more)");

        let pattern = format!("^a\u{1b}[31m{}$", "b".repeat(100));
        let rule = Rule::new("regex", RuleArgs::List(vec![json!(pattern)]), RuleKind::Pattern);
        let shown = rule.to_string();
        assert!(!shown.chars().any(char::is_control));
        assert!(shown.ends_with("…)"));
        assert!(shown.chars().count() < 60);
    }

    #[test]
    fn rename_history_does_not_affect_equality() {
        let a = Rule::new("loopable", RuleArgs::None, RuleKind::TypeCheck);
        let mut b = a.clone();
        b.renamed_from.push("iterable".into());
        assert_eq!(a, b);
    }

    #[test]
    fn to_raw_orders_types_flags_patterns_children() {
        let mut rs = leaf("integer");
        rs.nullable = true;
        rs.pattern_rules.push(Rule::new("range", RuleArgs::List(vec![json!(1), json!(3)]), RuleKind::Pattern));
        rs.alternative_enum = Some(vec![json!("n/a")]);
        let raw = rs.to_raw();
        let keys: Vec<&str> = raw.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, ["integer", "nullable", "range", "alternativeEnum"]);
        assert_eq!(raw["range"], json!([1, 3]));
    }

    #[test]
    fn with_element_shares_untouched_children() {
        let saddle = Arc::new(leaf("string"));
        let table = TableElements {
            rules_by_elements: IndexMap::from([
                ("wheels".to_string(), Arc::new(leaf("integer"))),
                ("saddle".to_string(), saddle.clone()),
            ]),
            membership: Membership::Whitelist(IndexSet::from(["bell".to_string()])),
        };
        let next = table.with_element("bell", leaf("boolean"));
        assert!(Arc::ptr_eq(&next.rules_by_elements["saddle"], &saddle));
        assert_eq!(next.keys().collect::<Vec<_>>(), ["wheels", "saddle", "bell"]);
        assert_eq!(next.membership, Membership::Exclusive);
        // original untouched
        assert_eq!(table.keys().count(), 2);
    }

    #[test]
    fn membership_policies() {
        assert!(Membership::Open.admits("x"));
        assert!(!Membership::Exclusive.admits("x"));
        let list = IndexSet::from(["x".to_string()]);
        assert!(Membership::Whitelist(list.clone()).admits("x"));
        assert!(!Membership::Blacklist(list).admits("x"));
    }

    #[test]
    fn unbounded_max_occur_reads_as_none() {
        let items = ListItems { min_occur: 1, max_occur: 0, item_rules: Arc::new(leaf("integer")) };
        assert_eq!(items.max_occur(), None);
        assert_eq!(items.with_item_rules(leaf("string")).item_rules().type_rules()[0].name(), "string");
    }
}
