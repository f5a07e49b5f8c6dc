// src/challenge.rs
//! Recursive interpreter: walks a subject against a canonical [`Ruleset`].
//!
//! Per node:
//! 1) `null` short-circuits on `nullable`,
//! 2) type rules, then emptiness, then pattern rules,
//! 3) on failure: `alternativeEnum`, else `alternativeRuleSet`,
//! 4) child specs: `tableElements` first, `listItems` only if it failed.
use std::borrow::Cow;

use serde::Deserialize;
use serde_json::Value;
use tracing::trace;

use crate::descriptor::{ContainerKind, RuleProvider};
use crate::error::{ChallengeError, Location, MAX_DEPTH};
use crate::normalize::Normalizer;
use crate::record::{clip, Failure, FailureKind, SubjectPreview};
use crate::ruleset::{Emptiness, ListItems, RuleKind, Ruleset, TableElements};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecordMode {
    /// No record; the walk stops at the first failure.
    #[default]
    Off,
    /// Record the path to the first failure.
    #[serde(alias = "first")]
    StopAtFirst,
    /// Record everything; every sibling is visited.
    #[serde(alias = "all")]
    Continue,
}

/// Outcome of the main (non-fallback) rules of one node.
enum Main {
    /// Passed; carries the container kind a composite type check recognised.
    Pass(Option<ContainerKind>),
    /// Passed and nothing below needs looking at.
    Settled,
    Fail(Failed),
}

enum Failed {
    Null,
    Rule(String),
}

pub struct Challenger<'p, P: RuleProvider + ?Sized> {
    provider: &'p P,
    mode: RecordMode,
    record: Vec<Failure>,
}

impl<'p, P: RuleProvider + ?Sized> Challenger<'p, P> {
    pub fn new(provider: &'p P) -> Self {
        Self { provider, mode: RecordMode::Off, record: Vec::new() }
    }

    pub fn with_record(mut self, mode: RecordMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> RecordMode {
        self.mode
    }

    /// Checks `subject` against `rules`. The record is reset first.
    pub fn challenge(&mut self, subject: &Value, rules: &Ruleset, key_path: &str) -> Result<bool, ChallengeError> {
        self.record.clear();
        self.node(subject, rules, 0, key_path)
    }

    /// Normalizes `raw` with this challenger's provider, then challenges.
    pub fn challenge_raw(&mut self, subject: &Value, raw: &Value, key_path: &str) -> Result<bool, ChallengeError> {
        let rules = Normalizer::new(self.provider).normalize(raw)?;
        self.challenge(subject, &rules, key_path)
    }

    pub fn record(&self) -> &[Failure] {
        &self.record
    }

    pub fn record_lines(&self) -> Vec<String> {
        self.record.iter().map(ToString::to_string).collect()
    }

    pub fn take_record(&mut self) -> Vec<Failure> {
        std::mem::take(&mut self.record)
    }

    fn keep_going(&self) -> bool {
        self.mode == RecordMode::Continue
    }

    fn fail(&mut self, depth: usize, key_path: &str, subject: &Value, kind: FailureKind) {
        trace!(depth, key_path, failure = %kind, "node failed");
        if self.mode != RecordMode::Off {
            self.record.push(Failure {
                depth,
                key_path: key_path.to_string(),
                kind,
                subject: SubjectPreview::of(subject),
            });
        }
    }

    fn node(&mut self, subject: &Value, rules: &Ruleset, depth: usize, key_path: &str) -> Result<bool, ChallengeError> {
        if depth > MAX_DEPTH {
            return Err(ChallengeError::RecursionLimit { at: Location::new(depth, key_path) });
        }

        let container = match self.main_rules(subject, rules)? {
            Main::Settled => return Ok(true),
            Main::Pass(container) => container,
            Main::Fail(failed) => {
                let mut alternatives = Vec::new();
                if let Some(values) = rules.alternative_enum() {
                    if !subject.is_null() && self.provider.enum_(subject, values) {
                        return Ok(true);
                    }
                    alternatives.push("alternativeEnum");
                }
                let mut rescued = false;
                if let Some(alt) = rules.alternative_rule_set() {
                    let mark = self.record.len();
                    rescued = self.node(subject, alt, depth, key_path)?;
                    self.record.truncate(mark);
                    alternatives.push("alternativeRuleSet");
                }
                if !rescued {
                    let kind = match failed {
                        Failed::Null => FailureKind::Null { alternatives },
                        Failed::Rule(rule) => FailureKind::Rule { rule, alternatives },
                    };
                    self.fail(depth, key_path, subject, kind);
                    return Ok(false);
                }
                if subject.is_null() {
                    return Ok(true);
                }
                None
            }
        };

        if !rules.has_child_specs() {
            return Ok(true);
        }
        let Some(kind) = container.or_else(|| self.provider.loopable(subject)) else {
            self.fail(depth, key_path, subject, FailureKind::NotLoopable);
            return Ok(false);
        };

        let mark = self.record.len();
        if let Some(table) = rules.table_elements() {
            if self.table_elements(subject, kind, table, depth, key_path)? {
                return Ok(true);
            }
            if rules.list_items().is_none() {
                return Ok(false);
            }
        }
        match rules.list_items() {
            Some(items) => {
                let passed = self.list_items(subject, kind, items, depth, key_path)?;
                if passed {
                    // the table's complaints are moot
                    self.record.truncate(mark);
                }
                Ok(passed)
            }
            None => Ok(true),
        }
    }

    fn main_rules(&self, subject: &Value, rules: &Ruleset) -> Result<Main, ChallengeError> {
        if subject.is_null() {
            return Ok(if rules.is_nullable() { Main::Settled } else { Main::Fail(Failed::Null) });
        }

        let mut container = None;
        for rule in rules.type_rules() {
            let verdict = self.provider.check(rule.name(), subject, rule.args().as_slice())?;
            if !verdict.passed() {
                return Ok(Main::Fail(Failed::Rule(rule.to_string())));
            }
            container = container.or(verdict.container());
        }

        match rules.emptiness() {
            Some(Emptiness::NonEmpty) if self.provider.is_empty(subject) => {
                return Ok(Main::Fail(Failed::Rule(Emptiness::NonEmpty.key().to_string())));
            }
            Some(Emptiness::Empty) if self.provider.is_empty(subject) => return Ok(Main::Settled),
            _ => {}
        }

        for rule in rules.pattern_rules() {
            let passed = match rule.kind() {
                RuleKind::Enum => self.provider.enum_(subject, rule.args().as_slice()),
                _ => self.provider.check(rule.name(), subject, rule.args().as_slice())?.passed(),
            };
            if !passed {
                return Ok(Main::Fail(Failed::Rule(rule.to_string())));
            }
        }
        Ok(Main::Pass(container))
    }

    fn table_elements(
        &mut self,
        subject: &Value,
        kind: ContainerKind,
        table: &TableElements,
        depth: usize,
        key_path: &str,
    ) -> Result<bool, ChallengeError> {
        let mut ok = true;
        let mut present = vec![false; table.rules_by_elements.len()];

        for (key, value) in entries(subject) {
            match table.rules_by_elements.get_full(key.as_ref()) {
                Some((index, _, child)) => {
                    present[index] = true;
                    let path = child_path(key_path, kind, &key);
                    if !self.node(value, child, depth + 1, &path)? {
                        ok = false;
                        if !self.keep_going() {
                            return Ok(false);
                        }
                    }
                }
                None if table.membership().admits(&key) => {}
                None => {
                    ok = false;
                    let policy = table.membership().name();
                    self.fail(depth, key_path, subject, FailureKind::UndeclaredKey { key: clip(&key), policy });
                    if !self.keep_going() {
                        return Ok(false);
                    }
                }
            }
        }

        for ((key, child), seen) in table.iter().zip(present) {
            if seen || child.is_optional() {
                continue;
            }
            ok = false;
            self.fail(depth, key_path, subject, FailureKind::MissingKey { key: clip(key) });
            if !self.keep_going() {
                return Ok(false);
            }
        }
        Ok(ok)
    }

    fn list_items(
        &mut self,
        subject: &Value,
        kind: ContainerKind,
        items: &ListItems,
        depth: usize,
        key_path: &str,
    ) -> Result<bool, ChallengeError> {
        let mut ok = true;
        let mut seen = 0;

        for (key, value) in entries(subject) {
            seen += 1;
            if let Some(max) = items.max_occur()
                && seen == max + 1
            {
                ok = false;
                self.fail(depth, key_path, subject, FailureKind::TooMany { max });
                if !self.keep_going() {
                    return Ok(false);
                }
            }
            let path = child_path(key_path, kind, &key);
            if !self.node(value, items.item_rules(), depth + 1, &path)? {
                ok = false;
                if !self.keep_going() {
                    return Ok(false);
                }
            }
        }

        if seen < items.min_occur() {
            ok = false;
            self.fail(depth, key_path, subject, FailureKind::TooFew { min: items.min_occur(), seen });
        }
        Ok(ok)
    }
}

/// Entries in the subject's natural order; ordinal keys are decimal indices.
fn entries(subject: &Value) -> Box<dyn Iterator<Item = (Cow<'_, str>, &Value)> + '_> {
    match subject {
        Value::Object(map) => Box::new(map.iter().map(|(k, v)| (Cow::Borrowed(k.as_str()), v))),
        Value::Array(items) => Box::new(
            items
                .iter()
                .enumerate()
                .map(|(i, v)| (Cow::Owned(i.to_string()), v)),
        ),
        _ => Box::new(std::iter::empty()),
    }
}

fn child_path(key_path: &str, kind: ContainerKind, key: &str) -> String {
    match kind {
        ContainerKind::List => format!("{key_path}[{key}]"),
        ContainerKind::Map => format!("{key_path}.{}", clip(key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DefinitionError;
    use crate::normalize::ROOT;
    use crate::rules::StandardRules;
    use serde_json::json;

    fn check(mode: RecordMode, subject: Value, raw: Value) -> (bool, Vec<String>) {
        let rules = StandardRules::new();
        let mut challenger = Challenger::new(&rules).with_record(mode);
        let passed = challenger.challenge_raw(&subject, &raw, ROOT).unwrap();
        (passed, challenger.record_lines())
    }

    fn passes(subject: Value, raw: Value) -> bool {
        check(RecordMode::Off, subject, raw).0
    }

    #[test]
    fn integer_in_range() {
        let raw = json!({"integer": true, "range": [1, 3]});
        assert!(passes(json!(2), raw.clone()));
        let (passed, record) = check(RecordMode::StopAtFirst, json!(4), raw.clone());
        assert!(!passed);
        assert_eq!(record.len(), 1);
        assert!(record[0].contains("range") && record[0].contains("1, 3"), "{}", record[0]);
        assert_eq!(record[0], "0 root: range(1, 3) failed - integer 4");
        assert!(!passes(json!("2"), raw));
    }

    #[test]
    fn exclusive_table() {
        let raw = json!({"tableElements": {
            "rulesByElements": {"wheels": {"integer": true, "range": [1, 3]}, "saddle": "string"},
            "exclusive": true
        }});
        assert!(passes(json!({"wheels": 2, "saddle": "leather"}), raw.clone()));

        let (passed, record) = check(RecordMode::StopAtFirst, json!({"wheels": 2, "saddle": "x", "bell": true}), raw.clone());
        assert!(!passed);
        assert_eq!(record, ["0 root: key `bell` is not allowed (exclusive) - map(3)"]);

        let (passed, record) = check(RecordMode::StopAtFirst, json!({"wheels": 2}), raw.clone());
        assert!(!passed);
        assert_eq!(record, ["0 root: required key `saddle` is missing - map(1)"]);

        let (_, record) = check(RecordMode::StopAtFirst, json!({"wheels": 5, "saddle": "x"}), raw);
        assert_eq!(record, ["1 root.wheels: range(1, 3) failed - integer 5"]);
    }

    #[test]
    fn optional_elements_may_be_missing() {
        let raw = json!({"tableElements": {"wheels": "integer", "bell": ["boolean", "optional"]}});
        assert!(passes(json!({"wheels": 2}), raw.clone()));
        assert!(!passes(json!({"bell": true}), raw));
    }

    #[test]
    fn whitelist_and_blacklist() {
        let white = json!({"tableElements": {"rulesByElements": {"a": "integer"}, "whitelist": ["b"]}});
        assert!(passes(json!({"a": 1, "b": "anything"}), white.clone()));
        assert!(!passes(json!({"a": 1, "c": 0}), white));

        let black = json!({"tableElements": {"rulesByElements": {"a": "integer"}, "blacklist": ["b"]}});
        assert!(passes(json!({"a": 1, "c": 0}), black.clone()));
        assert!(!passes(json!({"a": 1, "b": 0}), black));
    }

    #[test]
    fn null_handling() {
        let nullable = json!({"integer": true, "alternativeEnum": [null]});
        assert!(passes(Value::Null, nullable.clone()));
        assert!(passes(json!(1), nullable.clone()));
        assert!(!passes(json!("1"), nullable));

        let (passed, record) = check(RecordMode::StopAtFirst, Value::Null, json!("integer"));
        assert!(!passed);
        assert_eq!(record, ["0 root: null is not allowed - null"]);
    }

    #[test]
    fn alternative_enum_is_strict_and_skips_children() {
        let raw = json!({
            "listItems": {"itemRules": "integer", "minOccur": 1},
            "alternativeEnum": ["none", 0]
        });
        assert!(passes(json!("none"), raw.clone()));
        assert!(passes(json!(0), raw.clone()));
        assert!(!passes(json!(0.0), raw.clone()));
        assert!(!passes(json!("0"), raw.clone()));
        assert!(passes(json!([1, 2]), raw.clone()));
        assert!(!passes(json!([]), raw));
    }

    #[test]
    fn alternative_rule_set_rescues_and_its_record_is_dropped() {
        let raw = json!({"integer": true, "alternativeRuleSet": {"string": true, "regex": "^\\d+$"}});
        let (passed, record) = check(RecordMode::Continue, json!("42"), raw.clone());
        assert!(passed);
        assert!(record.is_empty());

        let (passed, record) = check(RecordMode::Continue, json!("forty"), raw);
        assert!(!passed);
        assert_eq!(record, ["0 root: integer failed, alternativeRuleSet did not match either - string(5) \"forty\""]);
    }

    #[test]
    fn rescued_subject_still_meets_child_specs() {
        let raw = json!({
            "keyedArray": true,
            "tableElements": {"a": "integer"},
            "alternativeRuleSet": {"indexedArray": true}
        });
        assert!(passes(json!({"a": 1}), raw.clone()));
        // a list gets past the alternative but has no key `a`
        assert!(!passes(json!([1]), raw));
    }

    #[test]
    fn table_elements_take_precedence_over_list_items() {
        let raw = json!({
            "tableElements": {"rulesByElements": {"kind": "string"}, "exclusive": true},
            "listItems": "integer"
        });
        assert!(passes(json!({"kind": "x"}), raw.clone()));
        assert!(passes(json!([1, 2, 3]), raw.clone()));

        let (passed, record) = check(RecordMode::Continue, json!([1, 2, 3]), raw.clone());
        assert!(passed);
        assert!(record.is_empty(), "{record:?}");

        let (passed, record) = check(RecordMode::Continue, json!(["a"]), raw);
        assert!(!passed);
        assert!(record.iter().any(|line| line.starts_with("1 root[0]: integer failed")), "{record:?}");
    }

    #[test]
    fn occurrence_bounds() {
        let raw = json!({"listItems": {"itemRules": "integer", "minOccur": 1, "maxOccur": 2}});
        assert!(!passes(json!([]), raw.clone()));
        assert!(passes(json!([1]), raw.clone()));
        assert!(passes(json!([1, 2]), raw.clone()));
        let (passed, record) = check(RecordMode::StopAtFirst, json!([1, 2, 3]), raw.clone());
        assert!(!passed);
        assert_eq!(record, ["0 root: more than 2 item(s) - list(3)"]);
        let (_, record) = check(RecordMode::StopAtFirst, json!([]), raw);
        assert_eq!(record, ["0 root: 0 item(s), at least 1 required - list(0)"]);
    }

    #[test]
    fn continue_reports_overflow_once_and_keeps_visiting() {
        let raw = json!({"listItems": {"itemRules": "integer", "maxOccur": 1}});
        let (passed, record) = check(RecordMode::Continue, json!([1, "x", "y"]), raw);
        assert!(!passed);
        assert_eq!(
            record,
            [
                "0 root: more than 1 item(s) - list(3)",
                "1 root[1]: integer failed - string(1) \"x\"",
                "1 root[2]: integer failed - string(1) \"y\"",
            ]
        );
    }

    #[test]
    fn subject_keys_are_escaped_and_cut_in_records() {
        let key = format!("evil\nkey\u{1b}[31m{}", "x".repeat(200));
        let shown = format!("evil\\nkey\\u{{1b}}[31m{}…", "x".repeat(27));
        let subject: Value = Value::Object([(key, json!("s")), ("a".to_string(), json!(1))].into_iter().collect());

        let exclusive = json!({"tableElements": {"rulesByElements": {"a": "integer"}, "exclusive": true}});
        let (_, record) = check(RecordMode::StopAtFirst, subject.clone(), exclusive);
        assert_eq!(record, [format!("0 root: key `{shown}` is not allowed (exclusive) - map(2)")]);

        let (_, record) = check(RecordMode::StopAtFirst, subject, json!({"listItems": "integer"}));
        assert_eq!(record, [format!("1 root.{shown}: integer failed - string(1) \"s\"")]);

        let values: Vec<Value> = (0..300).map(|i| json!(i)).collect();
        let (_, record) = check(RecordMode::StopAtFirst, json!(1000), json!({"enum": values}));
        assert_eq!(record, ["0 root: enum(0, 1, 2, 3, 4, … 295 more) failed - integer 1000"]);
    }

    #[test]
    fn continue_visits_every_sibling() {
        let raw = json!({"tableElements": {
            "rulesByElements": {"a": "integer", "b": "string", "c": "boolean"},
            "exclusive": true
        }});
        let subject = json!({"a": "x", "b": 1, "z": null});
        let (passed, first) = check(RecordMode::StopAtFirst, subject.clone(), raw.clone());
        assert!(!passed);
        assert_eq!(first.len(), 1);

        let (passed, all) = check(RecordMode::Continue, subject, raw);
        assert!(!passed);
        assert_eq!(
            all,
            [
                "1 root.a: integer failed - string(1) \"x\"",
                "1 root.b: string failed - integer 1",
                "0 root: key `z` is not allowed (exclusive) - map(3)",
                "0 root: required key `c` is missing - map(3)",
            ]
        );
    }

    #[test]
    fn emptiness() {
        let raw = json!({"string": true, "empty": true, "minLength": 3});
        assert!(passes(json!(""), raw.clone()));
        assert!(!passes(json!("ab"), raw));

        let raw = json!({"listItems": "integer", "nonEmpty": true});
        assert!(!passes(json!([]), raw.clone()));
        assert!(passes(json!([7]), raw));
    }

    #[test]
    fn not_loopable_subjects_fail_child_specs() {
        let raw = json!({"scalar": true, "listItems": "integer"});
        let (passed, record) = check(RecordMode::StopAtFirst, json!(3), raw);
        assert!(!passed);
        assert_eq!(record, ["0 root: is not a container - integer 3"]);
    }

    #[test]
    fn record_resets_per_challenge() {
        let rules = StandardRules::new();
        let ruleset = Normalizer::new(&rules).normalize(&json!("integer")).unwrap();
        let mut challenger = Challenger::new(&rules).with_record(RecordMode::StopAtFirst);
        assert!(!challenger.challenge(&json!("x"), &ruleset, ROOT).unwrap());
        assert_eq!(challenger.record().len(), 1);
        assert!(challenger.challenge(&json!(1), &ruleset, ROOT).unwrap());
        assert!(challenger.record().is_empty());
    }

    #[test]
    fn provider_errors_propagate() {
        let rules = StandardRules::new();
        let mut challenger = Challenger::new(&rules);
        let err = challenger
            .challenge_raw(&json!(5), &json!({"min": "x"}), ROOT)
            .unwrap_err();
        assert!(matches!(err, ChallengeError::Provider(_)));
        let err = challenger
            .challenge_raw(&json!("x"), &json!({"regex": "("}), ROOT)
            .unwrap_err();
        assert!(matches!(err, ChallengeError::Definition(DefinitionError::BadArgument { .. })));
        let err = challenger
            .challenge_raw(&json!("x"), &json!({"nope": true}), ROOT)
            .unwrap_err();
        assert!(matches!(err, ChallengeError::Definition(_)));
    }

    #[test]
    fn deep_subjects_hit_the_recursion_limit() {
        let rules = StandardRules::new();
        let leaf = Normalizer::new(&rules).normalize(&json!("integer")).unwrap();
        let tree = (0..=MAX_DEPTH).fold(leaf, |inner, _| {
            let wrapper = Normalizer::new(&rules).normalize(&json!({"listItems": "integer"})).unwrap();
            let items = wrapper.list_items().unwrap().with_item_rules(inner);
            wrapper.with_list_items(items)
        });
        let subject = (0..=MAX_DEPTH).fold(json!(1), |inner, _| json!([inner]));
        let err = Challenger::new(&rules).challenge(&subject, &tree, ROOT).unwrap_err();
        assert!(matches!(err, ChallengeError::RecursionLimit { ref at } if at.depth == MAX_DEPTH + 1));
    }

    #[test]
    fn record_mode_names() {
        let modes: Vec<RecordMode> = serde_json::from_value(json!(["off", "stopAtFirst", "first", "continue", "all"])).unwrap();
        assert_eq!(
            modes,
            [RecordMode::Off, RecordMode::StopAtFirst, RecordMode::StopAtFirst, RecordMode::Continue, RecordMode::Continue]
        );
    }
}
