//! Error types.
//!
//! Two taxonomies: [`DefinitionError`] for malformed rulesets (raised while
//! normalizing) and [`ChallengeError`] for the few things that can abort a
//! validation run. A subject that simply fails its rules is never an error.
use std::fmt;

use thiserror::Error;

/// Nesting limit shared by the normalizer and the interpreter.
pub const MAX_DEPTH: usize = 10;

/// Where in a ruleset (or subject) something happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub depth: usize,
    pub key_path: String,
}

impl Location {
    pub fn new(depth: usize, key_path: impl Into<String>) -> Self {
        Self { depth, key_path: key_path.into() }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "depth {} at {}", self.depth, self.key_path)
    }
}

/// Renders `name` plus the legacy names it was reached through.
pub(crate) fn rule_label(name: &str, renamed_from: &[String]) -> String {
    if renamed_from.is_empty() {
        name.to_string()
    } else {
        format!("{name} (renamed from {})", renamed_from.join(" <- "))
    }
}

fn arity_label(required: &usize, allowed: &usize) -> String {
    if required == allowed {
        required.to_string()
    } else {
        format!("{required}..={allowed}")
    }
}

// ————————————————————————————————————————————————————————————————————————————
// RULESET DEFINITION
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DefinitionError {
    #[error("unknown rule `{}`, {at}", rule_label(.name, .renamed_from))]
    UnknownRule { name: String, renamed_from: Vec<String>, at: Location },

    #[error("duplicate rule `{}`, {at}", rule_label(.name, .renamed_from))]
    DuplicateRule { name: String, renamed_from: Vec<String>, at: Location },

    #[error(
        "rule `{}` takes {} argument(s), {given} given, {at}",
        rule_label(.name, .renamed_from),
        arity_label(.required, .allowed)
    )]
    Arity {
        name: String,
        renamed_from: Vec<String>,
        required: usize,
        allowed: usize,
        given: usize,
        at: Location,
    },

    #[error("rule `{}`: {reason}, {at}", rule_label(.name, .renamed_from))]
    BadArgument { name: String, renamed_from: Vec<String>, reason: String, at: Location },

    #[error("`{name}` must be a boolean, {at}")]
    BadFlag { name: &'static str, at: Location },

    #[error("`{name}`: {reason}, {at}")]
    BadEnum { name: &'static str, reason: String, at: Location },

    #[error("`empty` and `nonEmpty` are mutually exclusive, {at}")]
    ContradictoryFlags { at: Location },

    #[error("ruleset declares no rules and nothing to infer a type-checking rule from, {at}")]
    EmptyRuleset { at: Location },

    #[error("no type-checking rule is compatible with rule `{name}`, {at}")]
    NoTypeGuard { name: String, at: Location },

    #[error("`alternativeRuleSet` must not contain `{found}`, {at}")]
    NestedAlternative { found: &'static str, at: Location },

    #[error("`{name}` must be {expected}, {at}")]
    BadChildShape { name: &'static str, expected: &'static str, at: Location },

    #[error("`{name}` does not take key `{key}`, {at}")]
    UnexpectedKey { name: &'static str, key: String, at: Location },

    #[error("`tableElements`: {reason}, {at}")]
    Membership { reason: String, at: Location },

    #[error("`tableElements` declares no elements, {at}")]
    EmptyTableElements { at: Location },

    #[error("`listItems`: {reason}, {at}")]
    Occurrence { reason: String, at: Location },

    #[error("ruleset nesting exceeds {max} levels, {at}", max = MAX_DEPTH)]
    RecursionLimit { at: Location },
}

impl DefinitionError {
    pub fn location(&self) -> &Location {
        match self {
            Self::UnknownRule { at, .. }
            | Self::DuplicateRule { at, .. }
            | Self::Arity { at, .. }
            | Self::BadArgument { at, .. }
            | Self::BadFlag { at, .. }
            | Self::BadEnum { at, .. }
            | Self::ContradictoryFlags { at }
            | Self::EmptyRuleset { at }
            | Self::NoTypeGuard { at, .. }
            | Self::NestedAlternative { at, .. }
            | Self::BadChildShape { at, .. }
            | Self::UnexpectedKey { at, .. }
            | Self::Membership { at, .. }
            | Self::EmptyTableElements { at }
            | Self::Occurrence { at, .. }
            | Self::RecursionLimit { at } => at,
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// PROVIDER / CHALLENGE
// ————————————————————————————————————————————————————————————————————————————

/// Misuse of a rule provider: the provider signals it, the core propagates it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    #[error("rule provider has no rule `{name}`")]
    UnknownRule { name: String },
    #[error("rule `{rule}`: {reason}")]
    BadArgument { rule: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChallengeError {
    #[error(transparent)]
    Definition(#[from] DefinitionError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("subject nesting exceeds {max} levels, {at}", max = MAX_DEPTH)]
    RecursionLimit { at: Location },
}

// ————————————————————————————————————————————————————————————————————————————
// PROVIDER INTEGRITY
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityError {
    #[error("type tags {first} and {second} share the value {bits:#b}")]
    DuplicateTag { first: &'static str, second: &'static str, bits: u32 },
    #[error("rule name `{name}` is declared twice")]
    DuplicateName { name: &'static str },
    #[error("rule `{name}` resolves to a different rule by name")]
    NameMismatch { name: &'static str },
    #[error("rule `{name}` allows fewer parameters than it requires")]
    ArityInverted { name: &'static str },
    #[error("legacy name `{legacy}` collides with a current rule name")]
    LegacyCollision { legacy: &'static str },
    #[error("legacy name `{legacy}` points at unknown rule `{target}`")]
    DanglingRename { legacy: &'static str, target: &'static str },
    #[error("pattern rule `{name}` ({tag}) has no type guard")]
    NoGuard { name: &'static str, tag: String },
    #[error("type guard `{name}` is not a zero-argument type-checking rule")]
    BadGuard { name: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_rename_chain_and_location() {
        let err = DefinitionError::Arity {
            name: "range".into(),
            renamed_from: vec!["between".into()],
            required: 2,
            allowed: 2,
            given: 1,
            at: Location::new(2, "root.wheels"),
        };
        assert_eq!(
            err.to_string(),
            "rule `range (renamed from between)` takes 2 argument(s), 1 given, depth 2 at root.wheels"
        );
        assert_eq!(err.location().depth, 2);
    }

    #[test]
    fn ranged_arity_is_rendered_inclusive() {
        let err = DefinitionError::Arity {
            name: "regex".into(),
            renamed_from: vec![],
            required: 1,
            allowed: 2,
            given: 3,
            at: Location::new(0, "root"),
        };
        assert!(err.to_string().contains("takes 1..=2 argument(s), 3 given"));
    }
}
