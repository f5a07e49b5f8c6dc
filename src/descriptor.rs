//! The contract between the engine and whatever supplies the leaf predicates.
use serde_json::Value;

use crate::error::ProviderError;
use crate::tag::TypeTag;

/// Static metadata about one named rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleDescriptor {
    pub name: &'static str,
    /// Type-checking rules are safe on any (non-null) subject; pattern rules
    /// assume a type-checking rule has already narrowed the subject.
    pub type_checking: bool,
    pub semantic_type: TypeTag,
    pub params_required: usize,
    pub params_allowed: usize,
    /// Name the rule used to go by.
    pub renamed_from: Option<&'static str>,
}

impl RuleDescriptor {
    pub const fn type_check(name: &'static str, semantic_type: TypeTag) -> Self {
        Self {
            name,
            type_checking: true,
            semantic_type,
            params_required: 0,
            params_allowed: 0,
            renamed_from: None,
        }
    }

    pub const fn pattern(
        name: &'static str,
        semantic_type: TypeTag,
        params_required: usize,
        params_allowed: usize,
    ) -> Self {
        Self {
            name,
            type_checking: false,
            semantic_type,
            params_required,
            params_allowed,
            renamed_from: None,
        }
    }

    pub const fn renamed_from(mut self, legacy: &'static str) -> Self {
        self.renamed_from = Some(legacy);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    /// Ordinal container (JSON array).
    List,
    /// Keyed container (JSON object).
    Map,
}

/// What a rule function reports back.
///
/// Composite type checks answer with the kind of container they recognised,
/// which lets the interpreter skip its own loopable check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Fail,
    Pass,
    Kind(ContainerKind),
}

impl Verdict {
    pub fn passed(self) -> bool {
        !matches!(self, Verdict::Fail)
    }
    pub fn container(self) -> Option<ContainerKind> {
        match self {
            Verdict::Kind(kind) => Some(kind),
            _ => None,
        }
    }
}

impl From<bool> for Verdict {
    fn from(passed: bool) -> Self {
        if passed { Verdict::Pass } else { Verdict::Fail }
    }
}

/// Supplies rule metadata to the normalizer and rule functions to the
/// interpreter.
///
/// Implementations must be immutable once built: descriptors are looked up by
/// name and may be handed out by reference for the provider's lifetime.
pub trait RuleProvider {
    /// Descriptor of a current (non-legacy) rule name.
    fn descriptor(&self, name: &str) -> Option<&RuleDescriptor>;

    /// Current name of a legacy rule name.
    fn renamed(&self, legacy: &str) -> Option<&'static str>;

    /// A zero-argument type-checking rule able to guard rules of `tag`.
    fn type_guard(&self, tag: TypeTag) -> Option<&'static str>;

    /// The type-checking rule injected in front of `tableElements`/`listItems`.
    fn container_guard(&self) -> &'static str;

    fn is_empty(&self, subject: &Value) -> bool;

    /// Strict membership: type and value must both match.
    fn enum_(&self, subject: &Value, values: &[Value]) -> bool;

    fn loopable(&self, subject: &Value) -> Option<ContainerKind>;

    /// Checks the arguments of rule `name` once, while normalizing, so a bad
    /// argument is reported before any subject is challenged.
    fn prepare(&self, _name: &str, _args: &[Value]) -> Result<(), ProviderError> {
        Ok(())
    }

    /// Runs rule `name` against `subject`. Never called with a null subject.
    fn check(&self, name: &str, subject: &Value, args: &[Value]) -> Result<Verdict, ProviderError>;
}
