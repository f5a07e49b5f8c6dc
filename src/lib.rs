//! Declarative JSON validation.
//!
//! A raw rule description is compiled by [`Normalizer`] into a canonical
//! [`Ruleset`], which [`Challenger`] then walks a subject against. Leaf
//! predicates come from a [`RuleProvider`]; [`StandardRules`] is the one this
//! crate ships.
//!
//! ```
//! use json_ruleset::{Challenger, RecordMode, StandardRules};
//! use serde_json::json;
//!
//! let rules = StandardRules::new();
//! let mut challenger = Challenger::new(&rules).with_record(RecordMode::StopAtFirst);
//! let raw = json!({"integer": true, "range": [1, 3]});
//! assert!(challenger.challenge_raw(&json!(2), &raw, "root").unwrap());
//! assert!(!challenger.challenge_raw(&json!(4), &raw, "root").unwrap());
//! assert_eq!(challenger.record_lines(), ["0 root: range(1, 3) failed - integer 4"]);
//! ```
pub mod challenge;
pub mod descriptor;
pub mod error;
pub mod normalize;
pub mod path_de;
pub mod record;
pub mod rules;
pub mod ruleset;
pub mod suite;
pub mod tag;

pub use challenge::{Challenger, RecordMode};
pub use descriptor::{ContainerKind, RuleDescriptor, RuleProvider, Verdict};
pub use error::{ChallengeError, DefinitionError, IntegrityError, Location, ProviderError, MAX_DEPTH};
pub use normalize::{Normalizer, ROOT};
pub use record::{Failure, FailureKind, SubjectPreview, PREVIEW_CHARS};
pub use rules::StandardRules;
pub use ruleset::{Emptiness, ListItems, Membership, Rule, RuleArgs, RuleKind, Ruleset, TableElements};
pub use tag::TypeTag;
