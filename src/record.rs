//! Failure records produced while challenging a subject.
use std::fmt;

use serde_json::Value;

/// Previews, keys and rule arguments are cut to this many code points.
pub const PREVIEW_CHARS: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// A main rule failed and no fallback rescued the subject.
    Rule { rule: String, alternatives: Vec<&'static str> },
    /// `null` met a ruleset that isn't nullable.
    Null { alternatives: Vec<&'static str> },
    NotLoopable,
    UndeclaredKey { key: String, policy: &'static str },
    MissingKey { key: String },
    TooMany { max: usize },
    TooFew { min: usize, seen: usize },
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Rule { rule, alternatives } => {
                write!(f, "{rule} failed")?;
                fallbacks(f, alternatives)
            }
            FailureKind::Null { alternatives } => {
                f.write_str("null is not allowed")?;
                fallbacks(f, alternatives)
            }
            FailureKind::NotLoopable => f.write_str("is not a container"),
            FailureKind::UndeclaredKey { key, policy } => write!(f, "key `{key}` is not allowed ({policy})"),
            FailureKind::MissingKey { key } => write!(f, "required key `{key}` is missing"),
            FailureKind::TooMany { max } => write!(f, "more than {max} item(s)"),
            FailureKind::TooFew { min, seen } => write!(f, "{seen} item(s), at least {min} required"),
        }
    }
}

fn fallbacks(f: &mut fmt::Formatter<'_>, alternatives: &[&'static str]) -> fmt::Result {
    if alternatives.is_empty() {
        Ok(())
    } else {
        write!(f, ", {} did not match either", alternatives.join(" and "))
    }
}

/// Runtime type, size and a short rendition of a subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectPreview {
    pub type_name: &'static str,
    pub size: Option<usize>,
    pub preview: Option<String>,
}

impl SubjectPreview {
    pub fn of(subject: &Value) -> Self {
        let (type_name, size, preview) = match subject {
            Value::Null => ("null", None, None),
            Value::Bool(b) => ("boolean", None, Some(b.to_string())),
            Value::Number(n) if n.is_f64() => ("float", None, Some(clip(&n.to_string()))),
            Value::Number(n) => ("integer", None, Some(n.to_string())),
            Value::String(s) => ("string", Some(s.chars().count()), Some(format!("\"{}\"", clip(s)))),
            Value::Array(items) => ("list", Some(items.len()), None),
            Value::Object(map) => ("map", Some(map.len()), None),
        };
        Self { type_name, size, preview }
    }
}

/// First [`PREVIEW_CHARS`] code points of subject or definition text, with
/// control and bidi override characters escaped.
pub(crate) fn clip(s: &str) -> String {
    let mut chars = s.chars();
    let mut out = String::with_capacity(s.len().min(PREVIEW_CHARS * 4));
    for c in chars.by_ref().take(PREVIEW_CHARS) {
        if unsafe_to_print(c) {
            out.extend(c.escape_debug());
        } else {
            out.push(c);
        }
    }
    if chars.next().is_some() {
        out.push('…');
    }
    out
}

fn unsafe_to_print(c: char) -> bool {
    c.is_control() || matches!(c, '\u{200b}'..='\u{200f}' | '\u{202a}'..='\u{202e}' | '\u{2066}'..='\u{2069}')
}

impl fmt::Display for SubjectPreview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)?;
        if let Some(size) = self.size {
            write!(f, "({size})")?;
        }
        if let Some(preview) = &self.preview {
            write!(f, " {preview}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub depth: usize,
    pub key_path: String,
    pub kind: FailureKind,
    pub subject: SubjectPreview,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {} - {}", self.depth, self.key_path, self.kind, self.subject)
    }
}
