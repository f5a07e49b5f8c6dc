//! Standard rule provider.
//!
//! Rules are a closed set ([`RuleId`]): every identifier maps to exactly one
//! descriptor and one function pointer, so a declared rule can't lack an
//! implementation. [`StandardRules`] indexes them by name once at
//! construction and is immutable afterwards, which makes it safe to share
//! between threads.
//!
//! - `types`: type-checking rules
//! - `num`: numeric pattern rules
//! - `text`: string pattern rules (lengths, character classes, shapes)
//! - `container`: size rules
//! - `time`: ISO 8601 date/time rules
pub mod container;
pub mod num;
pub mod text;
pub mod time;
pub mod types;

use std::collections::{HashMap, HashSet};

use serde_json::{Number, Value};

use crate::descriptor::{ContainerKind, RuleDescriptor, RuleProvider, Verdict};
use crate::error::{IntegrityError, ProviderError};
use crate::tag::TypeTag;

pub type RuleFn = fn(&Value, &[Value]) -> Result<Verdict, ProviderError>;

// ------------------------------- Identifiers ------------------------------ //

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleId {
    // type-checking
    Boolean,
    Number,
    Integer,
    Float,
    String,
    StringableScalar,
    Scalar,
    Numeric,
    Digital,
    Decimal,
    Loopable,
    IndexedArray,
    KeyedArray,
    // numeric
    Positive,
    NonNegative,
    Negative,
    Min,
    Max,
    Range,
    MaxDecimals,
    Bit32,
    Bit64,
    // container
    MinSize,
    MaxSize,
    ExactSize,
    // text
    Regex,
    UnicodeMinLength,
    UnicodeMaxLength,
    UnicodeExactLength,
    MinLength,
    MaxLength,
    ExactLength,
    UnicodePrintable,
    UnicodeMultiLine,
    Ascii,
    AsciiPrintable,
    AsciiMultiLine,
    PlainText,
    Hex,
    AlphaNum,
    Name,
    CamelName,
    SnakeName,
    LispName,
    Uuid,
    Base64,
    IpAddress,
    Url,
    HttpUrl,
    Email,
    // time
    DateIso8601,
    TimeIso8601,
    DateTimeIso8601,
    DateTimeIso8601Zonal,
}

impl RuleId {
    pub const ALL: &'static [RuleId] = &[
        Self::Boolean, Self::Number, Self::Integer, Self::Float, Self::String,
        Self::StringableScalar, Self::Scalar, Self::Numeric, Self::Digital, Self::Decimal,
        Self::Loopable, Self::IndexedArray, Self::KeyedArray,
        Self::Positive, Self::NonNegative, Self::Negative, Self::Min, Self::Max, Self::Range,
        Self::MaxDecimals, Self::Bit32, Self::Bit64,
        Self::MinSize, Self::MaxSize, Self::ExactSize,
        Self::Regex, Self::UnicodeMinLength, Self::UnicodeMaxLength, Self::UnicodeExactLength,
        Self::MinLength, Self::MaxLength, Self::ExactLength,
        Self::UnicodePrintable, Self::UnicodeMultiLine, Self::Ascii, Self::AsciiPrintable,
        Self::AsciiMultiLine, Self::PlainText, Self::Hex, Self::AlphaNum,
        Self::Name, Self::CamelName, Self::SnakeName, Self::LispName,
        Self::Uuid, Self::Base64, Self::IpAddress, Self::Url, Self::HttpUrl, Self::Email,
        Self::DateIso8601, Self::TimeIso8601, Self::DateTimeIso8601, Self::DateTimeIso8601Zonal,
    ];

    pub const fn descriptor(self) -> RuleDescriptor {
        use RuleDescriptor as D;
        use TypeTag as T;
        match self {
            Self::Boolean => D::type_check("boolean", T::BOOLEAN),
            Self::Number => D::type_check("number", T::NUMBER),
            Self::Integer => D::type_check("integer", T::INTEGER),
            Self::Float => D::type_check("float", T::FLOAT),
            Self::String => D::type_check("string", T::STRING),
            Self::StringableScalar => {
                D::type_check("stringableScalar", T::STRINGABLE_SCALAR).renamed_from("stringable")
            }
            Self::Scalar => D::type_check("scalar", T::SCALAR),
            Self::Numeric => D::type_check("numeric", T::NUMERIC),
            Self::Digital => D::type_check("digital", T::DIGITAL),
            Self::Decimal => D::type_check("decimal", T::DECIMAL),
            Self::Loopable => D::type_check("loopable", T::CONTAINER).renamed_from("iterable"),
            Self::IndexedArray => D::type_check("indexedArray", T::LIST).renamed_from("array"),
            Self::KeyedArray => D::type_check("keyedArray", T::MAP).renamed_from("object"),

            Self::Positive => D::pattern("positive", T::NUMBER, 0, 0),
            Self::NonNegative => D::pattern("nonNegative", T::NUMBER, 0, 0),
            Self::Negative => D::pattern("negative", T::NUMBER, 0, 0),
            Self::Min => D::pattern("min", T::NUMBER, 1, 1),
            Self::Max => D::pattern("max", T::NUMBER, 1, 1),
            Self::Range => D::pattern("range", T::NUMBER, 2, 2),
            Self::MaxDecimals => D::pattern("maxDecimals", T::NUMBER, 1, 1),
            Self::Bit32 => D::pattern("bit32", T::INTEGER, 0, 0),
            Self::Bit64 => D::pattern("bit64", T::INTEGER, 0, 0),

            Self::MinSize => D::pattern("minSize", T::CONTAINER, 1, 1),
            Self::MaxSize => D::pattern("maxSize", T::CONTAINER, 1, 1),
            Self::ExactSize => D::pattern("exactSize", T::CONTAINER, 1, 1),

            Self::Regex => D::pattern("regex", T::STRINGABLE_SCALAR, 1, 1),
            Self::UnicodeMinLength => D::pattern("unicodeMinLength", T::STRING, 1, 1),
            Self::UnicodeMaxLength => D::pattern("unicodeMaxLength", T::STRING, 1, 1),
            Self::UnicodeExactLength => D::pattern("unicodeExactLength", T::STRING, 1, 1),
            Self::MinLength => D::pattern("minLength", T::STRING, 1, 1),
            Self::MaxLength => D::pattern("maxLength", T::STRING, 1, 1),
            Self::ExactLength => D::pattern("exactLength", T::STRING, 1, 1),
            Self::UnicodePrintable => D::pattern("unicodePrintable", T::STRING, 0, 0),
            Self::UnicodeMultiLine => D::pattern("unicodeMultiLine", T::STRING, 0, 0),
            Self::Ascii => D::pattern("ascii", T::STRING, 0, 0),
            Self::AsciiPrintable => D::pattern("asciiPrintable", T::STRING, 0, 0),
            Self::AsciiMultiLine => D::pattern("asciiMultiLine", T::STRING, 0, 0),
            Self::PlainText => D::pattern("plainText", T::STRING, 0, 0),
            Self::Hex => D::pattern("hex", T::STRING, 0, 0),
            Self::AlphaNum => D::pattern("alphaNum", T::STRING, 0, 0),
            Self::Name => D::pattern("name", T::STRING, 0, 0),
            Self::CamelName => D::pattern("camelName", T::STRING, 0, 0),
            Self::SnakeName => D::pattern("snakeName", T::STRING, 0, 0),
            Self::LispName => D::pattern("lispName", T::STRING, 0, 0),
            Self::Uuid => D::pattern("uuid", T::STRING, 0, 0),
            Self::Base64 => D::pattern("base64", T::STRING, 0, 0),
            Self::IpAddress => D::pattern("ipAddress", T::STRING, 0, 0),
            Self::Url => D::pattern("url", T::STRING, 0, 0),
            Self::HttpUrl => D::pattern("httpUrl", T::STRING, 0, 0),
            Self::Email => D::pattern("email", T::STRING, 0, 0),

            Self::DateIso8601 => D::pattern("dateIso8601", T::STRING, 0, 0).renamed_from("dateISO8601"),
            Self::TimeIso8601 => D::pattern("timeIso8601", T::STRING, 0, 0).renamed_from("timeISO8601"),
            Self::DateTimeIso8601 => {
                D::pattern("dateTimeIso8601", T::STRING, 0, 0).renamed_from("dateTimeISO8601")
            }
            Self::DateTimeIso8601Zonal => {
                D::pattern("dateTimeIso8601Zonal", T::STRING, 0, 0).renamed_from("dateTimeISO8601Zonal")
            }
        }
    }

    pub const fn name(self) -> &'static str {
        self.descriptor().name
    }

    pub fn function(self) -> RuleFn {
        match self {
            Self::Boolean => types::boolean,
            Self::Number => types::number,
            Self::Integer => types::integer,
            Self::Float => types::float,
            Self::String => types::string,
            Self::StringableScalar => types::stringable_scalar,
            Self::Scalar => types::scalar,
            Self::Numeric => types::numeric,
            Self::Digital => types::digital,
            Self::Decimal => types::decimal,
            Self::Loopable => types::loopable,
            Self::IndexedArray => types::indexed_array,
            Self::KeyedArray => types::keyed_array,

            Self::Positive => num::positive,
            Self::NonNegative => num::non_negative,
            Self::Negative => num::negative,
            Self::Min => num::min,
            Self::Max => num::max,
            Self::Range => num::range,
            Self::MaxDecimals => num::max_decimals,
            Self::Bit32 => num::bit32,
            Self::Bit64 => num::bit64,

            Self::MinSize => container::min_size,
            Self::MaxSize => container::max_size,
            Self::ExactSize => container::exact_size,

            Self::Regex => text::regex,
            Self::UnicodeMinLength => text::unicode_min_length,
            Self::UnicodeMaxLength => text::unicode_max_length,
            Self::UnicodeExactLength => text::unicode_exact_length,
            Self::MinLength => text::min_length,
            Self::MaxLength => text::max_length,
            Self::ExactLength => text::exact_length,
            Self::UnicodePrintable => text::unicode_printable,
            Self::UnicodeMultiLine => text::unicode_multi_line,
            Self::Ascii => text::ascii,
            Self::AsciiPrintable => text::ascii_printable,
            Self::AsciiMultiLine => text::ascii_multi_line,
            Self::PlainText => text::plain_text,
            Self::Hex => text::hex,
            Self::AlphaNum => text::alpha_num,
            Self::Name => text::name,
            Self::CamelName => text::camel_name,
            Self::SnakeName => text::snake_name,
            Self::LispName => text::lisp_name,
            Self::Uuid => text::uuid,
            Self::Base64 => text::base64,
            Self::IpAddress => text::ip_address,
            Self::Url => text::url,
            Self::HttpUrl => text::http_url,
            Self::Email => text::email,

            Self::DateIso8601 => time::date_iso8601,
            Self::TimeIso8601 => time::time_iso8601,
            Self::DateTimeIso8601 => time::date_time_iso8601,
            Self::DateTimeIso8601Zonal => time::date_time_iso8601_zonal,
        }
    }
}

/// Pattern→type inference table: which type-checking rule guards which tag.
const GUARDS: &[(TypeTag, RuleId)] = &[
    (TypeTag::BOOLEAN, RuleId::Boolean),
    (TypeTag::INTEGER, RuleId::Integer),
    (TypeTag::FLOAT, RuleId::Float),
    (TypeTag::NUMBER, RuleId::Number),
    (TypeTag::STRING, RuleId::String),
    (TypeTag::STRINGABLE_SCALAR, RuleId::StringableScalar),
    (TypeTag::NUMERIC, RuleId::Numeric),
    (TypeTag::DIGITAL, RuleId::Digital),
    (TypeTag::DECIMAL, RuleId::Decimal),
    (TypeTag::SCALAR, RuleId::Scalar),
    (TypeTag::CONTAINER, RuleId::Loopable),
    (TypeTag::LIST, RuleId::IndexedArray),
    (TypeTag::MAP, RuleId::KeyedArray),
];

// ------------------------------- Provider --------------------------------- //

#[derive(Debug)]
struct RuleEntry {
    id: RuleId,
    descriptor: RuleDescriptor,
}

#[derive(Debug)]
pub struct StandardRules {
    by_name: HashMap<&'static str, RuleEntry>,
    renames: HashMap<&'static str, &'static str>,
}

impl StandardRules {
    pub fn new() -> Self {
        let mut by_name = HashMap::with_capacity(RuleId::ALL.len());
        let mut renames = HashMap::new();
        for &id in RuleId::ALL {
            let descriptor = id.descriptor();
            if let Some(legacy) = descriptor.renamed_from {
                renames.insert(legacy, descriptor.name);
            }
            by_name.insert(descriptor.name, RuleEntry { id, descriptor });
        }
        Self { by_name, renames }
    }

    pub fn rule(&self, name: &str) -> Option<RuleId> {
        self.by_name.get(name).map(|entry| entry.id)
    }

    /// Descriptors in declaration order.
    pub fn descriptors(&self) -> impl Iterator<Item = &RuleDescriptor> + '_ {
        RuleId::ALL
            .iter()
            .filter_map(|id| self.by_name.get(id.name()))
            .map(|entry| &entry.descriptor)
    }

    /// Self-test: tags are distinct, names resolve back to their identifiers,
    /// arities are sane, legacy names don't shadow current ones and every
    /// pattern rule has a usable type guard.
    pub fn integrity(&self) -> Result<(), IntegrityError> {
        TypeTag::integrity()?;

        let mut seen = HashSet::new();
        for &id in RuleId::ALL {
            let d = id.descriptor();
            if !seen.insert(d.name) {
                return Err(IntegrityError::DuplicateName { name: d.name });
            }
            if self.rule(d.name) != Some(id) {
                return Err(IntegrityError::NameMismatch { name: d.name });
            }
            if d.params_allowed < d.params_required {
                return Err(IntegrityError::ArityInverted { name: d.name });
            }
        }

        for (&legacy, &target) in &self.renames {
            if self.by_name.contains_key(legacy) {
                return Err(IntegrityError::LegacyCollision { legacy });
            }
            if !self.by_name.contains_key(target) {
                return Err(IntegrityError::DanglingRename { legacy, target });
            }
        }

        for d in self.descriptors().filter(|d| !d.type_checking) {
            let guard = self.type_guard(d.semantic_type).ok_or_else(|| IntegrityError::NoGuard {
                name: d.name,
                tag: d.semantic_type.to_string(),
            })?;
            self.check_guard(guard)?;
        }
        self.check_guard(self.container_guard())
    }

    fn check_guard(&self, name: &'static str) -> Result<(), IntegrityError> {
        match self.descriptor(name) {
            Some(d) if d.type_checking && d.params_required == 0 => Ok(()),
            _ => Err(IntegrityError::BadGuard { name }),
        }
    }
}

impl Default for StandardRules {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleProvider for StandardRules {
    fn descriptor(&self, name: &str) -> Option<&RuleDescriptor> {
        self.by_name.get(name).map(|entry| &entry.descriptor)
    }

    fn renamed(&self, legacy: &str) -> Option<&'static str> {
        self.renames.get(legacy).copied()
    }

    fn type_guard(&self, tag: TypeTag) -> Option<&'static str> {
        if let Some((_, id)) = GUARDS.iter().find(|(t, _)| *t == tag) {
            return Some(id.name());
        }
        // narrowest guard that still covers the tag
        GUARDS
            .iter()
            .filter(|(t, _)| t.contains(tag))
            .min_by_key(|(t, _)| t.bits().count_ones())
            .map(|(_, id)| id.name())
    }

    fn container_guard(&self) -> &'static str {
        RuleId::Loopable.name()
    }

    fn is_empty(&self, subject: &Value) -> bool {
        match subject {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            Value::Array(xs) => xs.is_empty(),
            Value::Object(map) => map.is_empty(),
            Value::Bool(_) | Value::Number(_) => false,
        }
    }

    fn enum_(&self, subject: &Value, values: &[Value]) -> bool {
        // serde_json compares numbers by representation: 1 != 1.0
        values.iter().any(|v| v == subject)
    }

    fn loopable(&self, subject: &Value) -> Option<ContainerKind> {
        types::container_kind(subject)
    }

    fn prepare(&self, name: &str, args: &[Value]) -> Result<(), ProviderError> {
        match self.rule(name) {
            Some(RuleId::Regex) => text::compiled(arg_str("regex", args, 0)?).map(drop),
            _ => Ok(()),
        }
    }

    fn check(&self, name: &str, subject: &Value, args: &[Value]) -> Result<Verdict, ProviderError> {
        let entry = self
            .by_name
            .get(name)
            .ok_or_else(|| ProviderError::UnknownRule { name: name.to_string() })?;
        (entry.id.function())(subject, args)
    }
}

// ------------------------------ Arguments --------------------------------- //

pub(crate) fn arg<'a>(rule: &'static str, args: &'a [Value], i: usize) -> Result<&'a Value, ProviderError> {
    args.get(i).ok_or_else(|| ProviderError::BadArgument {
        rule,
        reason: format!("missing argument {}", i + 1),
    })
}

pub(crate) fn arg_number<'a>(rule: &'static str, args: &'a [Value], i: usize) -> Result<&'a Number, ProviderError> {
    match arg(rule, args, i)? {
        Value::Number(n) => Ok(n),
        other => Err(ProviderError::BadArgument {
            rule,
            reason: format!("argument {} must be a number, got {other}", i + 1),
        }),
    }
}

pub(crate) fn arg_count(rule: &'static str, args: &[Value], i: usize) -> Result<usize, ProviderError> {
    arg(rule, args, i)?
        .as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| ProviderError::BadArgument {
            rule,
            reason: format!("argument {} must be a non-negative integer", i + 1),
        })
}

pub(crate) fn arg_str<'a>(rule: &'static str, args: &'a [Value], i: usize) -> Result<&'a str, ProviderError> {
    arg(rule, args, i)?.as_str().ok_or_else(|| ProviderError::BadArgument {
        rule,
        reason: format!("argument {} must be a string", i + 1),
    })
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn integrity_holds() {
        StandardRules::new().integrity().unwrap();
    }

    #[test]
    fn every_identifier_is_listed_once() {
        let rules = StandardRules::new();
        assert_eq!(rules.descriptors().count(), RuleId::ALL.len());
    }

    #[test]
    fn legacy_names_resolve_to_current_rules() {
        let rules = StandardRules::new();
        assert_eq!(rules.renamed("iterable"), Some("loopable"));
        assert_eq!(rules.renamed("dateISO8601"), Some("dateIso8601"));
        assert_eq!(rules.renamed("loopable"), None);
        assert!(rules.descriptor("iterable").is_none());
    }

    #[test]
    fn guards_prefer_exact_then_narrowest() {
        let rules = StandardRules::new();
        assert_eq!(rules.type_guard(TypeTag::NUMBER), Some("number"));
        assert_eq!(rules.type_guard(TypeTag::STRINGABLE_SCALAR), Some("stringableScalar"));
        // no exact entry: stringableScalar and scalar tie on width, first listed wins
        assert_eq!(rules.type_guard(TypeTag::STRING | TypeTag::INTEGER), Some("stringableScalar"));
        assert_eq!(rules.type_guard(TypeTag::NULL), None);
    }

    #[test]
    fn dispatch_reaches_rule_functions() {
        let rules = StandardRules::new();
        assert_eq!(rules.check("integer", &json!(3), &[]).unwrap(), Verdict::Pass);
        assert_eq!(rules.check("range", &json!(4), &[json!(1), json!(3)]).unwrap(), Verdict::Fail);
        assert_eq!(rules.check("loopable", &json!({}), &[]).unwrap(), Verdict::Kind(ContainerKind::Map));
        assert!(matches!(
            rules.check("nope", &json!(1), &[]),
            Err(ProviderError::UnknownRule { .. })
        ));
    }

    #[test]
    fn enum_is_strict() {
        let rules = StandardRules::new();
        let values = [json!(1), json!("two"), json!(true)];
        assert!(rules.enum_(&json!(1), &values));
        assert!(!rules.enum_(&json!(1.0), &values));
        assert!(!rules.enum_(&json!("1"), &values));
        assert!(rules.enum_(&json!(true), &values));
    }

    #[test]
    fn emptiness_covers_strings_and_containers_only() {
        let rules = StandardRules::new();
        assert!(rules.is_empty(&json!("")));
        assert!(rules.is_empty(&json!([])));
        assert!(rules.is_empty(&json!({})));
        assert!(!rules.is_empty(&json!(0)));
        assert!(!rules.is_empty(&json!(false)));
    }
}
