//! String pattern rules.
//!
//! Lengths come in two flavours: `*Length` counts UTF-8 bytes, `unicode*Length`
//! counts code points. `regex` is the only rule here that also accepts numbers
//! (matched against their JSON rendering).
use std::borrow::Cow;
use std::collections::HashMap;
use std::net::IpAddr;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use serde_json::Value;

use super::{arg_count, arg_str};
use crate::descriptor::Verdict;
use crate::error::ProviderError;

type Checked = Result<Verdict, ProviderError>;

static HEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9a-fA-F]+$").unwrap());
static ALPHA_NUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9]+$").unwrap());
static NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").unwrap());
static CAMEL_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z][a-zA-Z0-9]*$").unwrap());
static SNAKE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").unwrap());
static LISP_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z][a-z0-9\-]*$").unwrap());
static UUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$").unwrap()
});
static BASE64: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9+/]+={0,2}$").unwrap());
static URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.\-]*://[^\s/?#]+[^\s]*$").unwrap());
static HTTP_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[hH][tT][tT][pP][sS]?://[^\s/?#]+[^\s]*$").unwrap());
static EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s.]+(?:\.[^@\s.]+)+$").unwrap());

fn with_text(subject: &Value, test: impl FnOnce(&str) -> bool) -> Checked {
    Ok(subject.as_str().is_some_and(test).into())
}

fn multi_line_control(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\t')
}

// ---- regex ----

/// Compiled `regex` arguments, shared by every provider and thread.
static PATTERNS: Lazy<RwLock<HashMap<String, Regex>>> = Lazy::new(Default::default);

/// Compiles `pattern` once; later calls hand out a clone of the cached regex.
pub(crate) fn compiled(pattern: &str) -> Result<Regex, ProviderError> {
    if let Some(rx) = PATTERNS.read().get(pattern) {
        return Ok(rx.clone());
    }
    let rx = Regex::new(pattern).map_err(|error| ProviderError::BadArgument {
        rule: "regex",
        reason: format!("invalid pattern: {error}"),
    })?;
    PATTERNS.write().entry(pattern.to_string()).or_insert_with(|| rx.clone());
    Ok(rx)
}

pub fn regex(subject: &Value, args: &[Value]) -> Checked {
    let rx = compiled(arg_str("regex", args, 0)?)?;
    let haystack: Cow<'_, str> = match subject {
        Value::String(s) => Cow::Borrowed(s),
        Value::Number(n) => Cow::Owned(n.to_string()),
        _ => return Ok(Verdict::Fail),
    };
    Ok(rx.is_match(&haystack).into())
}

// ---- lengths ----

pub fn unicode_min_length(subject: &Value, args: &[Value]) -> Checked {
    let n = arg_count("unicodeMinLength", args, 0)?;
    with_text(subject, |s| s.chars().count() >= n)
}

pub fn unicode_max_length(subject: &Value, args: &[Value]) -> Checked {
    let n = arg_count("unicodeMaxLength", args, 0)?;
    with_text(subject, |s| s.chars().count() <= n)
}

pub fn unicode_exact_length(subject: &Value, args: &[Value]) -> Checked {
    let n = arg_count("unicodeExactLength", args, 0)?;
    with_text(subject, |s| s.chars().count() == n)
}

pub fn min_length(subject: &Value, args: &[Value]) -> Checked {
    let n = arg_count("minLength", args, 0)?;
    with_text(subject, |s| s.len() >= n)
}

pub fn max_length(subject: &Value, args: &[Value]) -> Checked {
    let n = arg_count("maxLength", args, 0)?;
    with_text(subject, |s| s.len() <= n)
}

pub fn exact_length(subject: &Value, args: &[Value]) -> Checked {
    let n = arg_count("exactLength", args, 0)?;
    with_text(subject, |s| s.len() == n)
}

// ---- character classes ----

pub fn unicode_printable(subject: &Value, _: &[Value]) -> Checked {
    with_text(subject, |s| !s.chars().any(char::is_control))
}

pub fn unicode_multi_line(subject: &Value, _: &[Value]) -> Checked {
    with_text(subject, |s| s.chars().all(|c| !c.is_control() || multi_line_control(c)))
}

pub fn ascii(subject: &Value, _: &[Value]) -> Checked {
    with_text(subject, |s| s.is_ascii())
}

pub fn ascii_printable(subject: &Value, _: &[Value]) -> Checked {
    with_text(subject, |s| s.chars().all(|c| c.is_ascii() && !c.is_ascii_control()))
}

pub fn ascii_multi_line(subject: &Value, _: &[Value]) -> Checked {
    with_text(subject, |s| {
        s.chars().all(|c| c.is_ascii() && (!c.is_ascii_control() || multi_line_control(c)))
    })
}

/// Multi-line printable text without markup brackets.
pub fn plain_text(subject: &Value, _: &[Value]) -> Checked {
    with_text(subject, |s| {
        s.chars()
            .all(|c| (!c.is_control() || multi_line_control(c)) && c != '<' && c != '>')
    })
}

pub fn hex(subject: &Value, _: &[Value]) -> Checked {
    with_text(subject, |s| HEX.is_match(s))
}

pub fn alpha_num(subject: &Value, _: &[Value]) -> Checked {
    with_text(subject, |s| ALPHA_NUM.is_match(s))
}

// ---- names & identifiers ----

pub fn name(subject: &Value, _: &[Value]) -> Checked {
    with_text(subject, |s| NAME.is_match(s))
}

pub fn camel_name(subject: &Value, _: &[Value]) -> Checked {
    with_text(subject, |s| CAMEL_NAME.is_match(s))
}

pub fn snake_name(subject: &Value, _: &[Value]) -> Checked {
    with_text(subject, |s| SNAKE_NAME.is_match(s))
}

pub fn lisp_name(subject: &Value, _: &[Value]) -> Checked {
    with_text(subject, |s| LISP_NAME.is_match(s))
}

pub fn uuid(subject: &Value, _: &[Value]) -> Checked {
    with_text(subject, |s| UUID.is_match(s))
}

pub fn base64(subject: &Value, _: &[Value]) -> Checked {
    with_text(subject, |s| s.len() % 4 == 0 && BASE64.is_match(s))
}

// ---- network ----

pub fn ip_address(subject: &Value, _: &[Value]) -> Checked {
    with_text(subject, |s| s.parse::<IpAddr>().is_ok())
}

pub fn url(subject: &Value, _: &[Value]) -> Checked {
    with_text(subject, |s| URL.is_match(s))
}

pub fn http_url(subject: &Value, _: &[Value]) -> Checked {
    with_text(subject, |s| HTTP_URL.is_match(s))
}

pub fn email(subject: &Value, _: &[Value]) -> Checked {
    with_text(subject, |s| EMAIL.is_match(s))
}
