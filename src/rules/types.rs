//! Type-checking rules. Safe on any non-null subject.
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::descriptor::{ContainerKind, Verdict};
use crate::error::ProviderError;

static NUMERIC_STR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?(?:\d+(?:\.\d+)?|\.\d+)$").unwrap());
static DIGITAL_STR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+$").unwrap());
static DECIMAL_STR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d*\.\d+$").unwrap());

type Checked = Result<Verdict, ProviderError>;

pub fn container_kind(subject: &Value) -> Option<ContainerKind> {
    match subject {
        Value::Array(_) => Some(ContainerKind::List),
        Value::Object(_) => Some(ContainerKind::Map),
        _ => None,
    }
}

pub fn is_integer(subject: &Value) -> bool {
    matches!(subject, Value::Number(n) if n.is_i64() || n.is_u64())
}

pub fn boolean(subject: &Value, _: &[Value]) -> Checked {
    Ok(subject.is_boolean().into())
}

pub fn number(subject: &Value, _: &[Value]) -> Checked {
    Ok(subject.is_number().into())
}

pub fn integer(subject: &Value, _: &[Value]) -> Checked {
    Ok(is_integer(subject).into())
}

/// Numbers written with a fraction or exponent; `1.0` is a float, `1` isn't.
pub fn float(subject: &Value, _: &[Value]) -> Checked {
    Ok(matches!(subject, Value::Number(n) if n.is_f64()).into())
}

pub fn string(subject: &Value, _: &[Value]) -> Checked {
    Ok(subject.is_string().into())
}

pub fn stringable_scalar(subject: &Value, _: &[Value]) -> Checked {
    Ok((subject.is_string() || subject.is_number()).into())
}

pub fn scalar(subject: &Value, _: &[Value]) -> Checked {
    Ok(matches!(subject, Value::Bool(_) | Value::Number(_) | Value::String(_)).into())
}

pub fn numeric(subject: &Value, _: &[Value]) -> Checked {
    Ok(match subject {
        Value::Number(_) => true,
        Value::String(s) => NUMERIC_STR.is_match(s),
        _ => false,
    }
    .into())
}

pub fn digital(subject: &Value, _: &[Value]) -> Checked {
    Ok(match subject {
        Value::String(s) => DIGITAL_STR.is_match(s),
        other => is_integer(other),
    }
    .into())
}

pub fn decimal(subject: &Value, _: &[Value]) -> Checked {
    Ok(match subject {
        Value::Number(n) => n.is_f64(),
        Value::String(s) => DECIMAL_STR.is_match(s),
        _ => false,
    }
    .into())
}

pub fn loopable(subject: &Value, _: &[Value]) -> Checked {
    Ok(container_kind(subject).map_or(Verdict::Fail, Verdict::Kind))
}

pub fn indexed_array(subject: &Value, _: &[Value]) -> Checked {
    Ok(match subject {
        Value::Array(_) => Verdict::Kind(ContainerKind::List),
        _ => Verdict::Fail,
    })
}

pub fn keyed_array(subject: &Value, _: &[Value]) -> Checked {
    Ok(match subject {
        Value::Object(_) => Verdict::Kind(ContainerKind::Map),
        _ => Verdict::Fail,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pass(f: fn(&Value, &[Value]) -> Checked, v: Value) -> bool {
        f(&v, &[]).unwrap().passed()
    }

    #[test]
    fn integers_and_floats_do_not_overlap() {
        assert!(pass(integer, json!(3)));
        assert!(pass(integer, json!(u64::MAX)));
        assert!(!pass(integer, json!(3.0)));
        assert!(pass(float, json!(3.5)));
        assert!(!pass(float, json!(3)));
        assert!(pass(number, json!(3)) && pass(number, json!(3.5)));
    }

    #[test]
    fn numeric_strings() {
        assert!(pass(numeric, json!("-12.5")));
        assert!(pass(numeric, json!(".5")));
        assert!(!pass(numeric, json!("1e")));
        assert!(pass(digital, json!("-12")));
        assert!(!pass(digital, json!("12.0")));
        assert!(pass(decimal, json!("12.0")));
        assert!(!pass(decimal, json!(12)));
    }

    #[test]
    fn containers_report_their_kind() {
        assert_eq!(loopable(&json!([1]), &[]).unwrap(), Verdict::Kind(ContainerKind::List));
        assert_eq!(keyed_array(&json!([1]), &[]).unwrap(), Verdict::Fail);
        assert_eq!(indexed_array(&json!("x"), &[]).unwrap(), Verdict::Fail);
    }

    #[test]
    fn scalar_excludes_containers() {
        assert!(pass(scalar, json!(false)));
        assert!(!pass(scalar, json!({})));
        assert!(pass(stringable_scalar, json!(1.5)));
        assert!(!pass(stringable_scalar, json!(true)));
    }
}
