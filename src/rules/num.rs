//! Numeric pattern rules. Guarded by `number`/`integer`, so non-numbers just fail.
use std::cmp::Ordering;

use serde_json::{Number, Value};

use super::{arg_count, arg_number};
use crate::descriptor::Verdict;
use crate::error::ProviderError;

type Checked = Result<Verdict, ProviderError>;

/// Exact for two integers, f64 otherwise.
fn compare(a: &Number, b: &Number) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return Some(x.cmp(&y));
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return Some(x.cmp(&y));
    }
    a.as_f64()?.partial_cmp(&b.as_f64()?)
}

fn sign(subject: &Value) -> Option<Ordering> {
    match subject {
        Value::Number(n) => n.as_f64()?.partial_cmp(&0.0),
        _ => None,
    }
}

pub fn positive(subject: &Value, _: &[Value]) -> Checked {
    Ok((sign(subject) == Some(Ordering::Greater)).into())
}

pub fn non_negative(subject: &Value, _: &[Value]) -> Checked {
    Ok(matches!(sign(subject), Some(Ordering::Greater | Ordering::Equal)).into())
}

pub fn negative(subject: &Value, _: &[Value]) -> Checked {
    Ok((sign(subject) == Some(Ordering::Less)).into())
}

pub fn min(subject: &Value, args: &[Value]) -> Checked {
    let bound = arg_number("min", args, 0)?;
    let Value::Number(n) = subject else { return Ok(Verdict::Fail) };
    Ok(matches!(compare(n, bound), Some(Ordering::Greater | Ordering::Equal)).into())
}

pub fn max(subject: &Value, args: &[Value]) -> Checked {
    let bound = arg_number("max", args, 0)?;
    let Value::Number(n) = subject else { return Ok(Verdict::Fail) };
    Ok(matches!(compare(n, bound), Some(Ordering::Less | Ordering::Equal)).into())
}

pub fn range(subject: &Value, args: &[Value]) -> Checked {
    let lo = arg_number("range", args, 0)?;
    let hi = arg_number("range", args, 1)?;
    if compare(lo, hi) == Some(Ordering::Greater) {
        return Err(ProviderError::BadArgument {
            rule: "range",
            reason: format!("minimum {lo} exceeds maximum {hi}"),
        });
    }
    let Value::Number(n) = subject else { return Ok(Verdict::Fail) };
    let above = matches!(compare(n, lo), Some(Ordering::Greater | Ordering::Equal));
    let below = matches!(compare(n, hi), Some(Ordering::Less | Ordering::Equal));
    Ok((above && below).into())
}

/// Digits after the decimal point in the number's shortest rendering.
pub fn decimals(n: &Number) -> usize {
    if !n.is_f64() {
        return 0;
    }
    let repr = n.to_string();
    let (mantissa, exponent) = match repr.split_once(['e', 'E']) {
        Some((m, e)) => (m, e.parse::<i64>().unwrap_or(0)),
        None => (repr.as_str(), 0),
    };
    let fraction = mantissa
        .split_once('.')
        .map(|(_, f)| f.trim_end_matches('0').len())
        .unwrap_or(0) as i64;
    (fraction - exponent).max(0) as usize
}

pub fn max_decimals(subject: &Value, args: &[Value]) -> Checked {
    let limit = arg_count("maxDecimals", args, 0)?;
    let Value::Number(n) = subject else { return Ok(Verdict::Fail) };
    Ok((decimals(n) <= limit).into())
}

pub fn bit32(subject: &Value, _: &[Value]) -> Checked {
    let fits = subject
        .as_i64()
        .is_some_and(|i| i32::try_from(i).is_ok());
    Ok(fits.into())
}

pub fn bit64(subject: &Value, _: &[Value]) -> Checked {
    Ok(subject.as_i64().is_some().into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(f: fn(&Value, &[Value]) -> Checked, v: Value, args: &[Value]) -> bool {
        f(&v, args).unwrap().passed()
    }

    #[test]
    fn range_is_inclusive() {
        let args = [json!(1), json!(3)];
        assert!(run(range, json!(1), &args));
        assert!(run(range, json!(3), &args));
        assert!(run(range, json!(2.5), &args));
        assert!(!run(range, json!(4), &args));
        assert!(!run(range, json!(0.999), &args));
    }

    #[test]
    fn range_rejects_inverted_bounds() {
        assert!(range(&json!(2), &[json!(3), json!(1)]).is_err());
        assert!(range(&json!(2), &[json!("a"), json!(1)]).is_err());
    }

    #[test]
    fn big_unsigned_compare_exactly() {
        assert!(run(min, json!(u64::MAX), &[json!(u64::MAX - 1)]));
        assert!(!run(max, json!(u64::MAX), &[json!(u64::MAX - 1)]));
    }

    #[test]
    fn signs() {
        assert!(run(positive, json!(0.1), &[]));
        assert!(!run(positive, json!(0), &[]));
        assert!(run(non_negative, json!(0), &[]));
        assert!(run(negative, json!(-2), &[]));
    }

    fn number(v: Value) -> Number {
        match v {
            Value::Number(n) => n,
            other => panic!("not a number: {other}"),
        }
    }

    #[test]
    fn decimals_count_fraction_digits() {
        assert_eq!(decimals(&number(json!(1.25))), 2);
        assert_eq!(decimals(&number(json!(3))), 0);
        assert_eq!(decimals(&number(json!(1e-7))), 7);
        assert!(run(max_decimals, json!(1.25), &[json!(2)]));
        assert!(!run(max_decimals, json!(1.255), &[json!(2)]));
    }

    #[test]
    fn bit_widths() {
        assert!(run(bit32, json!(i32::MAX), &[]));
        assert!(!run(bit32, json!(i64::from(i32::MAX) + 1), &[]));
        assert!(run(bit64, json!(i64::MIN), &[]));
        assert!(!run(bit64, json!(u64::MAX), &[]));
    }
}
