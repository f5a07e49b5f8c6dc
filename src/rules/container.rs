//! Size rules for arrays and objects.
use serde_json::Value;

use super::arg_count;
use crate::descriptor::Verdict;
use crate::error::ProviderError;

type Checked = Result<Verdict, ProviderError>;

fn size(subject: &Value) -> Option<usize> {
    match subject {
        Value::Array(xs) => Some(xs.len()),
        Value::Object(map) => Some(map.len()),
        _ => None,
    }
}

pub fn min_size(subject: &Value, args: &[Value]) -> Checked {
    let n = arg_count("minSize", args, 0)?;
    Ok(size(subject).is_some_and(|len| len >= n).into())
}

pub fn max_size(subject: &Value, args: &[Value]) -> Checked {
    let n = arg_count("maxSize", args, 0)?;
    Ok(size(subject).is_some_and(|len| len <= n).into())
}

pub fn exact_size(subject: &Value, args: &[Value]) -> Checked {
    let n = arg_count("exactSize", args, 0)?;
    Ok(size(subject).is_some_and(|len| len == n).into())
}
