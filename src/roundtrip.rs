//! Structural comparison of JSON trees, used to check that serializing a
//! validated value reproduces the document it was validated from.
//!
//! Both mapping keys and sequence elements are compared without regard to
//! order: sequences are matched as multisets. Numbers are compared by value,
//! so `1` and `1.0` are equal, but integers are never rounded: `u64::MAX` is
//! not equal to the float nearest to it.

use crate::error::{PathSegment, ValidationReport};
use crate::serialize::{serialize, SerializeOptions};
use crate::types::TypeSpec;
use crate::validate::{validate, ValidateOptions};
use serde::Serialize;
use serde_json::{Number, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffKind {
    ValuesChanged,
    TypeChanges,
    ItemAdded,
    ItemRemoved,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Difference {
    pub path: Vec<PathSegment>,
    pub kind: DiffKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right: Option<Value>,
}

pub fn deep_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => numbers_eq(x, y),
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).map_or(false, |w| deep_eq(v, w)))
        }
        (Value::Array(x), Value::Array(y)) => {
            let (unmatched_x, unmatched_y) = match_items(x, y);
            unmatched_x.is_empty() && unmatched_y.is_empty()
        }
        _ => a == b,
    }
}

/// The differences between `a` and `b`; empty exactly when they are
/// [`deep_eq`].
pub fn diff(a: &Value, b: &Value) -> Vec<Difference> {
    let mut out = vec![];
    diff_at(&mut vec![], a, b, &mut out);
    out
}

/// Validates `instance`, serializes the result with aliases and without
/// null fields, and diffs it against `instance`.
pub fn check_round_trip(
    spec: &TypeSpec,
    instance: &Value,
    options: ValidateOptions,
) -> Result<Vec<Difference>, ValidationReport> {
    let value = validate(spec, instance, options).into_result()?;
    let output = serialize(
        &value,
        &SerializeOptions::new().with_alias(true).with_exclude_null(true),
    );

    Ok(diff(instance, &output))
}

fn diff_at(path: &mut Vec<PathSegment>, a: &Value, b: &Value, out: &mut Vec<Difference>) {
    if deep_eq(a, b) {
        return;
    }

    match (a, b) {
        (Value::Object(x), Value::Object(y)) => {
            for (k, v) in x {
                path.push(PathSegment::from(k.as_str()));
                match y.get(k) {
                    Some(w) => diff_at(path, v, w, out),
                    None => out.push(difference(path, DiffKind::ItemRemoved, Some(v), None)),
                }
                path.pop();
            }

            for (k, w) in y {
                if !x.contains_key(k) {
                    path.push(PathSegment::from(k.as_str()));
                    out.push(difference(path, DiffKind::ItemAdded, None, Some(w)));
                    path.pop();
                }
            }
        }
        (Value::Array(x), Value::Array(y)) => {
            let (unmatched_x, unmatched_y) = match_items(x, y);

            for (&i, &j) in unmatched_x.iter().zip(&unmatched_y) {
                path.push(PathSegment::Index(i));
                diff_at(path, &x[i], &y[j], out);
                path.pop();
            }

            for &i in unmatched_x.iter().skip(unmatched_y.len()) {
                path.push(PathSegment::Index(i));
                out.push(difference(path, DiffKind::ItemRemoved, Some(&x[i]), None));
                path.pop();
            }

            for &j in unmatched_y.iter().skip(unmatched_x.len()) {
                path.push(PathSegment::Index(j));
                out.push(difference(path, DiffKind::ItemAdded, None, Some(&y[j])));
                path.pop();
            }
        }
        _ => {
            let kind = if type_name(a) == type_name(b) {
                DiffKind::ValuesChanged
            } else {
                DiffKind::TypeChanges
            };
            out.push(difference(path, kind, Some(a), Some(b)));
        }
    }
}

/// Pairs up equal elements; returns the indices of `x` and of `y` left
/// without a partner, in ascending order.
fn match_items(x: &[Value], y: &[Value]) -> (Vec<usize>, Vec<usize>) {
    let mut used = vec![false; y.len()];
    let mut unmatched_x = vec![];

    for (i, item) in x.iter().enumerate() {
        let partner = (0..y.len()).find(|&j| !used[j] && deep_eq(item, &y[j]));
        match partner {
            Some(j) => used[j] = true,
            None => unmatched_x.push(i),
        }
    }

    let unmatched_y = used
        .iter()
        .enumerate()
        .filter(|(_, used)| !**used)
        .map(|(j, _)| j)
        .collect();

    (unmatched_x, unmatched_y)
}

/// Integers compare exactly; an integer equals a float only when the float
/// is integral and converts back to the same integer.
fn numbers_eq(x: &Number, y: &Number) -> bool {
    match (integer_of(x), integer_of(y)) {
        (Some(a), Some(b)) => a == b,
        (Some(i), None) => float_is(y, i),
        (None, Some(i)) => float_is(x, i),
        (None, None) => x.as_f64() == y.as_f64(),
    }
}

fn integer_of(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

fn float_is(n: &Number, i: i128) -> bool {
    n.as_f64().map_or(false, |f| f.fract() == 0.0 && f as i128 == i)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn difference(
    path: &[PathSegment],
    kind: DiffKind,
    left: Option<&Value>,
    right: Option<&Value>,
) -> Difference {
    Difference {
        path: path.to_vec(),
        kind,
        left: left.cloned(),
        right: right.cloned(),
    }
}
