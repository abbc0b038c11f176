//! BSON value helpers shared by filters and the in-memory evaluator.
//!
//! Semantics follow the document store: numeric values compare equal across
//! integer/double representations, dotted paths traverse embedded documents
//! (and fan out over arrays), and missing fields compare like `null`.

use core::cmp::Ordering;

use bson::{Bson, Document};

pub use supermarket_core::Number;

/// Numeric view of a BSON integer or double.
pub fn to_number(value: &Bson) -> Option<Number> {
    match value {
        Bson::Int32(i) => Some(Number::Int(i64::from(*i))),
        Bson::Int64(i) => Some(Number::Int(*i)),
        Bson::Double(d) => Some(Number::Double(*d)),
        _ => None,
    }
}

/// Integers narrow to `Int32` when they fit, as the store does.
pub fn number_to_bson(n: Number) -> Bson {
    match n {
        Number::Int(i) => i32::try_from(i).map(Bson::Int32).unwrap_or(Bson::Int64(i)),
        Number::Double(d) => Bson::Double(d),
    }
}

/// Resolve a dotted path. Arrays met along the way fan out into an array of
/// the resolved values (missing values are skipped).
pub fn lookup_path(doc: &Document, path: &str) -> Option<Bson> {
    let (head, rest) = match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    };
    let value = doc.get(head)?;
    match rest {
        None => Some(value.clone()),
        Some(rest) => descend(value, rest),
    }
}

fn descend(value: &Bson, path: &str) -> Option<Bson> {
    match value {
        Bson::Document(inner) => lookup_path(inner, path),
        Bson::Array(items) => {
            let values: Vec<Bson> = items.iter().filter_map(|v| descend(v, path)).collect();
            Some(Bson::Array(values))
        }
        _ => None,
    }
}

/// Set a dotted path, creating (or replacing non-document) intermediates.
pub fn set_path(doc: &mut Document, path: &str, value: Bson) {
    match path.split_once('.') {
        None => {
            doc.insert(path, value);
        }
        Some((head, rest)) => {
            if !matches!(doc.get(head), Some(Bson::Document(_))) {
                doc.insert(head, Document::new());
            }
            if let Some(Bson::Document(inner)) = doc.get_mut(head) {
                set_path(inner, rest, value);
            }
        }
    }
}

/// Remove a dotted path if present.
pub fn remove_path(doc: &mut Document, path: &str) {
    match path.split_once('.') {
        None => {
            doc.remove(path);
        }
        Some((head, rest)) => {
            if let Some(Bson::Document(inner)) = doc.get_mut(head) {
                remove_path(inner, rest);
            }
        }
    }
}

/// Store equality: numbers by value, containers structurally.
pub fn values_equal(a: &Bson, b: &Bson) -> bool {
    if let (Some(x), Some(y)) = (to_number(a), to_number(b)) {
        return x.as_f64() == y.as_f64();
    }
    match (a, b) {
        (Bson::Array(x), Bson::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| values_equal(l, r))
        }
        (Bson::Document(x), Bson::Document(y)) => {
            x.len() == y.len()
                && x.iter()
                    .zip(y.iter())
                    .all(|((lk, lv), (rk, rv))| lk == rk && values_equal(lv, rv))
        }
        (Bson::Null | Bson::Undefined, Bson::Null | Bson::Undefined) => true,
        _ => a == b,
    }
}

/// Equality-match semantics used by `$match` and `$lookup`:
/// a missing candidate matches `null`, an array candidate matches when any
/// element (or the array as a whole) equals the target.
pub fn field_matches(candidate: Option<&Bson>, target: &Bson) -> bool {
    match candidate {
        None => matches!(target, Bson::Null),
        Some(value @ Bson::Array(items)) => {
            values_equal(value, target) || items.iter().any(|item| values_equal(item, target))
        }
        Some(value) => values_equal(value, target),
    }
}

fn type_rank(value: &Bson) -> u8 {
    match value {
        Bson::MinKey => 0,
        Bson::Null | Bson::Undefined => 1,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => 2,
        Bson::String(_) | Bson::Symbol(_) => 3,
        Bson::Document(_) => 4,
        Bson::Array(_) => 5,
        Bson::Binary(_) => 6,
        Bson::ObjectId(_) => 7,
        Bson::Boolean(_) => 8,
        Bson::DateTime(_) => 9,
        Bson::Timestamp(_) => 10,
        Bson::RegularExpression(_) => 11,
        Bson::MaxKey => 13,
        _ => 12,
    }
}

/// Total order across BSON types (store comparison order).
pub fn compare_values(a: &Bson, b: &Bson) -> Ordering {
    let rank = type_rank(a).cmp(&type_rank(b));
    if rank != Ordering::Equal {
        return rank;
    }
    if let (Some(x), Some(y)) = (to_number(a), to_number(b)) {
        return x.as_f64().total_cmp(&y.as_f64());
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => x.cmp(y),
        (Bson::Symbol(x), Bson::Symbol(y)) => x.cmp(y),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        (Bson::DateTime(x), Bson::DateTime(y)) => x.cmp(y),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => x.bytes().cmp(&y.bytes()),
        (Bson::Array(x), Bson::Array(y)) => x
            .iter()
            .zip(y)
            .map(|(l, r)| compare_values(l, r))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        (Bson::Document(x), Bson::Document(y)) => x
            .iter()
            .zip(y.iter())
            .map(|((lk, lv), (rk, rv))| lk.cmp(rk).then_with(|| compare_values(lv, rv)))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        _ => Ordering::Equal,
    }
}

/// Stable grouping key: numerically equal values map to the same key.
pub fn group_key(value: &Bson) -> String {
    if let Some(n) = to_number(value) {
        return format!("n:{}", n.as_f64());
    }
    match value {
        Bson::Null | Bson::Undefined => "null".to_string(),
        Bson::Array(items) => {
            let parts: Vec<String> = items.iter().map(group_key).collect();
            format!("a:[{}]", parts.join(","))
        }
        Bson::Document(doc) => {
            let parts: Vec<String> = doc
                .iter()
                .map(|(k, v)| format!("{k}={}", group_key(v)))
                .collect();
            format!("d:{{{}}}", parts.join(","))
        }
        other => format!("v:{other:?}"),
    }
}
