//! json-server style list queries over JSON records: field equality
//! filters, `q` full-text search, `_sort`/`_order`, and `_start`/`_end` or
//! `_page`/`_limit` slicing.
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::models::id_key;

/// Case-insensitive substring match; an empty needle matches everything.
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Follows a dotted path such as `salary.currency`.
fn lookup_path<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(record, |current, key| current.get(key))
}

fn matches_text(value: &Value, term: &str) -> bool {
    match value {
        Value::String(s) => s.to_lowercase().contains(term),
        Value::Number(n) => n.to_string().contains(term),
        Value::Bool(b) => b.to_string() == term,
        Value::Array(items) => items.iter().any(|v| matches_text(v, term)),
        Value::Object(map) => map.values().any(|v| matches_text(v, term)),
        Value::Null => false,
    }
}

/// Orders JSON scalars: numbers numerically, strings lexicographically,
/// anything missing or null last.
pub fn compare_json(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Greater,
        (_, None | Some(Value::Null)) => Ordering::Less,
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

fn parse_usize(params: &HashMap<String, String>, key: &str) -> Option<usize> {
    params.get(key).and_then(|v| v.parse::<usize>().ok())
}

pub fn apply_list_query(mut records: Vec<Value>, params: &HashMap<String, String>) -> Vec<Value> {
    for (key, expected) in params {
        if key.starts_with('_') || key == "q" {
            continue;
        }
        records.retain(|record| {
            lookup_path(record, key)
                .and_then(id_key)
                .map_or(false, |actual| actual == *expected)
        });
    }

    if let Some(term) = params.get("q").map(|q| q.trim().to_lowercase()) {
        if !term.is_empty() {
            records.retain(|record| matches_text(record, &term));
        }
    }

    if let Some(field) = params.get("_sort") {
        let descending = params
            .get("_order")
            .map_or(false, |o| o.eq_ignore_ascii_case("desc"));
        records.sort_by(|a, b| {
            let ord = compare_json(lookup_path(a, field), lookup_path(b, field));
            if descending {
                ord.reverse()
            } else {
                ord
            }
        });
    }

    let total = records.len();
    let (start, end) = if let Some(start) = parse_usize(params, "_start") {
        let end = parse_usize(params, "_end")
            .or_else(|| parse_usize(params, "_limit").map(|l| start + l))
            .unwrap_or(total);
        (start, end)
    } else if let Some(limit) = parse_usize(params, "_limit") {
        let page = parse_usize(params, "_page").unwrap_or(1).max(1);
        ((page - 1) * limit, page * limit)
    } else {
        (0, total)
    };

    let start = start.min(total);
    let end = end.clamp(start, total);
    records.drain(start..end).collect()
}
