pub mod announcement;
pub mod audit;
pub mod department;
pub mod employee;
pub mod leave;
pub mod user;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Record identifier as it appears on the wire: seeded and generated ids are
/// numbers, ids supplied by clients are often strings. Two ids are the same
/// record when their string forms match.
#[derive(Debug, Clone, Serialize, Deserialize, Eq)]
#[serde(untagged)]
pub enum RecordId {
    Number(i64),
    Text(String),
}

impl RecordId {
    pub fn as_key(&self) -> String {
        match self {
            RecordId::Number(n) => n.to_string(),
            RecordId::Text(s) => s.clone(),
        }
    }

    pub fn matches(&self, key: &str) -> bool {
        self.as_key() == key
    }
}

impl PartialEq for RecordId {
    fn eq(&self, other: &Self) -> bool {
        self.as_key() == other.as_key()
    }
}

impl std::hash::Hash for RecordId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.as_key().hash(state);
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_key())
    }
}

impl From<i64> for RecordId {
    fn from(n: i64) -> Self {
        RecordId::Number(n)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId::Text(s.to_string())
    }
}

/// String form of a JSON id value; `None` for null, objects and arrays.
pub fn id_key(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_and_text_ids_compare_by_string_form() {
        assert_eq!(RecordId::Number(7), RecordId::Text("7".to_string()));
        assert_ne!(RecordId::Number(7), RecordId::Text("07".to_string()));
    }

    #[test]
    fn record_id_deserializes_both_shapes() {
        let n: RecordId = serde_json::from_value(json!(3)).unwrap();
        let s: RecordId = serde_json::from_value(json!("1700000000000")).unwrap();
        assert_eq!(n, RecordId::Number(3));
        assert_eq!(s.as_key(), "1700000000000");
    }

    #[test]
    fn id_key_ignores_null() {
        assert_eq!(id_key(&json!(null)), None);
        assert_eq!(id_key(&json!(12)), Some("12".to_string()));
        assert_eq!(id_key(&json!("ab")), Some("ab".to_string()));
    }
}
