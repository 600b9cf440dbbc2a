pub mod memory;
pub mod postgres;
pub mod seed;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;

use crate::models::id_key;

pub const EMPLOYEES: &str = "employees";
pub const DEPARTMENTS: &str = "departments";
pub const STORES: &str = "stores";
pub const ROLES: &str = "roles";
pub const LEAVE_REQUESTS: &str = "leaveRequests";
pub const ANNOUNCEMENTS: &str = "announcements";
pub const AUDIT_LOGS: &str = "auditLogs";
pub const USERS: &str = "users";

pub const RESOURCES: &[&str] = &[
    EMPLOYEES,
    DEPARTMENTS,
    STORES,
    ROLES,
    LEAVE_REQUESTS,
    ANNOUNCEMENTS,
    AUDIT_LOGS,
    USERS,
];

pub fn is_known_resource(resource: &str) -> bool {
    RESOURCES.contains(&resource)
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("invalid record: {0}")]
    InvalidRecord(String),
    #[error("unexpected: {0}")]
    Unexpected(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound("record".to_string()),
            other => StoreError::Unexpected(other.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// JSON record collections keyed by resource name.
///
/// Every record is a JSON object carrying an `id`. Ids are compared by their
/// string form so `7` and `"7"` address the same record.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn list(&self, resource: &str) -> StoreResult<Vec<Value>>;
    async fn get(&self, resource: &str, id: &str) -> StoreResult<Value>;
    /// Stores a new record, assigning the next numeric id when `id` is absent.
    async fn insert(&self, resource: &str, body: Value) -> StoreResult<Value>;
    /// Replaces the whole record; the stored id always wins over the body's.
    async fn replace(&self, resource: &str, id: &str, body: Value) -> StoreResult<Value>;
    /// Shallow merge of `body` into the stored record.
    async fn patch(&self, resource: &str, id: &str, body: Value) -> StoreResult<Value>;
    /// `patch` that only applies while `field` still equals `expected`;
    /// otherwise Conflict and the record is left alone.
    async fn patch_if(
        &self,
        resource: &str,
        id: &str,
        field: &str,
        expected: &Value,
        body: Value,
    ) -> StoreResult<Value>;
    async fn delete(&self, resource: &str, id: &str) -> StoreResult<Value>;
    async fn is_empty(&self) -> StoreResult<bool>;
    fn backend_name(&self) -> &'static str;
}

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

/// Checks the body is an object and drops a null `id`.
pub(crate) fn prepare_body(body: Value) -> StoreResult<Map<String, Value>> {
    match body {
        Value::Object(mut map) => {
            if map.get("id").map_or(false, Value::is_null) {
                map.remove("id");
            }
            Ok(map)
        }
        _ => Err(StoreError::InvalidRecord("record must be a JSON object".to_string())),
    }
}

/// One above the largest numeric id in `records`, or 1 when there is none.
/// Fails when the largest id is already `i64::MAX`.
pub(crate) fn next_numeric_id<'a>(records: impl Iterator<Item = &'a Value>) -> StoreResult<i64> {
    records
        .filter_map(|r| r.get("id"))
        .filter_map(|id| match id {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.parse::<i64>().ok(),
            _ => None,
        })
        .max()
        .unwrap_or(0)
        .max(0)
        .checked_add(1)
        .ok_or_else(|| StoreError::Conflict("no numeric id left to assign".to_string()))
}

pub(crate) fn stale(resource: &str, id: &str, field: &str) -> StoreError {
    StoreError::Conflict(format!("{}/{} {} changed in the meantime", resource, id, field))
}

pub(crate) fn record_key(record: &Value) -> Option<String> {
    record.get("id").and_then(id_key)
}

/// Decodes every record of `resource` as `T`; records that don't decode are
/// skipped with a warning.
pub async fn fetch_all<T: DeserializeOwned>(
    store: &dyn RecordStore,
    resource: &str,
) -> StoreResult<Vec<T>> {
    let records = store.list(resource).await?;
    let mut items = Vec::with_capacity(records.len());
    for record in records {
        match serde_json::from_value::<T>(record.clone()) {
            Ok(item) => items.push(item),
            Err(err) => log::warn!(
                "Skipping malformed {} record {:?}: {}",
                resource,
                record_key(&record),
                err
            ),
        }
    }
    Ok(items)
}

pub async fn fetch_one<T: DeserializeOwned>(
    store: &dyn RecordStore,
    resource: &str,
    id: &str,
) -> StoreResult<T> {
    let record = store.get(resource, id).await?;
    serde_json::from_value(record)
        .map_err(|err| StoreError::Unexpected(format!("{}/{} does not decode: {}", resource, id, err)))
}

pub fn to_record<T: Serialize>(item: &T) -> StoreResult<Value> {
    serde_json::to_value(item).map_err(|err| StoreError::InvalidRecord(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prepare_body_strips_null_id_and_rejects_non_objects() {
        let map = prepare_body(json!({"id": null, "name": "Baku"})).unwrap();
        assert!(!map.contains_key("id"));
        assert_eq!(map["name"], "Baku");

        assert!(matches!(
            prepare_body(json!([1, 2])),
            Err(StoreError::InvalidRecord(_))
        ));
    }

    #[test]
    fn next_numeric_id_skips_text_ids() {
        let records = vec![json!({"id": 4}), json!({"id": "10"}), json!({"id": "abc"})];
        assert_eq!(next_numeric_id(records.iter()).unwrap(), 11);
        assert_eq!(next_numeric_id(std::iter::empty()).unwrap(), 1);
    }

    #[test]
    fn next_numeric_id_refuses_to_overflow() {
        let records = vec![json!({"id": i64::MAX}), json!({"id": 3})];
        assert!(matches!(
            next_numeric_id(records.iter()),
            Err(StoreError::Conflict(_))
        ));
    }
}
