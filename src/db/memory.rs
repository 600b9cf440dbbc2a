//! In-memory record store.
//!
//! Used for local development and tests, and whenever `DATABASE_URL` is not
//! set. Nothing survives a restart. Records keep insertion order inside each
//! resource.
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{next_numeric_id, prepare_body, record_key, stale, RecordStore, StoreError, StoreResult};
use crate::models::id_key;

#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<HashMap<String, Vec<Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(resource: &str, id: &str) -> StoreError {
    StoreError::NotFound(format!("{}/{}", resource, id))
}

fn position(records: &[Value], id: &str) -> Option<usize> {
    records
        .iter()
        .position(|r| record_key(r).as_deref() == Some(id))
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn list(&self, resource: &str) -> StoreResult<Vec<Value>> {
        let data = self.data.read().await;
        Ok(data.get(resource).cloned().unwrap_or_default())
    }

    async fn get(&self, resource: &str, id: &str) -> StoreResult<Value> {
        let data = self.data.read().await;
        data.get(resource)
            .and_then(|records| position(records, id).map(|idx| records[idx].clone()))
            .ok_or_else(|| not_found(resource, id))
    }

    async fn insert(&self, resource: &str, body: Value) -> StoreResult<Value> {
        let mut map = prepare_body(body)?;
        let mut data = self.data.write().await;
        let records = data.entry(resource.to_string()).or_default();

        match map.get("id").and_then(id_key) {
            Some(key) => {
                if position(records, &key).is_some() {
                    return Err(StoreError::Conflict(format!(
                        "{}/{} already exists",
                        resource, key
                    )));
                }
            }
            None => {
                map.insert("id".to_string(), Value::from(next_numeric_id(records.iter())?));
            }
        }

        let record = Value::Object(map);
        records.push(record.clone());
        Ok(record)
    }

    async fn replace(&self, resource: &str, id: &str, body: Value) -> StoreResult<Value> {
        let mut map = prepare_body(body)?;
        let mut data = self.data.write().await;
        let records = data.get_mut(resource).ok_or_else(|| not_found(resource, id))?;
        let idx = position(records, id).ok_or_else(|| not_found(resource, id))?;

        let stored_id = records[idx].get("id").cloned().unwrap_or(Value::Null);
        map.insert("id".to_string(), stored_id);
        records[idx] = Value::Object(map);
        Ok(records[idx].clone())
    }

    async fn patch(&self, resource: &str, id: &str, body: Value) -> StoreResult<Value> {
        let mut map = prepare_body(body)?;
        map.remove("id");
        let mut data = self.data.write().await;
        let records = data.get_mut(resource).ok_or_else(|| not_found(resource, id))?;
        let idx = position(records, id).ok_or_else(|| not_found(resource, id))?;

        if let Value::Object(existing) = &mut records[idx] {
            for (key, value) in map {
                existing.insert(key, value);
            }
        }
        Ok(records[idx].clone())
    }

    async fn patch_if(
        &self,
        resource: &str,
        id: &str,
        field: &str,
        expected: &Value,
        body: Value,
    ) -> StoreResult<Value> {
        let mut map = prepare_body(body)?;
        map.remove("id");
        let mut data = self.data.write().await;
        let records = data.get_mut(resource).ok_or_else(|| not_found(resource, id))?;
        let idx = position(records, id).ok_or_else(|| not_found(resource, id))?;

        if records[idx].get(field) != Some(expected) {
            return Err(stale(resource, id, field));
        }
        if let Value::Object(existing) = &mut records[idx] {
            for (key, value) in map {
                existing.insert(key, value);
            }
        }
        Ok(records[idx].clone())
    }

    async fn delete(&self, resource: &str, id: &str) -> StoreResult<Value> {
        let mut data = self.data.write().await;
        let records = data.get_mut(resource).ok_or_else(|| not_found(resource, id))?;
        let idx = position(records, id).ok_or_else(|| not_found(resource, id))?;
        Ok(records.remove(idx))
    }

    async fn is_empty(&self) -> StoreResult<bool> {
        let data = self.data.read().await;
        Ok(data.values().all(Vec::is_empty))
    }

    fn backend_name(&self) -> &'static str {
        "in-memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn insert_assigns_sequential_ids() {
        let store = MemoryStore::new();
        let a = store.insert("stores", json!({"name": "Nizami"})).await.unwrap();
        let b = store.insert("stores", json!({"id": null, "name": "Yasamal"})).await.unwrap();
        assert_eq!(a["id"], 1);
        assert_eq!(b["id"], 2);
    }

    #[tokio::test]
    async fn insert_keeps_client_id_and_rejects_duplicates() {
        let store = MemoryStore::new();
        store
            .insert("leaveRequests", json!({"id": "1700000000000", "days": 2}))
            .await
            .unwrap();
        let dup = store
            .insert("leaveRequests", json!({"id": "1700000000000"}))
            .await;
        assert!(matches!(dup, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn insert_after_max_id_is_a_conflict_not_a_panic() {
        let store = MemoryStore::new();
        store.insert("stores", json!({"id": i64::MAX, "name": "Edge"})).await.unwrap();
        let next = store.insert("stores", json!({"name": "Overflow"})).await;
        assert!(matches!(next, Err(StoreError::Conflict(_))));
        assert_eq!(store.list("stores").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn patch_if_applies_once() {
        let store = MemoryStore::new();
        store
            .insert("leaveRequests", json!({"id": "9", "status": "pending"}))
            .await
            .unwrap();
        let pending = json!("pending");

        let first = store
            .patch_if("leaveRequests", "9", "status", &pending, json!({"status": "approved"}))
            .await
            .unwrap();
        assert_eq!(first["status"], "approved");

        let second = store
            .patch_if("leaveRequests", "9", "status", &pending, json!({"status": "rejected"}))
            .await;
        assert!(matches!(second, Err(StoreError::Conflict(_))));
        assert_eq!(store.get("leaveRequests", "9").await.unwrap()["status"], "approved");
    }

    #[tokio::test]
    async fn numeric_and_text_ids_address_same_record() {
        let store = MemoryStore::new();
        store.insert("roles", json!({"id": 5, "name": "Cashier"})).await.unwrap();
        let role = store.get("roles", "5").await.unwrap();
        assert_eq!(role["name"], "Cashier");
    }

    #[tokio::test]
    async fn replace_forces_stored_id() {
        let store = MemoryStore::new();
        store.insert("roles", json!({"id": 5, "name": "Cashier"})).await.unwrap();
        let replaced = store
            .replace("roles", "5", json!({"id": 99, "name": "Senior cashier"}))
            .await
            .unwrap();
        assert_eq!(replaced, json!({"id": 5, "name": "Senior cashier"}));
    }

    #[tokio::test]
    async fn patch_merges_shallowly() {
        let store = MemoryStore::new();
        store
            .insert("stores", json!({"id": 1, "name": "Nizami", "code": "NZ"}))
            .await
            .unwrap();
        let patched = store
            .patch("stores", "1", json!({"code": "NZM", "id": 3}))
            .await
            .unwrap();
        assert_eq!(patched, json!({"id": 1, "name": "Nizami", "code": "NZM"}));
    }

    #[tokio::test]
    async fn delete_missing_record_is_not_found() {
        let store = MemoryStore::new();
        assert!(store.is_empty().await.unwrap());
        assert!(matches!(
            store.delete("stores", "1").await,
            Err(StoreError::NotFound(_))
        ));
    }
}
