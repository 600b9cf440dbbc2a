//! Postgres-backed record store.
//!
//! All resources share one `records` table; the JSON body is stored as
//! `jsonb` and `seq` keeps insertion order for listing.
use async_trait::async_trait;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::PgPool;

use super::{next_numeric_id, prepare_body, stale, RecordStore, StoreError, StoreResult};
use crate::models::id_key;

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    resource TEXT NOT NULL,
    id TEXT NOT NULL,
    body JSONB NOT NULL,
    seq BIGSERIAL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (resource, id)
)
"#;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(pool: PgPool) -> StoreResult<Self> {
        sqlx::query(CREATE_TABLE).execute(&pool).await?;
        Ok(Self { pool })
    }
}

fn not_found(resource: &str, id: &str) -> StoreError {
    StoreError::NotFound(format!("{}/{}", resource, id))
}

#[async_trait]
impl RecordStore for PgStore {
    async fn list(&self, resource: &str) -> StoreResult<Vec<Value>> {
        let rows = sqlx::query_scalar::<_, Json<Value>>(
            "SELECT body FROM records WHERE resource = $1 ORDER BY seq",
        )
        .bind(resource)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|Json(body)| body).collect())
    }

    async fn get(&self, resource: &str, id: &str) -> StoreResult<Value> {
        sqlx::query_scalar::<_, Json<Value>>(
            "SELECT body FROM records WHERE resource = $1 AND id = $2",
        )
        .bind(resource)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(|Json(body)| body)
        .ok_or_else(|| not_found(resource, id))
    }

    async fn insert(&self, resource: &str, body: Value) -> StoreResult<Value> {
        let mut map = prepare_body(body)?;
        let mut tx = self.pool.begin().await?;

        // Serialises id assignment per resource.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(resource)
            .execute(&mut *tx)
            .await?;

        let key = match map.get("id").and_then(id_key) {
            Some(key) => key,
            None => {
                let ids = sqlx::query_scalar::<_, Json<Value>>(
                    "SELECT jsonb_build_object('id', body->'id') FROM records WHERE resource = $1",
                )
                .bind(resource)
                .fetch_all(&mut *tx)
                .await?;
                let ids: Vec<Value> = ids.into_iter().map(|Json(v)| v).collect();
                let next = next_numeric_id(ids.iter())?;
                map.insert("id".to_string(), Value::from(next));
                next.to_string()
            }
        };

        let record = Value::Object(map);
        let inserted = sqlx::query(
            "INSERT INTO records (resource, id, body) VALUES ($1, $2, $3) ON CONFLICT (resource, id) DO NOTHING",
        )
        .bind(resource)
        .bind(&key)
        .bind(Json(&record))
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!(
                "{}/{} already exists",
                resource, key
            )));
        }

        tx.commit().await?;
        Ok(record)
    }

    async fn replace(&self, resource: &str, id: &str, body: Value) -> StoreResult<Value> {
        let mut map = prepare_body(body)?;
        let existing = self.get(resource, id).await?;
        map.insert(
            "id".to_string(),
            existing.get("id").cloned().unwrap_or(Value::Null),
        );
        let record = Value::Object(map);

        sqlx::query_scalar::<_, Json<Value>>(
            "UPDATE records SET body = $3, updated_at = NOW() WHERE resource = $1 AND id = $2 RETURNING body",
        )
        .bind(resource)
        .bind(id)
        .bind(Json(&record))
        .fetch_optional(&self.pool)
        .await?
        .map(|Json(body)| body)
        .ok_or_else(|| not_found(resource, id))
    }

    async fn patch(&self, resource: &str, id: &str, body: Value) -> StoreResult<Value> {
        let mut map = prepare_body(body)?;
        map.remove("id");

        sqlx::query_scalar::<_, Json<Value>>(
            "UPDATE records SET body = body || $3, updated_at = NOW() WHERE resource = $1 AND id = $2 RETURNING body",
        )
        .bind(resource)
        .bind(id)
        .bind(Json(Value::Object(map)))
        .fetch_optional(&self.pool)
        .await?
        .map(|Json(body)| body)
        .ok_or_else(|| not_found(resource, id))
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

        let updated = sqlx::query_scalar::<_, Json<Value>>(
            "UPDATE records SET body = body || $3, updated_at = NOW() \
             WHERE resource = $1 AND id = $2 AND body -> $4 = $5 RETURNING body",
        )
        .bind(resource)
        .bind(id)
        .bind(Json(Value::Object(map)))
        .bind(field)
        .bind(Json(expected))
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(Json(body)) => Ok(body),
            None => {
                self.get(resource, id).await?;
                Err(stale(resource, id, field))
            }
        }
    }

    async fn delete(&self, resource: &str, id: &str) -> StoreResult<Value> {
        sqlx::query_scalar::<_, Json<Value>>(
            "DELETE FROM records WHERE resource = $1 AND id = $2 RETURNING body",
        )
        .bind(resource)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(|Json(body)| body)
        .ok_or_else(|| not_found(resource, id))
    }

    async fn is_empty(&self) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM records)")
            .fetch_one(&self.pool)
            .await?;
        Ok(!exists)
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
