//! Generic REST access to every resource, plus the health check.
use actix_web::{web, HttpResponse};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};

use crate::db::seed::harden_user;
use crate::db::{
    is_known_resource, RecordStore, ANNOUNCEMENTS, AUDIT_LOGS, EMPLOYEES, LEAVE_REQUESTS, USERS,
};
use crate::errors::AppError;
use crate::handlers::announcement::visible_to;
use crate::models::announcement::Audience;
use crate::models::user::{AuthUser, Role};
use crate::models::{id_key, RecordId};
use crate::permissions::{Denial, Permissions};
use crate::state::AppState;
use crate::utils::query::apply_list_query;

pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "ok": true,
        "mode": state.store().backend_name(),
        "note": "Records are served under /api/{resource}, the HR API under /v1",
    }))
}

fn known(resource: &str) -> Result<(), AppError> {
    if is_known_resource(resource) {
        Ok(())
    } else {
        Err(AppError::NotFound(format!("Unknown resource: {}", resource)))
    }
}

fn require_admin(user: &AuthUser) -> Result<(), AppError> {
    if user.role == Role::Admin {
        Ok(())
    } else {
        Err(AppError::Forbidden("Only admins may modify records".to_string()))
    }
}

fn record_key(record: &Value, field: &str) -> Option<String> {
    record.get(field).and_then(id_key)
}

fn ids_where(records: &[Value], keep: impl Fn(&Value) -> bool) -> HashSet<String> {
    records
        .iter()
        .filter(|r| keep(*r))
        .filter_map(|r| record_key(r, "id"))
        .collect()
}

async fn scoped_employee_ids(
    store: &dyn RecordStore,
    perms: &Permissions,
) -> Result<HashSet<String>, AppError> {
    let employees = store.list(EMPLOYEES).await?;
    Ok(ids_where(&employees, |e| {
        let store_id = e
            .get("storeId")
            .cloned()
            .and_then(|v| serde_json::from_value::<RecordId>(v).ok());
        perms.in_scope(store_id.as_ref())
    }))
}

async fn scoped_leave_ids(
    store: &dyn RecordStore,
    employees: &HashSet<String>,
) -> Result<HashSet<String>, AppError> {
    let requests = store.list(LEAVE_REQUESTS).await?;
    Ok(ids_where(&requests, |r| {
        record_key(r, "employeeId").map_or(false, |e| employees.contains(&e))
    }))
}

/// Ids of the `resource` records `user` may read; `None` when nothing is
/// filtered. Store managers only see their store's employees, those
/// employees' leave requests and the audit entries about either, and never
/// see user accounts.
pub(crate) async fn readable_ids(
    store: &dyn RecordStore,
    user: &AuthUser,
    resource: &str,
) -> Result<Option<HashSet<String>>, AppError> {
    if resource == ANNOUNCEMENTS && user.role != Role::Admin {
        let items = store.list(ANNOUNCEMENTS).await?;
        return Ok(Some(ids_where(&items, |a| {
            a.get("audience")
                .cloned()
                .and_then(|v| serde_json::from_value::<Audience>(v).ok())
                .map_or(false, |audience| visible_to(user.role, audience))
        })));
    }
    if user.role != Role::StoreManager {
        return Ok(None);
    }

    let perms = Permissions::for_user(Some(user));
    match resource {
        USERS => Err(Denial::NoPermission.into()),
        EMPLOYEES => Ok(Some(scoped_employee_ids(store, &perms).await?)),
        LEAVE_REQUESTS => {
            let employees = scoped_employee_ids(store, &perms).await?;
            Ok(Some(scoped_leave_ids(store, &employees).await?))
        }
        AUDIT_LOGS => {
            let employees = scoped_employee_ids(store, &perms).await?;
            let leaves = scoped_leave_ids(store, &employees).await?;
            let logs = store.list(AUDIT_LOGS).await?;
            Ok(Some(ids_where(&logs, |log| {
                let target = record_key(log, "entityId").unwrap_or_default();
                match log.get("entity").and_then(Value::as_str) {
                    Some(EMPLOYEES) => employees.contains(&target),
                    Some(LEAVE_REQUESTS) => leaves.contains(&target),
                    _ => false,
                }
            })))
        }
        _ => Ok(None),
    }
}

/// Shapes a stored record for the wire: null foreign keys are dropped and
/// password hashes never leave the server.
fn serve(resource: &str, record: Value) -> Value {
    match record {
        Value::Object(mut map) => {
            map.retain(|key, value| !(key.ends_with("Id") && value.is_null()));
            if resource == USERS {
                map.remove("passwordHash");
            }
            Value::Object(map)
        }
        other => other,
    }
}

/// User writes accept a plaintext `password`, stored only as its hash.
fn prepare_write(resource: &str, body: Value) -> Result<Value, AppError> {
    match body {
        Value::Object(map) if resource == USERS => Ok(Value::Object(harden_user(map)?)),
        other => Ok(other),
    }
}

/// A replaced user keeps the stored hash unless the body sets a new password.
async fn keep_password_hash(store: &dyn RecordStore, id: &str, body: &mut Value) -> Result<(), AppError> {
    let Value::Object(map) = body else {
        return Ok(());
    };
    if map.contains_key("password") || map.contains_key("passwordHash") {
        return Ok(());
    }
    let stored = store.get(USERS, id).await?;
    if let Some(hash) = stored.get("passwordHash") {
        map.insert("passwordHash".to_string(), hash.clone());
    }
    Ok(())
}

pub async fn list_records(
    user: AuthUser,
    state: web::Data<AppState>,
    resource: web::Path<String>,
    query: web::Query<HashMap<String, String>>,
) -> Result<HttpResponse, AppError> {
    known(&resource)?;
    let readable = readable_ids(state.store(), &user, &resource).await?;
    let mut records = state.store().list(&resource).await?;
    if let Some(ids) = &readable {
        records.retain(|r| record_key(r, "id").map_or(false, |id| ids.contains(&id)));
    }
    let items: Vec<Value> = apply_list_query(records, &query)
        .into_iter()
        .map(|r| serve(&resource, r))
        .collect();
    Ok(HttpResponse::Ok().json(items))
}

pub async fn get_record(
    user: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (resource, id) = path.into_inner();
    known(&resource)?;
    let readable = readable_ids(state.store(), &user, &resource).await?;
    let record = state.store().get(&resource, &id).await?;
    if let Some(ids) = readable {
        let key = record_key(&record, "id").unwrap_or(id);
        if !ids.contains(&key) {
            return Err(match resource.as_str() {
                EMPLOYEES | LEAVE_REQUESTS => Denial::CrossStore.into(),
                _ => Denial::NoPermission.into(),
            });
        }
    }
    Ok(HttpResponse::Ok().json(serve(&resource, record)))
}

pub async fn create_record(
    user: AuthUser,
    state: web::Data<AppState>,
    resource: web::Path<String>,
    body: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
    known(&resource)?;
    require_admin(&user)?;
    let body = prepare_write(&resource, body.into_inner())?;
    let created = state.store().insert(&resource, body).await?;
    Ok(HttpResponse::Created().json(serve(&resource, created)))
}

pub async fn replace_record(
    user: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    body: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
    let (resource, id) = path.into_inner();
    known(&resource)?;
    require_admin(&user)?;
    let mut body = body.into_inner();
    if resource == USERS {
        keep_password_hash(state.store(), &id, &mut body).await?;
    }
    let body = prepare_write(&resource, body)?;
    let saved = state.store().replace(&resource, &id, body).await?;
    Ok(HttpResponse::Ok().json(serve(&resource, saved)))
}

pub async fn patch_record(
    user: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    body: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
    let (resource, id) = path.into_inner();
    known(&resource)?;
    require_admin(&user)?;
    let body = prepare_write(&resource, body.into_inner())?;
    let saved = state.store().patch(&resource, &id, body).await?;
    Ok(HttpResponse::Ok().json(serve(&resource, saved)))
}

pub async fn delete_record(
    user: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (resource, id) = path.into_inner();
    known(&resource)?;
    require_admin(&user)?;
    state.store().delete(&resource, &id).await?;
    Ok(HttpResponse::Ok().json(json!({})))
}
