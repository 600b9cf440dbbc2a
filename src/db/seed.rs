//! Startup seeding from a JSON file shaped like `{"employees": [...], ...}`.
use serde_json::{json, Map, Value};
use std::fs;
use std::path::Path;

use super::{is_known_resource, RecordStore, USERS};
use crate::config::AdminBootstrap;
use crate::errors::AppError;
use crate::utils::password::hash_password;

pub type Seed = Map<String, Value>;

/// Reads the seed file. Any failure is logged and treated as "no seed".
pub fn load_seed(path: &Path) -> Option<Seed> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            log::warn!("Seed file {} not read, starting empty: {}", path.display(), err);
            return None;
        }
    };
    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Object(seed)) => Some(seed),
        Ok(_) => {
            log::warn!("Seed file {} is not a JSON object, starting empty", path.display());
            None
        }
        Err(err) => {
            log::warn!("Seed file {} is not valid JSON, starting empty: {}", path.display(), err);
            None
        }
    }
}

fn item_problem(item: &Value) -> Option<&'static str> {
    match item {
        Value::Object(map) => match map.get("id") {
            None | Some(Value::Null) => Some("id is null/missing"),
            Some(_) => None,
        },
        _ => Some("NOT an object"),
    }
}

/// Lists every array element that is not an object or has no id.
pub fn validate_seed(seed: &Seed) -> Vec<String> {
    let mut problems = Vec::new();
    for (resource, value) in seed {
        let Value::Array(items) = value else { continue };
        for (idx, item) in items.iter().enumerate() {
            if let Some(problem) = item_problem(item) {
                problems.push(format!("{}[{}] -> {}", resource, idx, problem));
            }
        }
    }
    problems
}

/// Replaces a plaintext `password` with an argon2 `passwordHash`.
pub(crate) fn harden_user(mut user: Map<String, Value>) -> Result<Map<String, Value>, AppError> {
    if let Some(Value::String(password)) = user.remove("password") {
        if !user.contains_key("passwordHash") {
            user.insert("passwordHash".to_string(), json!(hash_password(&password)?));
        }
    }
    if let Some(Value::String(email)) = user.get("email") {
        let normalized = email.trim().to_lowercase();
        user.insert("email".to_string(), json!(normalized));
    }
    Ok(user)
}

/// Inserts every valid seed element; returns how many records were stored.
pub async fn apply_seed(store: &dyn RecordStore, seed: Seed) -> Result<usize, AppError> {
    let problems = validate_seed(&seed);
    if problems.is_empty() {
        log::info!("Seed validation OK");
    } else {
        log::warn!("Seed validation problems:");
        for problem in &problems {
            log::warn!("  - {}", problem);
        }
    }

    let mut inserted = 0;
    for (resource, value) in seed {
        let Value::Array(items) = value else { continue };
        if !is_known_resource(&resource) {
            log::warn!("Skipping unknown seed resource {}", resource);
            continue;
        }
        for item in items {
            if item_problem(&item).is_some() {
                continue;
            }
            let Value::Object(mut record) = item else { continue };
            if resource == USERS {
                record = harden_user(record)?;
            }
            store.insert(&resource, Value::Object(record)).await?;
            inserted += 1;
        }
    }
    Ok(inserted)
}

/// Creates the bootstrap admin unless a user with that email exists.
pub async fn ensure_admin(store: &dyn RecordStore, admin: &AdminBootstrap) -> Result<bool, AppError> {
    let email = admin.email.trim().to_lowercase();
    let exists = store.list(USERS).await?.iter().any(|u| {
        u.get("email")
            .and_then(Value::as_str)
            .map_or(false, |e| e.trim().eq_ignore_ascii_case(&email))
    });
    if exists {
        return Ok(false);
    }

    store
        .insert(
            USERS,
            json!({
                "fullName": admin.full_name,
                "email": email,
                "role": "admin",
                "storeId": null,
                "passwordHash": hash_password(&admin.password)?,
            }),
        )
        .await?;
    log::info!("Bootstrap admin {} created", email);
    Ok(true)
}
