//! Fixtures shared by the handler tests: an in-memory store with a small
//! company and a signed token per access role.
use actix_web::web;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::config::Config;
use crate::db::memory::MemoryStore;
use crate::db::RecordStore;
use crate::models::user::{AuthUser, Role};
use crate::models::RecordId;
use crate::state::AppState;
use crate::utils::jwt;
use crate::utils::password::hash_password;

pub const SECRET: &str = "test-secret";
pub const PASSWORD: &str = "password123";

pub fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        jwt_secret: SECRET.to_string(),
        token_ttl_hours: 1,
        database_url: None,
        seed_path: None,
        admin: None,
    }
}

pub fn fixtures(password_hash: &str) -> Vec<(&'static str, Value)> {
    vec![
        ("departments", json!({"id": 1, "companyId": 1, "name": "Sales", "code": "SL"})),
        ("departments", json!({"id": 2, "companyId": 1, "name": "Finance", "code": "FN"})),
        ("stores", json!({"id": 1, "companyId": 1, "name": "Nizami", "code": "NZ", "address": "Nizami st. 1"})),
        ("stores", json!({"id": 2, "companyId": 1, "name": "Yasamal", "code": "YS", "address": "Yasamal ave. 5"})),
        ("roles", json!({"id": 1, "name": "Cashier"})),
        ("roles", json!({"id": 2, "name": "Accountant"})),
        ("users", json!({"id": 1, "fullName": "Admin User", "email": "admin@gmail.com", "role": "admin", "storeId": null, "passwordHash": password_hash})),
        ("users", json!({"id": 2, "fullName": "Hr User", "email": "hr@gmail.com", "role": "hr", "storeId": null, "passwordHash": password_hash})),
        ("users", json!({"id": 3, "fullName": "Store Manager", "email": "manager@gmail.com", "role": "store_manager", "storeId": "2", "passwordHash": password_hash})),
        ("employees", json!({
            "id": 1, "companyId": 1, "fullName": "Aysel Aliyeva", "email": "aysel@gmail.com",
            "phone": "+994501112233", "departmentId": 1, "storeId": 1, "roleId": 1, "managerId": null,
            "status": "active", "hireDate": "2023-03-15",
            "salary": {"currency": "AZN", "base": 900, "bonus": 50}
        })),
        ("employees", json!({
            "id": 2, "companyId": 1, "fullName": "Rashad Huseynov", "email": "rashad@gmail.com",
            "phone": "+994502223344", "departmentId": 2, "storeId": 2, "roleId": 2, "managerId": 1,
            "status": "on_leave", "hireDate": "2024-01-20",
            "salary": {"currency": "AZN", "base": 1500, "bonus": 0}
        })),
        ("employees", json!({
            "id": 3, "companyId": 1, "fullName": "Nigar Karimova", "email": "nigar@gmail.com",
            "phone": "", "departmentId": 1, "storeId": null, "roleId": 2, "managerId": null,
            "status": "terminated", "hireDate": "2022-11-05",
            "salary": {"currency": "AZN", "base": 1200, "bonus": 100}
        })),
        ("leaveRequests", json!({
            "id": "100", "employeeId": 1, "type": "annual", "startDate": "2024-05-01",
            "endDate": "2024-05-05", "days": 5, "status": "pending", "note": "Family trip"
        })),
        ("leaveRequests", json!({
            "id": "101", "employeeId": 2, "type": "sick", "startDate": "2024-06-10",
            "endDate": "2024-06-11", "days": 2, "status": "approved", "note": ""
        })),
        ("announcements", json!({
            "id": 1, "title": "Holiday schedule", "content": "Offices close on 28 May.",
            "audience": "all", "createdAt": "2024-03-01T09:00:00Z"
        })),
        ("announcements", json!({
            "id": 2, "title": "HR policy update", "content": "New leave policy.",
            "audience": "hr", "createdAt": "2024-04-01T09:00:00Z"
        })),
        ("announcements", json!({
            "id": 3, "title": "Store inventory", "content": "Inventory count on Friday.",
            "audience": "store", "createdAt": "2024-05-01T09:00:00Z"
        })),
    ]
}

pub async fn seeded_state() -> web::Data<AppState> {
    let store = MemoryStore::new();
    let password_hash = hash_password(PASSWORD).expect("hash");
    for (resource, record) in fixtures(&password_hash) {
        store.insert(resource, record).await.expect("fixture insert");
    }
    web::Data::new(AppState::new(Arc::new(store), test_config()))
}

pub fn user_for(role: Role) -> AuthUser {
    let (id, name, email, store) = match role {
        Role::Admin => (1, "Admin User", "admin@gmail.com", None),
        Role::Hr => (2, "Hr User", "hr@gmail.com", None),
        Role::StoreManager => (3, "Store Manager", "manager@gmail.com", Some("2")),
    };
    AuthUser {
        id: RecordId::Number(id),
        full_name: name.to_string(),
        email: email.to_string(),
        role,
        store_id: store.map(RecordId::from),
    }
}

/// `Authorization` header value for the fixture user holding `role`.
pub fn bearer(role: Role) -> (&'static str, String) {
    let token = jwt::generate_token(&user_for(role), SECRET, 1).expect("token");
    ("Authorization", format!("Bearer {}", token))
}

pub async fn audit_actions(state: &AppState) -> Vec<String> {
    state
        .store()
        .list("auditLogs")
        .await
        .expect("audit logs")
        .iter()
        .filter_map(|log| log["action"].as_str().map(str::to_string))
        .collect()
}
