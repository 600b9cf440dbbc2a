use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::audit::{action_label, format_meta};
use crate::db::{fetch_all, AUDIT_LOGS, USERS};
use crate::errors::AppError;
use crate::handlers::records::readable_ids;
use crate::models::audit::{AuditLog, AuditLogRow};
use crate::models::user::{AuthUser, User};
use crate::state::AppState;
use crate::utils::query::contains_ci;

#[derive(Deserialize)]
pub struct AuditQueryParams {
    q: Option<String>,
    action: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditListResponse {
    items: Vec<AuditLogRow>,
    action_options: Vec<String>,
}

/// Audit entries `user` may read, newest first, with actor names and
/// readable summaries.
pub(crate) async fn audit_rows(state: &AppState, user: &AuthUser) -> Result<Vec<AuditLogRow>, AppError> {
    let mut logs: Vec<AuditLog> = fetch_all(state.store(), AUDIT_LOGS).await?;
    if let Some(ids) = readable_ids(state.store(), user, AUDIT_LOGS).await? {
        logs.retain(|log| ids.contains(&log.id.as_key()));
    }
    let users: Vec<User> = fetch_all(state.store(), USERS).await?;
    let names: HashMap<String, String> = users
        .into_iter()
        .map(|u| (u.id.as_key(), u.full_name))
        .collect();

    logs.sort_by(|a, b| b.at.cmp(&a.at));
    Ok(logs
        .into_iter()
        .map(|log| AuditLogRow {
            actor_name: names.get(&log.actor_id.as_key()).cloned(),
            action_label: action_label(&log.action).to_string(),
            meta_text: format_meta(log.meta.as_ref()),
            log,
        })
        .collect())
}

fn matches_term(row: &AuditLogRow, term: &str) -> bool {
    let meta_text = row
        .log
        .meta
        .as_ref()
        .map(|m| serde_json::Value::Object(m.clone()).to_string())
        .unwrap_or_default();

    contains_ci(&row.log.actor_id.as_key(), term)
        || row.actor_name.as_deref().map_or(false, |n| contains_ci(n, term))
        || contains_ci(&row.log.action, term)
        || contains_ci(&row.action_label, term)
        || contains_ci(&row.log.entity, term)
        || contains_ci(&row.log.entity_id, term)
        || contains_ci(&meta_text, term)
}

pub async fn get_audit_logs(
    user: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<AuditQueryParams>,
) -> Result<HttpResponse, AppError> {
    let rows = audit_rows(&state, &user).await?;

    let action_options: Vec<String> = rows
        .iter()
        .map(|r| r.log.action.clone())
        .filter(|a| !a.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let term = query.q.as_deref().unwrap_or("").trim().to_string();
    let action = query.action.as_deref().filter(|a| !a.is_empty());
    let items = rows
        .into_iter()
        .filter(|r| action.map_or(true, |a| r.log.action == a))
        .filter(|r| term.is_empty() || matches_term(r, &term))
        .collect();

    Ok(HttpResponse::Ok().json(AuditListResponse {
        items,
        action_options,
    }))
}

#[cfg(test)]
mod tests {
    use crate::handlers::configure;
    use crate::handlers::test_support::{bearer, seeded_state};
    use crate::models::user::Role;
    use actix_web::{test as atest, App};
    use serde_json::{json, Value};

    async fn seed_logs(state: &crate::state::AppState) {
        let entries = [
            json!({"id": "a", "at": "2024-05-01T10:00:00Z", "actorId": 1, "action": "employee.create",
                   "entity": "employees", "entityId": "4", "meta": {"fullName": "Elvin Mammadov"}}),
            json!({"id": "b", "at": "2024-05-03T10:00:00Z", "actorId": 2, "action": "leave.status",
                   "entity": "leaveRequests", "entityId": "100", "meta": {"status": "approved"}}),
            json!({"id": "c", "at": "2024-05-02T10:00:00Z", "actorId": 9, "action": "announcement.delete",
                   "entity": "announcements", "entityId": "2"}),
        ];
        for entry in entries {
            state.store().insert("auditLogs", entry).await.unwrap();
        }
    }

    #[actix_web::test]
    async fn rows_are_newest_first_with_labels() {
        let state = seeded_state().await;
        seed_logs(&state).await;
        let app = atest::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let req = atest::TestRequest::get()
            .uri("/v1/audit-logs")
            .insert_header(bearer(Role::Admin))
            .to_request();
        let body: Value = atest::call_and_read_body_json(&app, req).await;
        let items = body["items"].as_array().unwrap();

        let ids: Vec<_> = items.iter().map(|i| i["id"].clone()).collect();
        assert_eq!(ids, vec![json!("b"), json!("c"), json!("a")]);
        assert_eq!(items[0]["actorName"], "Hr User");
        assert_eq!(items[0]["actionLabel"], "Leave status changed");
        assert_eq!(items[0]["metaText"], "Status: Approved");
        assert_eq!(items[1]["actorName"], Value::Null);
        assert_eq!(items[1]["metaText"], "—");
        assert_eq!(
            body["actionOptions"],
            json!(["announcement.delete", "employee.create", "leave.status"])
        );
    }

    #[actix_web::test]
    async fn filters_by_action_and_search_term() {
        let state = seeded_state().await;
        seed_logs(&state).await;
        let app = atest::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let req = atest::TestRequest::get()
            .uri("/v1/audit-logs?action=employee.create")
            .insert_header(bearer(Role::Hr))
            .to_request();
        let body: Value = atest::call_and_read_body_json(&app, req).await;
        assert_eq!(body["items"].as_array().unwrap().len(), 1);

        // Matches the actor's name, not anything stored on the entry.
        let req = atest::TestRequest::get()
            .uri("/v1/audit-logs?q=admin%20user")
            .insert_header(bearer(Role::Hr))
            .to_request();
        let body: Value = atest::call_and_read_body_json(&app, req).await;
        assert_eq!(body["items"].as_array().unwrap().len(), 1);
        assert_eq!(body["items"][0]["id"], "a");

        let req = atest::TestRequest::get()
            .uri("/v1/audit-logs?q=elvin")
            .insert_header(bearer(Role::Hr))
            .to_request();
        let body: Value = atest::call_and_read_body_json(&app, req).await;
        assert_eq!(body["items"][0]["entityId"], "4");
    }

    #[actix_web::test]
    async fn store_manager_sees_entries_about_own_store() {
        let state = seeded_state().await;
        seed_logs(&state).await;
        state
            .store()
            .insert(
                "auditLogs",
                json!({"id": "d", "at": "2024-05-04T10:00:00Z", "actorId": 1, "action": "employee.update",
                       "entity": "employees", "entityId": "2"}),
            )
            .await
            .unwrap();
        let app = atest::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let req = atest::TestRequest::get()
            .uri("/v1/audit-logs")
            .insert_header(bearer(Role::StoreManager))
            .to_request();
        let body: Value = atest::call_and_read_body_json(&app, req).await;
        let ids: Vec<_> = body["items"].as_array().unwrap().iter().map(|i| i["id"].clone()).collect();
        // "b" is about leave request 100, which belongs to a store 1 employee.
        assert_eq!(ids, vec![json!("d")]);
        assert_eq!(body["actionOptions"], json!(["employee.update"]));
    }
}
