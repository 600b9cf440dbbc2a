use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use validator::{Validate, ValidationError};

use crate::audit;
use crate::db::{fetch_all, fetch_one, to_record, ANNOUNCEMENTS};
use crate::errors::AppError;
use crate::models::announcement::{Announcement, Audience};
use crate::models::user::{AuthUser, Role};
use crate::permissions;
use crate::state::AppState;
use crate::utils::query::contains_ci;
use crate::utils::validation::{validate_not_blank, validate_payload};

fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().chars().count() < 3 {
        let mut err = ValidationError::new("title_length");
        err.message = Some("Title must be at least 3 characters".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Deserialize, Validate)]
pub struct AnnouncementPayload {
    #[validate(custom = "validate_title")]
    title: String,
    #[validate(custom = "validate_not_blank")]
    content: String,
    #[serde(default = "default_audience")]
    audience: Audience,
}

fn default_audience() -> Audience {
    Audience::All
}

#[derive(Deserialize)]
pub struct AnnouncementQueryParams {
    q: Option<String>,
}

/// Audiences a role is shown; admins see everything.
pub fn visible_to(role: Role, audience: Audience) -> bool {
    match (role, audience) {
        (_, Audience::All) | (Role::Admin, _) => true,
        (Role::Hr, Audience::Hr) => true,
        (Role::StoreManager, Audience::Store) => true,
        _ => false,
    }
}

fn changed_fields(prev: &Announcement, next: &Announcement) -> Vec<&'static str> {
    let mut changed = Vec::new();
    if prev.title != next.title {
        changed.push("title");
    }
    if prev.content != next.content {
        changed.push("content");
    }
    if prev.audience != next.audience {
        changed.push("audience");
    }
    changed
}

/// Announcements the user may see, newest first.
pub(crate) async fn visible_announcements(
    state: &AppState,
    user: &AuthUser,
) -> Result<Vec<Announcement>, AppError> {
    let mut items: Vec<Announcement> = fetch_all(state.store(), ANNOUNCEMENTS).await?;
    items.retain(|a| visible_to(user.role, a.audience));
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(items)
}

pub async fn get_announcements(
    user: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<AnnouncementQueryParams>,
) -> Result<HttpResponse, AppError> {
    let term = query.q.as_deref().unwrap_or("").trim().to_string();
    let items: Vec<Announcement> = visible_announcements(&state, &user)
        .await?
        .into_iter()
        .filter(|a| {
            contains_ci(&a.title, &term)
                || contains_ci(&a.content, &term)
                || contains_ci(a.audience.as_str(), &term)
        })
        .collect();
    Ok(HttpResponse::Ok().json(items))
}

pub async fn create_announcement(
    user: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<AnnouncementPayload>,
) -> Result<HttpResponse, AppError> {
    permissions::require(permissions::can_manage_announcements(&user))?;
    validate_payload(&payload.0)?;

    let body = json!({
        "title": payload.title.trim(),
        "content": payload.content.trim(),
        "audience": payload.audience,
        "createdAt": Utc::now(),
    });
    let created: Announcement = serde_json::from_value(state.store().insert(ANNOUNCEMENTS, body).await?)
        .map_err(|err| AppError::InternalServerError(err.to_string()))?;

    audit::record(
        state.store(),
        &user,
        "announcement.create",
        ANNOUNCEMENTS,
        &created.id.as_key(),
        json!({"title": created.title}),
    )
    .await;

    Ok(HttpResponse::Created().json(created))
}

pub async fn update_announcement(
    user: AuthUser,
    state: web::Data<AppState>,
    id: web::Path<String>,
    payload: web::Json<AnnouncementPayload>,
) -> Result<HttpResponse, AppError> {
    permissions::require(permissions::can_manage_announcements(&user))?;
    validate_payload(&payload.0)?;

    let current: Announcement = fetch_one(state.store(), ANNOUNCEMENTS, &id).await?;
    let next = Announcement {
        id: current.id.clone(),
        title: payload.title.trim().to_string(),
        content: payload.content.trim().to_string(),
        audience: payload.audience,
        created_at: current.created_at,
        updated_at: Some(Utc::now()),
    };
    let changed = changed_fields(&current, &next);
    let saved = state.store().replace(ANNOUNCEMENTS, &id, to_record(&next)?).await?;

    audit::record(
        state.store(),
        &user,
        "announcement.update",
        ANNOUNCEMENTS,
        &next.id.as_key(),
        json!({"title": next.title, "changed": changed}),
    )
    .await;

    Ok(HttpResponse::Ok().json(saved))
}

pub async fn delete_announcement(
    user: AuthUser,
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    permissions::require(permissions::can_delete_announcements(&user))?;

    let removed: Announcement = fetch_one(state.store(), ANNOUNCEMENTS, &id).await?;
    state.store().delete(ANNOUNCEMENTS, &id).await?;

    audit::record(
        state.store(),
        &user,
        "announcement.delete",
        ANNOUNCEMENTS,
        &removed.id.as_key(),
        json!({"title": removed.title}),
    )
    .await;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Announcement deleted successfully",
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::configure;
    use crate::handlers::test_support::{audit_actions, bearer, seeded_state};
    use actix_web::http::StatusCode;
    use actix_web::{test as atest, App};
    use serde_json::Value;

    fn titles(body: &Value) -> Vec<String> {
        body.as_array()
            .unwrap()
            .iter()
            .map(|a| a["title"].as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn audience_visibility() {
        assert!(visible_to(Role::Admin, Audience::Store));
        assert!(visible_to(Role::Hr, Audience::Hr));
        assert!(!visible_to(Role::Hr, Audience::Store));
        assert!(visible_to(Role::StoreManager, Audience::All));
        assert!(!visible_to(Role::StoreManager, Audience::Hr));
    }

    #[actix_web::test]
    async fn list_is_newest_first_and_audience_filtered() {
        let state = seeded_state().await;
        let app = atest::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let req = atest::TestRequest::get()
            .uri("/v1/announcements")
            .insert_header(bearer(Role::Admin))
            .to_request();
        let body: Value = atest::call_and_read_body_json(&app, req).await;
        assert_eq!(
            titles(&body),
            vec!["Store inventory", "HR policy update", "Holiday schedule"]
        );

        let req = atest::TestRequest::get()
            .uri("/v1/announcements")
            .insert_header(bearer(Role::StoreManager))
            .to_request();
        let body: Value = atest::call_and_read_body_json(&app, req).await;
        assert_eq!(titles(&body), vec!["Store inventory", "Holiday schedule"]);

        let req = atest::TestRequest::get()
            .uri("/v1/announcements?q=MAY")
            .insert_header(bearer(Role::Admin))
            .to_request();
        let body: Value = atest::call_and_read_body_json(&app, req).await;
        assert_eq!(titles(&body), vec!["Holiday schedule"]);
    }

    #[actix_web::test]
    async fn hr_creates_and_updates_with_diff() {
        let state = seeded_state().await;
        let app = atest::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let req = atest::TestRequest::post()
            .uri("/v1/announcements")
            .insert_header(bearer(Role::Hr))
            .set_json(json!({"title": "  Payday ", "content": "Salaries on the 25th."}))
            .to_request();
        let resp = atest::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: Value = atest::read_body_json(resp).await;
        assert_eq!(created["title"], "Payday");
        assert_eq!(created["audience"], "all");
        assert!(created["createdAt"].is_string());

        let uri = format!("/v1/announcements/{}", created["id"]);
        let req = atest::TestRequest::put()
            .uri(&uri)
            .insert_header(bearer(Role::Hr))
            .set_json(json!({"title": "Payday", "content": "Salaries on the 26th.", "audience": "hr"}))
            .to_request();
        let updated: Value = atest::call_and_read_body_json(&app, req).await;
        assert!(updated["updatedAt"].is_string());
        assert_eq!(updated["createdAt"], created["createdAt"]);

        let logs = state.store().list("auditLogs").await.unwrap();
        assert_eq!(logs[1]["meta"]["changed"], json!(["content", "audience"]));
    }

    #[actix_web::test]
    async fn short_title_is_rejected() {
        let state = seeded_state().await;
        let app = atest::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let req = atest::TestRequest::post()
            .uri("/v1/announcements")
            .insert_header(bearer(Role::Admin))
            .set_json(json!({"title": "Hi", "content": "x"}))
            .to_request();
        assert_eq!(atest::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn only_admin_deletes() {
        let state = seeded_state().await;
        let app = atest::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let req = atest::TestRequest::delete()
            .uri("/v1/announcements/1")
            .insert_header(bearer(Role::Hr))
            .to_request();
        assert_eq!(atest::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = atest::TestRequest::delete()
            .uri("/v1/announcements/1")
            .insert_header(bearer(Role::Admin))
            .to_request();
        assert_eq!(atest::call_service(&app, req).await.status(), StatusCode::OK);
        assert_eq!(audit_actions(&state).await, vec!["announcement.delete"]);
    }
}
