use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::db::{fetch_all, USERS};
use crate::errors::AppError;
use crate::models::user::{AuthUser, Role, User};
use crate::models::RecordId;
use crate::permissions;
use crate::state::AppState;
use crate::utils::password::{hash_password, verify_password};
use crate::utils::validation::{validate_full_name, validate_not_blank, validate_payload};
use crate::utils::jwt;

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(custom = "validate_not_blank")]
    email: String,
    #[validate(length(min = 1, max = 128))]
    password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    token: String,
    user: AuthUser,
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewUser {
    #[validate(custom = "validate_full_name")]
    full_name: String,
    #[validate(email)]
    email: String,
    #[validate(length(min = 8, max = 64))]
    password: String,
    role: Role,
    store_id: Option<RecordId>,
}

async fn find_by_email(state: &AppState, email: &str) -> Result<Option<User>, AppError> {
    let users: Vec<User> = fetch_all(state.store(), USERS).await?;
    Ok(users
        .into_iter()
        .find(|u| u.email.trim().to_lowercase() == email))
}

pub async fn login(
    state: web::Data<AppState>,
    req: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    validate_payload(&req.0)?;

    let email = req.email.trim().to_lowercase();
    let user = find_by_email(&state, &email)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Email not found".to_string()))?;

    if !verify_password(&req.password, &user.password_hash)? {
        return Err(AppError::Unauthorized("Incorrect password".to_string()));
    }

    let user = AuthUser::from(user);
    let token = jwt::generate_token(&user, &state.config.jwt_secret, state.config.token_ttl_hours)
        .map_err(|_| AppError::InternalServerError("Token generation error".to_string()))?;

    log::info!("User {} signed in", user.id);
    Ok(HttpResponse::Ok().json(LoginResponse { token, user }))
}

pub async fn me(user: AuthUser) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(user))
}

pub async fn create_user(
    actor: AuthUser,
    state: web::Data<AppState>,
    new_user: web::Json<NewUser>,
) -> Result<HttpResponse, AppError> {
    permissions::require(actor.role == Role::Admin)?;
    validate_payload(&new_user.0)?;

    let new_user = new_user.into_inner();
    if new_user.role == Role::StoreManager && new_user.store_id.is_none() {
        return Err(AppError::BadRequest(
            "A store manager must be assigned to a store".to_string(),
        ));
    }

    let email = new_user.email.trim().to_lowercase();
    if find_by_email(&state, &email).await?.is_some() {
        return Err(AppError::Conflict("Email already exists".to_string()));
    }

    let created = state
        .store()
        .insert(
            USERS,
            json!({
                "fullName": new_user.full_name.trim(),
                "email": email,
                "role": new_user.role,
                "storeId": new_user.store_id,
                "passwordHash": hash_password(&new_user.password)?,
            }),
        )
        .await?;

    let user: User = serde_json::from_value(created)
        .map_err(|err| AppError::InternalServerError(err.to_string()))?;
    let user = AuthUser::from(user);

    crate::audit::record(
        state.store(),
        &actor,
        "user.create",
        USERS,
        &user.id.as_key(),
        json!({"fullName": user.full_name, "role": user.role}),
    )
    .await;

    Ok(HttpResponse::Created().json(user))
}
