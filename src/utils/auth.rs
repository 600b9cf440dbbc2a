use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest};
use futures_util::future::{FutureExt, LocalBoxFuture};

use crate::db::{fetch_one, StoreError, USERS};
use crate::errors::AppError;
use crate::models::user::{AuthUser, User};
use crate::state::AppState;
use crate::utils::jwt;

fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|auth| auth.to_str().ok())
        .and_then(|auth| auth.split_whitespace().nth(1))
        .map(str::to_string)
}

/// Resolves the signed-in user from `Authorization: Bearer <token>`. The
/// user is re-read from the store so deleted users lose access immediately.
impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let token = bearer_token(req);

        async move {
            let state = state.ok_or_else(|| {
                AppError::InternalServerError("Application state missing".to_string())
            })?;
            let token = token.ok_or_else(|| AppError::Unauthorized("Missing token".to_string()))?;
            let claims = jwt::validate_token(&token, &state.config.jwt_secret)?;

            let user: User = fetch_one(state.store(), USERS, &claims.sub)
                .await
                .map_err(|err| match err {
                    StoreError::NotFound(_) => {
                        AppError::Unauthorized("User not found or unauthorized".to_string())
                    }
                    other => other.into(),
                })?;
            Ok(user.into())
        }
        .boxed_local()
    }
}
