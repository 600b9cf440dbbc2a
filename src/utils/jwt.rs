use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::models::user::{AuthUser, Role};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub sub: String, // User id
    pub role: Role,
    pub store_id: Option<String>,
    pub exp: usize, // Expiration timestamp
}

pub fn generate_token(
    user: &AuthUser,
    secret: &str,
    ttl_hours: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        sub: user.id.as_key(),
        role: user.role,
        store_id: user.store_id.as_ref().map(|s| s.as_key()),
        exp: (OffsetDateTime::now_utc() + Duration::hours(ttl_hours)).unix_timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn validate_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(jsonwebtoken::Algorithm::HS256),
    )
    .map(|data| data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordId;

    fn manager() -> AuthUser {
        AuthUser {
            id: RecordId::Number(3),
            full_name: "Leyla Mammadova".to_string(),
            email: "leyla@gmail.com".to_string(),
            role: Role::StoreManager,
            store_id: Some(RecordId::Text("2".to_string())),
        }
    }

    #[test]
    fn token_round_trips_claims() {
        let token = generate_token(&manager(), "secret", 1).unwrap();
        let claims = validate_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, "3");
        assert_eq!(claims.role, Role::StoreManager);
        assert_eq!(claims.store_id.as_deref(), Some("2"));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = generate_token(&manager(), "secret", 1).unwrap();
        assert!(validate_token(&token, "other").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        // Past the default 60s leeway.
        let token = generate_token(&manager(), "secret", -1).unwrap();
        assert!(validate_token(&token, "secret").is_err());
    }
}
