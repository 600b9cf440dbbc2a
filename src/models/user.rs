use serde::{Deserialize, Serialize};

use super::RecordId;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Hr,
    StoreManager,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Hr => "hr",
            Role::StoreManager => "store_manager",
        }
    }
}

/// Stored user record. Only the argon2 hash of the password is kept.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: RecordId,
    pub full_name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub store_id: Option<RecordId>,
    pub password_hash: String,
}

/// The signed-in user as seen by handlers and clients.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: RecordId,
    pub full_name: String,
    pub email: String,
    pub role: Role,
    pub store_id: Option<RecordId>,
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        AuthUser {
            id: user.id,
            full_name: user.full_name,
            email: user.email,
            role: user.role,
            store_id: user.store_id,
        }
    }
}
