use serde::{Deserialize, Serialize};

use super::RecordId;

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: RecordId,
    #[serde(default)]
    pub company_id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    pub id: RecordId,
    #[serde(default)]
    pub company_id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// Job title an employee holds (not an access role).
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct JobRole {
    pub id: RecordId,
    pub name: String,
}
