use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::RecordId;

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub id: RecordId,
    pub at: DateTime<Utc>,
    pub actor_id: RecordId,
    pub action: String,
    pub entity: String,
    pub entity_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogRow {
    #[serde(flatten)]
    pub log: AuditLog,
    pub actor_name: Option<String>,
    pub action_label: String,
    pub meta_text: String,
}
