//! Audit trail: appending entries for mutations and rendering them for people.
use chrono::Utc;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::db::{RecordStore, AUDIT_LOGS};
use crate::models::user::AuthUser;

/// Appends an audit entry. A failed write is logged and swallowed so the
/// mutation that triggered it still succeeds.
pub async fn record(
    store: &dyn RecordStore,
    actor: &AuthUser,
    action: &str,
    entity: &str,
    entity_id: &str,
    meta: Value,
) {
    let entry = json!({
        "id": Uuid::new_v4().to_string(),
        "at": Utc::now().to_rfc3339(),
        "actorId": actor.id,
        "action": action,
        "entity": entity,
        "entityId": entity_id,
        "meta": meta,
    });

    if let Err(err) = store.insert(AUDIT_LOGS, entry).await {
        log::warn!("Audit entry {} for {}/{} not written: {}", action, entity, entity_id, err);
    }
}

pub fn action_label(action: &str) -> &str {
    match action {
        "employee.create" => "Employee created",
        "employee.update" => "Employee updated",
        "employee.delete" => "Employee deleted",

        "user.create" => "User created",

        "announcement.create" => "Announcement created",
        "announcement.update" => "Announcement updated",
        "announcement.delete" => "Announcement deleted",

        "leaveRequest.create" | "leave.create" => "Leave request created",
        "leaveRequest.update" | "leave.update" => "Leave request updated",
        "leaveRequest.approve" => "Leave request approved",
        "leaveRequest.reject" => "Leave request rejected",
        "leave.delete" => "Leave request deleted",
        "leave.status" => "Leave status changed",

        "payroll.create" => "Payroll entry created",
        "payroll.update" => "Payroll entry updated",
        "payroll.delete" => "Payroll entry deleted",

        "attendance.create" => "Attendance added",
        "attendance.update" => "Attendance updated",
        "attendance.delete" => "Attendance deleted",

        "performanceReview.create" => "Performance review created",
        "performanceReview.update" => "Performance review updated",
        "performanceReview.delete" => "Performance review deleted",

        "asset.assign" => "Asset assigned to employee",
        "asset.return" => "Asset returned",

        other => other,
    }
}

fn employee_field_label(field: &str) -> &str {
    match field {
        "salary.base" => "Salary",
        "salary.bonus" => "Bonus",
        "status" => "Status",
        "roleId" => "Position",
        "departmentId" => "Department",
        "storeId" => "Store",
        other => other,
    }
}

fn announcement_field_label(field: &str) -> &str {
    match field {
        "title" => "Title",
        "content" => "Text",
        "audience" => "Audience",
        other => other,
    }
}

fn meta_key_label(key: &str) -> &str {
    match key {
        "employeeId" => "Employee ID",
        "storeId" => "Store",
        "departmentId" => "Department",
        "roleId" => "Position",
        "status" => "Status",
        "type" => "Type",
        "month" => "Month",
        "rating" => "Rating",
        "days" => "Days",
        "startDate" => "Start date",
        "endDate" => "End date",
        other => other,
    }
}

fn status_label(value: &str) -> Option<&'static str> {
    Some(match value {
        "pending" => "Pending",
        "approved" => "Approved",
        "rejected" => "Rejected",
        "active" => "Active",
        "on_leave" => "On leave",
        "terminated" => "Terminated",
        "present" => "Present",
        "late" => "Late",
        "early_leave" => "Left early",
        "draft" => "Draft",
        "paid" => "Paid",
        _ => return None,
    })
}

/// Present when the field holds something other than null, false or "".
fn present<'a>(meta: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    meta.get(key).filter(|v| match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        _ => true,
    })
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn changed_list(changed: &Value, label: fn(&str) -> &str) -> String {
    match changed {
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => label(s).to_string(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", "),
        other => plain(other),
    }
}

/// Human-readable summary of an audit entry's `meta`.
pub fn format_meta(meta: Option<&Map<String, Value>>) -> String {
    let Some(meta) = meta else {
        return "—".to_string();
    };

    let full_name = present(meta, "fullName");
    let title = present(meta, "title");
    let changed = present(meta, "changed");

    match (full_name, title, changed) {
        (Some(name), _, Some(changed)) => {
            return format!(
                "Name: {}, changed: {}",
                plain(name),
                changed_list(changed, employee_field_label)
            )
        }
        (None, Some(title), Some(changed)) => {
            return format!(
                "Announcement: {}, changed: {}",
                plain(title),
                changed_list(changed, announcement_field_label)
            )
        }
        (Some(name), _, None) => return format!("Name: {}", plain(name)),
        (None, Some(title), None) => return format!("Announcement: {}", plain(title)),
        _ => {}
    }

    meta.iter()
        .map(|(key, value)| {
            let rendered = match value {
                Value::String(s) => status_label(s).map(str::to_string).unwrap_or_else(|| s.clone()),
                other => other.to_string(),
            };
            format!("{}: {}", meta_key_label(key), rendered)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::models::user::Role;
    use crate::models::RecordId;

    fn meta(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("meta must be an object"),
        }
    }

    #[test]
    fn no_meta_renders_dash() {
        assert_eq!(format_meta(None), "—");
    }

    #[test]
    fn employee_change_lists_labelled_fields() {
        let m = meta(json!({"fullName": "Aysel Aliyeva", "changed": ["salary.base", "storeId", "phone"]}));
        assert_eq!(
            format_meta(Some(&m)),
            "Name: Aysel Aliyeva, changed: Salary, Store, phone"
        );
    }

    #[test]
    fn announcement_change_and_plain_title() {
        let m = meta(json!({"title": "Holiday", "changed": ["content", "audience"]}));
        assert_eq!(format_meta(Some(&m)), "Announcement: Holiday, changed: Text, Audience");

        let m = meta(json!({"title": "Holiday"}));
        assert_eq!(format_meta(Some(&m)), "Announcement: Holiday");
    }

    #[test]
    fn generic_meta_uses_key_and_status_labels() {
        let m = meta(json!({"employeeId": 4, "status": "approved"}));
        assert_eq!(format_meta(Some(&m)), "Employee ID: 4, Status: Approved");

        let m = meta(json!({"reason": "manual"}));
        assert_eq!(format_meta(Some(&m)), "reason: manual");
    }

    #[test]
    fn generic_meta_keeps_insertion_order() {
        let m = meta(json!({"status": "rejected", "employeeId": 2, "days": 3}));
        assert_eq!(format_meta(Some(&m)), "Status: Rejected, Employee ID: 2, Days: 3");
    }

    #[test]
    fn empty_full_name_falls_through() {
        let m = meta(json!({"fullName": "", "status": "on_leave"}));
        assert_eq!(format_meta(Some(&m)), "fullName: , Status: On leave");
    }

    #[test]
    fn unknown_action_label_is_the_action() {
        assert_eq!(action_label("leave.status"), "Leave status changed");
        assert_eq!(action_label("shift.swap"), "shift.swap");
    }

    #[tokio::test]
    async fn record_appends_entry() {
        let store = MemoryStore::new();
        let actor = AuthUser {
            id: RecordId::Number(1),
            full_name: "Admin".to_string(),
            email: "admin@gmail.com".to_string(),
            role: Role::Admin,
            store_id: None,
        };
        record(&store, &actor, "employee.delete", "employees", "7", json!({"fullName": "X"})).await;

        let logs = store.list(AUDIT_LOGS).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0]["action"], "employee.delete");
        assert_eq!(logs[0]["entityId"], "7");
        assert_eq!(logs[0]["actorId"], 1);
    }
}
