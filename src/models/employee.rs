use serde::{Deserialize, Serialize};

use super::RecordId;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmployeeStatus {
    Active,
    OnLeave,
    Terminated,
}

impl EmployeeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmployeeStatus::Active => "active",
            EmployeeStatus::OnLeave => "on_leave",
            EmployeeStatus::Terminated => "terminated",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Salary {
    pub currency: String,
    pub base: f64,
    pub bonus: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: RecordId,
    pub company_id: i64,
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub department_id: RecordId,
    #[serde(default)]
    pub store_id: Option<RecordId>,
    pub role_id: RecordId,
    #[serde(default)]
    pub manager_id: Option<RecordId>,
    pub status: EmployeeStatus,
    pub hire_date: String,
    pub salary: Salary,
}

/// Directory view of an employee with lookup ids resolved to names.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeRow {
    pub id: RecordId,
    pub full_name: String,
    pub email: String,
    pub store_id: Option<RecordId>,
    pub store_name: String,
    pub department: String,
    pub role: String,
    pub salary: Salary,
    pub hired_at: String,
    pub status: EmployeeStatus,
}
