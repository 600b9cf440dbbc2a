use actix_web::http::header;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeSet, HashMap};
use validator::Validate;

use crate::audit;
use crate::db::{fetch_all, fetch_one, to_record, RecordStore, StoreError, DEPARTMENTS, EMPLOYEES, ROLES, STORES};
use crate::errors::AppError;
use crate::models::department::{Department, JobRole, Store};
use crate::models::employee::{Employee, EmployeeRow, EmployeeStatus, Salary};
use crate::models::user::AuthUser;
use crate::models::RecordId;
use crate::permissions::{self, Permissions};
use crate::state::AppState;
use crate::utils::query::contains_ci;
use crate::utils::validation::{
    validate_full_name, validate_gmail, validate_iso_date, validate_payload, validate_phone,
    validate_positive_amount,
};

const NO_VALUE: &str = "—";
const DEFAULT_CURRENCY: &str = "AZN";
const DEFAULT_COMPANY_ID: i64 = 1;

#[derive(Deserialize, Validate, Default)]
pub struct SalaryInput {
    currency: Option<String>,
    #[validate(custom = "validate_positive_amount")]
    #[serde(default)]
    base: f64,
    #[validate(range(min = 0.0))]
    #[serde(default)]
    bonus: f64,
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EmployeePayload {
    company_id: Option<i64>,
    #[validate(custom = "validate_full_name")]
    full_name: String,
    #[validate(custom = "validate_gmail")]
    email: String,
    #[serde(default)]
    #[validate(custom = "validate_phone")]
    phone: String,
    department_id: RecordId,
    #[serde(default)]
    store_id: Option<RecordId>,
    role_id: RecordId,
    #[serde(default)]
    manager_id: Option<RecordId>,
    #[serde(default = "default_status")]
    status: EmployeeStatus,
    #[validate(custom = "validate_iso_date")]
    hire_date: String,
    #[serde(default)]
    #[validate]
    salary: SalaryInput,
}

fn default_status() -> EmployeeStatus {
    EmployeeStatus::Active
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeQueryParams {
    q: Option<String>,
    status: Option<String>,
    department: Option<String>,
    role: Option<String>,
    store_id: Option<String>,
    sort: Option<String>,
    order: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeListResponse {
    items: Vec<EmployeeRow>,
    department_options: Vec<String>,
    role_options: Vec<String>,
    status_options: Vec<String>,
}

/// Id → display name maps for the lookup resources.
pub(crate) struct Lookups {
    departments: HashMap<String, String>,
    stores: HashMap<String, String>,
    roles: HashMap<String, String>,
}

impl Lookups {
    pub(crate) async fn load(store: &dyn RecordStore) -> Result<Self, AppError> {
        let departments: Vec<Department> = fetch_all(store, DEPARTMENTS).await?;
        let stores: Vec<Store> = fetch_all(store, STORES).await?;
        let roles: Vec<JobRole> = fetch_all(store, ROLES).await?;
        Ok(Lookups {
            departments: departments.into_iter().map(|d| (d.id.as_key(), d.name)).collect(),
            stores: stores.into_iter().map(|s| (s.id.as_key(), s.name)).collect(),
            roles: roles.into_iter().map(|r| (r.id.as_key(), r.name)).collect(),
        })
    }

    pub(crate) fn department_name(&self, id: &RecordId) -> String {
        self.departments.get(&id.as_key()).cloned().unwrap_or_else(|| NO_VALUE.to_string())
    }

    pub(crate) fn store_name(&self, id: Option<&RecordId>) -> String {
        id.and_then(|id| self.stores.get(&id.as_key()).cloned())
            .unwrap_or_else(|| NO_VALUE.to_string())
    }

    /// Like `store_name`, but says so when there is no store at all.
    pub(crate) fn store_label(&self, id: Option<&RecordId>) -> String {
        match id {
            None => "No store".to_string(),
            Some(_) => self.store_name(id),
        }
    }

    pub(crate) fn role_name(&self, id: &RecordId) -> String {
        self.roles.get(&id.as_key()).cloned().unwrap_or_else(|| NO_VALUE.to_string())
    }
}

pub(crate) fn to_row(emp: &Employee, lookups: &Lookups) -> EmployeeRow {
    EmployeeRow {
        id: emp.id.clone(),
        full_name: emp.full_name.clone(),
        email: emp.email.clone(),
        store_id: emp.store_id.clone(),
        store_name: lookups.store_name(emp.store_id.as_ref()),
        department: lookups.department_name(&emp.department_id),
        role: lookups.role_name(&emp.role_id),
        salary: emp.salary.clone(),
        hired_at: emp.hire_date.clone(),
        status: emp.status,
    }
}

/// Employees visible under the caller's store limit.
pub(crate) async fn scoped_employees(
    store: &dyn RecordStore,
    perms: &Permissions,
) -> Result<Vec<Employee>, AppError> {
    let employees: Vec<Employee> = fetch_all(store, EMPLOYEES).await?;
    Ok(employees
        .into_iter()
        .filter(|e| perms.in_scope(e.store_id.as_ref()))
        .collect())
}

fn distinct_sorted<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .filter(|v| !v.is_empty() && *v != NO_VALUE)
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn sort_rows(rows: &mut [EmployeeRow], sort: &str, descending: bool) -> Result<(), AppError> {
    match sort {
        "fullName" => rows.sort_by_key(|r| r.full_name.to_lowercase()),
        "hiredAt" => rows.sort_by(|a, b| a.hired_at.cmp(&b.hired_at)),
        "salary" => rows.sort_by(|a, b| a.salary.base.total_cmp(&b.salary.base)),
        "status" => rows.sort_by_key(|r| r.status.as_str()),
        other => return Err(AppError::BadRequest(format!("Unknown sort field: {}", other))),
    }
    if descending {
        rows.reverse();
    }
    Ok(())
}

async fn ensure_exists(
    store: &dyn RecordStore,
    resource: &str,
    id: &RecordId,
    label: &str,
) -> Result<(), AppError> {
    match store.get(resource, &id.as_key()).await {
        Ok(_) => Ok(()),
        Err(StoreError::NotFound(_)) => Err(AppError::BadRequest(format!("Unknown {}: {}", label, id))),
        Err(err) => Err(err.into()),
    }
}

async fn check_references(store: &dyn RecordStore, payload: &EmployeePayload) -> Result<(), AppError> {
    ensure_exists(store, DEPARTMENTS, &payload.department_id, "department").await?;
    ensure_exists(store, ROLES, &payload.role_id, "role").await?;
    if let Some(store_id) = &payload.store_id {
        ensure_exists(store, STORES, store_id, "store").await?;
    }
    if let Some(manager_id) = &payload.manager_id {
        ensure_exists(store, EMPLOYEES, manager_id, "manager").await?;
    }
    Ok(())
}

fn build_employee(payload: EmployeePayload, id: RecordId, current: Option<&Employee>) -> Employee {
    let currency = payload
        .salary
        .currency
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

    Employee {
        id,
        company_id: current
            .map(|c| c.company_id)
            .or(payload.company_id)
            .unwrap_or(DEFAULT_COMPANY_ID),
        full_name: payload.full_name.trim().to_string(),
        email: payload.email.trim().to_string(),
        phone: payload.phone.trim().to_string(),
        department_id: payload.department_id,
        store_id: payload.store_id,
        role_id: payload.role_id,
        manager_id: payload.manager_id,
        status: payload.status,
        hire_date: payload.hire_date,
        salary: Salary {
            currency,
            base: payload.salary.base,
            bonus: payload.salary.bonus,
        },
    }
}

/// Names of the fields that differ between two versions of an employee.
pub fn changed_fields(prev: &Employee, next: &Employee) -> Vec<&'static str> {
    let checks = [
        ("fullName", prev.full_name != next.full_name),
        ("email", prev.email != next.email),
        ("phone", prev.phone != next.phone),
        ("departmentId", prev.department_id != next.department_id),
        ("storeId", prev.store_id != next.store_id),
        ("roleId", prev.role_id != next.role_id),
        ("managerId", prev.manager_id != next.manager_id),
        ("status", prev.status != next.status),
        ("hireDate", prev.hire_date != next.hire_date),
        ("salary.base", prev.salary.base != next.salary.base),
        ("salary.bonus", prev.salary.bonus != next.salary.bonus),
        ("salary.currency", prev.salary.currency != next.salary.currency),
    ];
    checks
        .into_iter()
        .filter_map(|(field, changed)| changed.then_some(field))
        .collect()
}

pub async fn get_employees(
    user: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<EmployeeQueryParams>,
) -> Result<HttpResponse, AppError> {
    let perms = Permissions::for_user(Some(&user));
    permissions::require(perms.can_view_employees)?;

    let lookups = Lookups::load(state.store()).await?;
    let rows: Vec<EmployeeRow> = scoped_employees(state.store(), &perms)
        .await?
        .iter()
        .map(|e| to_row(e, &lookups))
        .collect();

    let department_options = distinct_sorted(rows.iter().map(|r| r.department.as_str()));
    let role_options = distinct_sorted(rows.iter().map(|r| r.role.as_str()));
    let status_options = distinct_sorted(rows.iter().map(|r| r.status.as_str()));

    let term = query.q.as_deref().unwrap_or("").trim().to_string();
    let mut items: Vec<EmployeeRow> = rows
        .into_iter()
        .filter(|r| query.status.as_deref().map_or(true, |s| r.status.as_str() == s))
        .filter(|r| query.department.as_deref().map_or(true, |d| r.department == d))
        .filter(|r| query.role.as_deref().map_or(true, |role| r.role == role))
        .filter(|r| {
            query
                .store_id
                .as_deref()
                .map_or(true, |s| r.store_id.as_ref().map_or(false, |id| id.matches(s)))
        })
        .filter(|r| {
            contains_ci(&r.full_name, &term)
                || contains_ci(&r.email, &term)
                || contains_ci(&r.department, &term)
                || contains_ci(&r.store_name, &term)
                || contains_ci(&r.role, &term)
        })
        .collect();

    if let Some(sort) = query.sort.as_deref() {
        let descending = query.order.as_deref() == Some("desc");
        sort_rows(&mut items, sort, descending)?;
    }

    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        items,
        department_options,
        role_options,
        status_options,
    }))
}

pub async fn get_employee(
    user: AuthUser,
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let perms = Permissions::for_user(Some(&user));
    let employee: Employee = fetch_one(state.store(), EMPLOYEES, &id).await?;
    perms.can_view_employee(&employee)?;
    Ok(HttpResponse::Ok().json(employee))
}

pub async fn create_employee(
    user: AuthUser,
    state: web::Data<AppState>,
    new_employee: web::Json<EmployeePayload>,
) -> Result<HttpResponse, AppError> {
    let perms = Permissions::for_user(Some(&user));
    perms.can_create_employee()?;
    validate_payload(&new_employee.0)?;

    let payload = new_employee.into_inner();
    check_references(state.store(), &payload).await?;

    // Placeholder id; the store assigns the real one.
    let mut body = to_record(&build_employee(payload, RecordId::Number(0), None))?;
    if let Some(map) = body.as_object_mut() {
        map.remove("id");
    }
    let created = state.store().insert(EMPLOYEES, body).await?;
    let employee: Employee = serde_json::from_value(created)
        .map_err(|err| AppError::InternalServerError(err.to_string()))?;

    audit::record(
        state.store(),
        &user,
        "employee.create",
        EMPLOYEES,
        &employee.id.as_key(),
        json!({"fullName": employee.full_name}),
    )
    .await;

    Ok(HttpResponse::Created().json(employee))
}

pub async fn update_employee(
    user: AuthUser,
    state: web::Data<AppState>,
    id: web::Path<String>,
    updates: web::Json<EmployeePayload>,
) -> Result<HttpResponse, AppError> {
    let perms = Permissions::for_user(Some(&user));
    let current: Employee = fetch_one(state.store(), EMPLOYEES, &id).await?;
    perms.can_edit_employee(&current)?;
    validate_payload(&updates.0)?;

    let payload = updates.into_inner();
    check_references(state.store(), &payload).await?;

    let next = build_employee(payload, current.id.clone(), Some(&current));
    let changed = changed_fields(&current, &next);
    let saved = state.store().replace(EMPLOYEES, &id, to_record(&next)?).await?;

    audit::record(
        state.store(),
        &user,
        "employee.update",
        EMPLOYEES,
        &next.id.as_key(),
        json!({"fullName": next.full_name, "changed": changed}),
    )
    .await;

    Ok(HttpResponse::Ok().json(saved))
}

pub async fn delete_employee(
    user: AuthUser,
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let perms = Permissions::for_user(Some(&user));
    let employee: Employee = fetch_one(state.store(), EMPLOYEES, &id).await?;
    perms.can_delete_employee(&employee)?;

    state.store().delete(EMPLOYEES, &id).await?;

    audit::record(
        state.store(),
        &user,
        "employee.delete",
        EMPLOYEES,
        &employee.id.as_key(),
        json!({"fullName": employee.full_name}),
    )
    .await;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Employee deleted successfully",
    })))
}

pub fn employees_csv(employees: &[Employee], lookups: &Lookups) -> Result<Vec<u8>, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let csv_error = |err: csv::Error| AppError::InternalServerError(format!("CSV export failed: {}", err));

    writer
        .write_record(["Full name", "Email", "Store", "Department", "Role"])
        .map_err(csv_error)?;
    for emp in employees {
        let store = lookups.store_name(emp.store_id.as_ref());
        let department = lookups.department_name(&emp.department_id);
        let role = lookups.role_name(&emp.role_id);
        writer
            .write_record([
                emp.full_name.as_str(),
                emp.email.as_str(),
                store.as_str(),
                department.as_str(),
                role.as_str(),
            ])
            .map_err(csv_error)?;
    }
    writer
        .into_inner()
        .map_err(|err| AppError::InternalServerError(format!("CSV export failed: {}", err)))
}

pub async fn export_employees(
    user: AuthUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    permissions::require(permissions::can_export_employees(&user))?;

    let perms = Permissions::for_user(Some(&user));
    let employees = scoped_employees(state.store(), &perms).await?;
    if employees.is_empty() {
        return Ok(HttpResponse::NoContent().finish());
    }

    let lookups = Lookups::load(state.store()).await?;
    let body = employees_csv(&employees, &lookups)?;

    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            header::CONTENT_DISPOSITION,
            "attachment; filename=\"employees.csv\"",
        ))
        .body(body))
}
