use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeSet, HashMap};
use validator::Validate;

use crate::audit;
use crate::db::{fetch_all, fetch_one, to_record, RecordStore, StoreError, EMPLOYEES, LEAVE_REQUESTS};
use crate::errors::AppError;
use crate::handlers::employee::Lookups;
use crate::models::employee::Employee;
use crate::models::leave::{LeaveRequest, LeaveRequestRow, LeaveStatus, LeaveType};
use crate::models::user::AuthUser;
use crate::models::RecordId;
use crate::permissions::{self, Denial, Permissions};
use crate::state::AppState;
use crate::utils::validation::{parse_iso_date, validate_iso_date, validate_payload};

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LeavePayload {
    employee_id: RecordId,
    #[serde(rename = "type", default = "default_type")]
    leave_type: LeaveType,
    #[validate(custom = "validate_iso_date")]
    start_date: String,
    #[validate(custom = "validate_iso_date")]
    end_date: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    note: String,
    status: Option<LeaveStatus>,
}

fn default_type() -> LeaveType {
    LeaveType::Annual
}

#[derive(Deserialize)]
pub struct LeaveQueryParams {
    status: Option<String>,
    #[serde(rename = "type")]
    leave_type: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveListResponse {
    items: Vec<LeaveRequestRow>,
    status_options: Vec<String>,
    type_options: Vec<String>,
}

/// Inclusive number of days between two `YYYY-MM-DD` dates; 0 when either
/// date is invalid or the range runs backwards.
pub fn calc_days_inclusive(start_date: &str, end_date: &str) -> i64 {
    match (parse_iso_date(start_date), parse_iso_date(end_date)) {
        (Some(start), Some(end)) => {
            let diff = (end - start).num_days();
            if diff >= 0 {
                diff + 1
            } else {
                0
            }
        }
        _ => 0,
    }
}

async fn employee_for(store: &dyn RecordStore, id: &RecordId) -> Result<Employee, AppError> {
    match fetch_one(store, EMPLOYEES, &id.as_key()).await {
        Ok(employee) => Ok(employee),
        Err(StoreError::NotFound(_)) => Err(AppError::BadRequest(format!("Unknown employee: {}", id))),
        Err(err) => Err(err.into()),
    }
}

/// Store of the employee a request belongs to; `None` when the employee is gone.
async fn request_store(store: &dyn RecordStore, request: &LeaveRequest) -> Result<Option<RecordId>, AppError> {
    match fetch_one::<Employee>(store, EMPLOYEES, &request.employee_id.as_key()).await {
        Ok(employee) => Ok(employee.store_id),
        Err(StoreError::NotFound(_)) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn checked_days(payload: &LeavePayload) -> Result<i64, AppError> {
    match calc_days_inclusive(&payload.start_date, &payload.end_date) {
        0 => Err(AppError::BadRequest(
            "End date must not be before start date".to_string(),
        )),
        days => Ok(days),
    }
}

fn distinct_sorted(values: impl Iterator<Item = &'static str>) -> Vec<String> {
    values
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub async fn get_leave_requests(
    user: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<LeaveQueryParams>,
) -> Result<HttpResponse, AppError> {
    let perms = Permissions::for_user(Some(&user));
    let employees: Vec<Employee> = fetch_all(state.store(), EMPLOYEES).await?;
    let requests: Vec<LeaveRequest> = fetch_all(state.store(), LEAVE_REQUESTS).await?;
    let lookups = Lookups::load(state.store()).await?;

    let by_id: HashMap<String, &Employee> = employees.iter().map(|e| (e.id.as_key(), e)).collect();

    let rows: Vec<LeaveRequestRow> = requests
        .into_iter()
        .map(|x| {
            let employee = by_id.get(&x.employee_id.as_key());
            let store_id = employee.and_then(|e| e.store_id.clone());
            LeaveRequestRow {
                employee_name: employee
                    .map(|e| e.full_name.clone())
                    .unwrap_or_else(|| format!("#{}", x.employee_id)),
                store_name: lookups.store_name(store_id.as_ref()),
                store_id,
                id: x.id,
                employee_id: x.employee_id,
                leave_type: x.leave_type,
                start_date: x.start_date,
                end_date: x.end_date,
                days: x.days,
                status: x.status,
                note: x.note,
            }
        })
        .filter(|r| perms.in_scope(r.store_id.as_ref()))
        .collect();

    let status_options = distinct_sorted(rows.iter().map(|r| r.status.as_str()));
    let type_options = distinct_sorted(rows.iter().map(|r| r.leave_type.as_str()));

    let items = rows
        .into_iter()
        .filter(|r| query.status.as_deref().map_or(true, |s| r.status.as_str() == s))
        .filter(|r| query.leave_type.as_deref().map_or(true, |t| r.leave_type.as_str() == t))
        .collect();

    Ok(HttpResponse::Ok().json(LeaveListResponse {
        items,
        status_options,
        type_options,
    }))
}

pub async fn get_leave_request(
    user: AuthUser,
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let perms = Permissions::for_user(Some(&user));
    let request: LeaveRequest = fetch_one(state.store(), LEAVE_REQUESTS, &id).await?;
    if !perms.in_scope(request_store(state.store(), &request).await?.as_ref()) {
        return Err(Denial::CrossStore.into());
    }
    Ok(HttpResponse::Ok().json(request))
}

pub async fn create_leave_request(
    user: AuthUser,
    state: web::Data<AppState>,
    new_request: web::Json<LeavePayload>,
) -> Result<HttpResponse, AppError> {
    validate_payload(&new_request.0)?;
    let payload = new_request.into_inner();
    let days = checked_days(&payload)?;

    let employee = employee_for(state.store(), &payload.employee_id).await?;
    let perms = Permissions::for_user(Some(&user));
    if !perms.in_scope(employee.store_id.as_ref()) {
        return Err(Denial::CrossStore.into());
    }

    // Only approvers may file a request that is already decided.
    let status = if permissions::is_leave_approver(&user) {
        payload.status.unwrap_or(LeaveStatus::Pending)
    } else {
        LeaveStatus::Pending
    };

    let body = json!({
        "employeeId": payload.employee_id,
        "type": payload.leave_type,
        "startDate": payload.start_date,
        "endDate": payload.end_date,
        "days": days,
        "status": status,
        "note": payload.note.trim(),
    });
    let created: LeaveRequest = serde_json::from_value(state.store().insert(LEAVE_REQUESTS, body).await?)
        .map_err(|err| AppError::InternalServerError(err.to_string()))?;

    audit::record(
        state.store(),
        &user,
        "leave.create",
        LEAVE_REQUESTS,
        &created.id.as_key(),
        json!({"employeeId": created.employee_id, "status": created.status}),
    )
    .await;

    Ok(HttpResponse::Created().json(created))
}

pub async fn update_leave_request(
    user: AuthUser,
    state: web::Data<AppState>,
    id: web::Path<String>,
    updates: web::Json<LeavePayload>,
) -> Result<HttpResponse, AppError> {
    permissions::require(permissions::is_leave_approver(&user))?;
    validate_payload(&updates.0)?;

    let current: LeaveRequest = fetch_one(state.store(), LEAVE_REQUESTS, &id).await?;
    let payload = updates.into_inner();
    let days = checked_days(&payload)?;
    employee_for(state.store(), &payload.employee_id).await?;

    let next = LeaveRequest {
        id: current.id.clone(),
        employee_id: payload.employee_id,
        leave_type: payload.leave_type,
        start_date: payload.start_date,
        end_date: payload.end_date,
        days,
        status: payload.status.unwrap_or(current.status),
        note: payload.note.trim().to_string(),
    };
    let saved = state.store().replace(LEAVE_REQUESTS, &id, to_record(&next)?).await?;

    audit::record(
        state.store(),
        &user,
        "leave.update",
        LEAVE_REQUESTS,
        &next.id.as_key(),
        json!({"employeeId": next.employee_id, "status": next.status}),
    )
    .await;

    Ok(HttpResponse::Ok().json(saved))
}

pub async fn delete_leave_request(
    user: AuthUser,
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    permissions::require(permissions::is_leave_approver(&user))?;

    let request: LeaveRequest = fetch_one(state.store(), LEAVE_REQUESTS, &id).await?;
    state.store().delete(LEAVE_REQUESTS, &id).await?;

    audit::record(
        state.store(),
        &user,
        "leave.delete",
        LEAVE_REQUESTS,
        &request.id.as_key(),
        json!({"employeeId": request.employee_id}),
    )
    .await;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Leave request deleted successfully",
    })))
}

async fn decide(
    user: AuthUser,
    state: web::Data<AppState>,
    id: String,
    status: LeaveStatus,
) -> Result<HttpResponse, AppError> {
    permissions::require(permissions::is_leave_approver(&user))?;

    let request: LeaveRequest = fetch_one(state.store(), LEAVE_REQUESTS, &id).await?;
    if request.status != LeaveStatus::Pending {
        return Err(AppError::Conflict(format!(
            "Leave request is already {}",
            request.status.as_str()
        )));
    }

    let saved = state
        .store()
        .patch_if(
            LEAVE_REQUESTS,
            &id,
            "status",
            &json!(LeaveStatus::Pending),
            json!({"status": status}),
        )
        .await
        .map_err(|err| match err {
            StoreError::Conflict(_) => {
                AppError::Conflict("Leave request was decided by someone else".to_string())
            }
            other => other.into(),
        })?;

    audit::record(
        state.store(),
        &user,
        "leave.status",
        LEAVE_REQUESTS,
        &request.id.as_key(),
        json!({"status": status}),
    )
    .await;

    Ok(HttpResponse::Ok().json(saved))
}

pub async fn approve_leave_request(
    user: AuthUser,
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    decide(user, state, id.into_inner(), LeaveStatus::Approved).await
}

pub async fn reject_leave_request(
    user: AuthUser,
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    decide(user, state, id.into_inner(), LeaveStatus::Rejected).await
}
