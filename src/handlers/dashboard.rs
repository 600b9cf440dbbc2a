use actix_web::{web, HttpResponse};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

use crate::db::{fetch_all, LEAVE_REQUESTS};
use crate::errors::AppError;
use crate::handlers::announcement::visible_announcements;
use crate::handlers::audit::audit_rows;
use crate::handlers::employee::{scoped_employees, to_row, Lookups};
use crate::models::announcement::Announcement;
use crate::models::audit::AuditLogRow;
use crate::models::employee::{Employee, EmployeeRow, EmployeeStatus};
use crate::models::leave::{LeaveRequest, LeaveStatus};
use crate::models::user::AuthUser;
use crate::permissions::Permissions;
use crate::state::AppState;

const LATEST_HIRES: usize = 5;
const RECENT_ANNOUNCEMENTS: usize = 3;
const RECENT_LOGS: usize = 6;

#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Kpis {
    total: usize,
    active: usize,
    on_leave: usize,
    terminated: usize,
    pending_leaves: usize,
    audit_count: usize,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct ChartDatum {
    name: String,
    count: usize,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct TrendDatum {
    month: String,
    count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Charts {
    by_store: Vec<ChartDatum>,
    by_department: Vec<ChartDatum>,
    hires_by_month: Vec<TrendDatum>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lists {
    latest_hires: Vec<EmployeeRow>,
    recent_announcements: Vec<Announcement>,
    recent_logs: Vec<AuditLogRow>,
}

#[derive(Serialize)]
pub struct DashboardResponse {
    kpis: Kpis,
    charts: Charts,
    lists: Lists,
}

/// Counts per name, biggest first; ties keep first-seen order.
fn count_by(names: impl Iterator<Item = String>) -> Vec<ChartDatum> {
    let mut counts: Vec<ChartDatum> = Vec::new();
    for name in names {
        match counts.iter_mut().find(|d| d.name == name) {
            Some(datum) => datum.count += 1,
            None => counts.push(ChartDatum { name, count: 1 }),
        }
    }
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

fn hires_by_month(employees: &[Employee]) -> Vec<TrendDatum> {
    let mut months: BTreeMap<String, usize> = BTreeMap::new();
    for emp in employees {
        let month: String = emp.hire_date.chars().take(7).collect();
        if month.is_empty() {
            continue;
        }
        *months.entry(month).or_default() += 1;
    }
    months
        .into_iter()
        .map(|(month, count)| TrendDatum { month, count })
        .collect()
}

fn kpis(employees: &[Employee], leaves: &[LeaveRequest], audit_count: usize) -> Kpis {
    let with_status = |status: EmployeeStatus| employees.iter().filter(|e| e.status == status).count();
    let in_scope: HashSet<String> = employees.iter().map(|e| e.id.as_key()).collect();

    Kpis {
        total: employees.len(),
        active: with_status(EmployeeStatus::Active),
        on_leave: with_status(EmployeeStatus::OnLeave),
        terminated: with_status(EmployeeStatus::Terminated),
        pending_leaves: leaves
            .iter()
            .filter(|x| x.status == LeaveStatus::Pending)
            .filter(|x| in_scope.contains(&x.employee_id.as_key()))
            .count(),
        audit_count,
    }
}

pub async fn get_dashboard(
    user: AuthUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let perms = Permissions::for_user(Some(&user));
    let mut employees = scoped_employees(state.store(), &perms).await?;
    let lookups = Lookups::load(state.store()).await?;
    let leaves: Vec<LeaveRequest> = fetch_all(state.store(), LEAVE_REQUESTS).await?;
    let announcements = visible_announcements(&state, &user).await?;
    let logs = audit_rows(&state, &user).await?;

    let kpis = kpis(&employees, &leaves, logs.len());
    let charts = Charts {
        by_store: count_by(employees.iter().map(|e| lookups.store_label(e.store_id.as_ref()))),
        by_department: count_by(employees.iter().map(|e| lookups.department_name(&e.department_id))),
        hires_by_month: hires_by_month(&employees),
    };

    employees.sort_by(|a, b| b.hire_date.cmp(&a.hire_date));
    let lists = Lists {
        latest_hires: employees
            .iter()
            .take(LATEST_HIRES)
            .map(|e| to_row(e, &lookups))
            .collect(),
        recent_announcements: announcements.into_iter().take(RECENT_ANNOUNCEMENTS).collect(),
        recent_logs: logs.into_iter().take(RECENT_LOGS).collect(),
    };

    Ok(HttpResponse::Ok().json(DashboardResponse { kpis, charts, lists }))
}
