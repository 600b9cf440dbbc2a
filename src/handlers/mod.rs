pub mod announcement;
pub mod audit;
pub mod auth;
pub mod dashboard;
pub mod employee;
pub mod leave;
pub mod records;

#[cfg(test)]
pub(crate) mod test_support;

use actix_web::web;

use crate::errors::AppError;

/// Mounts every route; shared by `main` and the handler tests.
/// Extractor failures answer with the same JSON error body as handlers.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .service(web::resource("/").route(web::get().to(records::health)))
        .service(web::resource("/v1/auth/login").route(web::post().to(auth::login)))
        .service(web::resource("/v1/auth/me").route(web::get().to(auth::me)))
        .service(web::resource("/v1/users").route(web::post().to(auth::create_user)))
        .service(web::resource("/v1/dashboard").route(web::get().to(dashboard::get_dashboard)))
        .service(
            web::resource("/v1/employees")
                .route(web::get().to(employee::get_employees))
                .route(web::post().to(employee::create_employee)),
        )
        .service(
            web::resource("/v1/employees/export")
                .route(web::get().to(employee::export_employees)),
        )
        .service(
            web::resource("/v1/employees/{id}")
                .route(web::get().to(employee::get_employee))
                .route(web::put().to(employee::update_employee))
                .route(web::delete().to(employee::delete_employee)),
        )
        .service(
            web::resource("/v1/leave-requests")
                .route(web::get().to(leave::get_leave_requests))
                .route(web::post().to(leave::create_leave_request)),
        )
        .service(
            web::resource("/v1/leave-requests/{id}")
                .route(web::get().to(leave::get_leave_request))
                .route(web::put().to(leave::update_leave_request))
                .route(web::delete().to(leave::delete_leave_request)),
        )
        .service(
            web::resource("/v1/leave-requests/{id}/approve")
                .route(web::post().to(leave::approve_leave_request)),
        )
        .service(
            web::resource("/v1/leave-requests/{id}/reject")
                .route(web::post().to(leave::reject_leave_request)),
        )
        .service(
            web::resource("/v1/announcements")
                .route(web::get().to(announcement::get_announcements))
                .route(web::post().to(announcement::create_announcement)),
        )
        .service(
            web::resource("/v1/announcements/{id}")
                .route(web::put().to(announcement::update_announcement))
                .route(web::delete().to(announcement::delete_announcement)),
        )
        .service(web::resource("/v1/audit-logs").route(web::get().to(audit::get_audit_logs)))
        .service(
            web::resource("/api/{resource}")
                .route(web::get().to(records::list_records))
                .route(web::post().to(records::create_record)),
        )
        .service(
            web::resource("/api/{resource}/{id}")
                .route(web::get().to(records::get_record))
                .route(web::put().to(records::replace_record))
                .route(web::patch().to(records::patch_record))
                .route(web::delete().to(records::delete_record)),
        );
}
