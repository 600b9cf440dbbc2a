//! Role-based access rules.
//!
//! admin: everything. hr: view, create and edit employees, no deletes.
//! store_manager: read-only and limited to the manager's own store.
use crate::errors::AppError;
use crate::models::employee::Employee;
use crate::models::user::{AuthUser, Role};
use crate::models::RecordId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permissions {
    pub can_view_employees: bool,
    pub can_create_employee: bool,
    pub can_edit_employee: bool,
    pub can_delete_employee: bool,
    pub limit_to_store_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    NoPermission,
    CrossStore,
}

impl Denial {
    pub fn message(&self) -> &'static str {
        match self {
            Denial::NoPermission => "You do not have permission for this action.",
            Denial::CrossStore => {
                "You can only perform this action for employees of your own store."
            }
        }
    }
}

impl From<Denial> for AppError {
    fn from(denial: Denial) -> Self {
        AppError::Forbidden(denial.message().to_string())
    }
}

impl Permissions {
    pub fn for_user(user: Option<&AuthUser>) -> Self {
        let Some(user) = user else {
            return Permissions {
                can_view_employees: false,
                can_create_employee: false,
                can_edit_employee: false,
                can_delete_employee: false,
                limit_to_store_id: None,
            };
        };

        match user.role {
            Role::Admin => Permissions {
                can_view_employees: true,
                can_create_employee: true,
                can_edit_employee: true,
                can_delete_employee: true,
                limit_to_store_id: None,
            },
            Role::Hr => Permissions {
                can_view_employees: true,
                can_create_employee: true,
                can_edit_employee: true,
                can_delete_employee: false,
                limit_to_store_id: None,
            },
            Role::StoreManager => Permissions {
                can_view_employees: true,
                can_create_employee: false,
                can_edit_employee: false,
                can_delete_employee: false,
                limit_to_store_id: user.store_id.as_ref().map(RecordId::as_key),
            },
        }
    }

    pub fn in_scope(&self, store_id: Option<&RecordId>) -> bool {
        same_store(store_id, self.limit_to_store_id.as_deref())
    }

    pub fn can_create_employee(&self) -> Result<(), Denial> {
        if self.can_create_employee {
            Ok(())
        } else {
            Err(Denial::NoPermission)
        }
    }

    pub fn can_view_employee(&self, emp: &Employee) -> Result<(), Denial> {
        if !self.can_view_employees {
            return Err(Denial::NoPermission);
        }
        if !self.in_scope(emp.store_id.as_ref()) {
            return Err(Denial::CrossStore);
        }
        Ok(())
    }

    pub fn can_edit_employee(&self, emp: &Employee) -> Result<(), Denial> {
        if !self.can_edit_employee {
            return Err(Denial::NoPermission);
        }
        if !self.in_scope(emp.store_id.as_ref()) {
            return Err(Denial::CrossStore);
        }
        Ok(())
    }

    pub fn can_delete_employee(&self, emp: &Employee) -> Result<(), Denial> {
        if !self.can_delete_employee {
            return Err(Denial::NoPermission);
        }
        if !self.in_scope(emp.store_id.as_ref()) {
            return Err(Denial::CrossStore);
        }
        Ok(())
    }
}

/// No limit admits everything; a record without a store is outside any limit.
pub fn same_store(record_store: Option<&RecordId>, limit: Option<&str>) -> bool {
    match (limit, record_store) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(limit), Some(store)) => store.matches(limit),
    }
}

/// Approves, rejects, edits and deletes leave requests.
pub fn is_leave_approver(user: &AuthUser) -> bool {
    matches!(user.role, Role::Admin | Role::Hr)
}

pub fn can_manage_announcements(user: &AuthUser) -> bool {
    matches!(user.role, Role::Admin | Role::Hr)
}

pub fn can_delete_announcements(user: &AuthUser) -> bool {
    user.role == Role::Admin
}

pub fn can_export_employees(user: &AuthUser) -> bool {
    matches!(user.role, Role::Admin | Role::Hr)
}

pub fn require(allowed: bool) -> Result<(), AppError> {
    if allowed {
        Ok(())
    } else {
        Err(Denial::NoPermission.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::employee::{EmployeeStatus, Salary};

    fn user(role: Role, store: Option<&str>) -> AuthUser {
        AuthUser {
            id: RecordId::Number(1),
            full_name: "Test User".to_string(),
            email: "test@gmail.com".to_string(),
            role,
            store_id: store.map(RecordId::from),
        }
    }

    fn employee(store: Option<i64>) -> Employee {
        Employee {
            id: RecordId::Number(10),
            company_id: 1,
            full_name: "Kamran Safarov".to_string(),
            email: "kamran@gmail.com".to_string(),
            phone: String::new(),
            department_id: RecordId::Number(1),
            store_id: store.map(RecordId::Number),
            role_id: RecordId::Number(1),
            manager_id: None,
            status: EmployeeStatus::Active,
            hire_date: "2023-01-10".to_string(),
            salary: Salary {
                currency: "AZN".to_string(),
                base: 800.0,
                bonus: 0.0,
            },
        }
    }

    #[test]
    fn anonymous_gets_nothing() {
        let p = Permissions::for_user(None);
        assert!(!p.can_view_employees);
        assert_eq!(p.can_create_employee(), Err(Denial::NoPermission));
        assert_eq!(p.limit_to_store_id, None);
    }

    #[test]
    fn admin_is_unrestricted() {
        let p = Permissions::for_user(Some(&user(Role::Admin, None)));
        assert!(p.can_edit_employee(&employee(Some(4))).is_ok());
        assert!(p.can_delete_employee(&employee(None)).is_ok());
    }

    #[test]
    fn hr_edits_but_never_deletes() {
        let p = Permissions::for_user(Some(&user(Role::Hr, Some("2"))));
        assert!(p.can_create_employee().is_ok());
        assert!(p.can_edit_employee(&employee(Some(9))).is_ok());
        assert_eq!(
            p.can_delete_employee(&employee(Some(9))),
            Err(Denial::NoPermission)
        );
        assert_eq!(p.limit_to_store_id, None);
    }

    #[test]
    fn store_manager_is_read_only_and_scoped() {
        let p = Permissions::for_user(Some(&user(Role::StoreManager, Some("2"))));
        assert_eq!(p.limit_to_store_id.as_deref(), Some("2"));
        assert!(p.can_view_employee(&employee(Some(2))).is_ok());
        assert_eq!(
            p.can_view_employee(&employee(Some(3))),
            Err(Denial::CrossStore)
        );
        assert_eq!(
            p.can_edit_employee(&employee(Some(2))),
            Err(Denial::NoPermission)
        );
    }

    #[test]
    fn same_store_rules() {
        assert!(same_store(None, None));
        assert!(same_store(Some(&RecordId::Number(1)), None));
        assert!(!same_store(None, Some("1")));
        assert!(same_store(Some(&RecordId::Number(1)), Some("1")));
        assert!(!same_store(Some(&RecordId::Number(11)), Some("1")));
    }

    #[test]
    fn role_gates() {
        let hr = user(Role::Hr, None);
        let manager = user(Role::StoreManager, Some("1"));
        assert!(is_leave_approver(&hr));
        assert!(!is_leave_approver(&manager));
        assert!(can_manage_announcements(&hr));
        assert!(!can_delete_announcements(&hr));
        assert!(can_delete_announcements(&user(Role::Admin, None)));
        assert!(!can_export_employees(&manager));
    }
}
