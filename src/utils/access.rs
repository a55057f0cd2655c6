//! Access control gate.
//!
//! A request is Anonymous until a valid session resolves it to an [`Identity`];
//! an identity whose role is [`Role::Admin`] is additionally Authenticated-Admin.
//! Handlers call [`authorize`] with the action they are about to perform and the
//! student whose records it touches, and get a tagged [`Decision`] back.

use serde::Serialize;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "student" => Some(Role::Student),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Resolved once per request and handed to handlers as an extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub student_id: i64,
    pub name: String,
    pub role: Role,
    pub must_change_password: bool,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Create, edit, reset or delete students.
    ManageStudents,
    AssignTeam,
    /// Create or delete exam providers and mock exams.
    ManageExams,
    LogPractice,
    DeletePracticeLog,
    RecordExamResult,
    DeleteExamResult,
}

impl Action {
    fn requires_admin(&self) -> bool {
        matches!(
            self,
            Action::ManageStudents | Action::AssignTeam | Action::ManageExams
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    Unauthenticated,
    AdminRequired,
    NotOwner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(Denial),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn into_result(self) -> Result<(), AppError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(Denial::Unauthenticated) => {
                Err(AppError::AuthError("Authentication required".to_string()))
            }
            Decision::Deny(Denial::AdminRequired) => {
                Err(AppError::Forbidden("Administrator role required".to_string()))
            }
            Decision::Deny(Denial::NotOwner) => Err(AppError::Forbidden(
                "You may only act on your own records".to_string(),
            )),
        }
    }
}

/// Decides whether `identity` may perform `action` on records owned by `target_student`.
///
/// Admin-only actions ignore the target. Record-level actions allow the owner, and
/// allow admins on behalf of anyone. A record action without a target is allowed
/// for any authenticated identity.
pub fn authorize(
    identity: Option<&Identity>,
    action: Action,
    target_student: Option<i64>,
) -> Decision {
    let Some(identity) = identity else {
        return Decision::Deny(Denial::Unauthenticated);
    };

    if identity.is_admin() {
        return Decision::Allow;
    }

    if action.requires_admin() {
        return Decision::Deny(Denial::AdminRequired);
    }

    match target_student {
        Some(owner) if owner != identity.student_id => Decision::Deny(Denial::NotOwner),
        _ => Decision::Allow,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(id: i64) -> Identity {
        Identity {
            student_id: id,
            name: format!("student-{id}"),
            role: Role::Student,
            must_change_password: false,
        }
    }

    fn admin(id: i64) -> Identity {
        Identity {
            role: Role::Admin,
            ..student(id)
        }
    }

    #[test]
    fn anonymous_is_always_denied() {
        for action in [Action::LogPractice, Action::ManageStudents, Action::DeleteExamResult] {
            assert_eq!(
                authorize(None, action, Some(1)),
                Decision::Deny(Denial::Unauthenticated)
            );
        }
    }

    #[test]
    fn students_act_on_their_own_records_only() {
        let me = student(7);
        assert!(authorize(Some(&me), Action::LogPractice, Some(7)).is_allowed());
        assert!(authorize(Some(&me), Action::DeletePracticeLog, Some(7)).is_allowed());
        assert_eq!(
            authorize(Some(&me), Action::LogPractice, Some(8)),
            Decision::Deny(Denial::NotOwner)
        );
        assert_eq!(
            authorize(Some(&me), Action::RecordExamResult, Some(8)),
            Decision::Deny(Denial::NotOwner)
        );
    }

    #[test]
    fn admin_actions_need_admin_role() {
        let me = student(7);
        for action in [Action::ManageStudents, Action::AssignTeam, Action::ManageExams] {
            assert_eq!(
                authorize(Some(&me), action, None),
                Decision::Deny(Denial::AdminRequired)
            );
            assert!(authorize(Some(&admin(1)), action, None).is_allowed());
        }
    }

    #[test]
    fn admins_act_on_behalf_of_anyone() {
        assert!(authorize(Some(&admin(1)), Action::LogPractice, Some(99)).is_allowed());
        assert!(authorize(Some(&admin(1)), Action::DeleteExamResult, Some(42)).is_allowed());
    }

    #[test]
    fn denials_map_to_http_errors() {
        assert!(matches!(
            Decision::Deny(Denial::Unauthenticated).into_result(),
            Err(AppError::AuthError(_))
        ));
        assert!(matches!(
            Decision::Deny(Denial::NotOwner).into_result(),
            Err(AppError::Forbidden(_))
        ));
        assert!(Decision::Allow.into_result().is_ok());
    }
}
