//! Caller identity extraction (spec §4.7). Credential issuance is an
//! external collaborator (spec §1 Non-goals); this crate trusts the
//! upstream gateway to have authenticated the caller and to forward their
//! identity as headers, the same trust boundary the teacher's own
//! deployment assumes for its ops tooling.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use grievance_core::error::GrvError;
use grievance_core::types::{Actor, Role, UserId};

use crate::error::ApiError;

/// The authenticated caller of an operation: role, user id, and — for
/// roles scoped to a department — the department they belong to (spec
/// §4.7's ownership check).
#[derive(Debug, Clone, Copy)]
pub struct AuthContext {
    pub user_id: UserId,
    pub role: Role,
    pub department_id: Option<i64>,
}

impl AuthContext {
    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.user_id,
            role: self.role,
            department_id: self.department_id,
        }
    }
}

fn parse_role(s: &str) -> Option<Role> {
    match s {
        "CITIZEN" => Some(Role::Citizen),
        "STAFF" => Some(Role::Staff),
        "DEPT_HEAD" => Some(Role::DeptHead),
        "ADMIN" => Some(Role::Admin),
        "COMMISSIONER" => Some(Role::Commissioner),
        "SUPER_ADMIN" => Some(Role::SuperAdmin),
        _ => None,
    }
}

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header_str = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        let user_id: UserId = header_str("x-user-id")
            .and_then(|v| v.parse().ok())
            .ok_or(GrvError::Unauthorized)?;
        let role = header_str("x-user-role")
            .and_then(|v| parse_role(&v.to_uppercase()))
            .ok_or(GrvError::Unauthorized)?;
        let department_id = header_str("x-department-id").and_then(|v| v.parse().ok());

        Ok(Self {
            user_id,
            role,
            department_id,
        })
    }
}
