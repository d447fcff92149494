pub mod audit;
pub mod complaints;
pub mod intake;
pub mod resolution;

use grievance_core::error::GrvError;
use grievance_core::types::Role;

use crate::auth::AuthContext;

/// Reject unless `auth`'s role is one of `allowed` (spec §4.7's role
/// matrix, applied to operations that aren't gated by `LifecycleEngine`
/// itself — listings, audit queries, routing).
pub(crate) fn require_role(auth: &AuthContext, allowed: &[Role]) -> Result<(), GrvError> {
    if allowed.contains(&auth.role) {
        Ok(())
    } else {
        Err(GrvError::Forbidden(format!(
            "role {:?} is not permitted to perform this operation",
            auth.role
        )))
    }
}
