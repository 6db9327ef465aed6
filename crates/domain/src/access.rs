//! Role-based access-control predicates.
//!
//! Every operation handler consults these before touching state. Checks fail
//! fast with [`Error::Unauthenticated`] or [`Error::Forbidden`]; a mutation
//! is never partially applied before its check.

use common::{Role, UserId};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Caller identity as resolved by the external auth collaborator.
///
/// The core never sees credential material; it receives only the verified
/// `(user id, role)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub role: Role,
}

impl Identity {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    /// Returns true if the caller owns the given resource.
    pub fn owns(&self, owner_id: UserId) -> bool {
        self.user_id == owner_id
    }
}

/// Requires a caller to be present at all.
pub fn require_identity(caller: Option<Identity>) -> Result<Identity> {
    caller.ok_or(Error::Unauthenticated)
}

/// Requires the caller to hold exactly the given role.
pub fn require_role(caller: Option<Identity>, role: Role) -> Result<Identity> {
    let identity = require_identity(caller)?;
    if identity.role != role {
        return Err(Error::forbidden(format!(
            "only {role} accounts may perform this operation"
        )));
    }
    Ok(identity)
}

/// Requires the caller to hold one of the given roles.
pub fn require_any_role(caller: Option<Identity>, roles: &[Role]) -> Result<Identity> {
    let identity = require_identity(caller)?;
    if !roles.contains(&identity.role) {
        return Err(Error::forbidden(
            "your role may not perform this operation".to_string(),
        ));
    }
    Ok(identity)
}

/// Requires the caller to own the resource.
pub fn require_owner(identity: &Identity, owner_id: UserId, what: &str) -> Result<()> {
    if !identity.owns(owner_id) {
        return Err(Error::forbidden(format!("you can only access your own {what}")));
    }
    Ok(())
}
