//! Bearer-token identity extraction.
//!
//! The gateway in front of this service verifies credentials and rewrites
//! the `Authorization` header to `Bearer <Role>:<user_id>`. This extractor
//! parses that pair into an [`Identity`]; anything missing or malformed
//! yields `None`, and the operation handlers decide whether anonymous
//! access is allowed.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use common::{Role, UserId};
use domain::Identity;

/// The caller identity, if a valid bearer token was presented.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Option<Identity>);

fn parse_bearer(value: &str) -> Option<Identity> {
    let token = value.strip_prefix("Bearer ")?;
    let (role, user_id) = token.split_once(':')?;
    let role: Role = role.parse().ok()?;
    let user_id: UserId = user_id.parse().ok()?;
    Some(Identity::new(user_id, role))
}

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let identity = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_bearer);
        Ok(AuthUser(identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_role_and_id() {
        let id = parse_bearer("Bearer Customer:42").unwrap();
        assert_eq!(id.user_id, UserId::new(42));
        assert_eq!(id.role, Role::Customer);
    }

    #[test]
    fn test_rejects_malformed_tokens() {
        assert!(parse_bearer("Bearer Customer").is_none());
        assert!(parse_bearer("Bearer Admin:42").is_none());
        assert!(parse_bearer("Bearer Customer:abc").is_none());
        assert!(parse_bearer("Customer:42").is_none());
    }
}
