use chrono::{DateTime, Utc};
use common::{Role, UserId};
use serde::{Deserialize, Serialize};

/// A platform account.
///
/// Registration and login live in the external auth service; the core only
/// needs the row for ownership checks and contact display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for inserting an account row (mirrored from the auth service).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialization_roundtrip() {
        let user = User {
            id: UserId::new(1),
            name: "Ana".into(),
            email: "ana@example.com".into(),
            phone: None,
            address: Some("Jl. Merdeka 1".into()),
            role: Role::Customer,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_string(&user).unwrap();
        let back: User = serde_json::from_str(&json).unwrap();
        assert_eq!(back, user);
    }
}
