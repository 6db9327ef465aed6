use serde::{Deserialize, Serialize};

/// Role attached to a caller identity.
///
/// The auth collaborator resolves the bearer credential; the core only ever
/// sees the resulting `(user id, role)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Orders food; owns carts and the orders created from them.
    Customer,
    /// Owns a restaurant and its menu; confirms, prepares, and rejects
    /// orders.
    Restaurant,
    /// Picks up ready orders and delivers them.
    Driver,
}

impl Role {
    /// Returns the role name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "Customer",
            Role::Restaurant => "Restaurant",
            Role::Driver => "Driver",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Customer" => Ok(Role::Customer),
            "Restaurant" => Ok(Role::Restaurant),
            "Driver" => Ok(Role::Driver),
            other => Err(format!("unknown role: {other}")),
        }
    }
}
