//! Delivery driver entity and availability state.

use chrono::{DateTime, Utc};
use common::{DriverId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Availability state of a driver.
///
/// State transitions:
/// ```text
/// Offline ◄──► Online ──► Delivering ──► Online
/// ```
/// Going offline while `Delivering` is rejected: a driver in `Delivering`
/// has exactly one in-flight order assigned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DriverStatus {
    /// Not accepting deliveries.
    #[default]
    Offline,

    /// Available to accept a ready order.
    Online,

    /// Currently carrying an order.
    Delivering,
}

impl DriverStatus {
    /// Returns true if the driver may accept a new delivery in this state.
    pub fn can_accept_delivery(&self) -> bool {
        matches!(self, DriverStatus::Online)
    }

    /// Returns true if the driver may go offline in this state.
    pub fn can_go_offline(&self) -> bool {
        !matches!(self, DriverStatus::Delivering)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverStatus::Offline => "Offline",
            DriverStatus::Online => "Online",
            DriverStatus::Delivering => "Delivering",
        }
    }
}

impl std::fmt::Display for DriverStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DriverStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Offline" => Ok(DriverStatus::Offline),
            "Online" => Ok(DriverStatus::Online),
            "Delivering" => Ok(DriverStatus::Delivering),
            other => Err(format!("unknown driver status: {other}")),
        }
    }
}

/// A delivery driver profile.
///
/// Exactly one profile exists per account (`account_id` is unique); every
/// "my profile" operation resolves through that linkage. A driver in
/// `Delivering` status is referenced by exactly one in-flight order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryDriver {
    pub id: DriverId,
    /// Owning account; unique across driver profiles.
    pub account_id: UserId,
    pub name: String,
    pub phone: Option<String>,
    pub vehicle: Option<String>,
    pub status: DriverStatus,
    pub current_location: Option<String>,
    pub rating: f64,
    /// Stored incrementally on delivery completion; other stats are derived
    /// on read.
    pub total_deliveries: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DeliveryDriver {
    /// Flips the driver online.
    pub fn go_online(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.status == DriverStatus::Delivering {
            return Err(Error::DriverDelivering);
        }
        self.status = DriverStatus::Online;
        self.updated_at = now;
        Ok(())
    }

    /// Flips the driver offline; rejected mid-delivery.
    pub fn go_offline(&mut self, now: DateTime<Utc>) -> Result<()> {
        if !self.status.can_go_offline() {
            return Err(Error::DriverDelivering);
        }
        self.status = DriverStatus::Offline;
        self.updated_at = now;
        Ok(())
    }
}

/// Payload for creating a driver profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDriver {
    pub account_id: UserId,
    pub name: String,
    pub phone: Option<String>,
    pub vehicle: Option<String>,
    pub current_location: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver(status: DriverStatus) -> DeliveryDriver {
        DeliveryDriver {
            id: DriverId::new(1),
            account_id: UserId::new(10),
            name: "Budi".into(),
            phone: None,
            vehicle: Some("motorcycle".into()),
            status,
            current_location: None,
            rating: 0.0,
            total_deliveries: 0,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_default_status_is_offline() {
        assert_eq!(DriverStatus::default(), DriverStatus::Offline);
    }

    #[test]
    fn test_only_online_can_accept() {
        assert!(!DriverStatus::Offline.can_accept_delivery());
        assert!(DriverStatus::Online.can_accept_delivery());
        assert!(!DriverStatus::Delivering.can_accept_delivery());
    }

    #[test]
    fn test_go_offline_rejected_while_delivering() {
        let mut d = driver(DriverStatus::Delivering);
        assert!(matches!(
            d.go_offline(Utc::now()).unwrap_err(),
            Error::DriverDelivering
        ));
        assert_eq!(d.status, DriverStatus::Delivering);
    }

    #[test]
    fn test_go_online_rejected_while_delivering() {
        let mut d = driver(DriverStatus::Delivering);
        assert!(d.go_online(Utc::now()).is_err());
    }

    #[test]
    fn test_online_offline_toggle() {
        let mut d = driver(DriverStatus::Offline);
        d.go_online(Utc::now()).unwrap();
        assert_eq!(d.status, DriverStatus::Online);
        d.go_offline(Utc::now()).unwrap();
        assert_eq!(d.status, DriverStatus::Offline);
    }

    #[test]
    fn test_status_display_and_parse() {
        for s in [
            DriverStatus::Offline,
            DriverStatus::Online,
            DriverStatus::Delivering,
        ] {
            assert_eq!(s.to_string().parse::<DriverStatus>().unwrap(), s);
        }
    }
}
