//! Order status state machine.

use common::Role;
use serde::{Deserialize, Serialize};

/// The status of an order in its lifecycle.
///
/// Status transitions:
/// ```text
/// pending ──► confirmed ──► preparing ──► ready ──► delivering ──► completed
///    │
///    └──► cancelled
/// ```
/// `cancelled` is reachable only from `pending` (customer cancellation or
/// restaurant rejection); both `completed` and `cancelled` are terminal.
/// `ready` is the handoff point to delivery assignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Placed by the customer, awaiting restaurant confirmation. Items can
    /// still be modified.
    #[default]
    Pending,

    /// Accepted by the restaurant.
    Confirmed,

    /// Being cooked.
    Preparing,

    /// Prepared by the restaurant, awaiting driver pickup.
    Ready,

    /// Picked up, on its way to the customer.
    Delivering,

    /// Delivered (terminal).
    Completed,

    /// Cancelled by the customer or rejected by the restaurant (terminal).
    Cancelled,
}

impl OrderStatus {
    /// Returns true if order items can be modified in this status.
    pub fn can_modify_items(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }

    /// Returns true if the restaurant can confirm the order in this status.
    pub fn can_confirm(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }

    /// Returns true if the order can be cancelled or rejected in this
    /// status. Cancellation is only permitted while pending so restaurants
    /// never lose in-progress work.
    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }

    /// Returns true if a driver can accept the order in this status.
    pub fn can_accept_for_delivery(&self) -> bool {
        matches!(self, OrderStatus::Ready)
    }

    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// Returns true if the order is still in flight.
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if moving from this status to `next` is a legal step of
    /// the state machine. Transitions are monotonic; skipping stages or
    /// moving backwards is never allowed.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, Preparing)
                | (Preparing, Ready)
                | (Ready, Delivering)
                | (Delivering, Completed)
        )
    }

    /// Returns the role allowed to set this status through the generic
    /// status-update path, if any. Cancellation goes through the dedicated
    /// cancel/reject operations instead.
    pub fn settable_by(&self) -> Option<Role> {
        match self {
            OrderStatus::Confirmed | OrderStatus::Preparing | OrderStatus::Ready => {
                Some(Role::Restaurant)
            }
            OrderStatus::Delivering | OrderStatus::Completed => Some(Role::Driver),
            OrderStatus::Pending | OrderStatus::Cancelled => None,
        }
    }

    /// Returns the status name as a string (lowercase, matching the wire
    /// format).
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Delivering => "delivering",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// All non-terminal statuses, for active-order queries.
    pub const ACTIVE: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Delivering,
    ];

    /// Terminal statuses, for history queries.
    pub const TERMINAL: [OrderStatus; 2] = [OrderStatus::Completed, OrderStatus::Cancelled];
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "preparing" => Ok(OrderStatus::Preparing),
            "ready" => Ok(OrderStatus::Ready),
            "delivering" => Ok(OrderStatus::Delivering),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_pending() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
    }

    #[test]
    fn test_only_pending_can_modify_items() {
        assert!(OrderStatus::Pending.can_modify_items());
        assert!(!OrderStatus::Confirmed.can_modify_items());
        assert!(!OrderStatus::Preparing.can_modify_items());
        assert!(!OrderStatus::Ready.can_modify_items());
        assert!(!OrderStatus::Delivering.can_modify_items());
        assert!(!OrderStatus::Completed.can_modify_items());
        assert!(!OrderStatus::Cancelled.can_modify_items());
    }

    #[test]
    fn test_only_pending_can_cancel() {
        assert!(OrderStatus::Pending.can_cancel());
        assert!(!OrderStatus::Confirmed.can_cancel());
        assert!(!OrderStatus::Delivering.can_cancel());
        assert!(!OrderStatus::Completed.can_cancel());
    }

    #[test]
    fn test_only_ready_can_accept_for_delivery() {
        assert!(OrderStatus::Ready.can_accept_for_delivery());
        assert!(!OrderStatus::Pending.can_accept_for_delivery());
        assert!(!OrderStatus::Delivering.can_accept_for_delivery());
    }

    #[test]
    fn test_transition_table_is_monotonic() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Preparing));
        assert!(Preparing.can_transition_to(Ready));
        assert!(Ready.can_transition_to(Delivering));
        assert!(Delivering.can_transition_to(Completed));

        // No skips, no backwards moves, nothing out of terminal states
        assert!(!Pending.can_transition_to(Preparing));
        assert!(!Pending.can_transition_to(Ready));
        assert!(!Confirmed.can_transition_to(Cancelled));
        assert!(!Ready.can_transition_to(Confirmed));
        assert!(!Delivering.can_transition_to(Pending));
        assert!(!Completed.can_transition_to(Delivering));
        assert!(!Cancelled.can_transition_to(Confirmed));
    }

    #[test]
    fn test_role_gating_for_status_updates() {
        assert_eq!(OrderStatus::Preparing.settable_by(), Some(Role::Restaurant));
        assert_eq!(OrderStatus::Ready.settable_by(), Some(Role::Restaurant));
        assert_eq!(OrderStatus::Delivering.settable_by(), Some(Role::Driver));
        assert_eq!(OrderStatus::Completed.settable_by(), Some(Role::Driver));
        assert_eq!(OrderStatus::Cancelled.settable_by(), None);
    }

    #[test]
    fn test_terminal_states() {
        assert!(OrderStatus::Completed.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        for s in OrderStatus::ACTIVE {
            assert!(!s.is_terminal());
            assert!(s.is_active());
        }
    }

    #[test]
    fn test_serializes_lowercase() {
        let json = serde_json::to_string(&OrderStatus::Delivering).unwrap();
        assert_eq!(json, "\"delivering\"");
    }

    #[test]
    fn test_display_and_parse_roundtrip() {
        for s in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Preparing,
            OrderStatus::Ready,
            OrderStatus::Delivering,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(s.to_string().parse::<OrderStatus>().unwrap(), s);
        }
    }
}
