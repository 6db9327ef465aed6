//! Pricing engine.
//!
//! Pure computation of line totals and fees; no I/O. Called whenever a cart
//! or order item set changes and at checkout/order creation, always over the
//! full current item set (recompute from scratch, never incremental deltas).

use common::Money;
use serde::{Deserialize, Serialize};

/// Platform commission rate applied to the item subtotal, in percent.
///
/// Fixed platform-wide; deliberately not a per-restaurant parameter. The
/// delivery fee, by contrast, always comes from the restaurant's fee
/// schedule.
pub const SERVICE_FEE_PERCENT: i64 = 5;

/// A priced line used as pricing input: unit price snapshot and quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineItem {
    pub unit_price: Money,
    pub quantity: u32,
}

impl LineItem {
    pub fn new(unit_price: Money, quantity: u32) -> Self {
        Self { unit_price, quantity }
    }

    /// Line total: unit price times quantity.
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// Derived monetary totals for a cart or order.
///
/// Invariant: `total == subtotal + delivery_fee + service_fee`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub service_fee: Money,
    pub total: Money,
}

/// Computes subtotal, service fee, and grand total for a set of line items
/// and a restaurant's delivery fee.
///
/// Degenerate case: an empty item set yields subtotal 0, service fee 0, and
/// total equal to the delivery fee (empty-cart checkout is rejected upstream
/// before this matters).
pub fn compute_totals<I>(line_items: I, delivery_fee: Money) -> Totals
where
    I: IntoIterator<Item = LineItem>,
{
    let subtotal: Money = line_items.into_iter().map(|li| li.line_total()).sum();
    let service_fee = subtotal.percent(SERVICE_FEE_PERCENT);
    let total = subtotal + delivery_fee + service_fee;

    Totals {
        subtotal,
        delivery_fee,
        service_fee,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_a() {
        // price 20000 x2 plus price 15000 x1, delivery fee 5000
        let totals = compute_totals(
            [
                LineItem::new(Money::from_minor(20000), 2),
                LineItem::new(Money::from_minor(15000), 1),
            ],
            Money::from_minor(5000),
        );
        assert_eq!(totals.subtotal.minor(), 55000);
        assert_eq!(totals.service_fee.minor(), 2750);
        assert_eq!(totals.total.minor(), 62750);
    }

    #[test]
    fn test_total_invariant_holds() {
        let totals = compute_totals(
            [LineItem::new(Money::from_minor(1234), 3)],
            Money::from_minor(700),
        );
        assert_eq!(
            totals.total,
            totals.subtotal + totals.delivery_fee + totals.service_fee
        );
    }

    #[test]
    fn test_service_fee_is_five_percent_rounded() {
        let totals = compute_totals(
            [LineItem::new(Money::from_minor(29), 1)],
            Money::zero(),
        );
        // 5% of 29 = 1.45 -> 1
        assert_eq!(totals.service_fee.minor(), 1);

        let totals = compute_totals(
            [LineItem::new(Money::from_minor(30), 1)],
            Money::zero(),
        );
        // 5% of 30 = 1.5 -> 2
        assert_eq!(totals.service_fee.minor(), 2);
    }

    #[test]
    fn test_empty_item_set() {
        let totals = compute_totals([], Money::from_minor(5000));
        assert_eq!(totals.subtotal, Money::zero());
        assert_eq!(totals.service_fee, Money::zero());
        assert_eq!(totals.total.minor(), 5000);
    }

    #[test]
    fn test_line_total() {
        let li = LineItem::new(Money::from_minor(20000), 2);
        assert_eq!(li.line_total().minor(), 40000);
    }
}
