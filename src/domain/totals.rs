//! Bill total engine
//!
//! Pure derivation of a bill's payable amounts from its line items and charge
//! configuration. No I/O and no failure path: missing or unresolvable inputs
//! degrade to zero so a bill under construction always has a total. Both the
//! client preview and the server-side authoritative calculation go through
//! this one function, so the two agree under the same rounding rule.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{ChargeSpec, PaymentStatus, TaxMode};

/// A single line on a bill. The line total is always derived from unit price
/// and quantity, never stored independently of them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BillItem {
    pub product_id: String,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl BillItem {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Charge configuration for one bill, independent of its items.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BillCharges {
    pub tax_mode: TaxMode,
    pub discount: ChargeSpec,
    pub tax: ChargeSpec,
    pub shipment: Decimal,
    pub installation: Decimal,
    /// Organization-level fallback, used only when `tax` supplies neither
    /// an amount nor a percentage.
    pub default_tax_percentage: Option<Decimal>,
}

/// Derived amounts for a bill. Ephemeral: recomputed on every mutation and
/// never accepted as input.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BillTotals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub due_amount: Decimal,
    pub payment_status: PaymentStatus,
}

/// One decimal place, midpoint away from zero. Every stored or displayed
/// bill total goes through this; see DESIGN.md before changing the scale.
pub fn round1(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
}

/// Compute the full totals record for a bill.
///
/// Resolution order for each charge: absolute amount, then percentage against
/// its base (subtotal for the discount, subtotal minus discount for tax), then
/// the organization default for tax only, then zero. Tax is gated entirely by
/// `tax_mode`. The discount is deliberately not clamped against the subtotal;
/// only the due amount is floored at zero.
pub fn compute(items: &[BillItem], charges: &BillCharges, paid_amount: Decimal) -> BillTotals {
    let subtotal: Decimal = items.iter().map(BillItem::line_total).sum();

    let discount = charges.discount.resolve(subtotal).unwrap_or(Decimal::ZERO);

    let tax = match charges.tax_mode {
        TaxMode::WithoutTax => Decimal::ZERO,
        TaxMode::WithTax => {
            let base = subtotal - discount;
            charges
                .tax
                .resolve(base)
                .or_else(|| charges.default_tax_percentage.map(|p| base * p / Decimal::from(100)))
                .unwrap_or(Decimal::ZERO)
        }
    };

    let total = round1(subtotal - discount + tax + charges.shipment + charges.installation);
    let due_amount = round1((total - paid_amount).max(Decimal::ZERO));

    let payment_status = if paid_amount <= Decimal::ZERO {
        PaymentStatus::Pending
    } else if paid_amount >= total {
        PaymentStatus::Paid
    } else {
        PaymentStatus::Partial
    };

    BillTotals { subtotal, discount, tax, total, due_amount, payment_status }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, price: i64, qty: u32) -> BillItem {
        BillItem { product_id: id.into(), name: format!("Item {id}"), unit_price: Decimal::from(price), quantity: qty }
    }

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_reference_bill() {
        // 2x500 + 1x1000, 10% discount, 18% tax, 50 shipment, 1000 paid.
        let items = vec![item("P1", 500, 2), item("P2", 1000, 1)];
        let charges = BillCharges {
            tax_mode: TaxMode::WithTax,
            discount: ChargeSpec::percent(Decimal::from(10)),
            tax: ChargeSpec::percent(Decimal::from(18)),
            shipment: Decimal::from(50),
            ..Default::default()
        };
        let totals = compute(&items, &charges, Decimal::from(1000));
        assert_eq!(totals.subtotal, Decimal::from(2000));
        assert_eq!(totals.discount, Decimal::from(200));
        assert_eq!(totals.tax, Decimal::from(324));
        assert_eq!(totals.total, dec("2174.0"));
        assert_eq!(totals.due_amount, dec("1174.0"));
        assert_eq!(totals.payment_status, PaymentStatus::Partial);
    }

    #[test]
    fn test_empty_bill_is_pending() {
        let totals = compute(&[], &BillCharges::default(), Decimal::ZERO);
        assert_eq!(totals.subtotal, Decimal::ZERO);
        assert_eq!(totals.total, dec("0.0"));
        assert_eq!(totals.due_amount, dec("0.0"));
        assert_eq!(totals.payment_status, PaymentStatus::Pending);
    }

    #[test]
    fn test_subtotal_is_order_independent() {
        let a = vec![item("P1", 500, 2), item("P2", 1000, 1), item("P3", 333, 3)];
        let b = vec![a[2].clone(), a[0].clone(), a[1].clone()];
        let charges = BillCharges::default();
        assert_eq!(compute(&a, &charges, Decimal::ZERO), compute(&b, &charges, Decimal::ZERO));
    }

    #[test]
    fn test_without_tax_ignores_tax_spec() {
        let items = vec![item("P1", 1000, 1)];
        let charges = BillCharges {
            tax_mode: TaxMode::WithoutTax,
            tax: ChargeSpec::percent(Decimal::from(18)),
            default_tax_percentage: Some(Decimal::from(12)),
            ..Default::default()
        };
        let totals = compute(&items, &charges, Decimal::ZERO);
        assert_eq!(totals.tax, Decimal::ZERO);
        assert_eq!(totals.total, dec("1000.0"));
    }

    #[test]
    fn test_tax_falls_back_to_org_default() {
        let items = vec![item("P1", 1000, 2)];
        let charges = BillCharges {
            tax_mode: TaxMode::WithTax,
            default_tax_percentage: Some(Decimal::from(12)),
            ..Default::default()
        };
        let totals = compute(&items, &charges, Decimal::ZERO);
        assert_eq!(totals.tax, Decimal::from(240));
    }

    #[test]
    fn test_tax_spec_beats_org_default() {
        let items = vec![item("P1", 1000, 1)];
        let charges = BillCharges {
            tax_mode: TaxMode::WithTax,
            tax: ChargeSpec::absolute(Decimal::from(75)),
            default_tax_percentage: Some(Decimal::from(12)),
            ..Default::default()
        };
        assert_eq!(compute(&items, &charges, Decimal::ZERO).tax, Decimal::from(75));
    }

    #[test]
    fn test_discount_amount_beats_percentage() {
        let items = vec![item("P1", 1000, 2)];
        let charges = BillCharges {
            discount: ChargeSpec { amount: Some(Decimal::from(300)), percentage: Some(Decimal::from(50)) },
            tax_mode: TaxMode::WithoutTax,
            ..Default::default()
        };
        assert_eq!(compute(&items, &charges, Decimal::ZERO).discount, Decimal::from(300));
    }

    #[test]
    fn test_tax_applies_after_discount() {
        let items = vec![item("P1", 1000, 2)];
        let charges = BillCharges {
            tax_mode: TaxMode::WithTax,
            discount: ChargeSpec::absolute(Decimal::from(200)),
            tax: ChargeSpec::percent(Decimal::from(10)),
            ..Default::default()
        };
        // (2000 - 200) * 10%
        assert_eq!(compute(&items, &charges, Decimal::ZERO).tax, Decimal::from(180));
    }

    #[test]
    fn test_overpayment_floors_due_at_zero() {
        let items = vec![item("P1", 500, 1)];
        let totals = compute(&items, &BillCharges { tax_mode: TaxMode::WithoutTax, ..Default::default() }, Decimal::from(800));
        assert_eq!(totals.due_amount, dec("0.0"));
        assert_eq!(totals.payment_status, PaymentStatus::Paid);
    }

    #[test]
    fn test_exact_payment_is_paid() {
        let items = vec![item("P1", 500, 1)];
        let charges = BillCharges { tax_mode: TaxMode::WithoutTax, ..Default::default() };
        let totals = compute(&items, &charges, Decimal::from(500));
        assert_eq!(totals.payment_status, PaymentStatus::Paid);
        assert_eq!(totals.due_amount, dec("0.0"));
    }

    #[test]
    fn test_status_boundaries() {
        let items = vec![item("P1", 500, 1)];
        let charges = BillCharges { tax_mode: TaxMode::WithoutTax, ..Default::default() };
        assert_eq!(compute(&items, &charges, Decimal::ZERO).payment_status, PaymentStatus::Pending);
        assert_eq!(compute(&items, &charges, dec("0.1")).payment_status, PaymentStatus::Partial);
        assert_eq!(compute(&items, &charges, dec("499.9")).payment_status, PaymentStatus::Partial);
        assert_eq!(compute(&items, &charges, Decimal::from(500)).payment_status, PaymentStatus::Paid);
    }

    #[test]
    fn test_discount_exceeding_subtotal_is_not_clamped() {
        let items = vec![item("P1", 1000, 2)];
        let charges = BillCharges {
            tax_mode: TaxMode::WithoutTax,
            discount: ChargeSpec::absolute(Decimal::from(2500)),
            ..Default::default()
        };
        let totals = compute(&items, &charges, Decimal::ZERO);
        assert_eq!(totals.discount, Decimal::from(2500));
        assert_eq!(totals.total, dec("-500.0"));
        assert_eq!(totals.due_amount, dec("0.0"));
    }

    #[test]
    fn test_flat_charges_are_additive() {
        let items = vec![item("P1", 100, 1)];
        let base = BillCharges { tax_mode: TaxMode::WithoutTax, ..Default::default() };
        let with_ship = BillCharges { shipment: Decimal::from(40), ..base.clone() };
        let with_both = BillCharges { installation: Decimal::from(60), ..with_ship.clone() };
        let t0 = compute(&items, &base, Decimal::ZERO).total;
        let t1 = compute(&items, &with_ship, Decimal::ZERO).total;
        let t2 = compute(&items, &with_both, Decimal::ZERO).total;
        assert!(t0 <= t1 && t1 <= t2);
        assert_eq!(t2, dec("200.0"));
    }

    #[test]
    fn test_total_rounds_to_one_decimal() {
        // 3 x 33.33 = 99.99 -> 100.0 at one decimal place.
        let items = vec![BillItem { product_id: "P1".into(), name: "Chair".into(), unit_price: dec("33.33"), quantity: 3 }];
        let totals = compute(&items, &BillCharges { tax_mode: TaxMode::WithoutTax, ..Default::default() }, Decimal::ZERO);
        assert_eq!(totals.subtotal, dec("99.99"));
        assert_eq!(totals.total, dec("100.0"));
    }

    #[test]
    fn test_round1_midpoint_goes_away_from_zero() {
        assert_eq!(round1(dec("2.25")), dec("2.3"));
        assert_eq!(round1(dec("-2.25")), dec("-2.3"));
        assert_eq!(round1(dec("2.24")), dec("2.2"));
    }

    #[test]
    fn test_recomputation_is_stable() {
        let items = vec![BillItem { product_id: "P1".into(), name: "Sofa".into(), unit_price: dec("1234.56"), quantity: 7 }];
        let charges = BillCharges {
            tax_mode: TaxMode::WithTax,
            discount: ChargeSpec::percent(dec("7.5")),
            tax: ChargeSpec::percent(Decimal::from(18)),
            shipment: dec("99.9"),
            ..Default::default()
        };
        let first = compute(&items, &charges, dec("5000"));
        for _ in 0..10 {
            assert_eq!(compute(&items, &charges, dec("5000")), first);
        }
    }
}
