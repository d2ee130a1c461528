//! Value objects for billing

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A discount or tax, expressed as either an absolute amount or a percentage
/// of some base value. The two forms are mutually exclusive: the setters clear
/// the opposite field, and when both are populated anyway (direct struct
/// construction), `amount` wins.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChargeSpec {
    pub amount: Option<Decimal>,
    pub percentage: Option<Decimal>,
}

impl ChargeSpec {
    pub fn none() -> Self { Self::default() }
    pub fn absolute(amount: Decimal) -> Self { Self { amount: Some(amount), percentage: None } }
    pub fn percent(percentage: Decimal) -> Self { Self { amount: None, percentage: Some(percentage) } }

    pub fn set_amount(&mut self, amount: Decimal) {
        self.amount = Some(amount);
        self.percentage = None;
    }

    pub fn set_percentage(&mut self, percentage: Decimal) {
        self.percentage = Some(percentage);
        self.amount = None;
    }

    pub fn is_empty(&self) -> bool { self.amount.is_none() && self.percentage.is_none() }

    /// Resolve the charge against a base. Returns `None` only when neither
    /// form is supplied, so callers can fall through to a default.
    pub fn resolve(&self, base: Decimal) -> Option<Decimal> {
        if let Some(amount) = self.amount {
            Some(amount)
        } else {
            self.percentage.map(|p| base * p / Decimal::from(100))
        }
    }
}

/// Whether tax applies to a bill at all.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxMode {
    #[default]
    WithTax,
    WithoutTax,
}

impl TaxMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WithTax => "with_tax",
            Self::WithoutTax => "without_tax",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "with_tax" => Some(Self::WithTax),
            "without_tax" => Some(Self::WithoutTax),
            _ => None,
        }
    }
}

impl fmt::Display for TaxMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.as_str()) }
}

/// Tri-state payment classification derived from paid vs. total amount.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Paid,
    Partial,
    #[default]
    Pending,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::Partial => "partial",
            Self::Pending => "pending",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "paid" => Some(Self::Paid),
            "partial" => Some(Self::Partial),
            "pending" => Some(Self::Pending),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.as_str()) }
}
