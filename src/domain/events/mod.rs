//! Domain events
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::PaymentStatus;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DomainEvent {
    Bill(BillEvent),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BillEvent {
    Created { bill_id: String, bill_number: String, total: Decimal },
    PaymentRecorded { bill_id: String, amount: Decimal, due_amount: Decimal, status: PaymentStatus },
}

impl DomainEvent {
    /// NATS subject the event is published under.
    pub fn subject(&self) -> &'static str {
        match self {
            DomainEvent::Bill(BillEvent::Created { .. }) => "billing.bill.created",
            DomainEvent::Bill(BillEvent::PaymentRecorded { .. }) => "billing.bill.payment_recorded",
        }
    }
}
