//! Bill Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::events::{BillEvent, DomainEvent};
use crate::domain::totals::{self, BillCharges, BillItem, BillTotals};
use crate::domain::value_objects::{ChargeSpec, PaymentStatus, TaxMode};

/// A sales bill under construction or settlement. Items, charges, and payment
/// state are the inputs; the totals record is derived and refreshed on every
/// mutation.
#[derive(Clone, Debug)]
pub struct Bill {
    id: String,
    bill_number: String,
    org_id: String,
    customer_name: String,
    customer_phone: Option<String>,
    items: Vec<BillItem>,
    charges: BillCharges,
    paid_amount: Decimal,
    totals: BillTotals,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    events: Vec<DomainEvent>,
}

#[derive(Debug, Clone, Error)]
pub enum BillError {
    #[error("item not found on bill")]
    ItemNotFound,
}

impl Bill {
    pub fn create(
        bill_number: impl Into<String>,
        org_id: impl Into<String>,
        customer_name: impl Into<String>,
        tax_mode: TaxMode,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            bill_number: bill_number.into(),
            org_id: org_id.into(),
            customer_name: customer_name.into(),
            customer_phone: None,
            items: vec![],
            charges: BillCharges { tax_mode, ..Default::default() },
            paid_amount: Decimal::ZERO,
            totals: BillTotals::default(),
            created_at: now,
            updated_at: now,
            events: vec![],
        }
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn bill_number(&self) -> &str { &self.bill_number }
    pub fn org_id(&self) -> &str { &self.org_id }
    pub fn customer_name(&self) -> &str { &self.customer_name }
    pub fn customer_phone(&self) -> Option<&str> { self.customer_phone.as_deref() }
    pub fn items(&self) -> &[BillItem] { &self.items }
    pub fn charges(&self) -> &BillCharges { &self.charges }
    pub fn paid_amount(&self) -> Decimal { self.paid_amount }
    pub fn totals(&self) -> &BillTotals { &self.totals }
    pub fn payment_status(&self) -> PaymentStatus { self.totals.payment_status }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    pub fn set_customer_phone(&mut self, phone: impl Into<String>) {
        self.customer_phone = Some(phone.into());
        self.touch();
    }

    /// Adding a product already on the bill increments its quantity; a bill
    /// never holds two lines for the same product.
    pub fn add_item(&mut self, item: BillItem) {
        if let Some(existing) = self.items.iter_mut().find(|i| i.product_id == item.product_id) {
            existing.quantity += item.quantity;
        } else {
            self.items.push(item);
        }
        self.recalculate();
    }

    pub fn increment_item(&mut self, product_id: &str) -> Result<(), BillError> {
        let item = self.items.iter_mut().find(|i| i.product_id == product_id).ok_or(BillError::ItemNotFound)?;
        item.quantity += 1;
        self.recalculate();
        Ok(())
    }

    /// Decrementing a line at quantity 1 removes it from the bill.
    pub fn decrement_item(&mut self, product_id: &str) -> Result<(), BillError> {
        let item = self.items.iter_mut().find(|i| i.product_id == product_id).ok_or(BillError::ItemNotFound)?;
        if item.quantity <= 1 {
            self.items.retain(|i| i.product_id != product_id);
        } else {
            item.quantity -= 1;
        }
        self.recalculate();
        Ok(())
    }

    pub fn update_quantity(&mut self, product_id: &str, quantity: u32) -> Result<(), BillError> {
        let item = self.items.iter_mut().find(|i| i.product_id == product_id).ok_or(BillError::ItemNotFound)?;
        if quantity == 0 {
            self.items.retain(|i| i.product_id != product_id);
        } else {
            item.quantity = quantity;
        }
        self.recalculate();
        Ok(())
    }

    pub fn remove_item(&mut self, product_id: &str) -> Result<(), BillError> {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        if self.items.len() == before {
            return Err(BillError::ItemNotFound);
        }
        self.recalculate();
        Ok(())
    }

    pub fn clear_items(&mut self) {
        self.items.clear();
        self.recalculate();
    }

    pub fn set_discount(&mut self, discount: ChargeSpec) {
        self.charges.discount = discount;
        self.recalculate();
    }

    pub fn set_tax(&mut self, tax: ChargeSpec) {
        self.charges.tax = tax;
        self.recalculate();
    }

    pub fn set_tax_mode(&mut self, mode: TaxMode) {
        self.charges.tax_mode = mode;
        self.recalculate();
    }

    pub fn set_shipment(&mut self, shipment: Decimal) {
        self.charges.shipment = shipment.max(Decimal::ZERO);
        self.recalculate();
    }

    pub fn set_installation(&mut self, installation: Decimal) {
        self.charges.installation = installation.max(Decimal::ZERO);
        self.recalculate();
    }

    pub fn set_default_tax_percentage(&mut self, percentage: Option<Decimal>) {
        self.charges.default_tax_percentage = percentage;
        self.recalculate();
    }

    /// Record an additional payment against the bill.
    pub fn record_payment(&mut self, amount: Decimal) {
        self.paid_amount += amount.max(Decimal::ZERO);
        self.recalculate();
        self.raise_event(DomainEvent::Bill(BillEvent::PaymentRecorded {
            bill_id: self.id.clone(),
            amount,
            due_amount: self.totals.due_amount,
            status: self.totals.payment_status,
        }));
    }

    /// Finalize the bill for persistence, raising the creation event with the
    /// settled total.
    pub fn finalize(&mut self) {
        self.recalculate();
        self.raise_event(DomainEvent::Bill(BillEvent::Created {
            bill_id: self.id.clone(),
            bill_number: self.bill_number.clone(),
            total: self.totals.total,
        }));
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }

    fn recalculate(&mut self) {
        self.totals = totals::compute(&self.items, &self.charges, self.paid_amount);
        self.touch();
    }

    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}
