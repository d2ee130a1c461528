//! Furnistore Billing & Catalog
//!
//! Self-hosted billing service for a furniture storefront.
//!
//! ## Features
//! - Bill total engine: one pure function from line items and charges to
//!   subtotal, discount, tax, total, due amount, and payment status
//! - Bill aggregate with merge-on-add line items and payment recording
//! - GST-style tax gating with an organization-level default percentage
//! - Amount-in-words and Indian digit grouping for printed invoices
//! - Product and category catalog

pub mod domain;
pub mod format;

pub use domain::aggregates::{Bill, BillError};
pub use domain::events::{BillEvent, DomainEvent};
pub use domain::totals::{compute, round1, BillCharges, BillItem, BillTotals};
pub use domain::value_objects::{ChargeSpec, PaymentStatus, TaxMode};
