//! Billing domain
pub mod aggregates;
pub mod events;
pub mod totals;
pub mod value_objects;
