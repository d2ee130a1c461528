//! Aggregates module
pub mod bill;

pub use bill::{Bill, BillError};
