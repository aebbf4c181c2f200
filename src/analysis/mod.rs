//! Multi-model aggregation.
//!
//! Reconciles per-modality predictions onto the canonical vocabulary and
//! selects a single diagnosis.

pub mod aggregator;
pub mod ledger;

pub use aggregator::*;
pub use ledger::{ConfidenceLedger, LedgerEntry};
