//! Prediction aggregation.
//!
//! Folds the per-modality predictions into a [`ConfidenceLedger`] and picks
//! the best-supported canonical label. Pure and single-pass; no I/O.

use crate::analysis::ledger::{ConfidenceLedger, LedgerEntry};
use crate::error::AggregationError;
use crate::models::{Diagnosis, ModalityPrediction};

/// Reconcile the OCT and Fundus predictions into one diagnosis.
///
/// An absent prediction contributes nothing. OCT is folded first, so on an
/// exact tie between two labels the OCT-derived one wins.
pub fn aggregate(
    oct: Option<ModalityPrediction>,
    fundus: Option<ModalityPrediction>,
) -> Result<Diagnosis, AggregationError> {
    aggregate_all(oct.into_iter().chain(fundus))
}

/// Same as [`aggregate`] over any number of predictions, folded in iteration order.
pub fn aggregate_all<I>(predictions: I) -> Result<Diagnosis, AggregationError>
where
    I: IntoIterator<Item = ModalityPrediction>,
{
    let ledger: ConfidenceLedger = predictions.into_iter().collect();
    decide(&ledger)
}

/// Select the winning entry of an already-built ledger.
pub fn decide(ledger: &ConfidenceLedger) -> Result<Diagnosis, AggregationError> {
    let winner = select(ledger).ok_or(AggregationError::NoValidPredictions)?;

    Ok(Diagnosis {
        label: winner.label(),
        confidence: winner.confidence(),
        contributing_modalities: winner.contributors().clone(),
    })
}

/// Highest normalized confidence; earlier entries win ties.
fn select(ledger: &ConfidenceLedger) -> Option<&LedgerEntry> {
    ledger.entries().iter().fold(None, |best, entry| match best {
        Some(b) if b.confidence() >= entry.confidence() => Some(b),
        _ => Some(entry),
    })
}

/// Ledger entries sorted by normalized confidence, highest first.
///
/// The sort is stable, so ties keep discovery order.
pub fn ranked(ledger: &ConfidenceLedger) -> Vec<&LedgerEntry> {
    let mut entries: Vec<&LedgerEntry> = ledger.entries().iter().collect();
    entries.sort_by(|a, b| {
        b.confidence()
            .partial_cmp(&a.confidence())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    entries
}
