//! Per-request confidence ledger.
//!
//! Each entry is a tagged accumulator: the raw sum of every confidence folded
//! into a canonical label, plus which modalities supplied it. The reported
//! confidence is the mean over contributions, so a label seen by a single
//! modality keeps that modality's raw value.

use crate::models::{DiseaseLabel, Modality, ModalityPrediction};
use std::collections::BTreeSet;

/// Accumulated evidence for one canonical label.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    label: DiseaseLabel,
    sum: f64,
    contributions: usize,
    contributors: BTreeSet<Modality>,
}

impl LedgerEntry {
    fn new(label: DiseaseLabel) -> Self {
        Self {
            label,
            sum: 0.0,
            contributions: 0,
            contributors: BTreeSet::new(),
        }
    }

    pub fn label(&self) -> DiseaseLabel {
        self.label
    }

    /// Raw sum before normalization.
    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn contributors(&self) -> &BTreeSet<Modality> {
        &self.contributors
    }

    /// Normalized confidence: the mean when several modalities agree,
    /// otherwise the single raw value.
    pub fn confidence(&self) -> f64 {
        if self.contributions > 1 {
            self.sum / self.contributions as f64
        } else {
            self.sum
        }
    }
}

/// Canonical label -> accumulated confidence, in order of discovery.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfidenceLedger {
    entries: Vec<LedgerEntry>,
}

impl ConfidenceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one prediction under its canonical label, creating the entry at 0 if absent.
    pub fn fold(&mut self, prediction: &ModalityPrediction) {
        let label = prediction.canonical_label();

        let index = match self.entries.iter().position(|e| e.label == label) {
            Some(i) => i,
            None => {
                self.entries.push(LedgerEntry::new(label));
                self.entries.len() - 1
            }
        };

        let entry = &mut self.entries[index];
        entry.sum += prediction.confidence();
        entry.contributions += 1;
        entry.contributors.insert(prediction.modality());
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, label: DiseaseLabel) -> Option<&LedgerEntry> {
        self.entries.iter().find(|e| e.label == label)
    }

    /// Entries in the order their labels were first seen.
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }
}

impl FromIterator<ModalityPrediction> for ConfidenceLedger {
    fn from_iter<I: IntoIterator<Item = ModalityPrediction>>(iter: I) -> Self {
        let mut ledger = ConfidenceLedger::new();
        for prediction in iter {
            ledger.fold(&prediction);
        }
        ledger
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModalityLabel;

    fn prediction(modality: Modality, label: ModalityLabel, confidence: f64) -> ModalityPrediction {
        ModalityPrediction::new(modality, label, confidence).unwrap()
    }

    #[test]
    fn test_single_contribution_keeps_raw_value() {
        let mut ledger = ConfidenceLedger::new();
        ledger.fold(&prediction(Modality::Fundus, ModalityLabel::Csr, 0.55));

        let entry = ledger.get(DiseaseLabel::Csr).unwrap();
        assert_eq!(entry.sum(), 0.55);
        assert_eq!(entry.confidence(), 0.55);
        assert_eq!(entry.contributors().len(), 1);
    }

    #[test]
    fn test_dual_contribution_is_averaged() {
        let mut ledger = ConfidenceLedger::new();
        ledger.fold(&prediction(Modality::Oct, ModalityLabel::Amd, 0.9));
        ledger.fold(&prediction(Modality::Fundus, ModalityLabel::Armd, 0.5));

        assert_eq!(ledger.len(), 1);
        let entry = ledger.get(DiseaseLabel::Amd).unwrap();
        assert!((entry.sum() - 1.4).abs() < 1e-12);
        assert!((entry.confidence() - 0.7).abs() < 1e-12);
        assert_eq!(
            entry.contributors().iter().copied().collect::<Vec<_>>(),
            vec![Modality::Oct, Modality::Fundus]
        );
    }

    #[test]
    fn test_dual_contribution_below_one_is_still_averaged() {
        let ledger: ConfidenceLedger = [
            prediction(Modality::Oct, ModalityLabel::Mh, 0.3),
            prediction(Modality::Fundus, ModalityLabel::Mh, 0.4),
        ]
        .into_iter()
        .collect();

        let entry = ledger.get(DiseaseLabel::Mh).unwrap();
        assert!((entry.confidence() - 0.35).abs() < 1e-12);
    }

    #[test]
    fn test_only_produced_labels_are_present() {
        let ledger: ConfidenceLedger = [
            prediction(Modality::Oct, ModalityLabel::Normal, 0.99),
            prediction(Modality::Fundus, ModalityLabel::Armd, 0.6),
        ]
        .into_iter()
        .collect();

        let labels: Vec<_> = ledger.entries().iter().map(|e| e.label()).collect();
        assert_eq!(labels, vec![DiseaseLabel::Normal, DiseaseLabel::Amd]);
        assert!(ledger.get(DiseaseLabel::Dr).is_none());
    }

    #[test]
    fn test_empty_ledger() {
        let ledger = ConfidenceLedger::new();
        assert!(ledger.is_empty());
        assert_eq!(ledger.len(), 0);
    }
}
