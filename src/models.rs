//! Data models for the diagnosis pipeline.
//!
//! This module contains the label vocabularies, the per-modality
//! prediction type, the final diagnosis and the serializable report.

use crate::error::PredictionError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Imaging modality, one per classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Modality {
    /// Optical Coherence Tomography scan.
    #[serde(rename = "OCT")]
    Oct,
    /// Fundus photograph.
    #[serde(rename = "Fundus")]
    Fundus,
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modality::Oct => write!(f, "OCT"),
            Modality::Fundus => write!(f, "Fundus"),
        }
    }
}

impl Modality {
    /// All modalities in processing order. OCT is folded first.
    pub const ALL: [Modality; 2] = [Modality::Oct, Modality::Fundus];

    /// The labels this modality's classifier may emit.
    pub fn vocabulary(self) -> &'static [ModalityLabel] {
        match self {
            Modality::Oct => &OCT_VOCABULARY,
            Modality::Fundus => &FUNDUS_VOCABULARY,
        }
    }

    /// Default class order of the trained model's output layer.
    pub fn default_class_names(self) -> Vec<String> {
        let names: &[&str] = match self {
            Modality::Oct => &["AMD", "CNV", "CSR", "DME", "DR", "DRUSEN", "MH", "normal"],
            Modality::Fundus => &["DR", "MH", "ARMD", "CSR"],
        };
        names.iter().map(|s| s.to_string()).collect()
    }

    /// Lowercase key used in config sections and report fields.
    pub fn key(self) -> &'static str {
        match self {
            Modality::Oct => "oct",
            Modality::Fundus => "fundus",
        }
    }
}

/// Canonical diagnosis vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DiseaseLabel {
    /// Age-related macular degeneration
    Amd,
    /// Choroidal neovascularization
    Cnv,
    /// Central serous retinopathy
    Csr,
    /// Diabetic macular edema
    Dme,
    /// Diabetic retinopathy
    Dr,
    Drusen,
    /// Macular hole
    Mh,
    Normal,
}

impl fmt::Display for DiseaseLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl DiseaseLabel {
    pub const ALL: [DiseaseLabel; 8] = [
        DiseaseLabel::Amd,
        DiseaseLabel::Cnv,
        DiseaseLabel::Csr,
        DiseaseLabel::Dme,
        DiseaseLabel::Dr,
        DiseaseLabel::Drusen,
        DiseaseLabel::Mh,
        DiseaseLabel::Normal,
    ];

    /// Short uppercase code, e.g. `AMD`.
    pub fn code(&self) -> &'static str {
        match self {
            DiseaseLabel::Amd => "AMD",
            DiseaseLabel::Cnv => "CNV",
            DiseaseLabel::Csr => "CSR",
            DiseaseLabel::Dme => "DME",
            DiseaseLabel::Dr => "DR",
            DiseaseLabel::Drusen => "DRUSEN",
            DiseaseLabel::Mh => "MH",
            DiseaseLabel::Normal => "NORMAL",
        }
    }
}

/// A label as emitted by one modality's classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ModalityLabel {
    Amd,
    Cnv,
    Csr,
    Dme,
    Dr,
    Drusen,
    Mh,
    Normal,
    /// Fundus spelling of AMD.
    Armd,
}

/// OCT classifier vocabulary (identical to the canonical one).
pub const OCT_VOCABULARY: [ModalityLabel; 8] = [
    ModalityLabel::Amd,
    ModalityLabel::Cnv,
    ModalityLabel::Csr,
    ModalityLabel::Dme,
    ModalityLabel::Dr,
    ModalityLabel::Drusen,
    ModalityLabel::Mh,
    ModalityLabel::Normal,
];

/// Fundus classifier vocabulary.
pub const FUNDUS_VOCABULARY: [ModalityLabel; 4] = [
    ModalityLabel::Dr,
    ModalityLabel::Mh,
    ModalityLabel::Armd,
    ModalityLabel::Csr,
];

impl ModalityLabel {
    /// Map onto the canonical vocabulary. Total: every variant has exactly one target.
    pub fn canonical(self) -> DiseaseLabel {
        match self {
            ModalityLabel::Amd | ModalityLabel::Armd => DiseaseLabel::Amd,
            ModalityLabel::Cnv => DiseaseLabel::Cnv,
            ModalityLabel::Csr => DiseaseLabel::Csr,
            ModalityLabel::Dme => DiseaseLabel::Dme,
            ModalityLabel::Dr => DiseaseLabel::Dr,
            ModalityLabel::Drusen => DiseaseLabel::Drusen,
            ModalityLabel::Mh => DiseaseLabel::Mh,
            ModalityLabel::Normal => DiseaseLabel::Normal,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ModalityLabel::Amd => "AMD",
            ModalityLabel::Cnv => "CNV",
            ModalityLabel::Csr => "CSR",
            ModalityLabel::Dme => "DME",
            ModalityLabel::Dr => "DR",
            ModalityLabel::Drusen => "DRUSEN",
            ModalityLabel::Mh => "MH",
            ModalityLabel::Normal => "NORMAL",
            ModalityLabel::Armd => "ARMD",
        }
    }
}

impl fmt::Display for ModalityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for ModalityLabel {
    type Err = String;

    /// Case-insensitive, so the model's `normal` class parses as `NORMAL`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "AMD" => Ok(ModalityLabel::Amd),
            "CNV" => Ok(ModalityLabel::Cnv),
            "CSR" => Ok(ModalityLabel::Csr),
            "DME" => Ok(ModalityLabel::Dme),
            "DR" => Ok(ModalityLabel::Dr),
            "DRUSEN" => Ok(ModalityLabel::Drusen),
            "MH" => Ok(ModalityLabel::Mh),
            "NORMAL" => Ok(ModalityLabel::Normal),
            "ARMD" => Ok(ModalityLabel::Armd),
            other => Err(format!("Unknown label: {}", other)),
        }
    }
}

/// Output of one classifier adapter for one image.
///
/// Constructed only through [`ModalityPrediction::new`], which enforces that
/// the label belongs to the modality's vocabulary and that the confidence
/// lies in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModalityPrediction {
    modality: Modality,
    label: ModalityLabel,
    confidence: f64,
}

impl ModalityPrediction {
    pub fn new(
        modality: Modality,
        label: ModalityLabel,
        confidence: f64,
    ) -> Result<Self, PredictionError> {
        if !modality.vocabulary().contains(&label) {
            return Err(PredictionError::LabelOutsideVocabulary { modality, label });
        }
        if !(0.0..=1.0).contains(&confidence) {
            return Err(PredictionError::InvalidDistribution {
                modality,
                reason: format!("confidence {} is outside [0, 1]", confidence),
            });
        }

        Ok(Self {
            modality,
            label,
            confidence,
        })
    }

    pub fn modality(&self) -> Modality {
        self.modality
    }

    pub fn label(&self) -> ModalityLabel {
        self.label
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// The label after synonym mapping.
    pub fn canonical_label(&self) -> DiseaseLabel {
        self.label.canonical()
    }
}

/// The reconciled decision.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnosis {
    pub label: DiseaseLabel,
    /// Unrounded, in `[0, 1]`.
    pub confidence: f64,
    pub contributing_modalities: BTreeSet<Modality>,
}

/// Paths of the two input images, echoed back in reports.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImagePaths {
    pub oct: String,
    pub fundus: String,
}

/// One ledger row as shown in reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub label: DiseaseLabel,
    pub confidence: String,
    pub modalities: Vec<Modality>,
}

/// Presentation-level diagnosis report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosisReport {
    /// Winning canonical label.
    pub prediction: DiseaseLabel,
    /// Percentage string with two decimals, e.g. `80.00%`.
    pub confidence: String,
    /// Modalities that contributed to the winning label.
    pub used_models: Vec<Modality>,
    pub explanation: String,
    pub images: ImagePaths,
    /// Every label either modality voted for, in discovery order.
    pub candidates: Vec<Candidate>,
    /// Per-modality failures that were folded into "no contribution".
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub modality_errors: BTreeMap<Modality, String>,
    pub generated_at: DateTime<Utc>,
}

/// Error body returned when no diagnosis can be produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_maps_armd_to_amd() {
        assert_eq!(ModalityLabel::Armd.canonical(), DiseaseLabel::Amd);
    }

    #[test]
    fn test_canonical_is_identity_on_canonical_codes() {
        for label in OCT_VOCABULARY {
            assert_eq!(label.canonical().code(), label.code());
            let again: ModalityLabel = label.canonical().code().parse().unwrap();
            assert_eq!(again.canonical(), label.canonical());
        }
    }

    #[test]
    fn test_every_vocabulary_label_canonicalizes() {
        for modality in Modality::ALL {
            for label in modality.vocabulary() {
                assert!(DiseaseLabel::ALL.contains(&label.canonical()));
            }
        }
    }

    #[test]
    fn test_label_parsing_is_case_insensitive() {
        assert_eq!("normal".parse::<ModalityLabel>(), Ok(ModalityLabel::Normal));
        assert_eq!("Armd".parse::<ModalityLabel>(), Ok(ModalityLabel::Armd));
        assert!("glaucoma".parse::<ModalityLabel>().is_err());
    }

    #[test]
    fn test_default_class_names_parse_into_vocabulary() {
        for modality in Modality::ALL {
            let names = modality.default_class_names();
            assert_eq!(names.len(), modality.vocabulary().len());
            for name in names {
                let label: ModalityLabel = name.parse().unwrap();
                assert!(modality.vocabulary().contains(&label));
            }
        }
    }

    #[test]
    fn test_prediction_rejects_label_outside_vocabulary() {
        let err = ModalityPrediction::new(Modality::Fundus, ModalityLabel::Cnv, 0.5).unwrap_err();
        assert!(matches!(err, PredictionError::LabelOutsideVocabulary { .. }));

        let err = ModalityPrediction::new(Modality::Oct, ModalityLabel::Armd, 0.5).unwrap_err();
        assert!(matches!(err, PredictionError::LabelOutsideVocabulary { .. }));
    }

    #[test]
    fn test_prediction_rejects_confidence_out_of_range() {
        assert!(ModalityPrediction::new(Modality::Oct, ModalityLabel::Dr, 1.2).is_err());
        assert!(ModalityPrediction::new(Modality::Oct, ModalityLabel::Dr, -0.1).is_err());
        assert!(ModalityPrediction::new(Modality::Oct, ModalityLabel::Dr, f64::NAN).is_err());
        assert!(ModalityPrediction::new(Modality::Oct, ModalityLabel::Dr, 1.0).is_ok());
    }

    #[test]
    fn test_serialized_names() {
        assert_eq!(serde_json::to_string(&Modality::Oct).unwrap(), "\"OCT\"");
        assert_eq!(serde_json::to_string(&Modality::Fundus).unwrap(), "\"Fundus\"");
        assert_eq!(serde_json::to_string(&DiseaseLabel::Drusen).unwrap(), "\"DRUSEN\"");
    }

    #[test]
    fn test_modality_ordering() {
        assert!(Modality::Oct < Modality::Fundus);
        assert_eq!(Modality::ALL[0], Modality::Oct);
    }
}
