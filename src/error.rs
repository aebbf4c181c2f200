//! Error types for the diagnosis core and its input boundary.

use crate::models::{Modality, ModalityLabel};
use std::path::PathBuf;
use thiserror::Error;

/// One modality's classifier could not produce a prediction.
///
/// Never fatal to a request: the pipeline treats it as "no contribution".
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictionError {
    #[error("{modality} image could not be decoded: {reason}")]
    Decode { modality: Modality, reason: String },

    #[error("{modality} classifier returned {actual} scores, expected {expected}")]
    ShapeMismatch {
        modality: Modality,
        expected: usize,
        actual: usize,
    },

    #[error("{modality} classifier returned an invalid distribution: {reason}")]
    InvalidDistribution { modality: Modality, reason: String },

    #[error("{modality} inference failed: {reason}")]
    Inference { modality: Modality, reason: String },

    #[error("label {label} is not in the {modality} vocabulary")]
    LabelOutsideVocabulary {
        modality: Modality,
        label: ModalityLabel,
    },
}

impl PredictionError {
    pub fn modality(&self) -> Modality {
        match self {
            PredictionError::Decode { modality, .. }
            | PredictionError::ShapeMismatch { modality, .. }
            | PredictionError::InvalidDistribution { modality, .. }
            | PredictionError::Inference { modality, .. }
            | PredictionError::LabelOutsideVocabulary { modality, .. } => *modality,
        }
    }
}

/// Aggregation could not select a diagnosis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AggregationError {
    #[error("No valid predictions from uploaded images.")]
    NoValidPredictions,
}

/// Rejected input, detected before any classifier runs.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("Please upload both OCT and Fundus images.")]
    NotProvided { modality: Modality },

    #[error("Both OCT and Fundus files are required. {modality} file not found: {}", .path.display())]
    NotFound { modality: Modality, path: PathBuf },

    #[error("Allowed file types are {}.", .allowed.join(", "))]
    DisallowedExtension {
        modality: Modality,
        path: PathBuf,
        allowed: Vec<String>,
    },

    #[error("Failed to read {modality} image {}: {source}", .path.display())]
    Unreadable {
        modality: Modality,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl InputError {
    /// Which of the two image roles was rejected.
    pub fn modality(&self) -> Modality {
        match self {
            InputError::NotProvided { modality }
            | InputError::NotFound { modality, .. }
            | InputError::DisallowedExtension { modality, .. }
            | InputError::Unreadable { modality, .. } => *modality,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prediction_error_reports_modality() {
        let err = PredictionError::ShapeMismatch {
            modality: Modality::Fundus,
            expected: 4,
            actual: 8,
        };
        assert_eq!(err.modality(), Modality::Fundus);
        assert_eq!(err.to_string(), "Fundus classifier returned 8 scores, expected 4");
    }

    #[test]
    fn test_input_error_messages() {
        let err = InputError::DisallowedExtension {
            modality: Modality::Oct,
            path: PathBuf::from("scan.gif"),
            allowed: vec!["png".into(), "jpg".into(), "jpeg".into()],
        };
        assert_eq!(err.to_string(), "Allowed file types are png, jpg, jpeg.");

        let err = InputError::NotProvided {
            modality: Modality::Fundus,
        };
        assert_eq!(err.to_string(), "Please upload both OCT and Fundus images.");
    }

    #[test]
    fn test_aggregation_error_message() {
        assert_eq!(
            AggregationError::NoValidPredictions.to_string(),
            "No valid predictions from uploaded images."
        );
    }
}
