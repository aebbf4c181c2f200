//! Classifier adapters.
//!
//! An adapter wraps one black-box backend for one modality: it decodes the
//! image, runs inference, and turns the score vector into a
//! [`ModalityPrediction`] via arg-max.

pub mod backend;
pub mod tensor;

pub use backend::{ClassifierBackend, TfServingBackend, TfServingConfig};
pub use tensor::ImageTensor;

use crate::error::PredictionError;
use crate::models::{Modality, ModalityLabel, ModalityPrediction};
use anyhow::Result;
use tracing::{debug, info};

/// One modality's classifier plus the class order of its output layer.
pub struct ClassifierAdapter {
    modality: Modality,
    class_names: Vec<ModalityLabel>,
    target_size: u32,
    backend: Box<dyn ClassifierBackend>,
}

impl ClassifierAdapter {
    /// Build an adapter. Fails if the class list is empty, repeats a label,
    /// or names a label outside the modality's vocabulary.
    pub fn new(
        modality: Modality,
        class_names: Vec<ModalityLabel>,
        target_size: u32,
        backend: Box<dyn ClassifierBackend>,
    ) -> Result<Self> {
        anyhow::ensure!(
            !class_names.is_empty(),
            "{} classifier needs at least one class name",
            modality
        );
        anyhow::ensure!(target_size > 0, "Target image size must be at least 1");

        for (i, label) in class_names.iter().enumerate() {
            anyhow::ensure!(
                modality.vocabulary().contains(label),
                "Class {} is not part of the {} vocabulary",
                label,
                modality
            );
            anyhow::ensure!(
                !class_names[..i].contains(label),
                "Class {} is listed twice for {}",
                label,
                modality
            );
        }

        info!(
            "{} classifier ready: {} ({} classes)",
            modality,
            backend.describe(),
            class_names.len()
        );

        Ok(Self {
            modality,
            class_names,
            target_size,
            backend,
        })
    }

    pub fn modality(&self) -> Modality {
        self.modality
    }

    /// Classify one image.
    ///
    /// Every failure (decode, inference, malformed distribution) comes back as
    /// a [`PredictionError`]. No retries.
    pub async fn predict(&self, image: &[u8]) -> Result<ModalityPrediction, PredictionError> {
        let tensor = ImageTensor::from_image_bytes(image, self.target_size).map_err(|e| {
            PredictionError::Decode {
                modality: self.modality,
                reason: e.to_string(),
            }
        })?;

        let scores = self
            .backend
            .infer(&tensor)
            .await
            .map_err(|e| PredictionError::Inference {
                modality: self.modality,
                reason: format!("{:#}", e),
            })?;
        drop(tensor);

        if scores.len() != self.class_names.len() {
            return Err(PredictionError::ShapeMismatch {
                modality: self.modality,
                expected: self.class_names.len(),
                actual: scores.len(),
            });
        }

        let (index, probability) =
            arg_max(&scores).map_err(|reason| PredictionError::InvalidDistribution {
                modality: self.modality,
                reason,
            })?;

        let prediction =
            ModalityPrediction::new(self.modality, self.class_names[index], probability as f64)?;
        debug!(
            "{} predicted {} ({:.4})",
            self.modality,
            prediction.label(),
            prediction.confidence()
        );

        Ok(prediction)
    }
}

/// Index and value of the largest score. The first maximum wins on ties.
pub fn arg_max(scores: &[f32]) -> Result<(usize, f32), String> {
    if let Some(bad) = scores.iter().find(|s| !s.is_finite()) {
        return Err(format!("non-finite score {}", bad));
    }

    scores
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, s)| match best {
            Some((_, b)) if b >= s => best,
            _ => Some((i, s)),
        })
        .ok_or_else(|| "empty distribution".to_string())
}
