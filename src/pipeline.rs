//! Request pipeline.
//!
//! [`DiagnosisPipeline`] owns both classifier adapters. It is built once at
//! startup and is read-only afterwards, so one instance can be shared behind
//! an `Arc` by any number of concurrent requests.

use crate::analysis::{aggregate, ConfidenceLedger};
use crate::classifier::{ClassifierAdapter, TfServingBackend, TfServingConfig};
use crate::config::Config;
use crate::error::{AggregationError, PredictionError};
use crate::explanations;
use crate::models::{Diagnosis, Modality, ModalityPrediction};
use anyhow::Result;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Raw bytes of the two images of one request.
#[derive(Debug, Clone, Default)]
pub struct ImagePair {
    pub oct: Vec<u8>,
    pub fundus: Vec<u8>,
}

/// Result of one successful request.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub diagnosis: Diagnosis,
    /// All candidates considered, including losers.
    pub ledger: ConfidenceLedger,
    pub explanation: &'static str,
    /// Modalities that failed and were treated as absent.
    pub failures: BTreeMap<Modality, PredictionError>,
}

pub struct DiagnosisPipeline {
    oct: ClassifierAdapter,
    fundus: ClassifierAdapter,
}

impl DiagnosisPipeline {
    pub fn new(oct: ClassifierAdapter, fundus: ClassifierAdapter) -> Result<Self> {
        anyhow::ensure!(
            oct.modality() == Modality::Oct,
            "OCT slot got a {} classifier",
            oct.modality()
        );
        anyhow::ensure!(
            fundus.modality() == Modality::Fundus,
            "Fundus slot got a {} classifier",
            fundus.modality()
        );

        Ok(Self { oct, fundus })
    }

    /// Build both adapters against TensorFlow Serving backends.
    pub fn from_config(config: &Config) -> Result<Self> {
        let build = |modality: Modality| -> Result<ClassifierAdapter> {
            let model = config.model(modality);
            let backend = TfServingBackend::new(TfServingConfig {
                endpoint: model.endpoint.clone(),
                model_name: model.resolved_model_name(modality),
                timeout_seconds: model.timeout_seconds,
            })?;

            ClassifierAdapter::new(
                modality,
                model.resolved_class_names(modality)?,
                config.image.target_size,
                Box::new(backend),
            )
        };

        Self::new(build(Modality::Oct)?, build(Modality::Fundus)?)
    }

    /// Run both classifiers concurrently and reconcile their outputs.
    ///
    /// A failing classifier only removes its own contribution. The request
    /// fails only when neither produced a prediction.
    pub async fn diagnose(&self, images: &ImagePair) -> Result<Outcome, AggregationError> {
        let (oct, fundus) = futures::join!(
            self.oct.predict(&images.oct),
            self.fundus.predict(&images.fundus)
        );

        let mut failures = BTreeMap::new();
        let oct = absorb(oct, &mut failures);
        let fundus = absorb(fundus, &mut failures);

        let ledger: ConfidenceLedger = oct.into_iter().chain(fundus).collect();
        debug!("Ledger holds {} candidate label(s)", ledger.len());
        for entry in ledger.entries() {
            debug!(
                "  {}: sum {:.4} from {:?}",
                entry.label(),
                entry.sum(),
                entry.contributors()
            );
        }

        let diagnosis = match aggregate(oct, fundus) {
            Ok(diagnosis) => diagnosis,
            Err(e) => {
                warn!("{}", e);
                return Err(e);
            }
        };

        info!(
            "Diagnosis: {} ({:.4}) from {:?}",
            diagnosis.label, diagnosis.confidence, diagnosis.contributing_modalities
        );

        Ok(Outcome {
            explanation: explanations::explain(diagnosis.label),
            diagnosis,
            ledger,
            failures,
        })
    }
}

/// Turn a classifier failure into "no contribution", remembering why.
fn absorb(
    result: Result<ModalityPrediction, PredictionError>,
    failures: &mut BTreeMap<Modality, PredictionError>,
) -> Option<ModalityPrediction> {
    match result {
        Ok(prediction) => Some(prediction),
        Err(e) => {
            warn!("Ignoring {} prediction: {}", e.modality(), e);
            failures.insert(e.modality(), e);
            None
        }
    }
}
