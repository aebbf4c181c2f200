//! Classifier backends.
//!
//! A backend is a black box that turns an [`ImageTensor`] into a probability
//! distribution over its model's classes. The shipped implementation talks to
//! a TensorFlow Serving REST endpoint.

use crate::classifier::tensor::{ImageTensor, CHANNELS};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Produces one score per class, in the model's output order.
#[async_trait]
pub trait ClassifierBackend: Send + Sync {
    /// Human-readable identifier for logs.
    fn describe(&self) -> String;

    async fn infer(&self, tensor: &ImageTensor) -> Result<Vec<f32>>;
}

/// Connection settings for a TensorFlow Serving model.
#[derive(Debug, Clone)]
pub struct TfServingConfig {
    pub endpoint: String,
    pub model_name: String,
    pub timeout_seconds: u64,
}

/// TensorFlow Serving predict request.
#[derive(Debug, Serialize)]
struct PredictRequest {
    instances: Vec<Vec<Vec<[f32; CHANNELS]>>>,
}

/// TensorFlow Serving predict response.
#[derive(Debug, Deserialize)]
struct PredictResponse {
    predictions: Vec<Vec<f32>>,
}

/// Backend calling `POST {endpoint}/v1/models/{model}:predict`.
pub struct TfServingBackend {
    config: TfServingConfig,
    http_client: reqwest::Client,
}

impl TfServingBackend {
    pub fn new(config: TfServingConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn predict_url(&self) -> String {
        format!(
            "{}/v1/models/{}:predict",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model_name
        )
    }
}

#[async_trait]
impl ClassifierBackend for TfServingBackend {
    fn describe(&self) -> String {
        format!("{} @ {}", self.config.model_name, self.config.endpoint)
    }

    async fn infer(&self, tensor: &ImageTensor) -> Result<Vec<f32>> {
        let url = self.predict_url();
        debug!("POST {} with tensor {:?}", url, tensor.shape());

        let request = PredictRequest {
            instances: vec![tensor.to_rows()],
        };

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow::anyhow!("Request timed out after {}s", self.config.timeout_seconds)
                } else if e.is_connect() {
                    anyhow::anyhow!("Cannot connect to model server at {}", self.config.endpoint)
                } else {
                    anyhow::anyhow!("Failed to send request: {}", e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Model server error {}: {}", status, body));
        }

        let predict_response: PredictResponse = response
            .json()
            .await
            .context("Failed to parse model server response")?;

        first_row(predict_response)
    }
}

/// Batch size is 1, so only the first row is meaningful.
fn first_row(response: PredictResponse) -> Result<Vec<f32>> {
    response
        .predictions
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("Model server returned no predictions"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(endpoint: &str) -> TfServingBackend {
        TfServingBackend::new(TfServingConfig {
            endpoint: endpoint.to_string(),
            model_name: "oct".to_string(),
            timeout_seconds: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_predict_url() {
        assert_eq!(
            backend("http://localhost:8501").predict_url(),
            "http://localhost:8501/v1/models/oct:predict"
        );
        assert_eq!(
            backend("http://models:8501/").predict_url(),
            "http://models:8501/v1/models/oct:predict"
        );
    }

    #[test]
    fn test_parse_predict_response() {
        let body = r#"{"predictions": [[0.1, 0.7, 0.2]]}"#;
        let response: PredictResponse = serde_json::from_str(body).unwrap();
        assert_eq!(first_row(response).unwrap(), vec![0.1, 0.7, 0.2]);
    }

    #[test]
    fn test_empty_predictions_is_error() {
        let response: PredictResponse = serde_json::from_str(r#"{"predictions": []}"#).unwrap();
        assert!(first_row(response).is_err());
    }

    #[test]
    fn test_request_shape() {
        let png = crate::classifier::tensor::tests::solid_png(4, 4, [255, 255, 255]);
        let tensor = ImageTensor::from_image_bytes(&png, 2).unwrap();
        let request = PredictRequest {
            instances: vec![tensor.to_rows()],
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["instances"][0][1][1], serde_json::json!([1.0, 1.0, 1.0]));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_error() {
        let png = crate::classifier::tensor::tests::solid_png(4, 4, [0, 0, 0]);
        let tensor = ImageTensor::from_image_bytes(&png, 2).unwrap();

        let result = backend("http://127.0.0.1:9").infer(&tensor).await;
        assert!(result.is_err());
    }
}
