//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.retinadx.toml` files.

use crate::cli::OutputFormat;
use crate::models::{Modality, ModalityLabel};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".retinadx.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Image preprocessing and input checks.
    #[serde(default)]
    pub image: ImageConfig,

    /// Per-modality model settings.
    #[serde(default)]
    pub models: ModelsConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Report format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Write the report here instead of stdout.
    #[serde(default)]
    pub output: Option<String>,
}

/// Image settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Side length of the square tensor fed to both models.
    #[serde(default = "default_target_size")]
    pub target_size: u32,

    /// Accepted file extensions (case-insensitive).
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            target_size: default_target_size(),
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

fn default_target_size() -> u32 {
    crate::classifier::tensor::DEFAULT_TARGET_SIZE
}

fn default_allowed_extensions() -> Vec<String> {
    vec!["png", "jpg", "jpeg"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Both classifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    #[serde(default = "ModelConfig::oct")]
    pub oct: ModelConfig,

    #[serde(default = "ModelConfig::fundus")]
    pub fundus: ModelConfig,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            oct: ModelConfig::oct(),
            fundus: ModelConfig::fundus(),
        }
    }
}

/// One classifier served by TensorFlow Serving.
///
/// `model_name` and `class_names` fall back to the modality's defaults when
/// omitted, so a section may set only the endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Base URL of the model server.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model name as registered on the server.
    #[serde(default)]
    pub model_name: Option<String>,

    /// Class labels in the order of the model's output layer.
    #[serde(default)]
    pub class_names: Option<Vec<String>>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl ModelConfig {
    fn for_modality(modality: Modality) -> Self {
        Self {
            endpoint: default_endpoint(),
            model_name: Some(modality.key().to_string()),
            class_names: Some(modality.default_class_names()),
            timeout_seconds: default_timeout(),
        }
    }

    fn oct() -> Self {
        Self::for_modality(Modality::Oct)
    }

    fn fundus() -> Self {
        Self::for_modality(Modality::Fundus)
    }

    /// Model name, or the modality key (`oct` / `fundus`).
    pub fn resolved_model_name(&self, modality: Modality) -> String {
        self.model_name
            .clone()
            .unwrap_or_else(|| modality.key().to_string())
    }

    /// Parse class names into labels, falling back to the modality's default order.
    pub fn resolved_class_names(&self, modality: Modality) -> Result<Vec<ModalityLabel>> {
        let names = self
            .class_names
            .clone()
            .unwrap_or_else(|| modality.default_class_names());

        names
            .iter()
            .map(|name| {
                name.parse::<ModalityLabel>()
                    .map_err(|e| anyhow::anyhow!("Invalid {} class name: {}", modality, e))
            })
            .collect()
    }
}

fn default_endpoint() -> String {
    "http://localhost:8501".to_string()
}

fn default_timeout() -> u64 {
    60
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Settings for one modality's model.
    pub fn model(&self, modality: Modality) -> &ModelConfig {
        match modality {
            Modality::Oct => &self.models.oct,
            Modality::Fundus => &self.models.fundus,
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref url) = args.oct_url {
            self.models.oct.endpoint = url.clone();
        }
        if let Some(ref url) = args.fundus_url {
            self.models.fundus.endpoint = url.clone();
        }

        // Timeout applies to both models
        if let Some(timeout) = args.timeout {
            self.models.oct.timeout_seconds = timeout;
            self.models.fundus.timeout_seconds = timeout;
        }

        if let Some(size) = args.image_size {
            self.image.target_size = size;
        }

        if let Some(format) = args.format {
            self.general.format = format;
        }
        if let Some(ref output) = args.output {
            self.general.output = Some(output.display().to_string());
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.image.target_size, 224);
        assert_eq!(config.general.format, OutputFormat::Markdown);
        assert!(config.image.allowed_extensions.contains(&"jpeg".to_string()));
        assert_eq!(config.model(Modality::Oct).resolved_model_name(Modality::Oct), "oct");
    }

    #[test]
    fn test_default_class_order() {
        let config = Config::default();
        let oct = config
            .model(Modality::Oct)
            .resolved_class_names(Modality::Oct)
            .unwrap();
        let fundus = config
            .model(Modality::Fundus)
            .resolved_class_names(Modality::Fundus)
            .unwrap();

        assert_eq!(oct.len(), 8);
        assert_eq!(oct[7], ModalityLabel::Normal);
        assert_eq!(
            fundus,
            vec![
                ModalityLabel::Dr,
                ModalityLabel::Mh,
                ModalityLabel::Armd,
                ModalityLabel::Csr
            ]
        );
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
format = "json"
output = "diagnosis.json"

[image]
target_size = 299

[models.fundus]
endpoint = "http://gpu-box:8501"
timeout_seconds = 10
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.format, OutputFormat::Json);
        assert_eq!(config.general.output.as_deref(), Some("diagnosis.json"));
        assert_eq!(config.image.target_size, 299);
        assert_eq!(config.image.allowed_extensions.len(), 3);
        assert_eq!(config.models.fundus.endpoint, "http://gpu-box:8501");
        assert_eq!(config.models.fundus.timeout_seconds, 10);
        // Omitted fields fall back per modality
        assert_eq!(
            config.models.fundus.resolved_model_name(Modality::Fundus),
            "fundus"
        );
        assert_eq!(
            config
                .models
                .fundus
                .resolved_class_names(Modality::Fundus)
                .unwrap()
                .len(),
            4
        );
        assert_eq!(config.models.oct.endpoint, "http://localhost:8501");
    }

    #[test]
    fn test_invalid_class_name() {
        let toml_content = r#"
[models.oct]
class_names = ["AMD", "GLAUCOMA"]
"#;
        let config: Config = toml::from_str(toml_content).unwrap();
        assert!(config
            .model(Modality::Oct)
            .resolved_class_names(Modality::Oct)
            .is_err());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[image]"));
        assert!(toml_str.contains("[models.oct]"));
        assert!(toml_str.contains("[models.fundus]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.models.fundus.class_names, Config::default().models.fundus.class_names);
    }
}
