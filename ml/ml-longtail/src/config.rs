//! Model configuration files.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::calibration::CalibrationConfig;
use crate::classifier::DotProductClassifierConfig;
use crate::error::{ModelError, Result};
use crate::resnet::ResNetConfig;
use crate::shots::Dataset;

/// Full model configuration: backbone, head and optional shot calibration.
///
/// # Example
///
/// ```
/// use ml_longtail::{Dataset, LongTailConfig};
///
/// let config = LongTailConfig::calibrated(Dataset::PlacesLt);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.classifier.num_classes, 368);
/// assert!(config.classifier.use_logits);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LongTailConfig {
    /// Feature extractor.
    #[serde(default)]
    pub backbone: ResNetConfig,

    /// Classifier head.
    #[serde(default)]
    pub classifier: DotProductClassifierConfig,

    /// Shot calibration applied to the head's raw scores.
    #[serde(default)]
    pub calibration: Option<CalibrationConfig>,
}

impl LongTailConfig {
    /// Creates a configuration without calibration.
    #[must_use]
    pub const fn new(backbone: ResNetConfig, classifier: DotProductClassifierConfig) -> Self {
        Self {
            backbone,
            classifier,
            calibration: None,
        }
    }

    /// ResNet-10 with a raw-score head feeding contiguous shot calibration.
    #[must_use]
    pub fn calibrated(dataset: Dataset) -> Self {
        let backbone = ResNetConfig::resnet10();
        let classifier = DotProductClassifierConfig::new(
            dataset.shot_layout().raw_width(),
            backbone.feature_dim(),
        )
        .with_logits(true);
        Self::new(backbone, classifier).with_calibration(CalibrationConfig::contiguous(dataset))
    }

    /// Sets the calibration stage.
    #[must_use]
    pub fn with_calibration(mut self, calibration: CalibrationConfig) -> Self {
        self.calibration = Some(calibration);
        self
    }

    /// Parses a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Serialization` on malformed JSON or unknown
    /// dataset identifiers.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Io` if the file can't be read and
    /// `ModelError::Serialization` if it can't be parsed.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Serializes the configuration as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Serialization` if serialization fails.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks that the stages fit together.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::InvalidConfig` for the first inconsistency
    /// found, or `ModelError::InvalidMask` if the calibration masks do not
    /// partition the dataset's classes.
    pub fn validate(&self) -> Result<()> {
        if !self.backbone.is_valid() {
            return Err(ModelError::invalid_config(format!(
                "invalid backbone: {:?}",
                self.backbone
            )));
        }
        if !self.classifier.is_valid() {
            return Err(ModelError::invalid_config(format!(
                "invalid classifier: {:?}",
                self.classifier
            )));
        }
        if self.classifier.feat_dim != self.backbone.feature_dim() {
            return Err(ModelError::invalid_config(format!(
                "classifier expects {} features, backbone produces {}",
                self.classifier.feat_dim,
                self.backbone.feature_dim()
            )));
        }

        if let Some(calibration) = &self.calibration {
            if !self.classifier.use_logits {
                return Err(ModelError::invalid_config(
                    "calibration needs raw scores; set classifier.use_logits",
                ));
            }
            let layout = calibration.layout();
            if self.classifier.num_classes != layout.raw_width() {
                return Err(ModelError::invalid_config(format!(
                    "classifier emits {} scores, {} calibration expects {}",
                    self.classifier.num_classes,
                    calibration.dataset,
                    layout.raw_width()
                )));
            }
            calibration.masks.validate(&layout)?;
        }

        Ok(())
    }
}
