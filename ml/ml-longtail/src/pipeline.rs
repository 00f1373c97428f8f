//! End-to-end model: backbone, classifier head and shot calibration.

use burn::module::Module;
use burn::prelude::Backend;
use burn::tensor::Tensor;
use tracing::debug;

use crate::calibration::CalibrateExperts;
use crate::classifier::DotProductClassifier;
use crate::config::LongTailConfig;
use crate::error::Result;
use crate::resnet::ResNet;

/// Image classifier for long-tailed label distributions.
///
/// Data flow: images -> [`ResNet`] features -> [`DotProductClassifier`]
/// scores -> (optional) [`CalibrateExperts`] log-probabilities.
///
/// # Example
///
/// ```ignore
/// use ml_longtail::{Dataset, LongTailConfig, LongTailModel};
///
/// let config = LongTailConfig::calibrated(Dataset::ImageNetLt);
/// let model = LongTailModel::<MyBackend>::new(&config, &device)?;
///
/// let log_probs = model.forward(Tensor::zeros([2, 3, 224, 224], &device))?;
/// assert_eq!(log_probs.dims(), [2, 1000]);
/// ```
#[derive(Debug, Module)]
pub struct LongTailModel<B: Backend> {
    backbone: ResNet<B>,
    classifier: DotProductClassifier<B>,
    calibration: Option<CalibrateExperts<B>>,
}

impl<B: Backend> LongTailModel<B> {
    /// Builds every stage of `config` on `device`.
    ///
    /// # Errors
    ///
    /// Returns the error of [`LongTailConfig::validate`] if the stages do
    /// not fit together.
    pub fn new(config: &LongTailConfig, device: &B::Device) -> Result<Self> {
        config.validate()?;

        let backbone = ResNet::new(config.backbone, device)?;
        let classifier = DotProductClassifier::new(config.classifier, device);
        let calibration = config
            .calibration
            .as_ref()
            .map(|calibration| calibration.init(device))
            .transpose()?;

        Ok(Self {
            backbone,
            classifier,
            calibration,
        })
    }

    /// Runs the full forward pass.
    ///
    /// # Arguments
    ///
    /// - `images`: Input tensor of shape `[batch_size, channels, height, width]`
    ///
    /// # Returns
    ///
    /// Log-probabilities of shape `[batch_size, num_classes]`. Without
    /// calibration this is whatever the head emits.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::ShapeMismatch` if the images don't match the
    /// backbone.
    pub fn forward(&self, images: Tensor<B, 4>) -> Result<Tensor<B, 2>> {
        let (features, _) = self.backbone.forward(images)?;
        let scores = self.classifier.forward(features)?;
        debug!(dims = ?scores.dims(), "classifier scores");

        match &self.calibration {
            Some(calibration) => calibration.forward(scores),
            None => Ok(scores),
        }
    }

    /// Number of classes in the output.
    #[must_use]
    pub fn num_classes(&self) -> usize {
        self.calibration
            .as_ref()
            .map_or(self.classifier.num_classes(), CalibrateExperts::num_classes)
    }

    /// Returns the feature extractor.
    #[must_use]
    pub const fn backbone(&self) -> &ResNet<B> {
        &self.backbone
    }

    /// Returns the classifier head.
    #[must_use]
    pub const fn classifier(&self) -> &DotProductClassifier<B> {
        &self.classifier
    }

    /// Returns the calibration stage, if any.
    #[must_use]
    pub const fn calibration(&self) -> Option<&CalibrateExperts<B>> {
        self.calibration.as_ref()
    }
}
