//! Linear classifier head over extracted features.

use burn::module::Module;
use burn::nn;
use burn::prelude::Backend;
use burn::tensor::Tensor;
use burn::tensor::activation::log_softmax;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Configuration for the dot-product classifier.
///
/// # Example
///
/// ```
/// use ml_longtail::DotProductClassifierConfig;
///
/// let config = DotProductClassifierConfig::default();
/// assert_eq!(config.num_classes, 1000);
/// assert_eq!(config.feat_dim, 512);
/// assert!(!config.use_logits);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DotProductClassifierConfig {
    /// Number of output columns.
    pub num_classes: usize,

    /// Input feature dimension.
    pub feat_dim: usize,

    /// Return raw scores instead of log-probabilities.
    ///
    /// Must be set when the scores feed the shot calibration, which applies
    /// its own per-band softmax.
    pub use_logits: bool,
}

impl Default for DotProductClassifierConfig {
    fn default() -> Self {
        Self {
            num_classes: 1000,
            feat_dim: 512,
            use_logits: false,
        }
    }
}

impl DotProductClassifierConfig {
    /// Creates a new configuration producing log-probabilities.
    #[must_use]
    pub const fn new(num_classes: usize, feat_dim: usize) -> Self {
        Self {
            num_classes,
            feat_dim,
            use_logits: false,
        }
    }

    /// Sets whether raw scores are returned.
    #[must_use]
    pub const fn with_logits(mut self, use_logits: bool) -> Self {
        self.use_logits = use_logits;
        self
    }

    /// Validates the configuration.
    ///
    /// Returns `true` if all dimensions are positive.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.num_classes > 0 && self.feat_dim > 0
    }
}

/// Single linear projection from features to per-class scores.
///
/// Architecture: Input -> Linear -> (optional) `LogSoftmax`
///
/// # Type Parameters
///
/// - `B`: The Burn backend (e.g., `NdArray`, `Wgpu`)
///
/// # Example
///
/// ```ignore
/// use ml_longtail::{DotProductClassifier, DotProductClassifierConfig};
///
/// let config = DotProductClassifierConfig::new(1003, 512).with_logits(true);
/// let head = DotProductClassifier::<MyBackend>::new(config, &device);
///
/// let scores = head.forward(Tensor::zeros([4, 512], &device))?;
/// assert_eq!(scores.dims(), [4, 1003]);
/// ```
#[derive(Debug, Module)]
pub struct DotProductClassifier<B: Backend> {
    fc: nn::Linear<B>,
    #[module(skip)]
    feat_dim: usize,
    #[module(skip)]
    num_classes: usize,
    #[module(skip)]
    use_logits: bool,
}

impl<B: Backend> DotProductClassifier<B> {
    /// Creates a new classifier head.
    ///
    /// # Arguments
    ///
    /// - `config`: Head configuration
    /// - `device`: The device to create the model on
    #[must_use]
    pub fn new(config: DotProductClassifierConfig, device: &B::Device) -> Self {
        let fc = nn::LinearConfig::new(config.feat_dim, config.num_classes).init(device);
        Self {
            fc,
            feat_dim: config.feat_dim,
            num_classes: config.num_classes,
            use_logits: config.use_logits,
        }
    }

    /// Runs the forward pass.
    ///
    /// # Arguments
    ///
    /// - `features`: Input tensor of shape `[batch_size, feat_dim]`
    ///
    /// # Returns
    ///
    /// Tensor of shape `[batch_size, num_classes]`: raw scores when built
    /// with `use_logits`, log-probabilities otherwise.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::ShapeMismatch` if the feature width is wrong.
    pub fn forward(&self, features: Tensor<B, 2>) -> Result<Tensor<B, 2>> {
        let [batch, width] = features.dims();
        if width != self.feat_dim {
            return Err(ModelError::shape_mismatch(
                format!("[{batch}, {}]", self.feat_dim),
                format!("[{batch}, {width}]"),
            ));
        }

        let scores = self.fc.forward(features);
        if self.use_logits {
            Ok(scores)
        } else {
            Ok(log_softmax(scores, 1))
        }
    }

    /// Returns the number of output columns.
    #[must_use]
    pub const fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Returns the expected feature dimension.
    #[must_use]
    pub const fn feat_dim(&self) -> usize {
        self.feat_dim
    }

    /// Returns `true` if the head emits raw scores.
    #[must_use]
    pub const fn uses_logits(&self) -> bool {
        self.use_logits
    }
}
