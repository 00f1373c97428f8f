//! Burn models for long-tailed visual recognition.
//!
//! Classes in long-tailed benchmarks range from many-shot to few-shot. This
//! crate provides the network pieces used to train on them:
//!
//! # Model Architectures
//!
//! - [`ResNet`] - Residual feature extractor (basic or bottleneck blocks)
//! - [`DotProductClassifier`] - Linear head, raw scores or log-probabilities
//! - [`CalibrateExperts`] - Per-shot-band temperature/bias calibration with
//!   joint renormalization
//! - [`LongTailModel`] - The three stages chained
//!
//! # Shot Bands
//!
//! The raw score vector is split into many, medium and few-shot bands, each
//! ending in a reject column. [`Dataset`] resolves the fixed layout of a
//! benchmark and [`ShotMasks`] maps each band's columns to output classes.
//!
//! # Checkpoint Persistence
//!
//! - Burn records in binary or JSON ([`save_checkpoint`], [`load_checkpoint`])
//! - PyTorch or safetensors state dicts matched by name ([`load_pretrained`])
//!
//! # Backend Support
//!
//! Models are generic over Burn backends. Common choices:
//! - `burn-ndarray` - CPU inference/training
//! - `burn-wgpu` - GPU inference/training
//!
//! Wrap the backend in `Autodiff` to train the calibration parameters.
//!
//! # Example
//!
//! ```ignore
//! use ml_longtail::{CalibrateExperts, Dataset, ShotMasks};
//!
//! let layout = Dataset::PlacesLt.shot_layout();
//! let masks = ShotMasks::contiguous(&layout);
//! let calib = CalibrateExperts::<MyBackend>::new(Dataset::PlacesLt, &masks, &device)?;
//!
//! let logits = Tensor::zeros([4, layout.raw_width()], &device);
//! let log_probs = calib.forward(logits)?;
//! assert_eq!(log_probs.dims(), [4, 365]);
//! ```

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod calibration;
mod checkpoint;
mod classifier;
mod config;
mod error;
mod pipeline;
mod resnet;
mod shots;

// Re-export model types
pub use calibration::{CalibrateExperts, CalibrationConfig};
pub use classifier::{DotProductClassifier, DotProductClassifierConfig};
pub use pipeline::LongTailModel;
pub use resnet::{BlockKind, Downsample, ResNet, ResNetConfig, ResidualBlock};

// Re-export shot layout types
pub use shots::{Dataset, NUM_BANDS, ShotBand, ShotLayout, ShotMasks};

// Re-export configuration
pub use config::LongTailConfig;

// Re-export checkpoint utilities
pub use checkpoint::{
    CheckpointFormat, PretrainedFormat, PretrainedReport, load_checkpoint, load_pretrained,
    save_checkpoint,
};

// Re-export error types
pub use error::{ModelError, Result};

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{
        BlockKind, CalibrateExperts, CalibrationConfig, CheckpointFormat, Dataset,
        DotProductClassifier, DotProductClassifierConfig, LongTailConfig, LongTailModel,
        ModelError, ResNet, ResNetConfig, ShotBand, ShotLayout, ShotMasks, load_checkpoint,
        load_pretrained, save_checkpoint,
    };
}
