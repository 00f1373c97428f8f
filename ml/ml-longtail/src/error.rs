//! Error types for ml-longtail crate.

use thiserror::Error;

/// Errors that can occur in ml-longtail operations.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Dataset identifier with no known shot layout.
    #[error("unsupported dataset: {0}")]
    UnsupportedDataset(String),

    /// Class masks do not partition the output classes.
    #[error("invalid class mask: {0}")]
    InvalidMask(String),

    /// Invalid model configuration.
    #[error("invalid model configuration: {0}")]
    InvalidConfig(String),

    /// Shape mismatch during a forward pass or parameter update.
    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Expected shape.
        expected: String,
        /// Actual shape.
        actual: String,
    },

    /// Failed to load checkpoint.
    #[error("failed to load checkpoint from {path}: {reason}")]
    LoadCheckpoint {
        /// Path to the checkpoint file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Failed to save checkpoint.
    #[error("failed to save checkpoint to {path}: {reason}")]
    SaveCheckpoint {
        /// Path to the checkpoint file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Checkpoint file not found.
    #[error("checkpoint not found: {0}")]
    CheckpointNotFound(String),

    /// Unsupported checkpoint format.
    #[error("unsupported checkpoint format: {0}")]
    UnsupportedFormat(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl ModelError {
    /// Creates an unsupported dataset error.
    #[must_use]
    pub fn unsupported_dataset(name: impl Into<String>) -> Self {
        Self::UnsupportedDataset(name.into())
    }

    /// Creates an invalid mask error.
    #[must_use]
    pub fn invalid_mask(reason: impl Into<String>) -> Self {
        Self::InvalidMask(reason.into())
    }

    /// Creates an invalid config error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }

    /// Creates a shape mismatch error.
    #[must_use]
    pub fn shape_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates a load checkpoint error.
    #[must_use]
    pub fn load_checkpoint(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::LoadCheckpoint {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a save checkpoint error.
    #[must_use]
    pub fn save_checkpoint(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SaveCheckpoint {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a checkpoint not found error.
    #[must_use]
    pub fn checkpoint_not_found(path: impl Into<String>) -> Self {
        Self::CheckpointNotFound(path.into())
    }

    /// Creates an unsupported format error.
    #[must_use]
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat(format.into())
    }
}

impl From<std::io::Error> for ModelError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for ml-longtail operations.
pub type Result<T> = std::result::Result<T, ModelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_unsupported_dataset() {
        let err = ModelError::unsupported_dataset("cifar100");
        assert!(err.to_string().contains("unsupported dataset"));
        assert!(err.to_string().contains("cifar100"));
    }

    #[test]
    fn error_invalid_mask() {
        let err = ModelError::invalid_mask("class 3 appears twice");
        assert!(err.to_string().contains("class 3 appears twice"));
    }

    #[test]
    fn error_invalid_config() {
        let err = ModelError::invalid_config("num_classes must be > 0");
        assert!(err.to_string().contains("num_classes must be > 0"));
    }

    #[test]
    fn error_shape_mismatch() {
        let err = ModelError::shape_mismatch("[_, 12]", "[2, 10]");
        assert!(err.to_string().contains("[_, 12]"));
        assert!(err.to_string().contains("[2, 10]"));
    }

    #[test]
    fn error_load_checkpoint() {
        let err = ModelError::load_checkpoint("resnet152.pth", "truncated archive");
        assert!(err.to_string().contains("resnet152.pth"));
        assert!(err.to_string().contains("truncated archive"));
    }

    #[test]
    fn error_save_checkpoint() {
        let err = ModelError::save_checkpoint("calib.bin", "disk full");
        assert!(err.to_string().contains("calib.bin"));
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn error_checkpoint_not_found() {
        let err = ModelError::checkpoint_not_found("/data/missing.pth");
        assert!(err.to_string().contains("/data/missing.pth"));
    }

    #[test]
    fn error_unsupported_format() {
        let err = ModelError::unsupported_format("onnx");
        assert!(err.to_string().contains("onnx"));
    }

    #[test]
    fn error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "not found");
        let err: ModelError = io_err.into();
        assert!(matches!(err, ModelError::Io(_)));
    }

    #[test]
    fn error_from_json_error() {
        let json_err = serde_json::from_str::<u32>("not a number").err();
        assert!(json_err.is_some());
        if let Some(json_err) = json_err {
            let err: ModelError = json_err.into();
            assert!(matches!(err, ModelError::Serialization(_)));
        }
    }
}
