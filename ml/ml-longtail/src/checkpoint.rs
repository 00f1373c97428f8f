//! Checkpoint persistence and pretrained weight import.

use std::path::Path;

use burn::module::Module;
use burn::prelude::Backend;
use burn::record::{BinFileRecorder, FullPrecisionSettings, PrettyJsonFileRecorder, Recorder};
use burn_store::{ModuleSnapshot, PyTorchToBurnAdapter, PytorchStore, SafetensorsStore};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ModelError, Result};

/// Key rewrites from the usual PyTorch `ResNet` state dict layout.
///
/// `nn.DataParallel` prefixes every key with `module.`, and the shortcut
/// projection is a `Sequential` indexed `0`/`1` there.
const PYTORCH_KEY_REMAP: [(&str, &str); 3] = [
    (r"^module\.", ""),
    (r"\.downsample\.0\.", ".downsample.conv."),
    (r"\.downsample\.1\.", ".downsample.bn."),
];

/// Supported checkpoint file formats.
///
/// # Example
///
/// ```
/// use ml_longtail::CheckpointFormat;
///
/// let format = CheckpointFormat::from_extension("bin");
/// assert_eq!(format, Some(CheckpointFormat::Binary));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CheckpointFormat {
    /// Binary format - compact and fast.
    ///
    /// Uses Burn's `BinFileRecorder` with full precision.
    #[default]
    Binary,

    /// JSON format - human-readable.
    ///
    /// Uses Burn's `PrettyJsonFileRecorder`. Larger file size but portable.
    Json,
}

impl CheckpointFormat {
    /// Determines format from file extension.
    ///
    /// - `.bin`, `.burn` -> Binary
    /// - `.json` -> Json
    /// - Other -> None
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "bin" | "burn" => Some(Self::Binary),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Determines format from file path.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Returns the default file extension for this format.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Binary => "bin",
            Self::Json => "json",
        }
    }

    /// Returns the format name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Binary => "binary",
            Self::Json => "json",
        }
    }
}

impl std::fmt::Display for CheckpointFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// External state-dict formats accepted by [`load_pretrained`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PretrainedFormat {
    /// Pickled PyTorch state dict (`.pt`, `.pth`).
    Pytorch,
    /// Safetensors file exported from PyTorch (`.safetensors`).
    Safetensors,
}

impl PretrainedFormat {
    /// Determines format from file path.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "pt" | "pth" => Some(Self::Pytorch),
            "safetensors" => Some(Self::Safetensors),
            _ => None,
        }
    }
}

/// Outcome of a partial pretrained load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PretrainedReport {
    /// Parameters overwritten from the file.
    pub applied: usize,

    /// Model parameters with no tensor in the file (left as initialized).
    pub missing: usize,

    /// File tensors that matched no model parameter, counted once per
    /// tensor under its file name.
    pub unused: usize,
}

impl PretrainedReport {
    /// Returns `true` if every model parameter came from the file.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.missing == 0
    }
}

/// Saves a model checkpoint to a file.
///
/// # Arguments
///
/// - `model`: The model to save
/// - `path`: Output file path (without extension)
/// - `format`: Checkpoint format to use
///
/// # Returns
///
/// The full path to the saved checkpoint (with extension added).
///
/// # Errors
///
/// Returns `ModelError::SaveCheckpoint` if saving fails.
///
/// # Example
///
/// ```ignore
/// use ml_longtail::{save_checkpoint, CheckpointFormat};
///
/// let path = save_checkpoint(&calibration, "calib", CheckpointFormat::Binary)?;
/// ```
pub fn save_checkpoint<B, M>(model: &M, path: &str, format: CheckpointFormat) -> Result<String>
where
    B: Backend,
    M: Module<B>,
{
    let full_path = format!("{}.{}", path, format.extension());
    let record = model.clone().into_record();

    let recorded = match format {
        CheckpointFormat::Binary => {
            BinFileRecorder::<FullPrecisionSettings>::new().record(record, full_path.clone().into())
        }
        CheckpointFormat::Json => PrettyJsonFileRecorder::<FullPrecisionSettings>::new()
            .record(record, full_path.clone().into()),
    };
    recorded.map_err(|e| ModelError::save_checkpoint(&full_path, e.to_string()))?;

    info!(path = %full_path, %format, "saved checkpoint");
    Ok(full_path)
}

/// Loads a model checkpoint from a file.
///
/// # Arguments
///
/// - `model`: The model to load weights into
/// - `path`: Path to the checkpoint file (with extension)
/// - `device`: Device to load the model onto
///
/// # Returns
///
/// The model with loaded weights.
///
/// # Errors
///
/// Returns `ModelError::LoadCheckpoint` if loading fails.
/// Returns `ModelError::CheckpointNotFound` if the file doesn't exist.
/// Returns `ModelError::UnsupportedFormat` if the format can't be determined.
pub fn load_checkpoint<B, M>(model: M, path: &str, device: &B::Device) -> Result<M>
where
    B: Backend,
    M: Module<B>,
{
    let path_obj = Path::new(path);

    if !path_obj.exists() {
        return Err(ModelError::checkpoint_not_found(path));
    }

    let format = CheckpointFormat::from_path(path_obj)
        .ok_or_else(|| ModelError::unsupported_format(path))?;

    let loaded = match format {
        CheckpointFormat::Binary => {
            model.load_file(path_obj, &BinFileRecorder::<FullPrecisionSettings>::new(), device)
        }
        CheckpointFormat::Json => model.load_file(
            path_obj,
            &PrettyJsonFileRecorder::<FullPrecisionSettings>::new(),
            device,
        ),
    }
    .map_err(|e| ModelError::load_checkpoint(path, e.to_string()))?;

    info!(path, %format, "loaded checkpoint");
    Ok(loaded)
}

/// Imports externally trained weights by parameter name.
///
/// Tensors are matched by name after stripping a `module.` prefix and
/// mapping `downsample.0`/`downsample.1` onto the shortcut projection.
/// Parameters without a matching tensor keep their initialized values and
/// tensors without a matching parameter are ignored; both are logged.
///
/// # Arguments
///
/// - `model`: The model to load weights into
/// - `path`: Path to a `.pt`, `.pth` or `.safetensors` file
/// - `top_level_key`: Key of the nested state dict in a PyTorch file, if any
///
/// # Errors
///
/// Returns `ModelError::CheckpointNotFound` if the file doesn't exist.
/// Returns `ModelError::UnsupportedFormat` if the extension is not recognized.
/// Returns `ModelError::LoadCheckpoint` if the file can't be read or a
/// matched tensor can't be applied.
///
/// # Example
///
/// ```ignore
/// use ml_longtail::{load_pretrained, ResNet, ResNetConfig};
///
/// let model = ResNet::<MyBackend>::new(ResNetConfig::resnet152(), &device)?;
/// let (model, report) = load_pretrained(model, "data/caffe_resnet152.pth", None)?;
/// assert_eq!(report.missing, 0);
/// ```
pub fn load_pretrained<B, M>(
    mut model: M,
    path: &str,
    top_level_key: Option<&str>,
) -> Result<(M, PretrainedReport)>
where
    B: Backend,
    M: ModuleSnapshot<B>,
{
    let path_obj = Path::new(path);

    if !path_obj.exists() {
        return Err(ModelError::checkpoint_not_found(path));
    }

    let format =
        PretrainedFormat::from_path(path_obj).ok_or_else(|| ModelError::unsupported_format(path))?;

    let result = match format {
        PretrainedFormat::Pytorch => {
            let mut store = PytorchStore::from_file(path_obj).allow_partial(true);
            if let Some(key) = top_level_key {
                store = store.with_top_level_key(key);
            }
            for (from, to) in PYTORCH_KEY_REMAP {
                store = store.with_key_remapping(from, to);
            }
            model
                .load_from(&mut store)
                .map_err(|e| ModelError::load_checkpoint(path, e.to_string()))?
        }
        PretrainedFormat::Safetensors => {
            let mut store = SafetensorsStore::from_file(path_obj)
                .with_from_adapter(PyTorchToBurnAdapter)
                .allow_partial(true);
            for (from, to) in PYTORCH_KEY_REMAP {
                store = store.with_key_remapping(from, to);
            }
            model
                .load_from(&mut store)
                .map_err(|e| ModelError::load_checkpoint(path, e.to_string()))?
        }
    };

    if !result.errors.is_empty() {
        return Err(ModelError::load_checkpoint(
            path,
            format!("{:?}", result.errors),
        ));
    }

    let unused = unmatched_tensors(&result.unused, &result.applied);
    let report = PretrainedReport {
        applied: result.applied.len(),
        missing: result.missing.len(),
        unused: unused.len(),
    };

    if report.missing > 0 {
        warn!(path, missing = ?result.missing, "parameters not found in pretrained weights, keeping initialization");
    }
    if report.unused > 0 {
        warn!(path, ?unused, "pretrained tensors matched no parameter");
    }
    info!(path, applied = report.applied, "loaded pretrained weights");

    Ok((model, report))
}

/// Model path a PyTorch tensor name lands on after key remapping.
fn remapped_name(name: &str) -> String {
    name.strip_prefix("module.")
        .unwrap_or(name)
        .replace(".downsample.0.", ".downsample.conv.")
        .replace(".downsample.1.", ".downsample.bn.")
}

/// Filters the store's unused list down to tensors that were not applied.
///
/// The store lists names before remapping and adaptation, so an applied
/// batch-norm `weight`/`bias` (loaded as `gamma`/`beta`) or a `module.`
/// prefixed tensor shows up there as well.
fn unmatched_tensors<'a>(unused: &'a [String], applied: &[String]) -> Vec<&'a str> {
    unused
        .iter()
        .map(String::as_str)
        .filter(|name| {
            let remapped = remapped_name(name);
            let adapted = remapped
                .strip_suffix(".weight")
                .map(|stem| format!("{stem}.gamma"))
                .or_else(|| remapped.strip_suffix(".bias").map(|stem| format!("{stem}.beta")));
            ![Some(remapped.clone()), adapted]
                .into_iter()
                .flatten()
                .any(|candidate| applied.iter().any(|a| *a == candidate))
        })
        .collect()
}
