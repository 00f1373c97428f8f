//! Per-shot-band calibration of classifier scores.

use burn::module::{Ignored, Module, Param};
use burn::prelude::Backend;
use burn::tensor::activation::softmax;
use burn::tensor::{Int, Tensor, TensorData};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ModelError, Result};
use crate::shots::{Dataset, ShotBand, ShotLayout, ShotMasks};

/// Configuration for the calibration module.
///
/// # Example
///
/// ```
/// use ml_longtail::{CalibrationConfig, Dataset};
///
/// let config = CalibrationConfig::contiguous(Dataset::PlacesLt);
/// assert!(config.is_valid());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Benchmark whose shot layout partitions the raw scores.
    pub dataset: Dataset,

    /// Output class of every real column, per band.
    pub masks: ShotMasks,
}

impl CalibrationConfig {
    /// Creates a configuration.
    #[must_use]
    pub const fn new(dataset: Dataset, masks: ShotMasks) -> Self {
        Self { dataset, masks }
    }

    /// Configuration whose classes are numbered band by band.
    #[must_use]
    pub fn contiguous(dataset: Dataset) -> Self {
        let masks = ShotMasks::contiguous(&dataset.shot_layout());
        Self { dataset, masks }
    }

    /// Returns the shot layout of the configured dataset.
    #[must_use]
    pub const fn layout(&self) -> ShotLayout {
        self.dataset.shot_layout()
    }

    /// Validates the configuration.
    ///
    /// Returns `true` if the masks partition the dataset's classes.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.masks.validate(&self.layout()).is_ok()
    }

    /// Builds the module on `device`.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::InvalidMask` if the masks do not partition the
    /// dataset's classes.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<CalibrateExperts<B>> {
        CalibrateExperts::new(self.dataset, &self.masks, device)
    }
}

/// Learned per-class temperature and bias over three shot bands.
///
/// Raw scores are split into the many, medium and few-shot bands. Each band
/// is scaled and shifted column-wise, soft-maxed on its own, stripped of its
/// reject column and placed at its classes. The assembled vector is then
/// renormalized across all bands and returned as log-probabilities, ready
/// for a negative log-likelihood loss.
///
/// A row whose kept probabilities all underflow to zero renormalizes as
/// `0 / 0` and yields non-finite outputs. This is not clamped; validate the
/// output before a loss if parameters can reach that regime.
///
/// # Type Parameters
///
/// - `B`: The Burn backend (use an `Autodiff` backend for training)
///
/// # Example
///
/// ```ignore
/// use ml_longtail::{CalibrateExperts, Dataset, ShotMasks};
///
/// let layout = Dataset::ImageNetLt.shot_layout();
/// let masks = ShotMasks::contiguous(&layout);
/// let calib = CalibrateExperts::<MyBackend>::new(Dataset::ImageNetLt, &masks, &device)?;
///
/// let logits = Tensor::zeros([8, layout.raw_width()], &device);
/// let log_probs = calib.forward(logits)?;
/// assert_eq!(log_probs.dims(), [8, 1000]);
/// ```
#[derive(Debug, Module)]
pub struct CalibrateExperts<B: Backend> {
    manyshot_temp: Param<Tensor<B, 2>>,
    mediumshot_temp: Param<Tensor<B, 2>>,
    fewshot_temp: Param<Tensor<B, 2>>,
    manyshot_bias: Param<Tensor<B, 2>>,
    mediumshot_bias: Param<Tensor<B, 2>>,
    fewshot_bias: Param<Tensor<B, 2>>,
    #[module(skip)]
    layout: Ignored<ShotLayout>,
    /// Concatenated band column feeding each output class.
    #[module(skip)]
    gather: Vec<i64>,
}

impl<B: Backend> CalibrateExperts<B> {
    /// Creates a calibration module for one of the supported datasets.
    ///
    /// All temperatures and biases start at one.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::InvalidMask` if the masks do not partition the
    /// dataset's classes.
    pub fn new(dataset: Dataset, masks: &ShotMasks, device: &B::Device) -> Result<Self> {
        info!(%dataset, "building shot calibration");
        Self::from_layout(dataset.shot_layout(), masks, device)
    }

    /// Creates a calibration module for an explicit band layout.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::InvalidMask` if the masks do not partition the
    /// layout's classes.
    pub fn from_layout(layout: ShotLayout, masks: &ShotMasks, device: &B::Device) -> Result<Self> {
        let gather = masks
            .gather_index(&layout)?
            .into_iter()
            .map(|column| {
                i64::try_from(column)
                    .map_err(|_| ModelError::invalid_mask(format!("column {column} overflows i64")))
            })
            .collect::<Result<Vec<_>>>()?;

        let [many, medium, few] = layout.widths();
        info!(
            many,
            medium,
            few,
            classes = layout.num_classes(),
            "shot calibration bands"
        );

        let ones = |width: usize| Param::from_tensor(Tensor::ones([1, width], device));

        Ok(Self {
            manyshot_temp: ones(many),
            mediumshot_temp: ones(medium),
            fewshot_temp: ones(few),
            manyshot_bias: ones(many),
            mediumshot_bias: ones(medium),
            fewshot_bias: ones(few),
            layout: Ignored(layout),
            gather,
        })
    }

    /// Returns the band layout of the raw scores.
    #[must_use]
    pub const fn layout(&self) -> &ShotLayout {
        &self.layout.0
    }

    /// Number of output classes.
    #[must_use]
    pub const fn num_classes(&self) -> usize {
        self.layout.0.num_classes()
    }

    /// Per-column temperature of a band, shape `[1, width]`.
    #[must_use]
    pub const fn temperature(&self, band: ShotBand) -> &Param<Tensor<B, 2>> {
        match band {
            ShotBand::Many => &self.manyshot_temp,
            ShotBand::Medium => &self.mediumshot_temp,
            ShotBand::Few => &self.fewshot_temp,
        }
    }

    /// Per-column bias of a band, shape `[1, width]`.
    #[must_use]
    pub const fn bias(&self, band: ShotBand) -> &Param<Tensor<B, 2>> {
        match band {
            ShotBand::Many => &self.manyshot_bias,
            ShotBand::Medium => &self.mediumshot_bias,
            ShotBand::Few => &self.fewshot_bias,
        }
    }

    /// Replaces the temperature and bias of one band.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::ShapeMismatch` unless both tensors are
    /// `[1, width]` for the band.
    pub fn with_band_parameters(
        mut self,
        band: ShotBand,
        temperature: Tensor<B, 2>,
        bias: Tensor<B, 2>,
    ) -> Result<Self> {
        let expected = [1, self.layout.width(band)];
        for tensor in [&temperature, &bias] {
            if tensor.dims() != expected {
                return Err(ModelError::shape_mismatch(
                    format!("{expected:?}"),
                    format!("{:?}", tensor.dims()),
                ));
            }
        }

        let (temp_slot, bias_slot) = match band {
            ShotBand::Many => (&mut self.manyshot_temp, &mut self.manyshot_bias),
            ShotBand::Medium => (&mut self.mediumshot_temp, &mut self.mediumshot_bias),
            ShotBand::Few => (&mut self.fewshot_temp, &mut self.fewshot_bias),
        };
        *temp_slot = Param::from_tensor(temperature);
        *bias_slot = Param::from_tensor(bias);
        Ok(self)
    }

    /// Calibrated log-probabilities.
    ///
    /// # Arguments
    ///
    /// - `logits`: Raw scores of shape `[batch_size, raw_width]`, bands in
    ///   many, medium, few order
    ///
    /// # Returns
    ///
    /// Log-probabilities of shape `[batch_size, num_classes]`.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::ShapeMismatch` if the score width differs from
    /// the layout's raw width.
    pub fn forward(&self, logits: Tensor<B, 2>) -> Result<Tensor<B, 2>> {
        Ok(self.probabilities(logits)?.log())
    }

    /// Calibrated probabilities, jointly renormalized over all classes.
    ///
    /// This is [`CalibrateExperts::forward`] without the final logarithm.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::ShapeMismatch` if the score width differs from
    /// the layout's raw width.
    pub fn probabilities(&self, logits: Tensor<B, 2>) -> Result<Tensor<B, 2>> {
        let [batch, width] = logits.dims();
        let raw_width = self.layout.raw_width();
        if width != raw_width {
            return Err(ModelError::shape_mismatch(
                format!("[{batch}, {raw_width}]"),
                format!("[{batch}, {width}]"),
            ));
        }
        debug!(batch, raw_width, "calibrating scores");

        let device = logits.device();
        let bands: Vec<Tensor<B, 2>> = ShotBand::ALL
            .iter()
            .map(|&band| self.band_probabilities(band, logits.clone()))
            .collect();
        let concatenated = Tensor::cat(bands, 1);

        let index = Tensor::<B, 1, Int>::from_data(
            TensorData::new(self.gather.clone(), [self.gather.len()]),
            &device,
        );
        let assembled = concatenated.select(1, index);

        let totals = assembled.clone().sum_dim(1);
        Ok(assembled / totals)
    }

    /// Softmax of one scaled band with its reject column removed.
    fn band_probabilities(&self, band: ShotBand, logits: Tensor<B, 2>) -> Tensor<B, 2> {
        let range = self.layout.range(band);
        let width = range.len();

        let raw = logits.narrow(1, range.start, width);
        let scaled = raw * self.temperature(band).val() + self.bias(band).val();

        softmax(scaled, 1).narrow(1, 0, width - 1)
    }
}
