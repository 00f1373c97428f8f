//! Frequency bands, per-dataset shot layouts and class masks.

use std::ops::Range;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Number of frequency bands in a layout.
pub const NUM_BANDS: usize = 3;

/// Class-frequency band.
///
/// Bands appear in the raw score vector in this order.
///
/// # Example
///
/// ```
/// use ml_longtail::ShotBand;
///
/// assert_eq!(ShotBand::ALL[0], ShotBand::Many);
/// assert_eq!(ShotBand::Few.name(), "few");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShotBand {
    /// Classes with many training examples.
    Many,
    /// Classes with a moderate number of training examples.
    Medium,
    /// Classes with few training examples.
    Few,
}

impl ShotBand {
    /// All bands in raw-vector order.
    pub const ALL: [Self; NUM_BANDS] = [Self::Many, Self::Medium, Self::Few];

    /// Position of the band in raw-vector order.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Many => 0,
            Self::Medium => 1,
            Self::Few => 2,
        }
    }

    /// Returns the band name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Many => "many",
            Self::Medium => "medium",
            Self::Few => "few",
        }
    }
}

impl std::fmt::Display for ShotBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Long-tailed benchmark with a fixed shot layout.
///
/// # Example
///
/// ```
/// use ml_longtail::Dataset;
///
/// let dataset = "places".parse::<Dataset>().ok();
/// assert_eq!(dataset, Some(Dataset::PlacesLt));
/// assert_eq!(Dataset::ImageNetLt.shot_layout().num_classes(), 1000);
/// assert!("cifar100".parse::<Dataset>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Dataset {
    /// ImageNet-LT: 1000 classes.
    #[default]
    #[serde(rename = "imagenet", alias = "imagenet_lt")]
    ImageNetLt,

    /// Places-LT: 365 classes.
    #[serde(rename = "places", alias = "places_lt")]
    PlacesLt,
}

impl Dataset {
    /// Returns the canonical identifier.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ImageNetLt => "imagenet",
            Self::PlacesLt => "places",
        }
    }

    /// Returns the band layout of the raw score vector for this dataset.
    #[must_use]
    pub const fn shot_layout(&self) -> ShotLayout {
        match self {
            Self::ImageNetLt => ShotLayout {
                ends: [392, 866, 1003],
            },
            Self::PlacesLt => ShotLayout {
                ends: [133, 296, 368],
            },
        }
    }
}

impl FromStr for Dataset {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "imagenet" | "imagenet_lt" => Ok(Self::ImageNetLt),
            "places" | "places_lt" => Ok(Self::PlacesLt),
            _ => Err(ModelError::unsupported_dataset(s)),
        }
    }
}

impl std::fmt::Display for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Partition of the raw score vector into three contiguous bands.
///
/// Each band ends with one synthetic reject column, so a band of width `w`
/// carries `w - 1` real classes.
///
/// # Example
///
/// ```
/// use ml_longtail::{ShotBand, ShotLayout};
///
/// let layout = ShotLayout::from_widths([4, 4, 4]).unwrap_or_else(|_| unreachable!());
/// assert_eq!(layout.range(ShotBand::Medium), 4..8);
/// assert_eq!(layout.raw_width(), 12);
/// assert_eq!(layout.num_classes(), 9);
/// ```
///
/// Serialized as the three band widths; deserialization goes through
/// [`ShotLayout::from_widths`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "[usize; 3]", into = "[usize; 3]")]
pub struct ShotLayout {
    /// Exclusive end of each band; the first band starts at zero.
    ends: [usize; NUM_BANDS],
}

impl ShotLayout {
    /// Builds a layout from per-band widths (reject column included).
    ///
    /// # Errors
    ///
    /// Returns `ModelError::InvalidConfig` if a band is narrower than two
    /// columns or the total width overflows.
    pub fn from_widths(widths: [usize; NUM_BANDS]) -> Result<Self> {
        let mut ends = [0; NUM_BANDS];
        let mut end: usize = 0;
        for (band, width) in ShotBand::ALL.iter().zip(widths) {
            if width < 2 {
                return Err(ModelError::invalid_config(format!(
                    "{band}-shot band needs at least one class and a reject column, got width {width}"
                )));
            }
            end = end.checked_add(width).ok_or_else(|| {
                ModelError::invalid_config(format!("band widths {widths:?} overflow"))
            })?;
            ends[band.index()] = end;
        }
        Ok(Self { ends })
    }

    /// Returns the layout for a dataset.
    #[must_use]
    pub const fn for_dataset(dataset: Dataset) -> Self {
        dataset.shot_layout()
    }

    /// Half-open column range of a band in the raw score vector.
    #[must_use]
    pub const fn range(&self, band: ShotBand) -> Range<usize> {
        let index = band.index();
        let start = if index == 0 { 0 } else { self.ends[index - 1] };
        start..self.ends[index]
    }

    /// Number of raw columns in a band, reject column included.
    #[must_use]
    pub const fn width(&self, band: ShotBand) -> usize {
        let range = self.range(band);
        range.end - range.start
    }

    /// Number of real classes in a band.
    #[must_use]
    pub const fn band_classes(&self, band: ShotBand) -> usize {
        self.width(band) - 1
    }

    /// Per-band widths in raw-vector order.
    #[must_use]
    pub const fn widths(&self) -> [usize; NUM_BANDS] {
        [
            self.width(ShotBand::Many),
            self.width(ShotBand::Medium),
            self.width(ShotBand::Few),
        ]
    }

    /// Total length of the raw score vector.
    #[must_use]
    pub const fn raw_width(&self) -> usize {
        self.ends[NUM_BANDS - 1]
    }

    /// Number of real classes, reject columns excluded.
    #[must_use]
    pub const fn num_classes(&self) -> usize {
        self.raw_width() - NUM_BANDS
    }
}

impl TryFrom<[usize; NUM_BANDS]> for ShotLayout {
    type Error = ModelError;

    fn try_from(widths: [usize; NUM_BANDS]) -> Result<Self> {
        Self::from_widths(widths)
    }
}

impl From<ShotLayout> for [usize; NUM_BANDS] {
    fn from(layout: ShotLayout) -> Self {
        layout.widths()
    }
}

/// Per-band ordered lists of global class indices.
///
/// Entry `i` of a band's mask is the output class that receives the band's
/// `i`-th calibrated probability.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShotMasks {
    /// Class indices of the many-shot band.
    pub many: Vec<usize>,

    /// Class indices of the medium-shot band.
    pub medium: Vec<usize>,

    /// Class indices of the few-shot band.
    pub few: Vec<usize>,
}

impl ShotMasks {
    /// Creates masks from the three per-band index lists.
    #[must_use]
    pub const fn new(many: Vec<usize>, medium: Vec<usize>, few: Vec<usize>) -> Self {
        Self { many, medium, few }
    }

    /// Masks that keep each band's classes contiguous in band order.
    ///
    /// Class `0` is the first many-shot class and the last class is the last
    /// few-shot class.
    #[must_use]
    pub fn contiguous(layout: &ShotLayout) -> Self {
        let mut next = 0;
        let mut take = |count: usize| {
            let mask: Vec<usize> = (next..next + count).collect();
            next += count;
            mask
        };
        let many = take(layout.band_classes(ShotBand::Many));
        let medium = take(layout.band_classes(ShotBand::Medium));
        let few = take(layout.band_classes(ShotBand::Few));
        Self { many, medium, few }
    }

    /// Returns the mask of a band.
    #[must_use]
    pub fn band(&self, band: ShotBand) -> &[usize] {
        match band {
            ShotBand::Many => &self.many,
            ShotBand::Medium => &self.medium,
            ShotBand::Few => &self.few,
        }
    }

    /// Checks that the masks match the layout and partition its classes.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::InvalidMask` if a mask has the wrong length, an
    /// index is out of range, or a class is claimed by more than one entry.
    pub fn validate(&self, layout: &ShotLayout) -> Result<()> {
        let num_classes = layout.num_classes();
        let mut owner: Vec<Option<ShotBand>> = vec![None; num_classes];

        for band in ShotBand::ALL {
            let mask = self.band(band);
            let expected = layout.band_classes(band);
            if mask.len() != expected {
                return Err(ModelError::invalid_mask(format!(
                    "{band}-shot mask has {} entries, layout expects {expected}",
                    mask.len()
                )));
            }

            for &class in mask {
                let slot = owner.get_mut(class).ok_or_else(|| {
                    ModelError::invalid_mask(format!(
                        "{band}-shot mask index {class} is outside 0..{num_classes}"
                    ))
                })?;
                if let Some(previous) = slot.replace(band) {
                    return Err(ModelError::invalid_mask(format!(
                        "class {class} is claimed by both the {previous}-shot and {band}-shot masks"
                    )));
                }
            }
        }

        // Lengths sum to num_classes and nothing is claimed twice, so every
        // slot is owned exactly once.
        Ok(())
    }

    /// Column of the band-ordered concatenation that feeds each class.
    ///
    /// Concatenating the truncated band distributions in band order and
    /// selecting these columns yields the assembled class vector.
    ///
    /// # Errors
    ///
    /// Same conditions as [`ShotMasks::validate`].
    pub fn gather_index(&self, layout: &ShotLayout) -> Result<Vec<usize>> {
        self.validate(layout)?;
        let mut index = vec![0; layout.num_classes()];
        let concatenated = ShotBand::ALL
            .iter()
            .flat_map(|&band| self.band(band).iter().copied());
        for (column, class) in concatenated.enumerate() {
            index[class] = column;
        }
        Ok(index)
    }
}
