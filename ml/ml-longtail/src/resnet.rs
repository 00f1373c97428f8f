//! Residual network feature extractor.

use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig};
use burn::nn::{
    BatchNorm, BatchNormConfig, Dropout, DropoutConfig, Initializer, Linear, LinearConfig,
    PaddingConfig2d,
};
use burn::prelude::Backend;
use burn::tensor::Tensor;
use burn::tensor::activation::relu;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ModelError, Result};

/// Output planes of the four stages before block expansion.
const STAGE_PLANES: [usize; 4] = [64, 128, 256, 512];

/// Width of the optional dense projection.
const FC_DIM: usize = 512;

/// Residual block variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    /// Two 3x3 convolutions, no channel expansion.
    #[default]
    Basic,
    /// 1x1 reduce, 3x3, 1x1 expand (x4).
    Bottleneck,
}

impl BlockKind {
    /// Channel multiplier of the block output.
    #[must_use]
    pub const fn expansion(&self) -> usize {
        match self {
            Self::Basic => 1,
            Self::Bottleneck => 4,
        }
    }
}

/// Configuration for the residual network.
///
/// # Example
///
/// ```
/// use ml_longtail::{BlockKind, ResNetConfig};
///
/// let config = ResNetConfig::resnet152();
/// assert_eq!(config.block, BlockKind::Bottleneck);
/// assert_eq!(config.layers, [3, 8, 36, 3]);
/// assert_eq!(config.feature_dim(), 512);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResNetConfig {
    /// Block variant used in every stage.
    pub block: BlockKind,

    /// Number of blocks in each of the four stages.
    pub layers: [usize; 4],

    /// Append a `512`-wide dense projection with `ReLU`.
    pub use_fc: bool,

    /// Dropout probability on the features (`None` = disabled).
    pub dropout: Option<f64>,

    /// Channels of the input images.
    pub in_channels: usize,
}

impl Default for ResNetConfig {
    fn default() -> Self {
        Self::resnet10()
    }
}

impl ResNetConfig {
    /// Creates a configuration without the dense projection or dropout.
    #[must_use]
    pub const fn new(block: BlockKind, layers: [usize; 4]) -> Self {
        Self {
            block,
            layers,
            use_fc: false,
            dropout: None,
            in_channels: 3,
        }
    }

    /// ResNet-10: basic blocks, one per stage, with the dense projection.
    #[must_use]
    pub const fn resnet10() -> Self {
        Self::new(BlockKind::Basic, [1, 1, 1, 1]).with_fc(true)
    }

    /// ResNet-152: bottleneck blocks `[3, 8, 36, 3]`, with the dense projection.
    #[must_use]
    pub const fn resnet152() -> Self {
        Self::new(BlockKind::Bottleneck, [3, 8, 36, 3]).with_fc(true)
    }

    /// Sets whether the dense projection is appended.
    #[must_use]
    pub const fn with_fc(mut self, use_fc: bool) -> Self {
        self.use_fc = use_fc;
        self
    }

    /// Sets the dropout probability.
    #[must_use]
    pub const fn with_dropout(mut self, dropout: Option<f64>) -> Self {
        self.dropout = dropout;
        self
    }

    /// Sets the number of input channels.
    #[must_use]
    pub const fn with_in_channels(mut self, in_channels: usize) -> Self {
        self.in_channels = in_channels;
        self
    }

    /// Width of the extracted feature vector.
    #[must_use]
    pub const fn feature_dim(&self) -> usize {
        if self.use_fc {
            FC_DIM
        } else {
            STAGE_PLANES[3] * self.block.expansion()
        }
    }

    /// Validates the configuration.
    ///
    /// Returns `true` if every stage has a block, the input has channels and
    /// the dropout probability is in `[0, 1)`.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.layers.iter().all(|&n| n > 0)
            && self.in_channels > 0
            && self.dropout.is_none_or(|p| (0.0..1.0).contains(&p))
    }
}

/// 1x1 projection of the shortcut when a block changes shape.
#[derive(Debug, Module)]
pub struct Downsample<B: Backend> {
    conv: Conv2d<B>,
    bn: BatchNorm<B>,
}

impl<B: Backend> Downsample<B> {
    fn new(in_channels: usize, out_channels: usize, stride: usize, device: &B::Device) -> Self {
        Self {
            conv: conv(in_channels, out_channels, 1, stride, 0, device),
            bn: batch_norm(out_channels, device),
        }
    }

    fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        self.bn.forward(self.conv.forward(input))
    }
}

/// Basic or bottleneck residual block.
///
/// Basic blocks leave `conv3`/`bn3` empty; the stride sits on `conv1` for
/// basic blocks and on `conv2` for bottlenecks.
#[derive(Debug, Module)]
pub struct ResidualBlock<B: Backend> {
    conv1: Conv2d<B>,
    bn1: BatchNorm<B>,
    conv2: Conv2d<B>,
    bn2: BatchNorm<B>,
    conv3: Option<Conv2d<B>>,
    bn3: Option<BatchNorm<B>>,
    downsample: Option<Downsample<B>>,
}

impl<B: Backend> ResidualBlock<B> {
    fn new(
        kind: BlockKind,
        inplanes: usize,
        planes: usize,
        stride: usize,
        downsample: Option<Downsample<B>>,
        device: &B::Device,
    ) -> Self {
        match kind {
            BlockKind::Basic => Self {
                conv1: conv(inplanes, planes, 3, stride, 1, device),
                bn1: batch_norm(planes, device),
                conv2: conv(planes, planes, 3, 1, 1, device),
                bn2: batch_norm(planes, device),
                conv3: None,
                bn3: None,
                downsample,
            },
            BlockKind::Bottleneck => {
                let out = planes * kind.expansion();
                Self {
                    conv1: conv(inplanes, planes, 1, 1, 0, device),
                    bn1: batch_norm(planes, device),
                    conv2: conv(planes, planes, 3, stride, 1, device),
                    bn2: batch_norm(planes, device),
                    conv3: Some(conv(planes, out, 1, 1, 0, device)),
                    bn3: Some(batch_norm(out, device)),
                    downsample,
                }
            }
        }
    }

    /// Returns `true` for bottleneck blocks.
    #[must_use]
    pub const fn is_bottleneck(&self) -> bool {
        self.conv3.is_some()
    }

    fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let residual = match &self.downsample {
            Some(downsample) => downsample.forward(input.clone()),
            None => input.clone(),
        };

        let out = relu(self.bn1.forward(self.conv1.forward(input)));
        let mut out = self.bn2.forward(self.conv2.forward(out));

        if let (Some(conv3), Some(bn3)) = (&self.conv3, &self.bn3) {
            out = bn3.forward(conv3.forward(relu(out)));
        }

        relu(out + residual)
    }
}

/// Residual network mapping images to feature vectors.
///
/// Architecture: Stem (7x7 conv, BN, `ReLU`, max-pool) -> 4 residual stages
/// -> global average pool -> (optional) Linear + `ReLU` -> (optional) Dropout
///
/// Convolution weights are drawn from `N(0, sqrt(2 / (k * k * out_channels)))`
/// and batch-norm layers start at weight 1, bias 0. Parameter names follow the
/// common `conv1`/`bn1`/`layerN.i.*`/`fc_add` layout so external state dicts
/// line up by name.
///
/// # Type Parameters
///
/// - `B`: The Burn backend (e.g., `NdArray`, `Wgpu`)
///
/// # Example
///
/// ```ignore
/// use ml_longtail::{ResNet, ResNetConfig};
///
/// let model = ResNet::<MyBackend>::new(ResNetConfig::resnet10(), &device)?;
/// let (features, _) = model.forward(Tensor::zeros([2, 3, 224, 224], &device))?;
/// assert_eq!(features.dims(), [2, 512]);
/// ```
#[derive(Debug, Module)]
pub struct ResNet<B: Backend> {
    conv1: Conv2d<B>,
    bn1: BatchNorm<B>,
    maxpool: MaxPool2d,
    layer1: Vec<ResidualBlock<B>>,
    layer2: Vec<ResidualBlock<B>>,
    layer3: Vec<ResidualBlock<B>>,
    layer4: Vec<ResidualBlock<B>>,
    avgpool: AdaptiveAvgPool2d,
    fc_add: Option<Linear<B>>,
    dropout: Option<Dropout>,
    #[module(skip)]
    in_channels: usize,
    #[module(skip)]
    feature_dim: usize,
}

impl<B: Backend> ResNet<B> {
    /// Creates a new residual network.
    ///
    /// # Arguments
    ///
    /// - `config`: Network configuration
    /// - `device`: The device to create the model on
    ///
    /// # Errors
    ///
    /// Returns `ModelError::InvalidConfig` if the configuration is invalid.
    pub fn new(config: ResNetConfig, device: &B::Device) -> Result<Self> {
        if !config.is_valid() {
            return Err(ModelError::invalid_config(format!(
                "resnet needs positive stage depths and input channels and dropout in [0, 1), got {config:?}"
            )));
        }

        let conv1 = conv(config.in_channels, STAGE_PLANES[0], 7, 2, 3, device);
        let bn1 = batch_norm(STAGE_PLANES[0], device);
        let maxpool = MaxPool2dConfig::new([3, 3])
            .with_strides([2, 2])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init();

        let mut inplanes = STAGE_PLANES[0];
        let [layer1, layer2, layer3, layer4] = [0, 1, 2, 3].map(|stage| {
            let stride = if stage == 0 { 1 } else { 2 };
            make_layer(
                config.block,
                &mut inplanes,
                STAGE_PLANES[stage],
                config.layers[stage],
                stride,
                device,
            )
        });

        let fc_add = config
            .use_fc
            .then(|| LinearConfig::new(inplanes, FC_DIM).init(device));

        let dropout = config.dropout.map(|prob| {
            info!(prob, "using dropout");
            DropoutConfig::new(prob).init()
        });

        info!(
            block = ?config.block,
            layers = ?config.layers,
            feature_dim = config.feature_dim(),
            "built resnet"
        );

        Ok(Self {
            conv1,
            bn1,
            maxpool,
            layer1,
            layer2,
            layer3,
            layer4,
            avgpool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            fc_add,
            dropout,
            in_channels: config.in_channels,
            feature_dim: config.feature_dim(),
        })
    }

    /// Runs the forward pass.
    ///
    /// # Arguments
    ///
    /// - `images`: Input tensor of shape `[batch_size, in_channels, height, width]`
    ///
    /// # Returns
    ///
    /// Tuple of:
    /// - Features: `[batch_size, feature_dim]`
    /// - Feature maps: always `None`, kept for callers that expect the slot
    ///
    /// # Errors
    ///
    /// Returns `ModelError::ShapeMismatch` if the channel count is wrong.
    pub fn forward(&self, images: Tensor<B, 4>) -> Result<(Tensor<B, 2>, Option<Tensor<B, 4>>)> {
        let dims = images.dims();
        if dims[1] != self.in_channels {
            return Err(ModelError::shape_mismatch(
                format!("[_, {}, _, _]", self.in_channels),
                format!("{dims:?}"),
            ));
        }

        let mut x = relu(self.bn1.forward(self.conv1.forward(images)));
        x = self.maxpool.forward(x);

        for block in self
            .layer1
            .iter()
            .chain(&self.layer2)
            .chain(&self.layer3)
            .chain(&self.layer4)
        {
            x = block.forward(x);
        }

        let mut features: Tensor<B, 2> = self.avgpool.forward(x).flatten(1, 3);

        if let Some(fc_add) = &self.fc_add {
            features = relu(fc_add.forward(features));
        }
        if let Some(dropout) = &self.dropout {
            features = dropout.forward(features);
        }

        Ok((features, None))
    }

    /// Width of the extracted feature vector.
    #[must_use]
    pub const fn feature_dim(&self) -> usize {
        self.feature_dim
    }
}

/// Builds one stage; the first block carries the stride and any downsample.
fn make_layer<B: Backend>(
    kind: BlockKind,
    inplanes: &mut usize,
    planes: usize,
    blocks: usize,
    stride: usize,
    device: &B::Device,
) -> Vec<ResidualBlock<B>> {
    let out = planes * kind.expansion();
    let downsample =
        (stride != 1 || *inplanes != out).then(|| Downsample::new(*inplanes, out, stride, device));

    let mut layer = Vec::with_capacity(blocks);
    layer.push(ResidualBlock::new(kind, *inplanes, planes, stride, downsample, device));
    *inplanes = out;
    for _ in 1..blocks {
        layer.push(ResidualBlock::new(kind, out, planes, 1, None, device));
    }
    layer
}

fn conv<B: Backend>(
    in_channels: usize,
    out_channels: usize,
    kernel: usize,
    stride: usize,
    padding: usize,
    device: &B::Device,
) -> Conv2d<B> {
    #[allow(clippy::cast_precision_loss)]
    let fan_out = (kernel * kernel * out_channels) as f64;
    Conv2dConfig::new([in_channels, out_channels], [kernel, kernel])
        .with_stride([stride, stride])
        .with_padding(PaddingConfig2d::Explicit(padding, padding))
        .with_bias(false)
        .with_initializer(Initializer::Normal {
            mean: 0.0,
            std: (2.0 / fan_out).sqrt(),
        })
        .init(device)
}

fn batch_norm<B: Backend>(channels: usize, device: &B::Device) -> BatchNorm<B> {
    BatchNormConfig::new(channels).init(device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    fn device() -> <TestBackend as Backend>::Device {
        <TestBackend as Backend>::Device::default()
    }

    fn values<const D: usize>(tensor: Tensor<TestBackend, D>) -> Vec<f32> {
        tensor.into_data().to_vec::<f32>().unwrap_or_default()
    }

    #[test]
    fn block_expansion() {
        assert_eq!(BlockKind::Basic.expansion(), 1);
        assert_eq!(BlockKind::Bottleneck.expansion(), 4);
    }

    #[test]
    fn config_factories() {
        let r10 = ResNetConfig::resnet10();
        assert_eq!(r10.block, BlockKind::Basic);
        assert_eq!(r10.layers, [1, 1, 1, 1]);
        assert!(r10.use_fc);
        assert_eq!(r10.dropout, None);
        assert!(r10.is_valid());

        let r152 = ResNetConfig::resnet152();
        assert_eq!(r152.block, BlockKind::Bottleneck);
        assert_eq!(r152.layers, [3, 8, 36, 3]);
        assert!(r152.is_valid());
    }

    #[test]
    fn config_feature_dim() {
        assert_eq!(ResNetConfig::resnet10().with_fc(false).feature_dim(), 512);
        assert_eq!(ResNetConfig::resnet152().with_fc(false).feature_dim(), 2048);
        assert_eq!(ResNetConfig::resnet152().feature_dim(), 512);
    }

    #[test]
    fn config_invalid() {
        assert!(!ResNetConfig::new(BlockKind::Basic, [1, 0, 1, 1]).is_valid());
        assert!(!ResNetConfig::resnet10().with_in_channels(0).is_valid());
        assert!(!ResNetConfig::resnet10().with_dropout(Some(1.0)).is_valid());
        assert!(ResNetConfig::resnet10().with_dropout(Some(0.5)).is_valid());
    }

    #[test]
    fn config_serialization() {
        let config = ResNetConfig::resnet152().with_dropout(Some(0.2));
        let json = serde_json::to_string(&config).unwrap_or_default();
        assert!(json.contains("\"bottleneck\""));

        let parsed: std::result::Result<ResNetConfig, _> = serde_json::from_str(&json);
        assert_eq!(parsed.ok(), Some(config));
    }

    #[test]
    fn new_rejects_invalid_config() {
        let config = ResNetConfig::new(BlockKind::Basic, [0, 1, 1, 1]);
        let result = ResNet::<TestBackend>::new(config, &device());
        assert!(matches!(result, Err(ModelError::InvalidConfig(_))));
    }

    #[test]
    fn resnet10_forward() {
        let model = ResNet::<TestBackend>::new(ResNetConfig::resnet10(), &device())
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(model.feature_dim(), 512);

        let images = Tensor::<TestBackend, 4>::ones([2, 3, 32, 32], &device());
        let (features, maps) = model.forward(images).unwrap_or_else(|e| panic!("{e}"));

        assert_eq!(features.dims(), [2, 512]);
        assert!(maps.is_none());
        // fc_add is followed by ReLU.
        assert!(values(features).iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn bottleneck_forward_without_fc() {
        let config = ResNetConfig::new(BlockKind::Bottleneck, [1, 1, 1, 1]);
        let model = ResNet::<TestBackend>::new(config, &device()).unwrap_or_else(|e| panic!("{e}"));
        assert!(model.layer1[0].is_bottleneck());

        let images = Tensor::<TestBackend, 4>::zeros([1, 3, 32, 32], &device());
        let (features, _) = model.forward(images).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(features.dims(), [1, 2048]);
    }

    #[test]
    fn forward_rejects_wrong_channels() {
        let model = ResNet::<TestBackend>::new(ResNetConfig::resnet10(), &device())
            .unwrap_or_else(|e| panic!("{e}"));
        let images = Tensor::<TestBackend, 4>::zeros([1, 1, 32, 32], &device());
        assert!(matches!(model.forward(images), Err(ModelError::ShapeMismatch { .. })));
    }

    #[test]
    fn stage_structure() {
        let config = ResNetConfig::new(BlockKind::Basic, [2, 1, 1, 3]);
        let model = ResNet::<TestBackend>::new(config, &device()).unwrap_or_else(|e| panic!("{e}"));

        assert_eq!(model.layer1.len(), 2);
        assert_eq!(model.layer4.len(), 3);
        // Basic stage 1 keeps 64 channels at stride 1: no shortcut projection.
        assert!(model.layer1[0].downsample.is_none());
        assert!(model.layer2[0].downsample.is_some());
        assert!(model.layer4[1].downsample.is_none());
        assert!(!model.layer2[0].is_bottleneck());
        assert!(model.fc_add.is_none());
        assert!(model.dropout.is_none());
    }

    #[test]
    fn bottleneck_first_stage_projects_shortcut() {
        let config = ResNetConfig::new(BlockKind::Bottleneck, [1, 1, 1, 1]);
        let model = ResNet::<TestBackend>::new(config, &device()).unwrap_or_else(|e| panic!("{e}"));
        // 64 -> 256 channels even at stride 1.
        assert!(model.layer1[0].downsample.is_some());
    }

    #[test]
    fn dropout_is_built_when_requested() {
        let config = ResNetConfig::resnet10().with_dropout(Some(0.5));
        let model = ResNet::<TestBackend>::new(config, &device()).unwrap_or_else(|e| panic!("{e}"));
        assert!(model.dropout.is_some());
    }

    #[test]
    fn conv_weights_scaled_by_fan_out() {
        let model = ResNet::<TestBackend>::new(ResNetConfig::resnet10(), &device())
            .unwrap_or_else(|e| panic!("{e}"));

        let weights = values(model.conv1.weight.val());
        #[allow(clippy::cast_precision_loss)]
        let n = weights.len() as f32;
        let mean = weights.iter().sum::<f32>() / n;
        let std = (weights.iter().map(|w| (w - mean).powi(2)).sum::<f32>() / n).sqrt();

        let expected = (2.0_f32 / (7.0 * 7.0 * 64.0)).sqrt();
        assert!(mean.abs() < 0.1 * expected, "mean {mean} too far from zero");
        assert!((std - expected).abs() < 0.1 * expected, "std {std}, expected {expected}");
    }

    #[test]
    fn batch_norm_starts_at_identity() {
        let model = ResNet::<TestBackend>::new(ResNetConfig::resnet10(), &device())
            .unwrap_or_else(|e| panic!("{e}"));

        for bn in [&model.bn1, &model.layer3[0].bn2] {
            assert!(values(bn.gamma.val()).iter().all(|&v| (v - 1.0).abs() < f32::EPSILON));
            assert!(values(bn.beta.val()).iter().all(|&v| v.abs() < f32::EPSILON));
        }
    }

    /// Writes a safetensors file holding constant-filled `f32` tensors.
    fn write_safetensors(path: &std::path::Path, tensors: &[(&str, Vec<usize>, f32)]) {
        let mut header = serde_json::Map::new();
        let mut data = Vec::new();
        for (name, shape, fill) in tensors {
            let count: usize = shape.iter().product();
            let start = data.len();
            for _ in 0..count {
                data.extend_from_slice(&fill.to_le_bytes());
            }
            header.insert(
                (*name).to_string(),
                serde_json::json!({
                    "dtype": "F32",
                    "shape": shape,
                    "data_offsets": [start, data.len()],
                }),
            );
        }

        let mut header = serde_json::to_vec(&header).unwrap_or_default();
        while header.len() % 8 != 0 {
            header.push(b' ');
        }
        let mut bytes = (header.len() as u64).to_le_bytes().to_vec();
        bytes.extend_from_slice(&header);
        bytes.extend_from_slice(&data);
        std::fs::write(path, bytes).unwrap_or_else(|e| panic!("{e}"));
    }

    #[test]
    fn pretrained_state_dict_loads_by_name() {
        use crate::checkpoint::load_pretrained;

        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        let device = device();

        // DataParallel-style keys, one classifier tensor the extractor lacks.
        let path = dir.path().join("resnet10.safetensors");
        write_safetensors(
            &path,
            &[
                ("module.conv1.weight", vec![64, 3, 7, 7], 0.5),
                ("module.layer2.0.downsample.0.weight", vec![128, 64, 1, 1], 0.25),
                ("module.layer2.0.downsample.1.weight", vec![128], 2.0),
                ("module.layer2.0.downsample.1.bias", vec![128], -1.0),
                ("module.fc.weight", vec![10, 512], 0.0),
            ],
        );

        let model = ResNet::<TestBackend>::new(ResNetConfig::resnet10(), &device)
            .unwrap_or_else(|e| panic!("{e}"));
        let untouched = values(model.layer1[0].conv1.weight.val());

        let (model, report) = load_pretrained::<TestBackend, _>(model, &path.to_string_lossy(), None)
            .unwrap_or_else(|e| panic!("{e}"));

        // conv1 + bn1 (4) + four basic blocks (10 each) + three projections
        // (5 each) + fc_add (2) = 62 tensors, 4 of them in the file.
        assert_eq!(report.applied, 4);
        assert_eq!(report.missing, 58);
        assert_eq!(report.unused, 1);
        assert!(!report.is_complete());

        assert!(values(model.conv1.weight.val()).iter().all(|&v| (v - 0.5).abs() < f32::EPSILON));
        let downsample = model.layer2[0].downsample.as_ref();
        assert!(downsample.is_some());
        if let Some(downsample) = downsample {
            assert!(values(downsample.conv.weight.val()).iter().all(|&v| (v - 0.25).abs() < f32::EPSILON));
            assert!(values(downsample.bn.gamma.val()).iter().all(|&v| (v - 2.0).abs() < f32::EPSILON));
            assert!(values(downsample.bn.beta.val()).iter().all(|&v| (v + 1.0).abs() < f32::EPSILON));
            assert!(values(downsample.bn.running_mean.value()).iter().all(|&v| v.abs() < f32::EPSILON));
        }

        assert_eq!(values(model.layer1[0].conv1.weight.val()), untouched);
        assert!(values(model.bn1.gamma.val()).iter().all(|&v| (v - 1.0).abs() < f32::EPSILON));
    }

    #[test]
    fn pretrained_state_dict_without_matches_keeps_initialization() {
        use crate::checkpoint::load_pretrained;

        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        let path = dir.path().join("head.safetensors");
        write_safetensors(&path, &[("fc.weight", vec![10, 512], 0.0)]);

        let model = ResNet::<TestBackend>::new(ResNetConfig::resnet10(), &device())
            .unwrap_or_else(|e| panic!("{e}"));
        let initial = values(model.conv1.weight.val());

        let (model, report) = load_pretrained::<TestBackend, _>(model, &path.to_string_lossy(), None)
            .unwrap_or_else(|e| panic!("{e}"));

        assert_eq!(report.applied, 0);
        assert_eq!(report.missing, 62);
        assert_eq!(report.unused, 1);
        assert_eq!(values(model.conv1.weight.val()), initial);
    }
}
