use crate::proto::*;
use paddy_core::internal::*;
use paddy_core::ops::array::{Flatten, Reshape};
use paddy_core::ops::cnn::{AvgPool, Conv2d, MaxPool, PoolSpec};
use paddy_core::ops::nn::{Activation, Dense, Dropout};
use std::collections::HashMap;

struct FromProto<'a> {
    tensors: &'a HashMap<String, Arc<Tensor>>,
}

impl FromProto<'_> {
    fn tensor(&self, name: &str) -> PaddyResult<Arc<Tensor>> {
        self.tensors
            .get(name)
            .cloned()
            .with_context(|| format!("Tensor {name:?} is referenced but not found"))
    }

    fn optional_tensor(&self, name: &Option<String>) -> PaddyResult<Option<Arc<Tensor>>> {
        name.as_deref().map(|n| self.tensor(n)).transpose()
    }

    fn layer(&self, proto: &LayerProto) -> PaddyResult<Layer> {
        let layer = match proto {
            LayerProto::Conv2d { kernel, bias, strides, padding } => Conv2d::new(
                self.tensor(kernel)?,
                self.optional_tensor(bias)?,
                strides.clone(),
                padding.clone(),
            )
            .into(),
            LayerProto::MaxPool2d { kernel_shape, strides, padding } => {
                MaxPool::new(PoolSpec::new(kernel_shape.clone(), padding.clone(), strides.clone()))
                    .into()
            }
            LayerProto::AvgPool2d { kernel_shape, strides, padding, count_include_pad } => {
                AvgPool::new(
                    PoolSpec::new(kernel_shape.clone(), padding.clone(), strides.clone()),
                    *count_include_pad,
                )
                .into()
            }
            LayerProto::Flatten { axis } => Flatten::new(*axis).into(),
            LayerProto::Reshape { shape } => Reshape::new(shape.clone()).into(),
            LayerProto::Dense { weights, bias } => {
                Dense::new(self.tensor(weights)?, self.optional_tensor(bias)?).into()
            }
            LayerProto::Relu => Activation::Relu.into(),
            LayerProto::LeakyRelu { alpha } => Activation::LeakyRelu { alpha: *alpha }.into(),
            LayerProto::Sigmoid => Activation::Sigmoid.into(),
            LayerProto::Tanh => Activation::Tanh.into(),
            LayerProto::Softmax => Activation::Softmax.into(),
            LayerProto::Dropout { rate } => {
                ensure!((0.0..1.0).contains(rate), "Dropout rate must be in [0, 1), got {}", rate);
                Dropout::new(*rate).into()
            }
        };
        Ok(layer)
    }
}

/// Build and validate a model from its manifest and tensors.
pub fn from_proto_model(
    manifest: &Manifest,
    tensors: &HashMap<String, Arc<Tensor>>,
) -> PaddyResult<ModelArtifact> {
    ensure!(
        manifest.format_version == FORMAT_VERSION,
        "Unsupported manifest format version {} (expected {})",
        manifest.format_version,
        FORMAT_VERSION
    );
    let deser = FromProto { tensors };
    let mut builder = ModelArtifact::builder(manifest.name.clone(), manifest.input.clone());
    if let Some(version) = &manifest.version {
        builder = builder.version(version.clone());
    }
    if let Some(labels) = &manifest.labels {
        builder = builder.labels(labels.iter().cloned());
    }
    for (ix, proto) in manifest.layers.iter().enumerate() {
        let layer = deser.layer(proto).with_context(|| format!("Loading layer #{ix}"))?;
        builder = builder.layer(layer);
    }
    let referenced: Vec<&str> = manifest.layers.iter().flat_map(|l| l.tensor_names()).collect();
    for name in tensors.keys() {
        if !referenced.contains(&name.as_str()) {
            warn!("Tensor {name:?} is not used by any layer");
        }
    }
    builder.build()
}
