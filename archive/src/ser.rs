use crate::proto::*;
use paddy_core::internal::*;
use paddy_core::ops::array::{Flatten, Reshape};
use paddy_core::ops::cnn::{AvgPool, Conv2d, MaxPool};
use paddy_core::ops::nn::{Activation, Dense};

/// A manifest, plus the named tensors it refers to.
#[derive(Debug, Clone)]
pub struct ProtoModel {
    pub manifest: Manifest,
    pub tensors: Vec<(String, Arc<Tensor>)>,
}

struct IntoProto {
    tensors: Vec<(String, Arc<Tensor>)>,
}

impl IntoProto {
    fn tensor(&mut self, layer_ix: usize, param: &str, tensor: &Arc<Tensor>) -> String {
        let name = format!("layer{layer_ix}.{param}");
        self.tensors.push((name.clone(), tensor.clone()));
        name
    }

    fn optional_tensor(
        &mut self,
        layer_ix: usize,
        param: &str,
        tensor: &Option<Arc<Tensor>>,
    ) -> Option<String> {
        tensor.as_ref().map(|t| self.tensor(layer_ix, param, t))
    }

    fn layer(&mut self, ix: usize, layer: &Layer) -> LayerProto {
        match layer {
            Layer::Conv2d(Conv2d { kernel, bias, strides, padding }) => LayerProto::Conv2d {
                kernel: self.tensor(ix, "kernel", kernel),
                bias: self.optional_tensor(ix, "bias", bias),
                strides: strides.clone(),
                padding: padding.clone(),
            },
            Layer::MaxPool2d(MaxPool { pool_spec }) => LayerProto::MaxPool2d {
                kernel_shape: pool_spec.kernel_shape.clone(),
                strides: pool_spec.strides.clone(),
                padding: pool_spec.padding.clone(),
            },
            Layer::AvgPool2d(AvgPool { pool_spec, count_include_pad }) => LayerProto::AvgPool2d {
                kernel_shape: pool_spec.kernel_shape.clone(),
                strides: pool_spec.strides.clone(),
                padding: pool_spec.padding.clone(),
                count_include_pad: *count_include_pad,
            },
            Layer::Flatten(Flatten { axis }) => LayerProto::Flatten { axis: *axis },
            Layer::Reshape(Reshape { shape }) => LayerProto::Reshape { shape: shape.clone() },
            Layer::Dense(Dense { weights, bias }) => LayerProto::Dense {
                weights: self.tensor(ix, "weights", weights),
                bias: self.optional_tensor(ix, "bias", bias),
            },
            Layer::Activation(activation) => match activation {
                Activation::Relu => LayerProto::Relu,
                Activation::LeakyRelu { alpha } => LayerProto::LeakyRelu { alpha: *alpha },
                Activation::Sigmoid => LayerProto::Sigmoid,
                Activation::Tanh => LayerProto::Tanh,
                Activation::Softmax => LayerProto::Softmax,
            },
            Layer::Dropout(dropout) => LayerProto::Dropout { rate: dropout.rate },
        }
    }
}

pub fn to_proto_model(model: &ModelArtifact) -> ProtoModel {
    let mut ser = IntoProto { tensors: vec![] };
    let layers = model.layers().iter().enumerate().map(|(ix, l)| ser.layer(ix, l)).collect();
    let manifest = Manifest {
        format_version: FORMAT_VERSION,
        name: model.name().to_string(),
        version: model.version().map(|v| v.to_string()),
        input: model.contract().clone(),
        labels: model.labels().map(|l| l.to_vec()),
        layers,
    };
    ProtoModel { manifest, tensors: ser.tensors }
}
