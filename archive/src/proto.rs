//! `model.json`, the manifest of an artifact container.
//!
//! Layers reference their parameters by tensor name; each name maps to a
//! `<name>.npy` entry next to the manifest.
use paddy_core::internal::*;
use paddy_core::ops::cnn::PaddingSpec;
use serde::{Deserialize, Serialize};

pub const MANIFEST_FILENAME: &str = "model.json";
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default = "format_version")]
    pub format_version: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub input: InputContract,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    pub layers: Vec<LayerProto>,
}

fn format_version() -> u32 {
    FORMAT_VERSION
}

fn unit_strides() -> TVec<usize> {
    tvec!(1, 1)
}

fn batch_axis() -> usize {
    1
}

fn is_false(b: &bool) -> bool {
    !*b
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LayerProto {
    Conv2d {
        kernel: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bias: Option<String>,
        #[serde(default = "unit_strides")]
        strides: TVec<usize>,
        #[serde(default)]
        padding: PaddingSpec,
    },
    MaxPool2d {
        kernel_shape: TVec<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        strides: Option<TVec<usize>>,
        #[serde(default)]
        padding: PaddingSpec,
    },
    AvgPool2d {
        kernel_shape: TVec<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        strides: Option<TVec<usize>>,
        #[serde(default)]
        padding: PaddingSpec,
        #[serde(default, skip_serializing_if = "is_false")]
        count_include_pad: bool,
    },
    Flatten {
        #[serde(default = "batch_axis")]
        axis: usize,
    },
    Reshape {
        shape: TVec<i64>,
    },
    Dense {
        weights: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bias: Option<String>,
    },
    Relu,
    LeakyRelu {
        alpha: f32,
    },
    Sigmoid,
    Tanh,
    Softmax,
    Dropout {
        #[serde(default)]
        rate: f32,
    },
}

impl LayerProto {
    /// Names of the tensors this layer needs.
    pub fn tensor_names(&self) -> Vec<&str> {
        match self {
            LayerProto::Conv2d { kernel, bias, .. } => {
                std::iter::once(kernel.as_str()).chain(bias.as_deref()).collect()
            }
            LayerProto::Dense { weights, bias } => {
                std::iter::once(weights.as_str()).chain(bias.as_deref()).collect()
            }
            _ => vec![],
        }
    }
}
