//! # Paddy core
//!
//! Model artifact, layer operators and the inference runner of the paddy
//! image classifier.
//!
//! ## Example
//!
//! ```
//! use paddy_core::prelude::*;
//! use paddy_core::ops::nn::{Activation, Dense};
//! use paddy_core::ops::array::Flatten;
//!
//! // a 2x2 RGB input, flattened and projected over 3 classes
//! let contract = InputContract::new(2, 2);
//! let model = ModelArtifact::builder("toy", contract)
//!     .layer(Flatten::default())
//!     .layer(Dense::new(rctensor2(&[[0.0f32; 3]; 12]), Some(rctensor1(&[0.1, 0.7, 0.2]))))
//!     .layer(Activation::Softmax)
//!     .build()
//!     .unwrap();
//!
//! let runner = InferenceRunner::new(Arc::new(model));
//! let input = Tensor::zero(&[1, 2, 2, 3]);
//! let prediction = runner.infer(&input).unwrap();
//! assert_eq!(prediction.class, 1);
//! ```
//!
//! Real-life use-cases load the artifact from disk with `paddy-archive`
//! and build the input tensor with `paddy-vision`.

#[macro_use]
extern crate derive_new;
#[macro_use]
extern crate log;

pub mod contract;
pub mod layer;
pub mod model;
pub mod ops;
pub mod prediction;
pub mod runner;

pub use paddy_data;

pub mod prelude {
    pub use crate::contract::{ChannelOrder, InputContract, Interpolation, Normalization};
    pub use crate::layer::Layer;
    pub use crate::model::ModelArtifact;
    pub use crate::prediction::Prediction;
    pub use crate::runner::{InferenceRunner, infer};
    pub use paddy_data::prelude::*;
    pub use std::sync::Arc;
}

pub mod internal {
    pub use crate::ops::Op;
    pub use crate::prelude::*;
    pub use paddy_data::internal::*;
}
