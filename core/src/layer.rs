//! The closed set of operations a network is made of.
use crate::internal::*;
use crate::ops::array::{Flatten, Reshape};
use crate::ops::cnn::{AvgPool, Conv2d, MaxPool};
use crate::ops::nn::{Activation, Dense, Dropout};

#[derive(Debug, Clone)]
pub enum Layer {
    Conv2d(Conv2d),
    MaxPool2d(MaxPool),
    AvgPool2d(AvgPool),
    Flatten(Flatten),
    Reshape(Reshape),
    Dense(Dense),
    Activation(Activation),
    Dropout(Dropout),
}

impl Layer {
    pub fn as_op(&self) -> &dyn Op {
        match self {
            Layer::Conv2d(op) => op,
            Layer::MaxPool2d(op) => op,
            Layer::AvgPool2d(op) => op,
            Layer::Flatten(op) => op,
            Layer::Reshape(op) => op,
            Layer::Dense(op) => op,
            Layer::Activation(op) => op,
            Layer::Dropout(op) => op,
        }
    }

    pub fn name(&self) -> Cow<'_, str> {
        self.as_op().name()
    }

    pub fn output_shape(&self, input: &[usize]) -> PaddyResult<TVec<usize>> {
        self.as_op().output_shape(input)
    }

    pub fn apply(&self, input: Tensor) -> PaddyResult<Tensor> {
        self.as_op().eval(input)
    }
}

macro_rules! layer_from {
    ($($op:ident => $variant:ident),*) => {
        $(impl From<$op> for Layer {
            fn from(op: $op) -> Layer {
                Layer::$variant(op)
            }
        })*
    };
}

layer_from!(
    Conv2d => Conv2d,
    MaxPool => MaxPool2d,
    AvgPool => AvgPool2d,
    Flatten => Flatten,
    Reshape => Reshape,
    Dense => Dense,
    Activation => Activation,
    Dropout => Dropout
);
