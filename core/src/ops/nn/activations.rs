use crate::internal::*;
use ndarray::prelude::*;

/// Element-wise non-linearities, plus softmax over the last axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Activation {
    Relu,
    LeakyRelu { alpha: f32 },
    Sigmoid,
    Tanh,
    Softmax,
}

impl Activation {
    fn eval_one(&self, x: f32) -> f32 {
        match self {
            Activation::Relu => x.max(0.0),
            Activation::LeakyRelu { alpha } => {
                if x >= 0.0 {
                    x
                } else {
                    alpha * x
                }
            }
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Activation::Tanh => x.tanh(),
            Activation::Softmax => unreachable!(),
        }
    }
}

pub(crate) fn softmax_in_place(mut values: ArrayViewMut1<f32>) {
    let max = values.fold(f32::NEG_INFINITY, |acc, &v| acc.max(v));
    values.mapv_inplace(|v| (v - max).exp());
    let sum = values.sum();
    values /= sum;
}

impl Op for Activation {
    fn name(&self) -> Cow<'_, str> {
        match self {
            Activation::Relu => "Relu",
            Activation::LeakyRelu { .. } => "LeakyRelu",
            Activation::Sigmoid => "Sigmoid",
            Activation::Tanh => "Tanh",
            Activation::Softmax => "Softmax",
        }
        .into()
    }

    fn info(&self) -> Vec<String> {
        match self {
            Activation::LeakyRelu { alpha } => vec![format!("alpha: {alpha}")],
            Activation::Softmax => vec!["axis: -1".to_string()],
            _ => vec![],
        }
    }

    fn output_shape(&self, input: &[usize]) -> PaddyResult<TVec<usize>> {
        if *self == Activation::Softmax {
            ensure!(!input.is_empty(), "Softmax needs at least one axis");
        }
        Ok(input.into())
    }

    fn eval(&self, input: Tensor) -> PaddyResult<Tensor> {
        let mut array = input.into_array();
        if *self == Activation::Softmax {
            ensure!(array.ndim() > 0, "Softmax needs at least one axis");
            let last = Axis(array.ndim() - 1);
            for lane in array.lanes_mut(last) {
                softmax_in_place(lane);
            }
        } else {
            array.mapv_inplace(|x| self.eval_one(x));
        }
        Ok(array.into_tensor())
    }
}
