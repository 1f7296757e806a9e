use super::Tensor;
use ndarray::*;
use std::sync::Arc;

pub fn tensor1(xs: &[f32]) -> Tensor {
    Tensor::from(arr1(xs))
}

pub fn tensor2<const N: usize>(xs: &[[f32; N]]) -> Tensor {
    Tensor::from(arr2(xs))
}

pub fn rctensor1(xs: &[f32]) -> Arc<Tensor> {
    Arc::new(tensor1(xs))
}

pub fn rctensor2<const N: usize>(xs: &[[f32; N]]) -> Arc<Tensor> {
    Arc::new(tensor2(xs))
}
