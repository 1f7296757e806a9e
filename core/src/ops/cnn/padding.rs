use crate::internal::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaddingSpec {
    Explicit(TVec<usize>, TVec<usize>),
    #[default]
    Valid,
    SameUpper,
    SameLower,
}

use PaddingSpec::*;

#[derive(Debug, Clone, new, PartialEq, Eq)]
pub struct ComputedPaddedDim {
    pub input: usize,
    pub output: usize,
    pub pad_before: usize,
    pub pad_after: usize,
}

impl PaddingSpec {
    pub fn compute(
        &self,
        input_spatial_shape: &[usize],
        kernel_spatial_shape: &[usize],
        strides: &[usize],
    ) -> PaddyResult<TVec<ComputedPaddedDim>> {
        ensure!(
            input_spatial_shape.len() == kernel_spatial_shape.len()
                && input_spatial_shape.len() == strides.len(),
            "Inconsistent geometry rank: input {:?}, kernel {:?}, strides {:?}",
            input_spatial_shape,
            kernel_spatial_shape,
            strides
        );
        (0..input_spatial_shape.len())
            .map(|d| {
                self.compute_one(d, input_spatial_shape[d], kernel_spatial_shape[d], strides[d])
            })
            .collect()
    }

    pub fn compute_one(
        &self,
        axis: usize,
        input: usize,
        kernel: usize,
        stride: usize,
    ) -> PaddyResult<ComputedPaddedDim> {
        ensure!(kernel > 0 && stride > 0, "Kernel and stride must be positive");
        let dim = match self {
            Valid => Self::valid(input, kernel, stride),
            Explicit(bef, aft) => {
                ensure!(
                    axis < bef.len() && axis < aft.len(),
                    "Explicit padding does not cover axis {}",
                    axis
                );
                Self::explicit(input, kernel, stride, bef[axis], aft[axis])
            }
            SameUpper => Self::same(input, kernel, stride, true),
            SameLower => Self::same(input, kernel, stride, false),
        };
        ensure!(
            dim.output > 0,
            "Kernel of size {} does not fit in padded input of size {} (axis {})",
            kernel,
            input + dim.pad_before + dim.pad_after,
            axis
        );
        Ok(dim)
    }

    fn valid(input: usize, kernel: usize, stride: usize) -> ComputedPaddedDim {
        let output = if input >= kernel { (input - kernel) / stride + 1 } else { 0 };
        ComputedPaddedDim::new(input, output, 0, 0)
    }

    fn explicit(
        input: usize,
        kernel: usize,
        stride: usize,
        bef: usize,
        aft: usize,
    ) -> ComputedPaddedDim {
        let padded = input + bef + aft;
        let output = if padded >= kernel { (padded - kernel) / stride + 1 } else { 0 };
        ComputedPaddedDim::new(input, output, bef, aft)
    }

    fn same(input: usize, kernel: usize, stride: usize, upper: bool) -> ComputedPaddedDim {
        if input == 0 {
            return ComputedPaddedDim::new(0, 0, 0, 0);
        }
        let output = input.div_ceil(stride);
        let pad = ((output - 1) * stride + kernel).saturating_sub(input);
        let lower_pad = pad / 2;
        let higher_pad = pad - lower_pad;
        let (before, after) = if upper { (lower_pad, higher_pad) } else { (higher_pad, lower_pad) };
        ComputedPaddedDim::new(input, output, before, after)
    }
}
