use crate::internal::*;

use super::{Geometry, PaddingSpec};

#[derive(Debug, Clone, new, Default, PartialEq, Eq, Hash)]
pub struct PoolSpec {
    pub kernel_shape: TVec<usize>,
    pub padding: PaddingSpec,
    pub strides: Option<TVec<usize>>,
}

impl PoolSpec {
    pub fn info(&self) -> Vec<String> {
        vec![format!(
            "Kernel shape:{:?} (strides:{:?}, padding:{:?})",
            self.kernel_shape,
            self.strides(),
            self.padding,
        )]
    }

    /// Strides default to the kernel shape: non-overlapping windows.
    pub fn strides(&self) -> TVec<usize> {
        self.strides.clone().unwrap_or_else(|| self.kernel_shape.clone())
    }

    pub fn compute_geo(&self, input_full_shape: &[usize]) -> PaddyResult<Geometry> {
        Geometry::new(input_full_shape, &self.kernel_shape, &self.strides(), &self.padding)
    }

    pub fn output_shape(&self, input_full_shape: &[usize]) -> PaddyResult<TVec<usize>> {
        let geo = self.compute_geo(input_full_shape)?;
        let (h, w) = geo.output_hw();
        Ok(tvec!(geo.n, h, w, geo.c))
    }
}
