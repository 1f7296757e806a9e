//! Spatial ops over NHWC tensors.
use crate::internal::*;

mod avgpool;
mod conv;
mod maxpool;
mod padding;
mod pools;

pub use self::avgpool::AvgPool;
pub use self::conv::Conv2d;
pub use self::maxpool::MaxPool;
pub use self::padding::{ComputedPaddedDim, PaddingSpec};
pub use self::pools::PoolSpec;

/// Resolved sliding-window geometry for one NHWC input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Geometry {
    pub n: usize,
    pub c: usize,
    pub rows: ComputedPaddedDim,
    pub cols: ComputedPaddedDim,
    pub kernel: [usize; 2],
    pub strides: [usize; 2],
}

impl Geometry {
    pub fn new(
        input_shape: &[usize],
        kernel: &[usize],
        strides: &[usize],
        padding: &PaddingSpec,
    ) -> PaddyResult<Geometry> {
        crate::ops::check_rank("spatial op", input_shape, 4)?;
        ensure!(kernel.len() == 2, "Expected a 2D kernel shape, got {:?}", kernel);
        ensure!(strides.len() == 2, "Expected 2D strides, got {:?}", strides);
        let computed = padding.compute(&input_shape[1..3], kernel, strides)?;
        Ok(Geometry {
            n: input_shape[0],
            c: input_shape[3],
            rows: computed[0].clone(),
            cols: computed[1].clone(),
            kernel: [kernel[0], kernel[1]],
            strides: [strides[0], strides[1]],
        })
    }

    pub fn output_hw(&self) -> (usize, usize) {
        (self.rows.output, self.cols.output)
    }

    /// Kernel and input coordinates `(ky, kx, y, x)` of the window feeding
    /// output pixel `(oy, ox)`. Positions falling in the padding are skipped.
    pub fn window(
        &self,
        oy: usize,
        ox: usize,
    ) -> impl Iterator<Item = (usize, usize, usize, usize)> + '_ {
        let y0 = (oy * self.strides[0]) as isize - self.rows.pad_before as isize;
        let x0 = (ox * self.strides[1]) as isize - self.cols.pad_before as isize;
        (0..self.kernel[0])
            .flat_map(move |ky| (0..self.kernel[1]).map(move |kx| (ky, kx)))
            .filter_map(move |(ky, kx)| {
                let y = y0 + ky as isize;
                let x = x0 + kx as isize;
                if y >= 0
                    && x >= 0
                    && (y as usize) < self.rows.input
                    && (x as usize) < self.cols.input
                {
                    Some((ky, kx, y as usize, x as usize))
                } else {
                    None
                }
            })
    }
}
