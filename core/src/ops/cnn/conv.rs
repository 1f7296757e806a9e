use crate::internal::*;
use ndarray::prelude::*;

use super::{Geometry, PaddingSpec};

/// 2D convolution over an NHWC input with an HWIO kernel.
#[derive(Debug, Clone, new)]
pub struct Conv2d {
    pub kernel: Arc<Tensor>,
    pub bias: Option<Arc<Tensor>>,
    pub strides: TVec<usize>,
    pub padding: PaddingSpec,
}

impl Conv2d {
    fn output_channels(&self) -> usize {
        self.kernel.shape()[3]
    }

    fn compute_geo(&self, input_shape: &[usize]) -> PaddyResult<Geometry> {
        crate::ops::check_rank("Conv2d kernel", self.kernel.shape(), 4)?;
        crate::ops::check_rank(&self.name(), input_shape, 4)?;
        if let Some(bias) = &self.bias {
            bias.ensure_shape("Conv2d bias", &[self.output_channels()])?;
        }
        if input_shape[3] != self.kernel.shape()[2] {
            let mut expected: TVec<usize> = input_shape.into();
            expected[3] = self.kernel.shape()[2];
            return Err(ShapeMismatch::new("Conv2d input channels", &expected, input_shape).into());
        }
        Geometry::new(input_shape, &self.kernel.shape()[0..2], &self.strides, &self.padding)
    }
}

impl Op for Conv2d {
    fn name(&self) -> Cow<'_, str> {
        "Conv2d".into()
    }

    fn info(&self) -> Vec<String> {
        vec![
            format!("Kernel (HWIO): {:?}, bias: {}", self.kernel.shape(), self.bias.is_some()),
            format!("Strides: {:?}, padding: {:?}", self.strides, self.padding),
        ]
    }

    fn params(&self) -> Vec<(&'static str, &Arc<Tensor>)> {
        let mut params = vec![("kernel", &self.kernel)];
        if let Some(bias) = &self.bias {
            params.push(("bias", bias));
        }
        params
    }

    fn output_shape(&self, input: &[usize]) -> PaddyResult<TVec<usize>> {
        let geo = self.compute_geo(input)?;
        let (h, w) = geo.output_hw();
        Ok(tvec!(geo.n, h, w, self.output_channels()))
    }

    fn eval(&self, input: Tensor) -> PaddyResult<Tensor> {
        let geo = self.compute_geo(input.shape())?;
        let input = input.into_array_ix::<Ix4>()?;
        let kernel = self.kernel.to_array_view().into_dimensionality::<Ix4>()?;
        let bias = match &self.bias {
            Some(b) => Some(b.to_array_view().into_dimensionality::<Ix1>()?),
            None => None,
        };
        let (oh, ow) = geo.output_hw();
        let mut output = Array4::<f32>::zeros((geo.n, oh, ow, self.output_channels()));
        for n in 0..geo.n {
            for oy in 0..oh {
                for ox in 0..ow {
                    let mut acc = output.slice_mut(s![n, oy, ox, ..]);
                    if let Some(bias) = &bias {
                        acc.assign(bias);
                    }
                    for (ky, kx, y, x) in geo.window(oy, ox) {
                        let pixel = input.slice(s![n, y, x, ..]);
                        acc += &pixel.dot(&kernel.slice(s![ky, kx, .., ..]));
                    }
                }
            }
        }
        Ok(output.into_tensor())
    }
}
