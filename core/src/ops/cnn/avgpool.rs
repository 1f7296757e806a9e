use crate::internal::*;
use ndarray::prelude::*;

use super::PoolSpec;

#[derive(Debug, Clone, new, Default, PartialEq, Eq, Hash)]
pub struct AvgPool {
    pub pool_spec: PoolSpec,
    pub count_include_pad: bool,
}

impl Op for AvgPool {
    fn name(&self) -> Cow<'_, str> {
        "AvgPool".into()
    }

    fn info(&self) -> Vec<String> {
        let mut info = self.pool_spec.info();
        info.push(format!("count_include_pad: {}", self.count_include_pad));
        info
    }

    fn output_shape(&self, input: &[usize]) -> PaddyResult<TVec<usize>> {
        self.pool_spec.output_shape(input)
    }

    fn eval(&self, input: Tensor) -> PaddyResult<Tensor> {
        let input = input.into_array_ix::<Ix4>()?;
        let geo = self.pool_spec.compute_geo(input.shape())?;
        let (oh, ow) = geo.output_hw();
        let full_window = (geo.kernel[0] * geo.kernel[1]) as f32;
        let mut output = Array4::<f32>::zeros((geo.n, oh, ow, geo.c));
        for n in 0..geo.n {
            for oy in 0..oh {
                for ox in 0..ow {
                    let mut values = output.slice_mut(s![n, oy, ox, ..]);
                    let mut count = 0usize;
                    for (_, _, y, x) in geo.window(oy, ox) {
                        values += &input.slice(s![n, y, x, ..]);
                        count += 1;
                    }
                    let divisor = if self.count_include_pad { full_window } else { count as f32 };
                    if divisor > 0.0 {
                        values /= divisor;
                    }
                }
            }
        }
        Ok(output.into_tensor())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ops::cnn::PaddingSpec;

    #[test]
    fn valid_average() -> PaddyResult<()> {
        let input = Tensor::from_shape(&[1, 2, 2, 1], &[1., 2., 3., 4.])?;
        let op = AvgPool::new(PoolSpec::new(tvec!(2, 2), PaddingSpec::Valid, None), false);
        op.eval(input)?.close_enough(&Tensor::from_shape(&[1, 1, 1, 1], &[2.5])?, false)
    }

    #[test]
    fn padding_in_divisor_or_not() -> PaddyResult<()> {
        let input = Tensor::from_shape(&[1, 1, 1, 1], &[4.])?;
        let spec = PoolSpec::new(tvec!(2, 2), PaddingSpec::SameUpper, Some(tvec!(1, 1)));
        let excluded = AvgPool::new(spec.clone(), false).eval(input.clone())?;
        excluded.close_enough(&Tensor::from_shape(&[1, 1, 1, 1], &[4.])?, false)?;
        let included = AvgPool::new(spec, true).eval(input)?;
        included.close_enough(&Tensor::from_shape(&[1, 1, 1, 1], &[1.])?, false)
    }
}
