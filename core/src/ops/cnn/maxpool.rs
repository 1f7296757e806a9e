use crate::internal::*;
use ndarray::prelude::*;

use super::PoolSpec;

#[derive(Debug, Clone, new, Default, PartialEq, Eq, Hash)]
pub struct MaxPool {
    pub pool_spec: PoolSpec,
}

impl Op for MaxPool {
    fn name(&self) -> Cow<'_, str> {
        "MaxPool".into()
    }

    fn info(&self) -> Vec<String> {
        self.pool_spec.info()
    }

    fn output_shape(&self, input: &[usize]) -> PaddyResult<TVec<usize>> {
        self.pool_spec.output_shape(input)
    }

    fn eval(&self, input: Tensor) -> PaddyResult<Tensor> {
        let input = input.into_array_ix::<Ix4>()?;
        let geo = self.pool_spec.compute_geo(input.shape())?;
        let (oh, ow) = geo.output_hw();
        let mut output = Array4::<f32>::from_elem((geo.n, oh, ow, geo.c), f32::NEG_INFINITY);
        for n in 0..geo.n {
            for oy in 0..oh {
                for ox in 0..ow {
                    let mut values = output.slice_mut(s![n, oy, ox, ..]);
                    for (_, _, y, x) in geo.window(oy, ox) {
                        values.zip_mut_with(&input.slice(s![n, y, x, ..]), |o, &i| *o = o.max(i));
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

    fn pool(kernel: usize, padding: PaddingSpec) -> MaxPool {
        MaxPool::new(PoolSpec::new(tvec!(kernel, kernel), padding, None))
    }

    #[test]
    fn two_by_two() -> PaddyResult<()> {
        let input = Tensor::from_shape(
            &[1, 4, 4, 1],
            &[1., 2., 3., 4., 5., 6., 7., 8., 9., 10., 11., 12., 13., 14., 15., 16.],
        )?;
        let output = pool(2, PaddingSpec::Valid).eval(input)?;
        output.close_enough(&Tensor::from_shape(&[1, 2, 2, 1], &[6., 8., 14., 16.])?, false)
    }

    #[test]
    fn channels_are_pooled_independently() -> PaddyResult<()> {
        let input = Tensor::from_shape(&[1, 1, 2, 2], &[1., 9., 5., 3.])?;
        pool(1, PaddingSpec::Valid).eval(input.clone())?.close_enough(&input, false)?;
        let op = MaxPool::new(PoolSpec::new(tvec!(1, 2), PaddingSpec::Valid, None));
        op.eval(input)?.close_enough(&Tensor::from_shape(&[1, 1, 1, 2], &[5., 9.])?, false)
    }

    #[test]
    fn same_padding_ignores_pad_values() -> PaddyResult<()> {
        let input = Tensor::from_shape(&[1, 3, 3, 1], &[-1.; 9])?;
        let op = pool(2, PaddingSpec::SameUpper);
        assert_eq!(&*op.output_shape(input.shape())?, &[1, 2, 2, 1]);
        op.eval(input)?.close_enough(&Tensor::from_shape(&[1, 2, 2, 1], &[-1.; 4])?, false)
    }
}
