use crate::internal::*;

/// Collapse the axes before and after `axis` into a rank 2 tensor.
#[derive(Debug, Clone, new, PartialEq, Eq, Hash)]
pub struct Flatten {
    pub axis: usize,
}

impl Default for Flatten {
    /// Keep the batch axis.
    fn default() -> Flatten {
        Flatten { axis: 1 }
    }
}

impl Flatten {
    fn compute_shape(&self, shape: &[usize]) -> PaddyResult<[usize; 2]> {
        ensure!(self.axis <= shape.len(), "Can not flatten {:?} at axis {}", shape, self.axis);
        let shape_0 = shape[..self.axis].iter().product();
        let shape_1 = shape[self.axis..].iter().product();
        Ok([shape_0, shape_1])
    }
}

impl Op for Flatten {
    fn name(&self) -> Cow<'_, str> {
        "Flatten".into()
    }

    fn info(&self) -> Vec<String> {
        vec![format!("axis: {}", self.axis)]
    }

    fn output_shape(&self, input: &[usize]) -> PaddyResult<TVec<usize>> {
        Ok(self.compute_shape(input)?.into_iter().collect())
    }

    fn eval(&self, input: Tensor) -> PaddyResult<Tensor> {
        let shape = self.compute_shape(input.shape())?;
        input.into_shape(&shape)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn keeps_batch_axis() -> PaddyResult<()> {
        let output = Flatten::default().eval(Tensor::zero(&[1, 4, 4, 8]))?;
        assert_eq!(output.shape(), &[1, 128]);
        Ok(())
    }

    #[test]
    fn keeps_row_major_order() -> PaddyResult<()> {
        let input = Tensor::from_shape(&[1, 2, 1, 2], &[1., 2., 3., 4.])?;
        let output = Flatten::default().eval(input)?;
        assert_eq!(output.as_slice(), &[1., 2., 3., 4.]);
        Ok(())
    }
}
