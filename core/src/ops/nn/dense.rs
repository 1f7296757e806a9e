use crate::internal::*;
use ndarray::prelude::*;

/// Fully connected layer: `input . weights + bias`, weights laid out as
/// `(inputs, outputs)`.
#[derive(Debug, Clone, new)]
pub struct Dense {
    pub weights: Arc<Tensor>,
    pub bias: Option<Arc<Tensor>>,
}

impl Dense {
    pub fn units(&self) -> usize {
        self.weights.shape().get(1).copied().unwrap_or(0)
    }

    fn check(&self, input: &[usize]) -> PaddyResult<()> {
        crate::ops::check_rank("Dense weights", self.weights.shape(), 2)?;
        crate::ops::check_rank("Dense", input, 2)?;
        if let Some(bias) = &self.bias {
            bias.ensure_shape("Dense bias", &[self.units()])?;
        }
        if input[1] != self.weights.shape()[0] {
            return Err(
                ShapeMismatch::new("Dense input", &[input[0], self.weights.shape()[0]], input)
                    .into(),
            );
        }
        Ok(())
    }
}

impl Op for Dense {
    fn name(&self) -> Cow<'_, str> {
        "Dense".into()
    }

    fn info(&self) -> Vec<String> {
        vec![format!("Weights: {:?}, bias: {}", self.weights.shape(), self.bias.is_some())]
    }

    fn params(&self) -> Vec<(&'static str, &Arc<Tensor>)> {
        let mut params = vec![("weights", &self.weights)];
        if let Some(bias) = &self.bias {
            params.push(("bias", bias));
        }
        params
    }

    fn output_shape(&self, input: &[usize]) -> PaddyResult<TVec<usize>> {
        self.check(input)?;
        Ok(tvec!(input[0], self.units()))
    }

    fn eval(&self, input: Tensor) -> PaddyResult<Tensor> {
        self.check(input.shape())?;
        let input = input.into_array_ix::<Ix2>()?;
        let weights = self.weights.to_array_view().into_dimensionality::<Ix2>()?;
        let mut output = input.dot(&weights);
        if let Some(bias) = &self.bias {
            output += &bias.to_array_view().into_dimensionality::<Ix1>()?;
        }
        Ok(output.into_tensor())
    }
}
