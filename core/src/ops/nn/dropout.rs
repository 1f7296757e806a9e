use crate::internal::*;

/// Training-time regularization, a no-op at inference.
#[derive(Debug, Clone, Copy, new, Default, PartialEq)]
pub struct Dropout {
    pub rate: f32,
}

impl Op for Dropout {
    fn name(&self) -> Cow<'_, str> {
        "Dropout".into()
    }

    fn info(&self) -> Vec<String> {
        vec![format!("rate: {} (inactive)", self.rate)]
    }

    fn output_shape(&self, input: &[usize]) -> PaddyResult<TVec<usize>> {
        Ok(input.into())
    }

    fn eval(&self, input: Tensor) -> PaddyResult<Tensor> {
        Ok(input)
    }
}
