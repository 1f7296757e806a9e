use crate::internal::*;
use paddy_data::itertools::Itertools;

/// Reshape to an explicit shape. At most one dimension may be `-1`, it is
/// then inferred from the element count.
#[derive(Debug, Clone, new, Default, PartialEq, Eq, Hash)]
pub struct Reshape {
    pub shape: TVec<i64>,
}

impl Reshape {
    fn compute_shape(&self, input: &[usize]) -> PaddyResult<TVec<usize>> {
        let len = input.iter().product::<usize>();
        let wildcards = self.shape.iter().filter(|&&d| d == -1).count();
        ensure!(wildcards <= 1, "Reshape accepts at most one -1 dimension, got {:?}", self.shape);
        ensure!(
            self.shape.iter().all(|&d| d == -1 || d > 0),
            "Invalid reshape target {:?}",
            self.shape
        );
        let known = self.shape.iter().filter(|&&d| d > 0).map(|&d| d as usize).product::<usize>();
        let shape: TVec<usize> = self
            .shape
            .iter()
            .map(|&d| if d == -1 { if known == 0 { 0 } else { len / known } } else { d as usize })
            .collect();
        if shape.iter().product::<usize>() != len {
            return Err(ShapeMismatch::new("reshape", &shape, input).into());
        }
        Ok(shape)
    }
}

impl Op for Reshape {
    fn name(&self) -> Cow<'_, str> {
        "Reshape".into()
    }

    fn info(&self) -> Vec<String> {
        vec![format!("to shape: {}", self.shape.iter().join("x"))]
    }

    fn output_shape(&self, input: &[usize]) -> PaddyResult<TVec<usize>> {
        self.compute_shape(input)
    }

    fn eval(&self, input: Tensor) -> PaddyResult<Tensor> {
        let shape = self.compute_shape(input.shape())?;
        input.into_shape(&shape)
    }
}
