//! Ops
use std::fmt;

pub mod array;
pub mod cnn;
pub mod nn;

use crate::internal::*;

/// A single step of the forward pass.
///
/// Ops are stateless and read-only: `eval` takes the activation by value and
/// only borrows the op, so one op can serve any number of concurrent passes.
pub trait Op: fmt::Debug + Send + Sync {
    fn name(&self) -> Cow<'_, str>;

    /// Human-readable parameters, one line each.
    fn info(&self) -> Vec<String> {
        vec![]
    }

    /// Parameter tensors, named, in a stable order.
    fn params(&self) -> Vec<(&'static str, &Arc<Tensor>)> {
        vec![]
    }

    /// Shape of the output for an input of `input` shape.
    ///
    /// Fails with a `ShapeMismatch` if the op can not consume that shape.
    fn output_shape(&self, input: &[usize]) -> PaddyResult<TVec<usize>>;

    fn eval(&self, input: Tensor) -> PaddyResult<Tensor>;
}

pub(crate) fn check_rank(op: &str, input: &[usize], rank: usize) -> PaddyResult<()> {
    if input.len() != rank {
        bail!("{} expects a rank {} input, got {:?}", op, rank, input)
    }
    Ok(())
}
