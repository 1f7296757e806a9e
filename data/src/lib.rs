#[macro_use]
mod macros;

/// A Smallvec instantiation with 4 embeddable values.
///
/// Used about everywhere in paddy for tensor shapes: a batched NHWC image
/// fits inline.
pub type TVec<T> = smallvec::SmallVec<[T; 4]>;

pub type PaddyResult<T> = anyhow::Result<T>;
pub type PaddyError = anyhow::Error;

pub mod prelude {
    pub use crate::errors::ShapeMismatch;
    pub use crate::tensor::litteral::*;
    pub use crate::tensor::{IntoTensor, Tensor};
    pub use crate::tvec;
    pub use crate::TVec;
    pub use crate::{PaddyError, PaddyResult};
}

pub mod internal {
    pub use crate::prelude::*;
    pub use anyhow::{anyhow, bail, ensure, format_err, Context as PaddyResultExt};
    pub use ndarray as paddy_ndarray;
    pub use smallvec as paddy_smallvec;
    pub use std::borrow::Cow;
    pub use std::sync::Arc;
}

pub use anyhow;
pub use itertools;
pub use ndarray;

mod errors;
mod tensor;
