use crate::TVec;
use itertools::Itertools;
use std::fmt;

/// A tensor reached a consumer that was built for another shape.
///
/// Raised instead of padding or truncating. When it escapes the runner it
/// means the preprocessing parameters and the loaded model disagree, which
/// is a deployment problem rather than a bad request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeMismatch {
    pub what: String,
    pub expected: TVec<usize>,
    pub found: TVec<usize>,
}

impl ShapeMismatch {
    pub fn new(what: impl Into<String>, expected: &[usize], found: &[usize]) -> ShapeMismatch {
        ShapeMismatch { what: what.into(), expected: expected.into(), found: found.into() }
    }
}

impl fmt::Display for ShapeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Shape mismatch for {}: expected {}, got {}",
            self.what,
            self.expected.iter().join("x"),
            self.found.iter().join("x")
        )
    }
}

impl std::error::Error for ShapeMismatch {}
