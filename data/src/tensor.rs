//! `Tensor`, paddy main data object of interest.
use crate::errors::ShapeMismatch;
use itertools::Itertools;
use ndarray::prelude::*;
use std::fmt;

pub mod litteral;

/// Tensor is a concrete, owned, n-dimensional array of f32.
///
/// Images, layer parameters and activations all travel as tensors. The
/// storage is always kept in standard (row-major) layout so that
/// `as_slice` never fails.
#[derive(Clone, PartialEq)]
pub struct Tensor {
    data: ArrayD<f32>,
}

impl Tensor {
    /// Create a tensor with a given shape and a slice of elements.
    /// The data is copied.
    pub fn from_shape(shape: &[usize], data: &[f32]) -> anyhow::Result<Tensor> {
        anyhow::ensure!(
            data.len() == shape.iter().product::<usize>(),
            "Shape product must be equal to data length ({:?} vs {})",
            shape,
            data.len()
        );
        Ok(Tensor { data: ArrayD::from_shape_vec(IxDyn(shape), data.to_vec())? })
    }

    pub fn zero(shape: &[usize]) -> Tensor {
        Tensor { data: ArrayD::zeros(IxDyn(shape)) }
    }

    pub fn rank(&self) -> usize {
        self.data.ndim()
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Access the data as a contiguous slice, in row-major order.
    pub fn as_slice(&self) -> &[f32] {
        // constructors and reshapes maintain standard layout
        self.data.as_slice().unwrap_or(&[])
    }

    pub fn to_array_view(&self) -> ArrayViewD<'_, f32> {
        self.data.view()
    }

    pub fn into_array(self) -> ArrayD<f32> {
        self.data
    }

    /// Consume the tensor as a statically-ranked array.
    pub fn into_array_ix<D: Dimension>(self) -> anyhow::Result<Array<f32, D>> {
        let rank = self.rank();
        self.data.into_dimensionality::<D>().map_err(|_| {
            anyhow::anyhow!(
                "Expected a tensor of rank {}, got rank {}",
                D::NDIM.map(|d| d.to_string()).unwrap_or_else(|| "?".into()),
                rank
            )
        })
    }

    /// Reinterpret the data under a new shape with the same element count.
    pub fn into_shape(self, shape: &[usize]) -> anyhow::Result<Tensor> {
        if shape.iter().product::<usize>() != self.len() {
            return Err(ShapeMismatch::new("reshape", shape, self.shape()).into());
        }
        let data = if self.data.is_standard_layout() {
            self.data
        } else {
            self.data.as_standard_layout().into_owned()
        };
        Ok(Tensor { data: data.into_shape_with_order(IxDyn(shape))? })
    }

    /// Fail with a `ShapeMismatch` if this tensor is not exactly `expected`.
    pub fn ensure_shape(&self, what: &str, expected: &[usize]) -> Result<(), ShapeMismatch> {
        if self.shape() != expected {
            return Err(ShapeMismatch::new(what, expected, self.shape()));
        }
        Ok(())
    }

    /// Index of the largest value, first one wins on ties.
    ///
    /// Returns `None` for empty tensors or if any value is NaN.
    pub fn argmax(&self) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for (ix, &v) in self.data.iter().enumerate() {
            if v.is_nan() {
                return None;
            }
            if best.map(|(_, b)| v > b).unwrap_or(true) {
                best = Some((ix, v));
            }
        }
        best.map(|(ix, _)| ix)
    }

    /// Shape and leading values, for logs.
    fn dump(&self) -> String {
        let trunc = self.len() > 12;
        let data = self.data.iter().take(if trunc { 12 } else { self.len() }).join(", ");
        format!("{},f32 {}{}", self.shape().iter().join(","), data, if trunc { "..." } else { "" })
    }

    /// Compare two tensors, allowing for rounding errors.
    pub fn close_enough(&self, other: &Self, approx: bool) -> anyhow::Result<()> {
        if self.shape() != other.shape() {
            anyhow::bail!("Shape mismatch {:?} != {:?}", self.shape(), other.shape())
        }
        let (atol, rtol) = if approx { (5e-4, 1e-4) } else { (0.0, 0.0) };
        ndarray::indices_of(&self.data).into_iter().try_for_each(|indices| {
            let a = self.data[&indices];
            let b = other.data[&indices];
            if !((a.is_nan() && b.is_nan())
                || (a.is_infinite() && b.is_infinite() && a.signum() == b.signum())
                || (a - b).abs() <= atol + rtol * b.abs())
            {
                anyhow::bail!("Mismatch at {:?} {} != {}", indices.slice(), a, b)
            }
            Ok(())
        })
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "{}", self.dump())
    }
}

pub trait IntoTensor: Sized {
    fn into_tensor(self) -> Tensor;
}

impl<D: Dimension> IntoTensor for Array<f32, D> {
    fn into_tensor(self) -> Tensor {
        Tensor::from(self)
    }
}

impl IntoTensor for Tensor {
    fn into_tensor(self) -> Tensor {
        self
    }
}

impl<D: Dimension> From<Array<f32, D>> for Tensor {
    fn from(it: Array<f32, D>) -> Tensor {
        let data = it.into_dyn();
        let data =
            if data.is_standard_layout() { data } else { data.as_standard_layout().into_owned() };
        Tensor { data }
    }
}

#[cfg(test)]
mod tests {
    use super::litteral::*;
    use super::*;
    use proptest::collection::vec;
    use proptest::prelude::*;

    #[test]
    fn from_shape_checks_len() {
        assert!(Tensor::from_shape(&[2, 3], &[0.0; 5]).is_err());
        let t = Tensor::from_shape(&[2, 3], &[0.0; 6]).unwrap();
        assert_eq!(t.shape(), &[2, 3]);
    }

    #[test]
    fn transposed_array_is_stored_standard() {
        let a = arr2(&[[1f32, 2.0], [3.0, 4.0]]).reversed_axes();
        let t = Tensor::from(a);
        assert_eq!(t.as_slice(), &[1.0, 3.0, 2.0, 4.0]);
    }

    #[test]
    fn reshape_refuses_other_len() {
        let t = Tensor::zero(&[1, 4, 4, 3]);
        let e = t.into_shape(&[1, 40]).unwrap_err();
        assert!(e.downcast_ref::<ShapeMismatch>().is_some());
    }

    #[test]
    fn argmax_first_on_ties() {
        assert_eq!(tensor1(&[0.1, 0.7, 0.2]).argmax(), Some(1));
        assert_eq!(tensor1(&[0.5, 0.5]).argmax(), Some(0));
        assert_eq!(tensor1(&[0.5, f32::NAN]).argmax(), None);
        assert_eq!(tensor1(&[]).argmax(), None);
    }

    #[test]
    fn dump_truncates() {
        let t = Tensor::zero(&[1, 20]);
        assert!(t.dump().ends_with("..."));
        assert_eq!(format!("{:?}", tensor1(&[1.0, 2.0])), "2,f32 1, 2");
    }

    proptest! {
        #[test]
        fn reshape_keeps_data(data in vec(-10f32..10f32, 1..64)) {
            let t = tensor1(&data);
            let len = t.len();
            let r = t.clone().into_shape(&[1, len, 1]).unwrap();
            prop_assert_eq!(r.as_slice(), t.as_slice());
        }

        #[test]
        fn argmax_points_at_max(data in vec(-10f32..10f32, 1..64)) {
            let ix = tensor1(&data).argmax().unwrap();
            prop_assert!(data.iter().all(|&v| v <= data[ix]));
        }
    }
}
