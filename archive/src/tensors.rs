//! Parameter tensors as NumPy `.npy` files.
use ndarray_npy::{ReadNpyExt, WriteNpyExt};
use paddy_core::internal::paddy_ndarray::ArrayD;
use paddy_core::internal::*;
use std::io::{Read, Write};

pub const TENSOR_EXTENSION: &str = "npy";

pub fn read_tensor(reader: impl Read) -> PaddyResult<Tensor> {
    let array = ArrayD::<f32>::read_npy(reader)?;
    Ok(array.into_tensor())
}

pub fn write_tensor(writer: impl Write, tensor: &Tensor) -> PaddyResult<()> {
    tensor.to_array_view().write_npy(writer)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn npy_keeps_shape_and_values() -> PaddyResult<()> {
        let tensor = Tensor::from_shape(&[2, 1, 3], &[0.5, -1.0, 2.0, 3.25, 0.0, f32::MAX])?;
        let mut buffer = vec![];
        write_tensor(&mut buffer, &tensor)?;
        assert_eq!(&buffer[0..6], b"\x93NUMPY");
        assert_eq!(read_tensor(&*buffer)?, tensor);
        Ok(())
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(read_tensor(&b"not a numpy file"[..]).is_err());
    }
}
