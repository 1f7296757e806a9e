//! # Paddy vision
//!
//! Turns uploaded image bytes into the tensor a model expects, as declared
//! by its `InputContract`: decode, convert to RGB, resize, reorder channels,
//! normalize and add the batch axis.
//!
//! ```no_run
//! use paddy_core::prelude::*;
//!
//! let bytes = std::fs::read("leaf.jpg").unwrap();
//! let tensor = paddy_vision::preprocess(&bytes, &InputContract::new(64, 64)).unwrap();
//! assert_eq!(tensor.shape(), &[1, 64, 64, 3]);
//! ```
#[macro_use]
extern crate log;

use image::DynamicImage;
use image::imageops::{self, FilterType};
use paddy_core::internal::paddy_ndarray::Array4;
use paddy_core::internal::*;
use std::fmt;

/// The uploaded bytes are not an image we can read.
///
/// This is the only preprocessing failure caused by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    pub reason: String,
}

impl DecodeError {
    fn new(reason: impl Into<String>) -> DecodeError {
        DecodeError { reason: reason.into() }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Could not decode image: {}", self.reason)
    }
}

impl std::error::Error for DecodeError {}

/// Decode an image container, guessing its format from the magic bytes.
pub fn decode(raw: &[u8]) -> Result<DynamicImage, DecodeError> {
    if raw.is_empty() {
        return Err(DecodeError::new("empty input"));
    }
    let format = image::guess_format(raw).map_err(|e| DecodeError::new(e.to_string()))?;
    let image = image::load_from_memory_with_format(raw, format)
        .map_err(|e| DecodeError::new(format!("{format:?}: {e}")))?;
    debug!("Decoded {:?} image, {}x{}", format, image.width(), image.height());
    Ok(image)
}

fn filter(interpolation: Interpolation) -> FilterType {
    match interpolation {
        Interpolation::Nearest => FilterType::Nearest,
        Interpolation::Bilinear => FilterType::Triangle,
        Interpolation::CatmullRom => FilterType::CatmullRom,
        Interpolation::Gaussian => FilterType::Gaussian,
        Interpolation::Lanczos3 => FilterType::Lanczos3,
    }
}

/// Preprocess an already decoded image.
pub fn preprocess_image(image: &DynamicImage, contract: &InputContract) -> PaddyResult<Tensor> {
    contract.validate()?;
    let (width, height) = contract.size();
    let target = (u32::try_from(width)?, u32::try_from(height)?);
    let rgb = image.to_rgb8();
    let resized = if rgb.dimensions() == target {
        rgb
    } else {
        imageops::resize(&rgb, target.0, target.1, filter(contract.interpolation))
    };
    let channels = contract.channel_order.source_channels();
    let normalization = contract.normalization;
    let array = Array4::from_shape_fn((1, height, width, InputContract::CHANNELS), |(_, y, x, c)| {
        normalization.apply(resized[(x as u32, y as u32)][channels[c]])
    });
    Ok(array.into_tensor())
}

/// Decode and preprocess raw bytes into a `(1, H, W, 3)` tensor in `[0, 1]`.
///
/// Fails with a `DecodeError` if the bytes are empty or not an image.
pub fn preprocess(raw: &[u8], contract: &InputContract) -> PaddyResult<Tensor> {
    let image = decode(raw)?;
    preprocess_image(&image, contract)
}

/// `preprocess` with an explicit `(width, height)` and the default contract
/// otherwise.
pub fn preprocess_to_size(raw: &[u8], target_size: (usize, usize)) -> PaddyResult<Tensor> {
    preprocess(raw, &InputContract::new(target_size.0, target_size.1))
}
