//! What a model expects its input image to look like.
//!
//! Every deployed artifact declares its own contract: the preprocessing
//! code reads it from there instead of carrying constants.
use crate::internal::*;
use serde::{Deserialize, Serialize};

/// Order of the three colour channels in the innermost tensor axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelOrder {
    #[default]
    Rgb,
    Bgr,
}

impl ChannelOrder {
    /// For each output channel, the RGB channel it is read from.
    pub fn source_channels(&self) -> [usize; 3] {
        match self {
            ChannelOrder::Rgb => [0, 1, 2],
            ChannelOrder::Bgr => [2, 1, 0],
        }
    }
}

/// Resampling filter used to bring the image to the contract size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    Nearest,
    #[default]
    Bilinear,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

/// Mapping from 8-bit pixel intensities to model input values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// `value / 255`, landing in `[0, 1]`.
    #[default]
    UnitRange,
}

impl Normalization {
    pub fn apply(&self, intensity: u8) -> f32 {
        match self {
            Normalization::UnitRange => intensity as f32 / 255.0,
        }
    }
}

/// Input contract of a model: NHWC, batch of 1, three channels, f32.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputContract {
    pub width: usize,
    pub height: usize,
    #[serde(default)]
    pub channel_order: ChannelOrder,
    #[serde(default)]
    pub interpolation: Interpolation,
    #[serde(default)]
    pub normalization: Normalization,
}

impl InputContract {
    pub const CHANNELS: usize = 3;

    pub fn new(width: usize, height: usize) -> InputContract {
        InputContract {
            width,
            height,
            channel_order: ChannelOrder::default(),
            interpolation: Interpolation::default(),
            normalization: Normalization::default(),
        }
    }

    pub fn with_channel_order(self, channel_order: ChannelOrder) -> InputContract {
        InputContract { channel_order, ..self }
    }

    pub fn with_interpolation(self, interpolation: Interpolation) -> InputContract {
        InputContract { interpolation, ..self }
    }

    /// Target size as `(width, height)`.
    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// `(1, H, W, 3)`
    pub fn input_shape(&self) -> TVec<usize> {
        tvec!(1, self.height, self.width, Self::CHANNELS)
    }

    pub fn validate(&self) -> PaddyResult<()> {
        ensure!(
            self.width > 0 && self.height > 0,
            "Input contract size must be positive, got {}x{}",
            self.width,
            self.height
        );
        ensure!(
            self.width <= u32::MAX as usize && self.height <= u32::MAX as usize,
            "Input contract size {}x{} exceeds the largest image dimension",
            self.width,
            self.height
        );
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn shape_is_nhwc() {
        assert_eq!(&*InputContract::new(64, 32).input_shape(), &[1, 32, 64, 3]);
    }

    #[test]
    fn empty_size_is_rejected() {
        assert!(InputContract::new(0, 32).validate().is_err());
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn oversized_is_rejected() {
        let too_wide = u32::MAX as usize + 1;
        assert!(InputContract::new(too_wide, 32).validate().is_err());
        assert!(InputContract::new(32, too_wide).validate().is_err());
        assert!(InputContract::new(u32::MAX as usize, 1).validate().is_ok());
    }

    #[test]
    fn bgr_swaps_outer_channels() {
        assert_eq!(ChannelOrder::Bgr.source_channels(), [2, 1, 0]);
    }

    #[test]
    fn unit_range_bounds() {
        assert_eq!(Normalization::UnitRange.apply(0), 0.0);
        assert_eq!(Normalization::UnitRange.apply(255), 1.0);
    }
}
