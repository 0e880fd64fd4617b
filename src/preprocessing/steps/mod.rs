//! Individual preprocessing steps

pub mod contrast;
pub mod denoise;
pub mod grayscale;
pub mod sharpen;

use crate::error::OcrError;
use image::{DynamicImage, GrayImage, ImageBuffer, Pixel, RgbImage};

/// 8-bit raster the filtering steps operate on
///
/// Colorless inputs stay single-channel so a grayscale step earlier in the
/// pipeline is not undone.
pub(crate) enum Raster {
    Gray(GrayImage),
    Rgb(RgbImage),
}

impl From<DynamicImage> for Raster {
    fn from(image: DynamicImage) -> Self {
        match image {
            DynamicImage::ImageLuma8(gray) => Raster::Gray(gray),
            other if !other.color().has_color() => Raster::Gray(other.to_luma8()),
            other => Raster::Rgb(other.to_rgb8()),
        }
    }
}

impl From<Raster> for DynamicImage {
    fn from(raster: Raster) -> Self {
        match raster {
            Raster::Gray(gray) => DynamicImage::ImageLuma8(gray),
            Raster::Rgb(rgb) => DynamicImage::ImageRgb8(rgb),
        }
    }
}

/// Enhancement factors must be finite and positive
pub(crate) fn check_factor(name: &str, factor: f32) -> Result<(), OcrError> {
    if factor.is_finite() && factor > 0.0 {
        Ok(())
    } else {
        Err(OcrError::InvalidInput(format!(
            "{} factor must be a positive number, got {}",
            name, factor
        )))
    }
}

/// Extrapolate from `degenerate` towards `image` by `factor`
///
/// 1.0 returns `image`, 0.0 would return `degenerate`, larger values
/// exaggerate the difference between the two.
pub(crate) fn blend<P>(
    degenerate: &ImageBuffer<P, Vec<u8>>,
    image: &ImageBuffer<P, Vec<u8>>,
    factor: f32,
) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    let mut out = image.clone();
    for (dst, (&base, &src)) in out.iter_mut().zip(degenerate.iter().zip(image.iter())) {
        let value = base as f32 + factor * (src as f32 - base as f32);
        *dst = value.round().clamp(0.0, 255.0) as u8;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, LumaA, Rgba, RgbaImage};

    #[test]
    fn test_blend_identity_and_extrapolation() {
        let base = GrayImage::from_pixel(2, 1, Luma([100]));
        let img = GrayImage::from_fn(2, 1, |x, _| Luma([if x == 0 { 80 } else { 200 }]));

        assert_eq!(blend(&base, &img, 1.0), img);

        let doubled = blend(&base, &img, 2.0);
        assert_eq!(doubled.get_pixel(0, 0).0[0], 60);
        assert_eq!(doubled.get_pixel(1, 0).0[0], 255); // clamped from 300
    }

    #[test]
    fn test_raster_keeps_gray_inputs_single_channel() {
        let gray_alpha = image::ImageBuffer::from_pixel(3, 3, LumaA([10u8, 255]));
        assert!(matches!(
            Raster::from(DynamicImage::ImageLumaA8(gray_alpha)),
            Raster::Gray(_)
        ));

        let rgba = RgbaImage::from_pixel(3, 3, Rgba([1, 2, 3, 255]));
        assert!(matches!(
            Raster::from(DynamicImage::ImageRgba8(rgba)),
            Raster::Rgb(_)
        ));
    }

    #[test]
    fn test_check_factor() {
        assert!(check_factor("contrast", 0.5).is_ok());
        assert!(check_factor("contrast", 0.0).is_err());
        assert!(check_factor("contrast", -1.0).is_err());
        assert!(check_factor("contrast", f32::NAN).is_err());
        assert!(check_factor("contrast", f32::INFINITY).is_err());
    }
}
