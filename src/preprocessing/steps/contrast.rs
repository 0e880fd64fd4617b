use super::{blend, check_factor, grayscale, Raster};
use crate::error::OcrError;
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};

/// Scale distance from the mean luminance by `factor`
/// 1.0 leaves the image unchanged, 2.0 doubles the contrast
pub fn apply(image: DynamicImage, factor: f32) -> Result<DynamicImage, OcrError> {
    check_factor("contrast", factor)?;

    let mean = mean_luminance(&image);
    let (width, height) = (image.width(), image.height());

    let enhanced = match Raster::from(image) {
        Raster::Gray(gray) => {
            let flat = GrayImage::from_pixel(width, height, Luma([mean]));
            Raster::Gray(blend(&flat, &gray, factor))
        }
        Raster::Rgb(rgb) => {
            let flat = RgbImage::from_pixel(width, height, Rgb([mean; 3]));
            Raster::Rgb(blend(&flat, &rgb, factor))
        }
    };

    Ok(enhanced.into())
}

fn mean_luminance(image: &DynamicImage) -> u8 {
    let gray = grayscale::luminance(image);
    if gray.is_empty() {
        return 0;
    }

    let sum: u64 = gray.iter().map(|&v| u64::from(v)).sum();
    (sum as f64 / gray.len() as f64).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_tone() -> GrayImage {
        GrayImage::from_fn(10, 10, |x, _| if x < 5 { Luma([100]) } else { Luma([150]) })
    }

    #[test]
    fn test_contrast_spreads_values_around_mean() {
        let result = apply(DynamicImage::ImageLuma8(two_tone()), 2.0).unwrap();
        let gray = result.to_luma8();

        // mean is 125: 100 -> 75, 150 -> 175
        assert_eq!(gray.get_pixel(0, 0).0[0], 75);
        assert_eq!(gray.get_pixel(9, 0).0[0], 175);
    }

    #[test]
    fn test_contrast_factor_one_is_identity() {
        let img = two_tone();
        let result = apply(DynamicImage::ImageLuma8(img.clone()), 1.0).unwrap();
        assert_eq!(result.to_luma8(), img);
    }

    #[test]
    fn test_contrast_keeps_color() {
        let img = RgbImage::from_pixel(4, 4, Rgb([200, 40, 40]));
        let result = apply(DynamicImage::ImageRgb8(img), 1.5).unwrap();
        assert!(matches!(result, DynamicImage::ImageRgb8(_)));
        assert_eq!(result.width(), 4);
    }

    #[test]
    fn test_contrast_rejects_non_positive_factor() {
        let err = apply(DynamicImage::ImageLuma8(two_tone()), 0.0).unwrap_err();
        assert!(matches!(err, OcrError::InvalidInput(_)));
    }
}
