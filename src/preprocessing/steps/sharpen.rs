use super::{blend, check_factor, Raster};
use crate::error::OcrError;
use image::{DynamicImage, GrayImage, RgbImage};
use imageproc::filter::filter3x3;

/// Smoothing kernel used as the "blurred" reference (weights sum to 13)
const SMOOTH: [f32; 9] = [
    1.0 / 13.0,
    1.0 / 13.0,
    1.0 / 13.0,
    1.0 / 13.0,
    5.0 / 13.0,
    1.0 / 13.0,
    1.0 / 13.0,
    1.0 / 13.0,
    1.0 / 13.0,
];

/// Push the image away from a smoothed copy of itself
/// `factor` 1.0 leaves it unchanged; above 1.0 edges get crisper
pub fn apply(image: DynamicImage, factor: f32) -> Result<DynamicImage, OcrError> {
    check_factor("sharpness", factor)?;

    let sharpened = match Raster::from(image) {
        Raster::Gray(gray) => {
            let smooth: GrayImage = filter3x3(&gray, &SMOOTH);
            Raster::Gray(blend(&smooth, &gray, factor))
        }
        Raster::Rgb(rgb) => {
            let smooth: RgbImage = filter3x3(&rgb, &SMOOTH);
            Raster::Rgb(blend(&smooth, &rgb, factor))
        }
    };

    Ok(sharpened.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    #[test]
    fn test_sharpen_enhances_edges() {
        // Create image with an edge (left half dark, right half light)
        let img = GrayImage::from_fn(20, 10, |x, _| {
            if x < 10 {
                Luma([50])
            } else {
                Luma([200])
            }
        });

        let result = apply(DynamicImage::ImageLuma8(img.clone()), 2.0).unwrap();
        let result_gray = result.to_luma8();

        let edge_left = result_gray.get_pixel(9, 5).0[0];
        let edge_right = result_gray.get_pixel(10, 5).0[0];

        // The difference at the edge should be at least as large as original
        let original_diff = 200i32 - 50;
        let result_diff = (edge_right as i32 - edge_left as i32).abs();

        assert!(
            result_diff >= original_diff,
            "Edge should be enhanced: {} >= {}",
            result_diff,
            original_diff
        );
    }

    #[test]
    fn test_sharpen_leaves_flat_regions_alone() {
        let img = RgbImage::from_pixel(8, 8, Rgb([120, 60, 30]));
        let result = apply(DynamicImage::ImageRgb8(img.clone()), 2.0).unwrap();
        let rgb = result.to_rgb8();

        // Only float rounding in the smoothing pass may move a flat pixel
        for (out, orig) in rgb.iter().zip(img.iter()) {
            assert!((*out as i32 - *orig as i32).abs() <= 2);
        }
    }

    #[test]
    fn test_sharpen_rejects_bad_factor() {
        let img = GrayImage::new(4, 4);
        assert!(apply(DynamicImage::ImageLuma8(img), -2.0).is_err());
    }
}
