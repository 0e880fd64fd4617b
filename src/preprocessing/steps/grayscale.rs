use crate::error::OcrError;
use image::{DynamicImage, GrayImage, Luma};

/// Convert image to single-channel luminance
pub fn apply(image: DynamicImage) -> Result<DynamicImage, OcrError> {
    Ok(DynamicImage::ImageLuma8(luminance(&image)))
}

/// ITU-R 601-2 luma: L = R * 299/1000 + G * 587/1000 + B * 114/1000
///
/// Alpha is dropped; single-channel 8-bit input is returned as is.
pub fn luminance(image: &DynamicImage) -> GrayImage {
    if let DynamicImage::ImageLuma8(gray) = image {
        return gray.clone();
    }

    let rgb = image.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        let weighted = u32::from(r) * 299 + u32::from(g) * 587 + u32::from(b) * 114;
        Luma([((weighted + 500) / 1000) as u8])
    })
}
