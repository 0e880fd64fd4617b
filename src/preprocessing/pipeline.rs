use crate::error::OcrError;
use image::DynamicImage;
use serde::Serialize;
use std::str::FromStr;
use std::time::Instant;

use super::steps;

/// Factor used by the contrast and sharpness steps unless overridden
pub const DEFAULT_ENHANCE_FACTOR: f32 = 2.0;

/// Which preprocessing steps run, and how strongly
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PreprocessOptions {
    pub grayscale: bool,
    pub contrast: bool,
    pub contrast_factor: f32,
    pub sharpen: bool,
    pub sharpness_factor: f32,
    pub denoise: bool,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            grayscale: false,
            contrast: false,
            contrast_factor: DEFAULT_ENHANCE_FACTOR,
            sharpen: false,
            sharpness_factor: DEFAULT_ENHANCE_FACTOR,
            denoise: false,
        }
    }
}

impl PreprocessOptions {
    /// Reject out-of-range factors, including those of disabled steps
    pub fn validate(&self) -> Result<(), OcrError> {
        steps::check_factor("contrast", self.contrast_factor)?;
        steps::check_factor("sharpness", self.sharpness_factor)
    }

    pub fn is_noop(&self) -> bool {
        !(self.grayscale || self.contrast || self.sharpen || self.denoise)
    }
}

/// Named option bundles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Preset {
    /// Skip all preprocessing
    #[default]
    None,
    /// Steps: grayscale only
    Minimal,
    /// Steps: grayscale, contrast, sharpen
    Enhanced,
    /// Steps: grayscale, contrast, sharpen, denoise
    Aggressive,
}

impl Preset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Minimal => "minimal",
            Self::Enhanced => "enhanced",
            Self::Aggressive => "aggressive",
        }
    }

    pub fn options(&self) -> PreprocessOptions {
        let base = PreprocessOptions::default();
        match self {
            Self::None => base,
            Self::Minimal => PreprocessOptions {
                grayscale: true,
                ..base
            },
            Self::Enhanced => PreprocessOptions {
                grayscale: true,
                contrast: true,
                sharpen: true,
                ..base
            },
            Self::Aggressive => PreprocessOptions {
                grayscale: true,
                contrast: true,
                sharpen: true,
                denoise: true,
                ..base
            },
        }
    }
}

impl FromStr for Preset {
    type Err = OcrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "minimal" => Ok(Self::Minimal),
            "enhanced" => Ok(Self::Enhanced),
            "aggressive" => Ok(Self::Aggressive),
            other => Err(OcrError::InvalidInput(format!(
                "Unknown preprocessing preset: {}",
                other
            ))),
        }
    }
}

/// Timing information for a single preprocessing step
#[derive(Debug, Clone, Serialize)]
pub struct StepTiming {
    pub name: String,
    pub time_ms: u64,
}

/// Result of preprocessing including timing stats
#[derive(Debug, Clone, Serialize)]
pub struct PreprocessingResult {
    /// Preprocessed image (not serialized)
    #[serde(skip)]
    pub image: DynamicImage,
    /// Total preprocessing time in milliseconds
    pub total_time_ms: u64,
    /// Steps that ran, in order
    pub steps: Vec<StepTiming>,
}

/// Preprocessing pipeline
///
/// Steps always run in the order grayscale, contrast, sharpen, denoise.
#[derive(Debug, Clone)]
pub struct Pipeline {
    options: PreprocessOptions,
}

impl Pipeline {
    pub fn new(options: PreprocessOptions) -> Result<Self, OcrError> {
        options.validate()?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &PreprocessOptions {
        &self.options
    }

    /// Process an image according to the configured options
    pub fn process(&self, image: DynamicImage) -> Result<PreprocessingResult, OcrError> {
        let start = Instant::now();
        let mut steps_timing = Vec::new();
        let opts = self.options;

        if opts.is_noop() {
            return Ok(PreprocessingResult {
                image,
                total_time_ms: 0,
                steps: vec![],
            });
        }

        let mut img = image;

        if opts.grayscale {
            img = self.run_step("grayscale", img, &mut steps_timing, steps::grayscale::apply)?;
        }

        if opts.contrast {
            img = self.run_step("contrast", img, &mut steps_timing, |i| {
                steps::contrast::apply(i, opts.contrast_factor)
            })?;
        }

        if opts.sharpen {
            img = self.run_step("sharpen", img, &mut steps_timing, |i| {
                steps::sharpen::apply(i, opts.sharpness_factor)
            })?;
        }

        if opts.denoise {
            img = self.run_step("denoise", img, &mut steps_timing, steps::denoise::apply)?;
        }

        Ok(PreprocessingResult {
            image: img,
            total_time_ms: start.elapsed().as_millis() as u64,
            steps: steps_timing,
        })
    }

    fn run_step<F>(
        &self,
        name: &str,
        img: DynamicImage,
        timings: &mut Vec<StepTiming>,
        step_fn: F,
    ) -> Result<DynamicImage, OcrError>
    where
        F: FnOnce(DynamicImage) -> Result<DynamicImage, OcrError>,
    {
        let step_start = Instant::now();
        let result = step_fn(img)?;
        let time_ms = step_start.elapsed().as_millis() as u64;
        tracing::debug!("Preprocessing step '{}' took {}ms", name, time_ms);
        timings.push(StepTiming {
            name: name.to_string(),
            time_ms,
        });
        Ok(result)
    }
}

/// Validate `options` and apply them to `image`
pub fn preprocess(
    image: DynamicImage,
    options: &PreprocessOptions,
) -> Result<PreprocessingResult, OcrError> {
    Pipeline::new(*options)?.process(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn sample_image() -> DynamicImage {
        let img = RgbImage::from_fn(32, 24, |x, y| {
            let v = ((x * 7 + y * 13) % 256) as u8;
            if (x / 4 + y / 4) % 2 == 0 {
                Rgb([v, 255 - v, v / 2])
            } else {
                Rgb([30, 30, 30])
            }
        });
        DynamicImage::ImageRgb8(img)
    }

    fn all_combinations() -> impl Iterator<Item = PreprocessOptions> {
        (0u8..16).map(|bits| PreprocessOptions {
            grayscale: bits & 1 != 0,
            contrast: bits & 2 != 0,
            sharpen: bits & 4 != 0,
            denoise: bits & 8 != 0,
            ..PreprocessOptions::default()
        })
    }

    #[test]
    fn test_every_combination_is_deterministic() {
        for options in all_combinations() {
            let first = preprocess(sample_image(), &options).unwrap();
            let second = preprocess(sample_image(), &options).unwrap();
            assert_eq!(
                first.image.as_bytes(),
                second.image.as_bytes(),
                "options {:?} are not deterministic",
                options
            );
            assert_eq!((first.image.width(), first.image.height()), (32, 24));
        }
    }

    #[test]
    fn test_steps_run_in_fixed_order() {
        let options = PreprocessOptions {
            grayscale: true,
            contrast: true,
            sharpen: true,
            denoise: true,
            ..PreprocessOptions::default()
        };
        let result = preprocess(sample_image(), &options).unwrap();
        let names: Vec<&str> = result.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["grayscale", "contrast", "sharpen", "denoise"]);
        assert!(matches!(result.image, DynamicImage::ImageLuma8(_)));
    }

    #[test]
    fn test_noop_returns_input_unchanged() {
        let result = preprocess(sample_image(), &PreprocessOptions::default()).unwrap();
        assert!(result.steps.is_empty());
        assert_eq!(result.image.as_bytes(), sample_image().as_bytes());
    }

    #[test]
    fn test_invalid_factor_fails_fast() {
        let options = PreprocessOptions {
            contrast_factor: -0.5,
            ..PreprocessOptions::default()
        };
        assert!(matches!(
            Pipeline::new(options),
            Err(OcrError::InvalidInput(_))
        ));

        let options = PreprocessOptions {
            sharpen: true,
            sharpness_factor: 0.0,
            ..PreprocessOptions::default()
        };
        assert!(matches!(
            preprocess(sample_image(), &options),
            Err(OcrError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_presets() {
        assert_eq!("Minimal".parse::<Preset>().unwrap(), Preset::Minimal);
        assert!("extreme".parse::<Preset>().is_err());

        assert!(Preset::None.options().is_noop());
        let aggressive = Preset::Aggressive.options();
        assert!(aggressive.grayscale && aggressive.contrast && aggressive.sharpen && aggressive.denoise);
        assert_eq!(Preset::Enhanced.as_str(), "enhanced");
        assert!(!Preset::Enhanced.options().denoise);
    }
}
