//! Image preprocessing module for OCR enhancement
//!
//! Applies the optional grayscale, contrast, sharpen and denoise steps in a
//! fixed order so identical inputs always give identical outputs.

pub mod pipeline;
pub mod steps;

pub use pipeline::{
    preprocess, Pipeline, PreprocessOptions, PreprocessingResult, Preset, StepTiming,
    DEFAULT_ENHANCE_FACTOR,
};
