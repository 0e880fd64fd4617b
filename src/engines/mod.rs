//! OCR engine implementations
//!
//! `tesseract` drives the real recognition engine; `fixed` replays canned
//! rows so the rest of the pipeline can run without one.

pub mod fixed;
pub mod tesseract;

pub use fixed::FixedEngine;
pub use tesseract::TesseractEngine;
