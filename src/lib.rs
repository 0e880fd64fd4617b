//! OCR harness that recognizes text with tesseract and annotates the input
//! image with boxes colored by per-word confidence.

pub mod annotate;
pub mod config;
pub mod engine;
pub mod engines;
pub mod error;
pub mod ocr;
pub mod preprocessing;
pub mod recognition;
pub mod report;
pub mod selftest;
pub mod server;

pub use config::{Config, EngineConfig};
pub use engine::{EngineMode, OcrEngine, RecognitionConfig, SegmentationMode};
pub use error::OcrError;
pub use ocr::{OcrProcessor, OcrSummary};
pub use preprocessing::{PreprocessOptions, Preset};
pub use recognition::{BoundingBox, Confidence, RecognitionResult, WordResult};
