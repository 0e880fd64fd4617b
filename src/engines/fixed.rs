//! Engine that replays canned rows
//!
//! Lets the pipeline and the HTTP layer be exercised without a tesseract
//! installation.

use crate::engine::{OcrEngine, RawWord, RecognitionConfig, WORD_LEVEL};
use crate::error::OcrError;
use image::DynamicImage;
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct FixedEngine {
    rows: Vec<RawWord>,
    languages: Vec<String>,
    calls: AtomicUsize,
}

impl FixedEngine {
    /// An engine with `eng` installed that always reports `rows`
    pub fn new(rows: Vec<RawWord>) -> Self {
        Self {
            rows,
            languages: vec!["eng".to_string(), "osd".to_string()],
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_languages(mut self, languages: &[&str]) -> Self {
        self.languages = languages.iter().map(|l| l.to_string()).collect();
        self
    }

    /// Number of times `recognize` has been called
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Build a word-level row on the given line
pub fn word(line: u32, text: &str, bbox: (i64, i64, i64, i64), confidence: f32) -> RawWord {
    let (left, top, width, height) = bbox;
    RawWord {
        level: WORD_LEVEL,
        page: 1,
        block: 1,
        paragraph: 1,
        line,
        word: 0,
        left,
        top,
        width,
        height,
        confidence,
        text: text.to_string(),
    }
}

impl OcrEngine for FixedEngine {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn description(&self) -> &'static str {
        "Replays a fixed set of recognition rows"
    }

    fn version(&self) -> Result<String, OcrError> {
        Ok(format!("fixed {}", env!("CARGO_PKG_VERSION")))
    }

    fn available_languages(&self) -> Result<Vec<String>, OcrError> {
        Ok(self.languages.clone())
    }

    fn recognize(
        &self,
        _image: &DynamicImage,
        _config: &RecognitionConfig,
    ) -> Result<Vec<RawWord>, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.rows.clone())
    }
}
