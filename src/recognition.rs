//! Structured recognition results
//!
//! Turns the engine's raw rows into [`WordResult`]s with a validated
//! confidence and rebuilds the full text from them, so the word table and
//! the text always agree.

use crate::engine::{OcrEngine, RawWord, RecognitionConfig, WORD_LEVEL};
use crate::error::OcrError;
use image::DynamicImage;
use serde::{Serialize, Serializer};

/// Per-word confidence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    /// Integer score in 0..=100
    Score(u8),
    /// The engine attached no score to this region
    NotApplicable,
}

impl Confidence {
    /// Normalize an engine confidence (-1 or 0.0..=100.0)
    ///
    /// Fractional scores are truncated, so 79.9 stays below the 80 boundary.
    pub fn from_raw(raw: f32) -> Result<Self, OcrError> {
        if raw.is_nan() || !(-1.0..=100.0).contains(&raw) {
            return Err(OcrError::EngineInvocationFailed(format!(
                "Engine reported confidence {} outside -1..=100",
                raw
            )));
        }

        if raw < 0.0 {
            Ok(Self::NotApplicable)
        } else {
            Ok(Self::Score(raw.trunc() as u8))
        }
    }

    pub fn score(&self) -> Option<u8> {
        match self {
            Self::Score(score) => Some(*score),
            Self::NotApplicable => None,
        }
    }
}

impl Serialize for Confidence {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.score().serialize(serializer)
    }
}

/// Pixel-space box of a recognized word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    fn from_raw(row: &RawWord) -> Result<Self, OcrError> {
        let coord = |value: i64, name: &str| {
            u32::try_from(value).map_err(|_| {
                OcrError::EngineInvocationFailed(format!(
                    "Engine reported {} {} for word '{}'",
                    name, value, row.text
                ))
            })
        };

        Ok(Self {
            x: coord(row.left, "left")?,
            y: coord(row.top, "top")?,
            width: coord(row.width, "width")?,
            height: coord(row.height, "height")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordResult {
    pub text: String,
    pub bbox: BoundingBox,
    pub confidence: Confidence,
}

impl WordResult {
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// Words in engine-reported order plus the text they make up
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecognitionResult {
    pub full_text: String,
    pub words: Vec<WordResult>,
    /// Averaged over the engine's fractional scores, before truncation
    pub(crate) mean_confidence: Option<f32>,
}

impl RecognitionResult {
    /// Normalize raw engine rows
    ///
    /// Keeps word-level rows with non-blank text in the order given. Words on
    /// one line are joined by a space, lines by a newline, and a change of
    /// paragraph or block adds a blank line.
    pub fn from_rows(rows: Vec<RawWord>) -> Result<Self, OcrError> {
        let mut words = Vec::new();
        let mut full_text = String::new();
        let mut previous: Option<&RawWord> = None;
        let mut raw_scores: Vec<f32> = Vec::new();

        for row in rows.iter().filter(|row| row.level == WORD_LEVEL) {
            let text = row.text.trim();
            if text.is_empty() {
                continue;
            }

            let confidence = Confidence::from_raw(row.confidence)?;
            if confidence != Confidence::NotApplicable {
                raw_scores.push(row.confidence);
            }
            let bbox = BoundingBox::from_raw(row)?;

            if let Some(prev) = previous {
                let same_paragraph = (prev.page, prev.block, prev.paragraph)
                    == (row.page, row.block, row.paragraph);
                if same_paragraph && prev.line == row.line {
                    full_text.push(' ');
                } else if same_paragraph {
                    full_text.push('\n');
                } else {
                    full_text.push_str("\n\n");
                }
            }
            full_text.push_str(text);
            previous = Some(row);

            words.push(WordResult {
                text: text.to_string(),
                bbox,
                confidence,
            });
        }

        let mean_confidence = if raw_scores.is_empty() {
            None
        } else {
            Some(raw_scores.iter().sum::<f32>() / raw_scores.len() as f32)
        };

        Ok(Self {
            full_text,
            words,
            mean_confidence,
        })
    }

    /// Mean engine score over words that carry one
    pub fn mean_confidence(&self) -> Option<f32> {
        self.mean_confidence
    }
}

/// Run the engine on `image` and normalize what it returns
///
/// Every requested language must be installed; otherwise this fails with
/// `UnsupportedLanguage` before the engine is asked to recognize anything.
pub fn recognize(
    engine: &dyn OcrEngine,
    image: &DynamicImage,
    config: &RecognitionConfig,
) -> Result<RecognitionResult, OcrError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(OcrError::InvalidInput(format!(
            "Image has no pixels ({}x{})",
            image.width(),
            image.height()
        )));
    }

    let available = engine.available_languages()?;
    let missing: Vec<String> = config
        .languages()
        .iter()
        .filter(|lang| !available.contains(lang))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(OcrError::UnsupportedLanguage { missing, available });
    }

    let rows = engine.recognize(image, config)?;
    let row_count = rows.len();
    let result = RecognitionResult::from_rows(rows)?;

    tracing::debug!(
        "{} returned {} rows, {} words kept",
        engine.name(),
        row_count,
        result.words.len()
    );

    Ok(result)
}
