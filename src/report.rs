//! Human-facing rendering of OCR results and saving them to disk

use crate::error::OcrError;
use crate::ocr::OcrSummary;
use crate::recognition::{Confidence, WordResult};
use image::{ImageFormat, RgbImage};
use std::fmt::Write as _;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// "N/A" for the sentinel, otherwise a one-decimal percentage
pub fn format_confidence(confidence: Option<f32>) -> String {
    match confidence {
        Some(value) => format!("{:.1}%", value),
        None => "N/A".to_string(),
    }
}

fn word_confidence(confidence: Confidence) -> String {
    format_confidence(confidence.score().map(f32::from))
}

/// Plain-text table of (word, confidence, x, y, width, height)
pub fn words_table(words: &[WordResult]) -> String {
    const HEADERS: [&str; 6] = ["word", "confidence", "x", "y", "width", "height"];

    let rows: Vec<[String; 6]> = words
        .iter()
        .map(|w| {
            [
                w.text.clone(),
                word_confidence(w.confidence),
                w.bbox.x.to_string(),
                w.bbox.y.to_string(),
                w.bbox.width.to_string(),
                w.bbox.height.to_string(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(|h| h.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let mut push_row = |cells: &[&str]| {
        let line: Vec<String> = cells
            .iter()
            .zip(widths)
            .enumerate()
            .map(|(i, (cell, width))| {
                // text column left-aligned, numbers right-aligned
                if i == 0 {
                    format!("{:<width$}", cell, width = width)
                } else {
                    format!("{:>width$}", cell, width = width)
                }
            })
            .collect();
        let _ = writeln!(out, "{}", line.join("  ").trim_end());
    };

    push_row(&HEADERS);
    for row in &rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        push_row(&cells);
    }
    out
}

/// Encode an annotated image as PNG bytes
pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>, OcrError> {
    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| OcrError::Internal(format!("Failed to encode PNG: {}", e)))?;
    Ok(png)
}

/// Paths written by [`save_output`]
#[derive(Debug, Clone)]
pub struct SavedOutput {
    pub image: PathBuf,
    pub text: PathBuf,
}

/// Write the annotated image and recognized text as `result_<unix-seconds>.{png,txt}`
pub fn save_output(summary: &OcrSummary, output_dir: &Path) -> Result<SavedOutput, OcrError> {
    std::fs::create_dir_all(output_dir).map_err(|e| {
        OcrError::Internal(format!(
            "Failed to create output directory {}: {}",
            output_dir.display(),
            e
        ))
    })?;

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();

    let image_path = output_dir.join(format!("result_{}.png", timestamp));
    let text_path = output_dir.join(format!("result_{}.txt", timestamp));

    summary
        .annotated
        .image
        .save_with_format(&image_path, ImageFormat::Png)
        .map_err(|e| {
            OcrError::Internal(format!("Failed to save {}: {}", image_path.display(), e))
        })?;

    std::fs::write(&text_path, &summary.full_text).map_err(|e| {
        OcrError::Internal(format!("Failed to save {}: {}", text_path.display(), e))
    })?;

    tracing::info!(
        "Saved {} and {}",
        image_path.display(),
        text_path.display()
    );

    Ok(SavedOutput {
        image: image_path,
        text: text_path,
    })
}
