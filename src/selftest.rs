//! Fixed sequence of sanity checks against the configured engine
//!
//! Used by the `selftest` subcommand to confirm an installation works before
//! serving requests.

use crate::annotate::glyphs;
use crate::engine::{EngineMode, RecognitionConfig, SegmentationMode};
use crate::error::OcrError;
use crate::ocr::OcrProcessor;
use crate::preprocessing::PreprocessOptions;
use image::{DynamicImage, Rgb, RgbImage};
use std::fmt;

/// Text drawn into the generated test image
pub const GENERATED_TEXT: &str = "123";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Fail,
    Skip,
}

#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub name: &'static str,
    pub status: CheckStatus,
    pub detail: String,
}

#[derive(Debug, Clone, Default)]
pub struct SelfTestReport {
    pub outcomes: Vec<CheckOutcome>,
}

impl SelfTestReport {
    pub fn passed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == CheckStatus::Pass)
            .count()
    }

    pub fn all_passed(&self) -> bool {
        self.passed() == self.outcomes.len()
    }
}

impl fmt::Display for SelfTestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for outcome in &self.outcomes {
            let status = match outcome.status {
                CheckStatus::Pass => "PASS",
                CheckStatus::Fail => "FAIL",
                CheckStatus::Skip => "SKIP",
            };
            writeln!(f, "[{}] {}: {}", status, outcome.name, outcome.detail)?;
        }
        write!(
            f,
            "Total: {}/{} checks passed",
            self.passed(),
            self.outcomes.len()
        )
    }
}

/// White canvas with [`GENERATED_TEXT`] in large black block digits
pub fn generated_image() -> DynamicImage {
    const SCALE: u32 = 12;
    const MARGIN: u32 = 40;

    let (text_width, text_height) = glyphs::text_size(GENERATED_TEXT, SCALE);
    let mut canvas = RgbImage::from_pixel(
        text_width + MARGIN * 2,
        text_height + MARGIN * 2,
        Rgb([255, 255, 255]),
    );
    glyphs::draw_text(
        &mut canvas,
        MARGIN as i32,
        MARGIN as i32,
        GENERATED_TEXT,
        SCALE,
        Rgb([0, 0, 0]),
    );
    DynamicImage::ImageRgb8(canvas)
}

fn outcome(name: &'static str, result: Result<String, OcrError>) -> CheckOutcome {
    match result {
        Ok(detail) => CheckOutcome {
            name,
            status: CheckStatus::Pass,
            detail,
        },
        Err(e) => CheckOutcome {
            name,
            status: CheckStatus::Fail,
            detail: e.to_string(),
        },
    }
}

/// Run every check; later checks are skipped if the engine cannot be reached
pub fn run_checks(processor: &OcrProcessor, language: &str) -> SelfTestReport {
    let engine = processor.engine();
    let mut report = SelfTestReport::default();

    let version = outcome(
        "Engine version",
        engine
            .version()
            .map(|v| format!("{} ({})", v, engine.name())),
    );
    let reachable = version.status == CheckStatus::Pass;
    report.outcomes.push(version);

    const DEPENDENT: [&str; 4] = [
        "Installed languages",
        "Recognize generated image",
        "Detailed word data",
        "Custom segmentation config",
    ];
    if !reachable {
        report
            .outcomes
            .extend(DEPENDENT.iter().map(|&name| CheckOutcome {
                name,
                status: CheckStatus::Skip,
                detail: "engine unavailable".to_string(),
            }));
        return report;
    }

    report.outcomes.push(outcome(
        DEPENDENT[0],
        engine.available_languages().map(|langs| langs.join(", ")),
    ));

    let default_run = RecognitionConfig::new(language).and_then(|config| {
        processor.run(generated_image(), &config, &PreprocessOptions::default())
    });

    report.outcomes.push(outcome(
        DEPENDENT[1],
        default_run
            .as_ref()
            .map_err(clone_error)
            .and_then(|summary| {
                let detail = format!(
                    "expected '{}', read '{}'",
                    GENERATED_TEXT, summary.full_text
                );
                if summary.full_text.contains(GENERATED_TEXT) {
                    Ok(detail)
                } else {
                    Err(OcrError::EngineInvocationFailed(detail))
                }
            }),
    ));

    report.outcomes.push(outcome(
        DEPENDENT[2],
        default_run.map(|summary| {
            let words: Vec<String> = summary
                .words
                .iter()
                .map(|w| {
                    let score = w
                        .confidence
                        .score()
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "n/a".to_string());
                    format!("'{}' ({})", w.text, score)
                })
                .collect();
            format!("{} words: {}", words.len(), words.join(", "))
        }),
    ));

    let custom_run = RecognitionConfig::new(language).and_then(|config| {
        let config = config
            .with_segmentation(SegmentationMode::SingleBlock)
            .with_engine_mode(EngineMode::Default);
        processor.run(generated_image(), &config, &PreprocessOptions::default())
    });
    report.outcomes.push(outcome(
        DEPENDENT[3],
        custom_run.map(|summary| format!("--oem 3 --psm 6 read '{}'", summary.full_text)),
    ));

    report
}

/// `OcrError` is not `Clone`; keep kind and message for the second report line
fn clone_error(err: &OcrError) -> OcrError {
    match err {
        OcrError::UnsupportedLanguage { missing, available } => OcrError::UnsupportedLanguage {
            missing: missing.clone(),
            available: available.clone(),
        },
        OcrError::InvalidInput(msg) => OcrError::InvalidInput(msg.clone()),
        OcrError::EngineUnavailable(msg) => OcrError::EngineUnavailable(msg.clone()),
        OcrError::EngineInvocationFailed(msg) => OcrError::EngineInvocationFailed(msg.clone()),
        other => OcrError::Internal(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::engines::fixed::{word, FixedEngine};
    use crate::engines::TesseractEngine;
    use std::path::PathBuf;
    use std::sync::Arc;

    #[test]
    fn test_generated_image_has_ink() {
        let image = generated_image().to_rgb8();
        assert!(image.pixels().any(|p| p == &Rgb([0, 0, 0])));
        assert_eq!(image.get_pixel(0, 0), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_all_checks_pass_with_working_engine() {
        let engine = FixedEngine::new(vec![word(1, "123", (40, 40, 132, 60), 91.0)]);
        let processor = OcrProcessor::new(Arc::new(engine));

        let report = run_checks(&processor, "eng");
        assert_eq!(report.outcomes.len(), 5);
        assert!(report.all_passed(), "{}", report);
        assert!(report.to_string().ends_with("Total: 5/5 checks passed"));
    }

    #[test]
    fn test_misread_generated_text_fails() {
        let engine = FixedEngine::new(vec![word(1, "IZE", (40, 40, 132, 60), 91.0)]);
        let processor = OcrProcessor::new(Arc::new(engine));

        let report = run_checks(&processor, "eng");
        assert_eq!(report.outcomes[2].status, CheckStatus::Fail);
        assert!(report.outcomes[2].detail.contains("read 'IZE'"));
        assert!(!report.all_passed());
    }

    #[test]
    fn test_missing_language_fails_recognition_checks() {
        let engine = FixedEngine::new(Vec::new());
        let processor = OcrProcessor::new(Arc::new(engine));

        let report = run_checks(&processor, "xyz");
        assert!(!report.all_passed());
        assert_eq!(report.outcomes[2].status, CheckStatus::Fail);
        assert!(report.outcomes[2].detail.contains("xyz"));
        assert_eq!(report.outcomes[3].status, CheckStatus::Fail);
    }

    #[test]
    fn test_unreachable_engine_skips_remaining_checks() {
        let engine = TesseractEngine::new(&EngineConfig {
            executable: PathBuf::from("/nonexistent/bin/tesseract"),
            tessdata_dir: None,
        });
        let processor = OcrProcessor::new(Arc::new(engine));

        let report = run_checks(&processor, "eng");
        assert_eq!(report.outcomes[0].status, CheckStatus::Fail);
        assert!(report.outcomes[1..]
            .iter()
            .all(|o| o.status == CheckStatus::Skip));
        assert_eq!(report.passed(), 0);
    }
}
