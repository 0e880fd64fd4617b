//! Tesseract engine implementation
//!
//! Drives the `tesseract` command-line program and reads its TSV output, which
//! carries per-word boxes and confidences. The executable location and tessdata
//! directory come from [`EngineConfig`]; nothing here reads the environment.

use crate::config::EngineConfig;
use crate::engine::{OcrEngine, RawWord, RecognitionConfig};
use crate::error::OcrError;
use image::{DynamicImage, ImageFormat};
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::process::{Command, Output};
use std::str::FromStr;

/// Columns in a tesseract TSV row
const TSV_COLUMNS: usize = 12;

/// Tesseract OCR Engine (external process)
pub struct TesseractEngine {
    executable: PathBuf,
    tessdata_dir: Option<PathBuf>,
}

impl TesseractEngine {
    pub fn new(config: &EngineConfig) -> Self {
        tracing::debug!(
            "Tesseract engine configured (executable: {}, tessdata: {:?})",
            config.executable.display(),
            config.tessdata_dir
        );

        Self {
            executable: config.executable.clone(),
            tessdata_dir: config.tessdata_dir.clone(),
        }
    }

    /// Run a prepared command, mapping spawn failures to `EngineUnavailable`
    fn run(&self, mut cmd: Command) -> Result<Output, OcrError> {
        tracing::debug!("Running {:?}", cmd);

        cmd.output().map_err(|e| match e.kind() {
            ErrorKind::NotFound => OcrError::EngineUnavailable(format!(
                "tesseract executable not found at '{}'",
                self.executable.display()
            )),
            _ => OcrError::EngineUnavailable(format!(
                "Failed to run '{}': {}",
                self.executable.display(),
                e
            )),
        })
    }

    fn tessdata_args(&self, cmd: &mut Command) {
        if let Some(dir) = &self.tessdata_dir {
            cmd.arg("--tessdata-dir").arg(dir);
        }
    }

    /// Turn a failed recognition run into the most specific error we can name
    fn recognition_failure(&self, output: &Output, config: &RecognitionConfig) -> OcrError {
        let stderr = String::from_utf8_lossy(&output.stderr);

        let missing = failed_languages(&stderr);
        if !missing.is_empty() {
            let available = self.available_languages().unwrap_or_default();
            return OcrError::UnsupportedLanguage { missing, available };
        }

        OcrError::EngineInvocationFailed(format!(
            "tesseract exited with {} for languages '{}': {}",
            output.status,
            config.language_arg(),
            stderr.trim()
        ))
    }
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn description(&self) -> &'static str {
        "Tesseract OCR via the tesseract command-line program"
    }

    fn version(&self) -> Result<String, OcrError> {
        let mut cmd = Command::new(&self.executable);
        cmd.arg("--version");
        let output = self.run(cmd)?;

        if !output.status.success() {
            return Err(OcrError::EngineInvocationFailed(format!(
                "tesseract --version exited with {}",
                output.status
            )));
        }

        // Older releases print the banner on stderr
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        stdout
            .lines()
            .chain(stderr.lines())
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                OcrError::EngineInvocationFailed("tesseract reported no version".to_string())
            })
    }

    fn available_languages(&self) -> Result<Vec<String>, OcrError> {
        let mut cmd = Command::new(&self.executable);
        self.tessdata_args(&mut cmd);
        cmd.arg("--list-langs");
        let output = self.run(cmd)?;

        if !output.status.success() {
            return Err(OcrError::EngineUnavailable(format!(
                "tesseract --list-langs exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let listing = if stdout.trim().is_empty() {
            String::from_utf8_lossy(&output.stderr).into_owned()
        } else {
            stdout.into_owned()
        };

        Ok(parse_language_list(&listing))
    }

    fn recognize(
        &self,
        image: &DynamicImage,
        config: &RecognitionConfig,
    ) -> Result<Vec<RawWord>, OcrError> {
        let mut input = tempfile::Builder::new()
            .prefix("ocr-input-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| OcrError::Internal(format!("Failed to create temp file: {}", e)))?;

        // PNG has no float pixel formats
        let written = match image {
            DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
                DynamicImage::ImageRgba8(image.to_rgba8()).write_to(&mut input, ImageFormat::Png)
            }
            _ => image.write_to(&mut input, ImageFormat::Png),
        };
        written.map_err(|e| OcrError::InvalidInput(format!("Failed to encode image: {}", e)))?;
        input
            .flush()
            .map_err(|e| OcrError::Internal(format!("Failed to write temp file: {}", e)))?;

        let mut cmd = Command::new(&self.executable);
        cmd.arg(input.path()).arg("stdout");
        self.tessdata_args(&mut cmd);
        cmd.arg("-l")
            .arg(config.language_arg())
            .arg("--oem")
            .arg(config.engine_mode().code().to_string())
            .arg("--psm")
            .arg(config.segmentation().code().to_string())
            .args(config.flags())
            .arg("tsv");

        tracing::debug!(
            "Recognizing {}x{} image (lang: {}, psm: {}, oem: {})",
            image.width(),
            image.height(),
            config.language_arg(),
            config.segmentation().code(),
            config.engine_mode().code()
        );

        let output = self.run(cmd)?;
        if !output.status.success() {
            return Err(self.recognition_failure(&output, config));
        }

        let tsv = String::from_utf8(output.stdout).map_err(|e| {
            OcrError::EngineInvocationFailed(format!("tesseract produced invalid UTF-8: {}", e))
        })?;

        parse_tsv(&tsv)
    }
}

// ============================================================================
// Output parsing
// ============================================================================

/// Parse tesseract's TSV output into raw rows
pub(crate) fn parse_tsv(tsv: &str) -> Result<Vec<RawWord>, OcrError> {
    let mut rows = Vec::new();

    for (index, line) in tsv.lines().enumerate() {
        if line.trim().is_empty() || (index == 0 && line.starts_with("level")) {
            continue;
        }

        let row = index + 1;
        let fields: Vec<&str> = line.splitn(TSV_COLUMNS, '\t').collect();
        // The text column is dropped entirely on some structural rows
        if fields.len() < TSV_COLUMNS - 1 {
            return Err(OcrError::EngineInvocationFailed(format!(
                "Malformed TSV row {}: expected {} columns, got {}",
                row,
                TSV_COLUMNS,
                fields.len()
            )));
        }

        rows.push(RawWord {
            level: field(&fields, 0, row)?,
            page: field(&fields, 1, row)?,
            block: field(&fields, 2, row)?,
            paragraph: field(&fields, 3, row)?,
            line: field(&fields, 4, row)?,
            word: field(&fields, 5, row)?,
            left: field(&fields, 6, row)?,
            top: field(&fields, 7, row)?,
            width: field(&fields, 8, row)?,
            height: field(&fields, 9, row)?,
            confidence: field(&fields, 10, row)?,
            text: fields.get(11).copied().unwrap_or_default().to_string(),
        });
    }

    Ok(rows)
}

fn field<T: FromStr>(fields: &[&str], index: usize, row: usize) -> Result<T, OcrError> {
    let raw = fields[index].trim();
    raw.parse().map_err(|_| {
        OcrError::EngineInvocationFailed(format!(
            "Malformed TSV row {}: column {} has unexpected value '{}'",
            row,
            index + 1,
            raw
        ))
    })
}

/// Parse `--list-langs` output, skipping the "List of available languages" banner
fn parse_language_list(listing: &str) -> Vec<String> {
    listing
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("List of available languages"))
        .map(str::to_string)
        .collect()
}

/// Languages tesseract complained about, e.g. `Failed loading language 'xyz'`
fn failed_languages(stderr: &str) -> Vec<String> {
    const MARKER: &str = "Failed loading language '";

    let mut missing: Vec<String> = stderr
        .lines()
        .filter_map(|line| {
            let rest = &line[line.find(MARKER)? + MARKER.len()..];
            rest.split('\'').next().map(str::to_string)
        })
        .collect();
    missing.dedup();
    missing
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_TSV: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext
1\t1\t0\t0\t0\t0\t0\t0\t640\t200\t-1\t
2\t1\t1\t0\t0\t0\t40\t60\t520\t80\t-1\t
3\t1\t1\t1\t0\t0\t40\t60\t520\t80\t-1\t
4\t1\t1\t1\t1\t0\t40\t60\t520\t80\t-1\t
5\t1\t1\t1\t1\t1\t40\t60\t230\t80\t96.406158\tTEST
5\t1\t1\t1\t1\t2\t330\t62\t230\t78\t95.97\t123
";

    #[test]
    fn test_parse_tsv_reads_all_rows() {
        let rows = parse_tsv(SAMPLE_TSV).unwrap();
        assert_eq!(rows.len(), 6);

        let word = &rows[4];
        assert_eq!(word.level, 5);
        assert_eq!(word.text, "TEST");
        assert_eq!((word.left, word.top, word.width, word.height), (40, 60, 230, 80));
        assert!((word.confidence - 96.406158).abs() < 1e-4);

        assert_eq!(rows[0].confidence, -1.0);
        assert_eq!(rows[0].text, "");
    }

    #[test]
    fn test_parse_tsv_accepts_missing_text_column() {
        let rows = parse_tsv("1\t1\t0\t0\t0\t0\t0\t0\t10\t10\t-1\n").unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].text.is_empty());
    }

    #[test]
    fn test_parse_tsv_keeps_tabs_inside_text() {
        let rows = parse_tsv("5\t1\t1\t1\t1\t1\t0\t0\t10\t10\t90\ta\tb\n").unwrap();
        assert_eq!(rows[0].text, "a\tb");
    }

    #[test]
    fn test_parse_tsv_rejects_malformed_rows() {
        let err = parse_tsv("5\t1\t1\n").unwrap_err();
        assert!(matches!(err, OcrError::EngineInvocationFailed(_)));

        let err = parse_tsv("5\t1\t1\t1\t1\t1\t0\t0\t10\t10\thigh\tword\n").unwrap_err();
        assert!(err.to_string().contains("'high'"));
    }

    #[test]
    fn test_parse_language_list() {
        let listing = "List of available languages in \"/usr/share/tessdata/\" (3):\neng\njpn\nosd\n";
        assert_eq!(parse_language_list(listing), ["eng", "jpn", "osd"]);
    }

    #[test]
    fn test_failed_languages_from_stderr() {
        let stderr = "Error opening data file /usr/share/tessdata/xyz.traineddata\n\
                      Please make sure the TESSDATA_PREFIX environment variable is set.\n\
                      Failed loading language 'xyz'\n\
                      Tesseract couldn't load any languages!\n";
        assert_eq!(failed_languages(stderr), ["xyz"]);
        assert!(failed_languages("Warning: Invalid resolution 0 dpi.").is_empty());
    }

    #[test]
    fn test_missing_executable_is_engine_unavailable() {
        let engine = TesseractEngine::new(&EngineConfig {
            executable: PathBuf::from("/nonexistent/bin/tesseract"),
            tessdata_dir: None,
        });

        assert!(matches!(
            engine.version(),
            Err(OcrError::EngineUnavailable(_))
        ));
        assert!(matches!(
            engine.available_languages(),
            Err(OcrError::EngineUnavailable(_))
        ));

        let image = DynamicImage::new_luma8(8, 8);
        let config = RecognitionConfig::new("eng").unwrap();
        assert!(matches!(
            engine.recognize(&image, &config),
            Err(OcrError::EngineUnavailable(_))
        ));
    }
}
