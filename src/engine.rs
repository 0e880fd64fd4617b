use crate::error::OcrError;
use image::DynamicImage;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Page segmentation mode passed to the engine (`--psm`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentationMode {
    /// Fully automatic page segmentation
    #[default]
    Auto,
    /// A single uniform block of text
    SingleBlock,
    /// A single text line
    SingleLine,
    /// A single word
    SingleWord,
    /// As much text as possible, in no particular order
    SparseText,
}

impl SegmentationMode {
    pub const ALL: [SegmentationMode; 5] = [
        Self::Auto,
        Self::SingleBlock,
        Self::SingleLine,
        Self::SingleWord,
        Self::SparseText,
    ];

    /// Tesseract's numeric code for this mode
    pub fn code(&self) -> u8 {
        match self {
            Self::Auto => 3,
            Self::SingleBlock => 6,
            Self::SingleLine => 7,
            Self::SingleWord => 8,
            Self::SparseText => 11,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::SingleBlock => "single_block",
            Self::SingleLine => "single_line",
            Self::SingleWord => "single_word",
            Self::SparseText => "sparse_text",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Auto => "Fully automatic page segmentation (default)",
            Self::SingleBlock => "Single uniform block of text",
            Self::SingleLine => "Single text line",
            Self::SingleWord => "Single word",
            Self::SparseText => "Find as much text as possible",
        }
    }
}

impl FromStr for SegmentationMode {
    type Err = OcrError;

    /// Accepts either the numeric code or the mode name
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|mode| s == mode.code().to_string() || s == mode.as_str())
            .ok_or_else(|| OcrError::InvalidInput(format!("Unknown segmentation mode: {}", s)))
    }
}

impl fmt::Display for SegmentationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.description())
    }
}

/// Recognition algorithm variant (`--oem`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineMode {
    LegacyOnly,
    LstmOnly,
    LegacyAndLstm,
    /// Whatever the installed engine supports
    #[default]
    Default,
}

impl EngineMode {
    pub fn code(&self) -> u8 {
        match self {
            Self::LegacyOnly => 0,
            Self::LstmOnly => 1,
            Self::LegacyAndLstm => 2,
            Self::Default => 3,
        }
    }
}

impl FromStr for EngineMode {
    type Err = OcrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "0" => Ok(Self::LegacyOnly),
            "1" => Ok(Self::LstmOnly),
            "2" => Ok(Self::LegacyAndLstm),
            "3" => Ok(Self::Default),
            other => Err(OcrError::InvalidInput(format!(
                "Unknown engine mode: {} (expected 0-3)",
                other
            ))),
        }
    }
}

/// Per-request recognition settings
///
/// Built once through the `with_*` methods and then only read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionConfig {
    languages: Vec<String>,
    segmentation: SegmentationMode,
    engine_mode: EngineMode,
    flags: Vec<String>,
}

impl RecognitionConfig {
    /// Create a config from a `+`-joined language selector such as `eng+jpn`
    pub fn new(languages: &str) -> Result<Self, OcrError> {
        let languages: Vec<String> = languages
            .split('+')
            .map(|code| code.trim().to_string())
            .collect();

        if let Some(bad) = languages.iter().find(|code| !is_valid_language_code(code)) {
            return Err(OcrError::InvalidInput(format!(
                "Invalid language code: '{}'",
                bad
            )));
        }

        Ok(Self {
            languages,
            segmentation: SegmentationMode::default(),
            engine_mode: EngineMode::default(),
            flags: Vec::new(),
        })
    }

    pub fn with_segmentation(mut self, segmentation: SegmentationMode) -> Self {
        self.segmentation = segmentation;
        self
    }

    pub fn with_engine_mode(mut self, engine_mode: EngineMode) -> Self {
        self.engine_mode = engine_mode;
        self
    }

    /// Extra engine arguments, split on whitespace (e.g. `-c preserve_interword_spaces=1`)
    pub fn with_flags(mut self, flags: &str) -> Self {
        self.flags = flags.split_whitespace().map(str::to_string).collect();
        self
    }

    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    /// Languages in the engine's `+`-joined form
    pub fn language_arg(&self) -> String {
        self.languages.join("+")
    }

    pub fn segmentation(&self) -> SegmentationMode {
        self.segmentation
    }

    pub fn engine_mode(&self) -> EngineMode {
        self.engine_mode
    }

    pub fn flags(&self) -> &[String] {
        &self.flags
    }
}

fn is_valid_language_code(code: &str) -> bool {
    !code.is_empty()
        && code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '/'))
}

/// Row granularity as reported by the engine
pub const WORD_LEVEL: u8 = 5;

/// One raw row of engine output, before normalization
#[derive(Debug, Clone, PartialEq)]
pub struct RawWord {
    pub level: u8,
    pub page: u32,
    pub block: u32,
    pub paragraph: u32,
    pub line: u32,
    pub word: u32,
    pub left: i64,
    pub top: i64,
    pub width: i64,
    pub height: i64,
    /// Engine confidence, 0-100 or -1 for rows that carry no text
    pub confidence: f32,
    pub text: String,
}

/// Trait that all OCR engines must implement
pub trait OcrEngine: Send + Sync {
    /// Returns the engine identifier (e.g., "tesseract")
    fn name(&self) -> &'static str;

    /// Returns a human-readable description of the engine
    fn description(&self) -> &'static str;

    /// Engine version string
    fn version(&self) -> Result<String, OcrError>;

    /// Language codes with installed recognition data
    fn available_languages(&self) -> Result<Vec<String>, OcrError>;

    /// Run recognition and return the engine's rows in reported order
    fn recognize(
        &self,
        image: &DynamicImage,
        config: &RecognitionConfig,
    ) -> Result<Vec<RawWord>, OcrError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_splits_languages() {
        let config = RecognitionConfig::new("eng+jpn").unwrap();
        assert_eq!(config.languages(), ["eng", "jpn"]);
        assert_eq!(config.language_arg(), "eng+jpn");
        assert_eq!(config.segmentation(), SegmentationMode::Auto);
        assert_eq!(config.engine_mode(), EngineMode::Default);
    }

    #[test]
    fn test_config_rejects_bad_language_codes() {
        assert!(matches!(
            RecognitionConfig::new(""),
            Err(OcrError::InvalidInput(_))
        ));
        assert!(matches!(
            RecognitionConfig::new("eng+"),
            Err(OcrError::InvalidInput(_))
        ));
        assert!(matches!(
            RecognitionConfig::new("eng;rm"),
            Err(OcrError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_flags_split_on_whitespace() {
        let config = RecognitionConfig::new("eng")
            .unwrap()
            .with_flags("  -c   preserve_interword_spaces=1 ");
        assert_eq!(config.flags(), ["-c", "preserve_interword_spaces=1"]);
    }

    #[test]
    fn test_segmentation_mode_parses_code_and_name() {
        assert_eq!(
            "6".parse::<SegmentationMode>().unwrap(),
            SegmentationMode::SingleBlock
        );
        assert_eq!(
            "single_line".parse::<SegmentationMode>().unwrap(),
            SegmentationMode::SingleLine
        );
        assert!("42".parse::<SegmentationMode>().is_err());
    }

    #[test]
    fn test_engine_mode_parses_codes() {
        assert_eq!("1".parse::<EngineMode>().unwrap(), EngineMode::LstmOnly);
        assert_eq!("3".parse::<EngineMode>().unwrap().code(), 3);
        assert!("4".parse::<EngineMode>().is_err());
    }
}
