use std::path::PathBuf;

/// Default maximum upload size (50MB)
pub const DEFAULT_MAX_FILE_SIZE: usize = 52_428_800;

/// Settings for locating the external tesseract installation
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Path or name of the tesseract executable
    pub executable: PathBuf,
    /// Directory holding `*.traineddata` files (tesseract's own default if unset)
    pub tessdata_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("tesseract"),
            tessdata_dir: None,
        }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub default_language: String,
    pub max_file_size: usize,
    pub engine: EngineConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7860,
            default_language: "eng".to_string(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            engine: EngineConfig::default(),
        }
    }
}
