use crate::annotate::{
    AnnotateOptions, ConfidenceTier, TierCounts, HIGH_CONFIDENCE, MEDIUM_CONFIDENCE, TIER_COLORS,
};
use crate::config::Config;
use crate::engine::{EngineMode, RecognitionConfig, SegmentationMode};
use crate::engines::TesseractEngine;
use crate::error::OcrError;
use crate::ocr::OcrProcessor;
use crate::preprocessing::{PreprocessOptions, Preset, StepTiming};
use crate::recognition::WordResult;
use crate::report;
use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::{header, StatusCode},
    middleware,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Room for multipart boundaries and the small form fields around the file
const FORM_OVERHEAD: usize = 64 * 1024;

const INDEX_HTML: &str = include_str!("../static/index.html");

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub processor: OcrProcessor,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(processor: OcrProcessor, config: Config) -> Self {
        Self {
            processor,
            config: Arc::new(config),
        }
    }
}

/// OCR response
#[derive(Serialize)]
pub struct OcrResponse {
    pub text: String,
    pub words: Vec<WordResult>,
    pub mean_confidence: Option<f32>,
    pub mean_confidence_display: String,
    pub tier_counts: TierCounts,
    pub preprocessing: Vec<StepTiming>,
    pub processing_time_ms: u64,
    /// Annotated image, base64-encoded PNG
    pub annotated_image: String,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct SegmentationInfo {
    pub code: u8,
    pub name: &'static str,
    pub description: &'static str,
}

#[derive(Serialize)]
pub struct TierInfo {
    pub tier: ConfidenceTier,
    pub min_score: u8,
    pub color: [u8; 3],
}

/// Server info response
#[derive(Serialize)]
pub struct InfoResponse {
    pub version: String,
    pub engine: String,
    pub engine_version: Option<String>,
    pub installed_languages: Vec<String>,
    pub default_language: String,
    pub segmentation_modes: Vec<SegmentationInfo>,
    pub presets: Vec<&'static str>,
    pub confidence_tiers: Vec<TierInfo>,
    pub max_file_size_bytes: usize,
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_file_size.saturating_add(FORM_OVERHEAD);

    let max_file_size = state.config.max_file_size;

    Router::new()
        .route("/", get(handle_index))
        .route("/ocr", post(handle_ocr))
        .route("/health", get(handle_health))
        .route("/info", get(handle_info))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(middleware::map_response_with_state(
            max_file_size,
            json_payload_too_large,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::disable()),
        )
        .with_state(state)
}

/// The body limit layer answers in plain text; give callers the usual JSON error
async fn json_payload_too_large(State(max): State<usize>, response: Response) -> Response {
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));

    if response.status() == StatusCode::PAYLOAD_TOO_LARGE && !is_json {
        return OcrError::UploadTooLarge { max }.into_response();
    }
    response
}

fn multipart_error(err: MultipartError, context: &str, max: usize) -> OcrError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        OcrError::UploadTooLarge { max }
    } else {
        OcrError::InvalidRequest(format!("{}: {}", context, err))
    }
}

/// Run the HTTP server
pub async fn run(config: Config) -> anyhow::Result<()> {
    let engine = TesseractEngine::new(&config.engine);
    let processor = OcrProcessor::new(Arc::new(engine));
    let addr = format!("{}:{}", config.host, config.port);

    let probe = processor.clone();
    match tokio::task::spawn_blocking(move || probe.engine().version()).await? {
        Ok(version) => tracing::info!("Using {}", version),
        Err(e) => tracing::warn!("{}; requests will fail until it is installed", e),
    }

    let app = router(AppState::new(processor, config));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn handle_index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Form fields of an OCR request, before validation
#[derive(Default)]
struct OcrForm {
    file: Option<Bytes>,
    language: Option<String>,
    psm: Option<String>,
    oem: Option<String>,
    flags: Option<String>,
    preset: Option<String>,
    grayscale: Option<String>,
    contrast: Option<String>,
    contrast_factor: Option<String>,
    sharpen: Option<String>,
    sharpness_factor: Option<String>,
    denoise: Option<String>,
    show_confidence: Option<String>,
}

impl OcrForm {
    async fn read(mut multipart: Multipart, max_file_size: usize) -> Result<Self, OcrError> {
        let mut form = OcrForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| multipart_error(e, "Failed to parse multipart", max_file_size))?
        {
            let name = field.name().unwrap_or_default().to_string();

            if name == "file" {
                form.file = Some(field.bytes().await.map_err(|e| {
                    multipart_error(e, "Failed to read file data", max_file_size)
                })?);
                continue;
            }

            let slot = match name.as_str() {
                "language" => &mut form.language,
                "psm" => &mut form.psm,
                "oem" => &mut form.oem,
                "flags" => &mut form.flags,
                "preset" => &mut form.preset,
                "grayscale" => &mut form.grayscale,
                "contrast" => &mut form.contrast,
                "contrast_factor" => &mut form.contrast_factor,
                "sharpen" => &mut form.sharpen,
                "sharpness_factor" => &mut form.sharpness_factor,
                "denoise" => &mut form.denoise,
                "show_confidence" => &mut form.show_confidence,
                _ => {
                    tracing::debug!("Ignoring unknown form field: {}", name);
                    continue;
                }
            };
            let value = field
                .text()
                .await
                .map_err(|e| multipart_error(e, &format!("Invalid {}", name), max_file_size))?;
            *slot = Some(value.trim().to_string()).filter(|v| !v.is_empty());
        }

        Ok(form)
    }

    fn recognition_config(&self, default_language: &str) -> Result<RecognitionConfig, OcrError> {
        let language = self.language.as_deref().unwrap_or(default_language);
        let mut config = RecognitionConfig::new(language)?;
        if let Some(psm) = &self.psm {
            config = config.with_segmentation(psm.parse()?);
        }
        if let Some(oem) = &self.oem {
            config = config.with_engine_mode(oem.parse::<EngineMode>()?);
        }
        if let Some(flags) = &self.flags {
            config = config.with_flags(flags);
        }
        Ok(config)
    }

    /// Preset first, then individual switches on top
    fn preprocess_options(&self) -> Result<PreprocessOptions, OcrError> {
        let mut options = match &self.preset {
            Some(preset) => preset.parse::<Preset>()?.options(),
            None => PreprocessOptions::default(),
        };

        override_flag(&mut options.grayscale, "grayscale", &self.grayscale)?;
        override_flag(&mut options.contrast, "contrast", &self.contrast)?;
        override_flag(&mut options.sharpen, "sharpen", &self.sharpen)?;
        override_flag(&mut options.denoise, "denoise", &self.denoise)?;
        override_factor(&mut options.contrast_factor, "contrast_factor", &self.contrast_factor)?;
        override_factor(
            &mut options.sharpness_factor,
            "sharpness_factor",
            &self.sharpness_factor,
        )?;

        Ok(options)
    }

    fn annotate_options(&self) -> Result<AnnotateOptions, OcrError> {
        let mut options = AnnotateOptions::default();
        override_flag(&mut options.show_confidence, "show_confidence", &self.show_confidence)?;
        Ok(options)
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool, OcrError> {
    match value.to_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        other => Err(OcrError::InvalidRequest(format!(
            "Invalid value for {}: {}",
            name, other
        ))),
    }
}

fn override_flag(target: &mut bool, name: &str, value: &Option<String>) -> Result<(), OcrError> {
    if let Some(value) = value {
        *target = parse_flag(name, value)?;
    }
    Ok(())
}

fn override_factor(target: &mut f32, name: &str, value: &Option<String>) -> Result<(), OcrError> {
    if let Some(value) = value {
        *target = value.parse().map_err(|_| {
            OcrError::InvalidRequest(format!("Invalid value for {}: {}", name, value))
        })?;
    }
    Ok(())
}

/// Handle OCR requests
async fn handle_ocr(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<OcrResponse>, OcrError> {
    let form = OcrForm::read(multipart, state.config.max_file_size).await?;

    let data = form.file.as_ref().ok_or(OcrError::MissingFile)?;
    if data.len() > state.config.max_file_size {
        return Err(OcrError::ImageTooLarge {
            size: data.len(),
            max: state.config.max_file_size,
        });
    }

    let config = form.recognition_config(&state.config.default_language)?;
    let preprocess = form.preprocess_options()?;
    let processor = state
        .processor
        .clone()
        .with_annotate_options(form.annotate_options()?);

    let image = image::load_from_memory(data)
        .map_err(|e| OcrError::InvalidInput(format!("Failed to decode image: {}", e)))?;

    tracing::info!(
        "OCR request: {}x{} image, languages: {}, psm: {}",
        image.width(),
        image.height(),
        config.language_arg(),
        config.segmentation()
    );

    // Engine calls block on a subprocess
    let summary = tokio::task::spawn_blocking(move || processor.run(image, &config, &preprocess))
        .await
        .map_err(|e| OcrError::Internal(format!("OCR task failed: {}", e)))??;

    let png = report::encode_png(&summary.annotated.image)?;

    Ok(Json(OcrResponse {
        mean_confidence_display: report::format_confidence(summary.mean_confidence),
        text: summary.full_text,
        words: summary.words,
        mean_confidence: summary.mean_confidence,
        tier_counts: summary.annotated.counts,
        preprocessing: summary.preprocessing,
        processing_time_ms: summary.processing_time_ms,
        annotated_image: STANDARD.encode(png),
    }))
}

/// Handle health check requests
async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle info requests
async fn handle_info(State(state): State<AppState>) -> impl IntoResponse {
    let processor = state.processor.clone();
    let probed = tokio::task::spawn_blocking(move || {
        let engine = processor.engine();
        (engine.name(), engine.version(), engine.available_languages())
    })
    .await;

    let (engine, engine_version, installed_languages) = match probed {
        Ok((name, version, languages)) => {
            let languages = languages.unwrap_or_else(|e| {
                tracing::warn!("Could not list languages: {}", e);
                Vec::new()
            });
            (name.to_string(), version.ok(), languages)
        }
        Err(e) => {
            tracing::warn!("Engine probe failed: {}", e);
            ("unknown".to_string(), None, Vec::new())
        }
    };

    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        engine,
        engine_version,
        installed_languages,
        default_language: state.config.default_language.clone(),
        segmentation_modes: SegmentationMode::ALL
            .iter()
            .map(|mode| SegmentationInfo {
                code: mode.code(),
                name: mode.as_str(),
                description: mode.description(),
            })
            .collect(),
        presets: [Preset::None, Preset::Minimal, Preset::Enhanced, Preset::Aggressive]
            .iter()
            .map(Preset::as_str)
            .collect(),
        confidence_tiers: TIER_COLORS
            .iter()
            .map(|(tier, color)| TierInfo {
                tier: *tier,
                min_score: match tier {
                    ConfidenceTier::High => HIGH_CONFIDENCE,
                    ConfidenceTier::Medium => MEDIUM_CONFIDENCE,
                    ConfidenceTier::Low => 0,
                },
                color: color.0,
            })
            .collect(),
        max_file_size_bytes: state.config.max_file_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("denoise", "on").unwrap());
        assert!(parse_flag("denoise", "TRUE").unwrap());
        assert!(!parse_flag("denoise", "0").unwrap());
        assert!(matches!(
            parse_flag("denoise", "maybe"),
            Err(OcrError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_switches_override_preset() {
        let form = OcrForm {
            preset: Some("aggressive".to_string()),
            denoise: Some("false".to_string()),
            contrast_factor: Some("1.5".to_string()),
            ..OcrForm::default()
        };

        let options = form.preprocess_options().unwrap();
        assert!(options.grayscale);
        assert!(options.sharpen);
        assert!(!options.denoise);
        assert_eq!(options.contrast_factor, 1.5);
    }

    #[test]
    fn test_recognition_config_from_form() {
        let form = OcrForm {
            psm: Some("7".to_string()),
            oem: Some("1".to_string()),
            flags: Some("-c preserve_interword_spaces=1".to_string()),
            ..OcrForm::default()
        };

        let config = form.recognition_config("deu").unwrap();
        assert_eq!(config.language_arg(), "deu");
        assert_eq!(config.segmentation(), SegmentationMode::SingleLine);
        assert_eq!(config.engine_mode(), EngineMode::LstmOnly);
        assert_eq!(config.flags().len(), 2);
    }

    #[test]
    fn test_unknown_psm_rejected() {
        let form = OcrForm {
            psm: Some("42".to_string()),
            ..OcrForm::default()
        };
        assert!(form.recognition_config("eng").is_err());
    }
}
