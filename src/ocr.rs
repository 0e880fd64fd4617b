use crate::annotate::{self, AnnotateOptions, AnnotatedImage};
use crate::engine::{OcrEngine, RecognitionConfig};
use crate::error::OcrError;
use crate::preprocessing::{Pipeline, PreprocessOptions, StepTiming};
use crate::recognition::{self, WordResult};
use image::DynamicImage;
use std::sync::Arc;
use std::time::Instant;

/// Everything one OCR run produces
#[derive(Debug, Clone)]
pub struct OcrSummary {
    pub full_text: String,
    pub words: Vec<WordResult>,
    pub mean_confidence: Option<f32>,
    pub annotated: AnnotatedImage,
    pub preprocessing: Vec<StepTiming>,
    pub processing_time_ms: u64,
}

/// Runs preprocessing, recognition and annotation as one unit
#[derive(Clone)]
pub struct OcrProcessor {
    engine: Arc<dyn OcrEngine>,
    annotate: AnnotateOptions,
}

impl OcrProcessor {
    pub fn new(engine: Arc<dyn OcrEngine>) -> Self {
        Self {
            engine,
            annotate: AnnotateOptions::default(),
        }
    }

    pub fn with_annotate_options(mut self, options: AnnotateOptions) -> Self {
        self.annotate = options;
        self
    }

    pub fn engine(&self) -> &dyn OcrEngine {
        self.engine.as_ref()
    }

    /// Run the full pipeline on `image`
    ///
    /// The first failing stage ends the run and its error is returned as is.
    /// Boxes are drawn on the original image, not the preprocessed one.
    pub fn run(
        &self,
        image: DynamicImage,
        config: &RecognitionConfig,
        preprocess: &PreprocessOptions,
    ) -> Result<OcrSummary, OcrError> {
        let start = Instant::now();
        let pipeline = Pipeline::new(*preprocess)?;

        let prepared = pipeline.process(image.clone())?;
        let result = recognition::recognize(self.engine.as_ref(), &prepared.image, config)?;
        let annotated = annotate::annotate(&image, &result, &self.annotate);

        let mean_confidence = result.mean_confidence();
        let processing_time_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            "OCR completed in {}ms ({} words, mean confidence: {}, languages: {})",
            processing_time_ms,
            result.words.len(),
            mean_confidence
                .map(|c| format!("{:.1}", c))
                .unwrap_or_else(|| "n/a".to_string()),
            config.language_arg()
        );

        Ok(OcrSummary {
            full_text: result.full_text,
            words: result.words,
            mean_confidence,
            annotated,
            preprocessing: prepared.steps,
            processing_time_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::fixed::{word, FixedEngine};
    use image::{Rgb, RgbImage};

    fn page() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(200, 80, Rgb([250, 250, 250])))
    }

    fn processor(engine: FixedEngine) -> (OcrProcessor, Arc<FixedEngine>) {
        let engine = Arc::new(engine);
        (OcrProcessor::new(engine.clone()), engine)
    }

    #[test]
    fn test_run_assembles_summary() {
        let (processor, _) = processor(FixedEngine::new(vec![
            word(1, "TEST", (10, 20, 60, 30), 96.0),
            word(1, "123", (90, 20, 50, 30), 64.0),
        ]));
        let config = RecognitionConfig::new("eng").unwrap();

        let summary = processor
            .run(page(), &config, &PreprocessOptions::default())
            .unwrap();

        assert_eq!(summary.full_text, "TEST 123");
        assert_eq!(summary.words.len(), 2);
        assert_eq!(summary.mean_confidence, Some(80.0));
        assert_eq!(summary.annotated.counts.high, 1);
        assert_eq!(summary.annotated.counts.medium, 1);
        assert_eq!(summary.annotated.image.dimensions(), (200, 80));
    }

    #[test]
    fn test_annotation_uses_original_colors() {
        let (processor, _) = processor(FixedEngine::new(vec![word(
            1,
            "x",
            (10, 20, 20, 20),
            90.0,
        )]));
        let config = RecognitionConfig::new("eng").unwrap();
        let input = DynamicImage::ImageRgb8(RgbImage::from_pixel(100, 60, Rgb([10, 20, 200])));

        let summary = processor
            .run(input, &config, &crate::preprocessing::Preset::Minimal.options())
            .unwrap();

        // Grayscale preprocessing must not leak into the annotated output
        assert_eq!(summary.annotated.image.get_pixel(90, 50), &Rgb([10, 20, 200]));
        assert_eq!(summary.preprocessing.len(), 1);
    }

    #[test]
    fn test_invalid_preprocessing_stops_before_engine() {
        let (processor, engine) = processor(FixedEngine::new(Vec::new()));
        let config = RecognitionConfig::new("eng").unwrap();
        let options = PreprocessOptions {
            contrast: true,
            contrast_factor: 0.0,
            ..PreprocessOptions::default()
        };

        let err = processor.run(page(), &config, &options).unwrap_err();
        assert!(matches!(err, OcrError::InvalidInput(_)));
        assert_eq!(engine.calls(), 0);
    }

    #[test]
    fn test_unsupported_language_propagates() {
        let (processor, engine) = processor(FixedEngine::new(vec![word(
            1,
            "TEST",
            (0, 0, 10, 10),
            90.0,
        )]));
        let config = RecognitionConfig::new("xyz").unwrap();

        let err = processor
            .run(page(), &config, &PreprocessOptions::default())
            .unwrap_err();
        assert!(matches!(err, OcrError::UnsupportedLanguage { .. }));
        assert_eq!(engine.calls(), 0);
    }
}
