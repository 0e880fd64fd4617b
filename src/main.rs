use clap::{Args, Parser, Subcommand};
use ocr_annotate::annotate::AnnotateOptions;
use ocr_annotate::config::{Config, EngineConfig};
use ocr_annotate::engine::{EngineMode, RecognitionConfig, SegmentationMode};
use ocr_annotate::engines::TesseractEngine;
use ocr_annotate::ocr::{OcrProcessor, OcrSummary};
use ocr_annotate::preprocessing::{PreprocessOptions, Preset, DEFAULT_ENHANCE_FACTOR};
use ocr_annotate::{report, selftest, server};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "ocr-annotate")]
#[command(about = "Tesseract OCR with confidence-colored bounding boxes")]
#[command(version)]
struct Cli {
    /// Path to the tesseract executable
    #[arg(long, global = true, env = "TESSERACT_PATH", default_value = "tesseract")]
    tesseract: PathBuf,

    /// Path to tessdata directory (uses TESSDATA_PREFIX env var if not set)
    #[arg(long, global = true, env = "TESSDATA_PREFIX")]
    tessdata_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "RUST_LOG", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the web front end
    Serve(ServeArgs),
    /// Recognize a single image file
    Run(RunArgs),
    /// Check that the engine is installed and working
    Selftest {
        /// Language used for the recognition checks
        #[arg(long, default_value = "eng")]
        language: String,
    },
    /// List installed language codes
    Languages,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Host address to bind to
    #[arg(long, env = "OCR_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(long, env = "OCR_PORT", default_value = "7860")]
    port: u16,

    /// Default language for OCR (e.g., "eng", "deu", "eng+fra")
    #[arg(long, env = "OCR_DEFAULT_LANGUAGE", default_value = "eng")]
    default_language: String,

    /// Maximum file size in bytes (default: 50MB)
    #[arg(long, env = "OCR_MAX_FILE_SIZE", default_value = "52428800")]
    max_file_size: usize,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Image to recognize
    image: PathBuf,

    /// Language codes joined with "+"
    #[arg(short, long, default_value = "eng")]
    language: String,

    /// Page segmentation mode (3, 6, 7, 8 or 11)
    #[arg(long, default_value = "3")]
    psm: SegmentationMode,

    /// OCR engine mode (0-3)
    #[arg(long, default_value = "3")]
    oem: EngineMode,

    /// Extra engine arguments, e.g. "-c preserve_interword_spaces=1"
    #[arg(long, allow_hyphen_values = true)]
    flags: Option<String>,

    /// Preprocessing preset; individual switches are added on top
    #[arg(long)]
    preset: Option<Preset>,

    #[arg(long)]
    grayscale: bool,

    #[arg(long)]
    contrast: bool,

    #[arg(long, default_value_t = DEFAULT_ENHANCE_FACTOR)]
    contrast_factor: f32,

    #[arg(long)]
    sharpen: bool,

    #[arg(long, default_value_t = DEFAULT_ENHANCE_FACTOR)]
    sharpness_factor: f32,

    #[arg(long)]
    denoise: bool,

    /// Draw boxes without confidence labels
    #[arg(long)]
    no_labels: bool,

    /// Save the annotated image and text here
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

impl RunArgs {
    fn preprocess_options(&self) -> PreprocessOptions {
        let base = self.preset.unwrap_or_default().options();
        PreprocessOptions {
            grayscale: base.grayscale || self.grayscale,
            contrast: base.contrast || self.contrast,
            contrast_factor: self.contrast_factor,
            sharpen: base.sharpen || self.sharpen,
            sharpness_factor: self.sharpness_factor,
            denoise: base.denoise || self.denoise,
        }
    }

    fn recognition_config(&self) -> anyhow::Result<RecognitionConfig> {
        let mut config = RecognitionConfig::new(&self.language)?
            .with_segmentation(self.psm)
            .with_engine_mode(self.oem);
        if let Some(flags) = &self.flags {
            config = config.with_flags(flags);
        }
        Ok(config)
    }
}

fn build_config(serve: ServeArgs, engine: EngineConfig) -> Config {
    Config {
        host: serve.host,
        port: serve.port,
        default_language: serve.default_language,
        max_file_size: serve.max_file_size,
        engine,
    }
}

fn processor(engine: &EngineConfig) -> OcrProcessor {
    OcrProcessor::new(Arc::new(TesseractEngine::new(engine)))
}

fn print_summary(summary: &OcrSummary) {
    println!("{}", summary.full_text);
    println!();
    print!("{}", report::words_table(&summary.words));
    println!();
    println!(
        "Mean confidence: {}",
        report::format_confidence(summary.mean_confidence)
    );
    let counts = summary.annotated.counts;
    println!(
        "Boxes: {} high, {} medium, {} low",
        counts.high, counts.medium, counts.low
    );
}

fn run_image(args: RunArgs, engine: &EngineConfig) -> anyhow::Result<()> {
    let config = args.recognition_config()?;
    let preprocess = args.preprocess_options();
    let processor = processor(engine).with_annotate_options(AnnotateOptions {
        show_confidence: !args.no_labels,
        ..AnnotateOptions::default()
    });

    let image = image::open(&args.image)
        .map_err(|e| anyhow::anyhow!("Failed to open {}: {}", args.image.display(), e))?;
    let summary = processor.run(image, &config, &preprocess)?;

    if args.json {
        let output = json!({
            "text": summary.full_text,
            "words": summary.words,
            "mean_confidence": summary.mean_confidence,
            "tier_counts": summary.annotated.counts,
            "preprocessing": summary.preprocessing,
            "processing_time_ms": summary.processing_time_ms,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_summary(&summary);
    }

    if let Some(dir) = &args.output_dir {
        let saved = report::save_output(&summary, dir)?;
        eprintln!(
            "Saved {} and {}",
            saved.image.display(),
            saved.text.display()
        );
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let engine = EngineConfig {
        executable: cli.tesseract,
        tessdata_dir: cli.tessdata_dir,
    };

    match cli.command {
        Command::Serve(args) => {
            let config = build_config(args, engine);
            tracing::info!("Starting ocr-annotate v{}", env!("CARGO_PKG_VERSION"));
            tracing::info!("Binding to {}:{}", config.host, config.port);
            server::run(config).await
        }
        Command::Run(args) => run_image(args, &engine),
        Command::Selftest { language } => {
            let report = selftest::run_checks(&processor(&engine), &language);
            println!("{}", report);
            if !report.all_passed() {
                anyhow::bail!(
                    "{} of {} checks did not pass",
                    report.outcomes.len() - report.passed(),
                    report.outcomes.len()
                );
            }
            Ok(())
        }
        Command::Languages => {
            for language in processor(&engine).engine().available_languages()? {
                println!("{}", language);
            }
            Ok(())
        }
    }
}
