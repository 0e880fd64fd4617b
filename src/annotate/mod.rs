//! Confidence-colored bounding box overlay
//!
//! Every scored word gets a rectangle whose color comes from a fixed
//! tier table. The source image is never touched; drawing happens on an
//! RGB copy.

pub mod glyphs;

use crate::recognition::{BoundingBox, Confidence, RecognitionResult};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use serde::Serialize;

/// Lowest score in the high tier
pub const HIGH_CONFIDENCE: u8 = 80;
/// Lowest score in the medium tier
pub const MEDIUM_CONFIDENCE: u8 = 50;

/// Stroke width in pixels
pub const DEFAULT_THICKNESS: u32 = 2;

const LABEL_SCALE: u32 = 2;
const LABEL_PADDING: u32 = 2;
const LABEL_INK: Rgb<u8> = Rgb([255, 255, 255]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

/// Box color per tier
pub const TIER_COLORS: [(ConfidenceTier, Rgb<u8>); 3] = [
    (ConfidenceTier::High, Rgb([0, 255, 0])),
    (ConfidenceTier::Medium, Rgb([255, 165, 0])),
    (ConfidenceTier::Low, Rgb([255, 0, 0])),
];

impl ConfidenceTier {
    pub fn from_score(score: u8) -> Self {
        if score >= HIGH_CONFIDENCE {
            Self::High
        } else if score >= MEDIUM_CONFIDENCE {
            Self::Medium
        } else {
            Self::Low
        }
    }

    /// `None` for the not-applicable sentinel
    pub fn of(confidence: Confidence) -> Option<Self> {
        confidence.score().map(Self::from_score)
    }

    pub fn color(&self) -> Rgb<u8> {
        TIER_COLORS
            .iter()
            .find(|(tier, _)| tier == self)
            .map(|(_, color)| *color)
            .unwrap_or(Rgb([255, 0, 0]))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AnnotateOptions {
    /// Print the score above each box
    pub show_confidence: bool,
    pub thickness: u32,
}

impl Default for AnnotateOptions {
    fn default() -> Self {
        Self {
            show_confidence: true,
            thickness: DEFAULT_THICKNESS,
        }
    }
}

/// Boxes drawn per tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TierCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl TierCounts {
    fn record(&mut self, tier: ConfidenceTier) {
        match tier {
            ConfidenceTier::High => self.high += 1,
            ConfidenceTier::Medium => self.medium += 1,
            ConfidenceTier::Low => self.low += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.high + self.medium + self.low
    }
}

#[derive(Debug, Clone)]
pub struct AnnotatedImage {
    pub image: RgbImage,
    pub counts: TierCounts,
}

/// Draw a box for every word with text and a score
pub fn annotate(
    image: &DynamicImage,
    result: &RecognitionResult,
    options: &AnnotateOptions,
) -> AnnotatedImage {
    let mut canvas = image.to_rgb8();
    let mut counts = TierCounts::default();

    for word in result.words.iter().filter(|w| w.has_text()) {
        let Some(score) = word.confidence.score() else {
            continue;
        };
        let tier = ConfidenceTier::from_score(score);
        let color = tier.color();

        draw_box(&mut canvas, word.bbox, color, options.thickness);
        if options.show_confidence {
            draw_label(&mut canvas, word.bbox, &format!("{}%", score), color);
        }
        counts.record(tier);
    }

    tracing::debug!(
        "Annotated {} boxes (high: {}, medium: {}, low: {})",
        counts.total(),
        counts.high,
        counts.medium,
        counts.low
    );

    AnnotatedImage {
        image: canvas,
        counts,
    }
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// Stroke centered on the box edge: half inside, half outside
fn draw_box(canvas: &mut RgbImage, bbox: BoundingBox, color: Rgb<u8>, thickness: u32) {
    let (x, y) = (to_i32(bbox.x), to_i32(bbox.y));
    let (width, height) = (to_i32(bbox.width.max(1)), to_i32(bbox.height.max(1)));
    let thickness = to_i32(thickness.max(1));
    let half = thickness / 2;

    for i in 0..thickness {
        let offset = i - half;
        let rw = width.saturating_add(offset * 2);
        let rh = height.saturating_add(offset * 2);
        if rw <= 0 || rh <= 0 {
            continue;
        }

        let rect = Rect::at(x - offset, y - offset).of_size(rw as u32, rh as u32);
        draw_hollow_rect_mut(canvas, rect, color);
    }
}

/// Filled tab above the box with the label in white; inside the box when
/// there is no room above
fn draw_label(canvas: &mut RgbImage, bbox: BoundingBox, text: &str, color: Rgb<u8>) {
    let (text_width, text_height) = glyphs::text_size(text, LABEL_SCALE);
    let tab_width = text_width + LABEL_PADDING * 2;
    let tab_height = text_height + LABEL_PADDING * 2;

    let x = to_i32(bbox.x);
    let y = if bbox.y >= tab_height {
        to_i32(bbox.y - tab_height)
    } else {
        to_i32(bbox.y)
    };

    draw_filled_rect_mut(canvas, Rect::at(x, y).of_size(tab_width, tab_height), color);
    let pad = to_i32(LABEL_PADDING);
    glyphs::draw_text(canvas, x + pad, y + pad, text, LABEL_SCALE, LABEL_INK);
}
