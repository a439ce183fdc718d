use std::time::Duration;

use clap::ValueEnum;
use image::ImageFormat;
use serde::{Deserialize, Serialize};

use crate::analysis::render::DEFAULT_STROKE_WIDTH;
use crate::models::{Color, Palette};

/// How the cropper treats box groups with identical box lists.
///
/// `Group` keeps only the first of several identical groups. Two labels that
/// share one box but differ elsewhere are still both cropped, so the same
/// region can appear twice. This mirrors the historical behavior and is likely
/// a defect; `Off` crops every group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum DedupMode {
    #[default]
    Group,
    Off,
}

/// Encoding used for image artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum OutputFormat {
    #[default]
    #[value(name = "jpg")]
    Jpeg,
    Png,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
        }
    }

    pub fn image_format(&self) -> ImageFormat {
        match self {
            OutputFormat::Jpeg => ImageFormat::Jpeg,
            OutputFormat::Png => ImageFormat::Png,
        }
    }

    pub fn file_name(&self, stem: &str) -> String {
        format!("{}.{}", stem, self.extension())
    }
}

/// Settings for one analysis run
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Upper bound on labels requested from the recognition service
    pub max_labels: usize,
    pub stroke_width: u32,
    pub palette: Palette,
    pub polygon_color: Color,
    pub dedup: DedupMode,
    pub format: OutputFormat,
}

impl AnalysisConfig {
    pub fn new() -> Self {
        Self {
            max_labels: 100,
            stroke_width: DEFAULT_STROKE_WIDTH,
            palette: Palette::default(),
            polygon_color: Color::AQUA,
            dedup: DedupMode::Group,
            format: OutputFormat::Jpeg,
        }
    }

    pub fn with_max_labels(mut self, max_labels: usize) -> Self {
        self.max_labels = max_labels;
        self
    }

    pub fn with_stroke_width(mut self, stroke_width: u32) -> Self {
        self.stroke_width = stroke_width;
        self
    }

    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = palette;
        self
    }

    pub fn with_polygon_color(mut self, color: Color) -> Self {
        self.polygon_color = color;
        self
    }

    pub fn with_dedup(mut self, dedup: DedupMode) -> Self {
        self.dedup = dedup;
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Retry policy for the recognition service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionConfig {
    /// Total attempts per call, including the first
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RecognitionConfig {
    pub fn new() -> Self {
        Self {
            max_attempts: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(20),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_delays(mut self, base_delay: Duration, max_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self.max_delay = max_delay;
        self
    }

    /// Delay before retry number `attempt` (1-based): doubles each time, capped at `max_delay`
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self::new()
    }
}
