use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use image::DynamicImage;
use tracing::{debug, info};
use uuid::Uuid;

use crate::artifacts::{Artifact, ArtifactKind};
use crate::config::AnalysisConfig;
use crate::models::{BoxGroup, Label, TextDetection};

/// State of one analysis as it moves through the pipeline.
/// Every step reads what earlier steps left here and adds its own outputs.
pub struct AnalysisRun {
    pub run_id: Uuid,

    /// Name the caller gave the input (usually its file name)
    pub source_name: String,

    /// Encoded input exactly as submitted, sent to the recognition service
    pub source_bytes: Arc<Vec<u8>>,

    /// Decoded input
    pub source: Arc<DynamicImage>,

    pub labels: Vec<Label>,

    /// One group per label with instances, in label order
    pub groups: Vec<BoxGroup>,

    pub texts: Vec<TextDetection>,

    pub crop_count: usize,

    pub artifacts: Vec<Artifact>,
}

impl AnalysisRun {
    /// Decode `bytes`; fails before any recognition call if the input is not an image
    pub fn new(source_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let source_name = source_name.into();
        let source = image::load_from_memory(&bytes)
            .with_context(|| format!("Failed to decode image {}", source_name))?;
        Ok(Self {
            run_id: Uuid::new_v4(),
            source_name,
            source_bytes: Arc::new(bytes),
            source: Arc::new(source),
            labels: Vec::new(),
            groups: Vec::new(),
            texts: Vec::new(),
            crop_count: 0,
            artifacts: Vec::new(),
        })
    }

    /// First artifact of the given kind
    pub fn artifact(&self, kind: ArtifactKind) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.kind == kind)
    }

    pub fn crops(&self) -> impl Iterator<Item = &Artifact> {
        self.artifacts
            .iter()
            .filter(|a| matches!(a.kind, ArtifactKind::ElementCrop(_)))
    }
}

/// Debug configuration for pipeline execution
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for debug outputs
    pub output_dir: PathBuf,
    /// Whether debug mode is enabled
    pub enabled: bool,
}

/// Context available to all pipeline steps
#[derive(Clone)]
pub struct PipelineContext {
    pub config: AnalysisConfig,
    pub debug: Option<DebugConfig>,
}

/// Trait that all pipeline steps must implement
pub trait PipelineStep: Send + Sync {
    /// Read earlier outputs from `run` and add this step's outputs to it
    fn process(&self, run: &mut AnalysisRun, context: &PipelineContext) -> Result<()>;

    /// Human-readable name for this step (used in logs and debug directory names)
    fn name(&self) -> &str;
}

/// Composable pipeline builder
pub struct Pipeline {
    steps: Vec<Arc<dyn PipelineStep>>,
    context: PipelineContext,
}

impl Pipeline {
    /// Create a new empty pipeline
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            context: PipelineContext {
                config: AnalysisConfig::default(),
                debug: None,
            },
        }
    }

    pub fn with_config(mut self, config: AnalysisConfig) -> Self {
        self.context.config = config;
        self
    }

    /// Enable debug mode with output directory
    /// The directory must be empty or non-existent
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                return Err(anyhow::anyhow!(
                    "Debug directory is not empty: {}",
                    output_dir.display()
                ));
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }

        self.context.debug = Some(DebugConfig {
            output_dir,
            enabled: true,
        });

        Ok(self)
    }

    /// Add a processing step to the pipeline
    pub fn add_step(mut self, step: Arc<dyn PipelineStep>) -> Self {
        self.steps.push(step);
        self
    }

    /// Run every step in order on one input image
    pub fn run(&self, source_name: impl Into<String>, bytes: Vec<u8>) -> Result<AnalysisRun> {
        self.run_partial(source_name, bytes, self.steps.len())
    }

    /// Run only the first `num_steps` steps (useful for debugging)
    pub fn run_partial(
        &self,
        source_name: impl Into<String>,
        bytes: Vec<u8>,
        num_steps: usize,
    ) -> Result<AnalysisRun> {
        let mut run = AnalysisRun::new(source_name, bytes)?;
        info!(
            run_id = %run.run_id,
            source = %run.source_name,
            width = run.source.width(),
            height = run.source.height(),
            "Starting analysis"
        );

        for (step_idx, step) in self.steps.iter().take(num_steps).enumerate() {
            let step_name = step.name();
            debug!(step = step_name, "Running step");

            let produced_from = run.artifacts.len();
            step.process(&mut run, &self.context)
                .with_context(|| format!("Step '{}' failed", step_name))?;

            self.save_debug_output(step_idx, step_name, &run.artifacts[produced_from..])?;
        }

        Ok(run)
    }

    /// Save the images a step produced, if debug mode is enabled
    fn save_debug_output(
        &self,
        step_idx: usize,
        step_name: &str,
        produced: &[Artifact],
    ) -> Result<()> {
        let Some(debug_config) = &self.context.debug else {
            return Ok(());
        };
        if !debug_config.enabled {
            return Ok(());
        }

        let images: Vec<_> = produced.iter().filter_map(|a| a.as_image()).collect();
        if images.is_empty() {
            return Ok(());
        }

        let step_dir_name = format!(
            "{:02}_{}",
            step_idx + 1,
            step_name.to_lowercase().replace(' ', "_")
        );
        let step_dir = debug_config.output_dir.join(&step_dir_name);
        std::fs::create_dir_all(&step_dir)?;

        for (idx, image) in images.iter().enumerate() {
            let output_path = step_dir.join(format!("{:02}.png", idx + 1));
            image
                .save(&output_path)
                .map_err(|e| anyhow::anyhow!("Failed to save debug image: {}", e))?;
        }

        debug!(count = images.len(), dir = %step_dir_name, "Saved debug images");
        Ok(())
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}
