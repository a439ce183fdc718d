use std::sync::Arc;

use anyhow::{Context, Result};
use image::{DynamicImage, ImageFormat};
use tracing::info;

use crate::analysis::{crop, render};
use crate::artifacts::{encode_image, Artifact, ArtifactKind, REPORT_NAME, TEXT_LISTING_NAME};
use crate::models::box_groups;
use crate::pipeline::{AnalysisRun, PipelineContext, PipelineStep};
use crate::recognition::RecognitionClient;
use crate::report::{text_listing, ReportAssembler, ReportInput};

const ANNOTATED_STEM: &str = "analyzed_image";
const FINAL_STEM: &str = "final_analyzed_image";

/// Ask the recognition service for labels in the submitted image
pub struct DetectLabelsStep {
    pub client: Arc<dyn RecognitionClient>,
}

impl PipelineStep for DetectLabelsStep {
    fn process(&self, run: &mut AnalysisRun, context: &PipelineContext) -> Result<()> {
        let labels = self
            .client
            .detect_labels(&run.source_bytes, context.config.max_labels)?;
        run.groups = box_groups(&labels);
        run.labels = labels;

        info!(
            labels = run.labels.len(),
            with_instances = run.groups.len(),
            "Analyzed labels"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "Label Detection"
    }
}

/// Outline every label instance on a copy of the input
pub struct RenderBoxesStep;

impl PipelineStep for RenderBoxesStep {
    fn process(&self, run: &mut AnalysisRun, context: &PipelineContext) -> Result<()> {
        let config = &context.config;
        let colors = config.palette.assign(run.groups.len());
        let annotated =
            render::render_box_groups(&run.source, &run.groups, &colors, config.stroke_width)?;

        run.artifacts.push(Artifact::image(
            config.format.file_name(ANNOTATED_STEM),
            ArtifactKind::AnnotatedImage,
            annotated,
        ));
        Ok(())
    }

    fn name(&self) -> &str {
        "Box Rendering"
    }
}

/// Cut each instance of each unique box group out of the input
pub struct CropElementsStep;

impl PipelineStep for CropElementsStep {
    fn process(&self, run: &mut AnalysisRun, context: &PipelineContext) -> Result<()> {
        let config = &context.config;
        let crops = crop::crop_groups(&run.source, &run.groups, config.dedup);
        run.crop_count = crops.len();

        for (idx, image) in crops.into_iter().enumerate() {
            run.artifacts.push(Artifact::image(
                config.format.file_name(&crop::element_name(idx)),
                ArtifactKind::ElementCrop(idx),
                image,
            ));
        }

        info!(crops = run.crop_count, dedup = ?config.dedup, "Isolated elements");
        Ok(())
    }

    fn name(&self) -> &str {
        "Element Cropping"
    }
}

/// Ask the recognition service for text.
///
/// Detection runs on the annotated image when one exists, otherwise on the input.
pub struct DetectTextStep {
    pub client: Arc<dyn RecognitionClient>,
}

impl PipelineStep for DetectTextStep {
    fn process(&self, run: &mut AnalysisRun, _context: &PipelineContext) -> Result<()> {
        let texts = match run.artifact(ArtifactKind::AnnotatedImage).and_then(|a| a.as_image()) {
            Some(annotated) => {
                let bytes = encode_image(annotated, ImageFormat::Png)
                    .context("Failed to encode annotated image")?;
                self.client.detect_text(&bytes)?
            }
            None => self.client.detect_text(&run.source_bytes)?,
        };

        info!(texts = texts.len(), "Extracted text");
        run.texts = texts;
        Ok(())
    }

    fn name(&self) -> &str {
        "Text Detection"
    }
}

/// Outline detected text on top of the annotated image
pub struct RenderPolygonsStep;

impl PipelineStep for RenderPolygonsStep {
    fn process(&self, run: &mut AnalysisRun, context: &PipelineContext) -> Result<()> {
        let config = &context.config;
        let base = match run.artifact(ArtifactKind::AnnotatedImage).and_then(|a| a.as_image()) {
            Some(annotated) => DynamicImage::ImageRgb8(annotated.clone()),
            None => (*run.source).clone(),
        };

        let polygons: Vec<_> = run.texts.iter().map(|t| t.polygon.clone()).collect();
        let final_image = render::render_polygons(&base, &polygons, config.polygon_color);

        run.artifacts.push(Artifact::image(
            config.format.file_name(FINAL_STEM),
            ArtifactKind::FinalAnnotatedImage,
            final_image,
        ));
        Ok(())
    }

    fn name(&self) -> &str {
        "Polygon Rendering"
    }
}

/// Write the text listing and the report referencing every image artifact
pub struct ReportStep {
    pub assembler: Arc<dyn ReportAssembler>,
}

impl PipelineStep for ReportStep {
    fn process(&self, run: &mut AnalysisRun, _context: &PipelineContext) -> Result<()> {
        let listing = Artifact::text(
            TEXT_LISTING_NAME,
            ArtifactKind::TextListing,
            text_listing(&run.texts),
        );

        let html = {
            let run: &AnalysisRun = run;
            self.assembler.assemble(&ReportInput {
                labels: &run.labels,
                texts: &run.texts,
                annotated_image: artifact_name(run, ArtifactKind::AnnotatedImage),
                final_image: artifact_name(run, ArtifactKind::FinalAnnotatedImage),
                crops: run.crops().map(|a| a.file_name.as_str()).collect(),
            })
        };

        run.artifacts.push(listing);
        run.artifacts
            .push(Artifact::text(REPORT_NAME, ArtifactKind::Report, html));
        Ok(())
    }

    fn name(&self) -> &str {
        "Report Assembly"
    }
}

fn artifact_name(run: &AnalysisRun, kind: ArtifactKind) -> Option<&str> {
    run.artifact(kind).map(|a| a.file_name.as_str())
}
