pub mod crop;
pub mod geometry;
pub mod render;
pub mod steps;

use std::sync::Arc;

use crate::config::AnalysisConfig;
use crate::pipeline::Pipeline;
use crate::recognition::RecognitionClient;
use crate::report::{HtmlReport, ReportAssembler};

/// Build the standard analysis pipeline: labels, boxes, crops, text, polygons, report
pub fn build_standard_pipeline(
    config: AnalysisConfig,
    client: Arc<dyn RecognitionClient>,
) -> Pipeline {
    build_pipeline_with_report(config, client, Arc::new(HtmlReport))
}

/// Standard pipeline with a caller-supplied report assembler
pub fn build_pipeline_with_report(
    config: AnalysisConfig,
    client: Arc<dyn RecognitionClient>,
    assembler: Arc<dyn ReportAssembler>,
) -> Pipeline {
    use steps::*;

    Pipeline::new()
        .with_config(config)
        .add_step(Arc::new(DetectLabelsStep { client: client.clone() }))
        .add_step(Arc::new(RenderBoxesStep))
        .add_step(Arc::new(CropElementsStep))
        .add_step(Arc::new(DetectTextStep { client }))
        .add_step(Arc::new(RenderPolygonsStep))
        .add_step(Arc::new(ReportStep { assembler }))
}
