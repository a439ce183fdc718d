pub mod analysis;
pub mod artifacts;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod recognition;
pub mod report;

pub use analysis::build_standard_pipeline;
pub use analysis::geometry::{
    map_box, map_polygon, NormalizedBox, NormalizedPoint, NormalizedPolygon, PixelBox,
    PixelPolygon,
};
pub use artifacts::{Artifact, ArtifactKind, ArtifactStore};
pub use config::{AnalysisConfig, DedupMode, OutputFormat, RecognitionConfig};
pub use error::{ArtifactWriteError, GeometryError, RenderError, ServiceError};
pub use models::{BoxGroup, Color, Label, LabelInstance, Palette, TextDetection, TextKind};
pub use pipeline::{AnalysisRun, Pipeline, PipelineContext, PipelineStep};
pub use recognition::{FixtureClient, RecognitionClient, RetryingClient};
pub use report::{HtmlReport, ReportAssembler};
