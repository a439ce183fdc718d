mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from labelcrop for tests
pub use labelcrop::{
    AnalysisConfig, AnalysisRun, ArtifactKind, ArtifactStore, DedupMode, Label, NormalizedBox,
    NormalizedPoint, NormalizedPolygon, OutputFormat, RecognitionClient, ServiceError,
    TextDetection, TextKind,
};
