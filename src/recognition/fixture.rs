use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use crate::analysis::geometry::{NormalizedBox, NormalizedPoint, NormalizedPolygon};
use crate::error::ServiceError;
use crate::models::{Label, LabelInstance, TextDetection, TextKind};

use super::RecognitionClient;

// --- Service wire format ---

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DetectLabelsResponse {
    labels: Vec<WireLabel>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireLabel {
    name: String,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    instances: Vec<WireInstance>,
    #[serde(default)]
    parents: Vec<WireParent>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireInstance {
    bounding_box: WireBox,
    #[serde(default)]
    confidence: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireParent {
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireBox {
    width: f64,
    height: f64,
    left: f64,
    top: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DetectTextResponse {
    text_detections: Vec<WireText>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireText {
    detected_text: String,
    #[serde(rename = "Type")]
    kind: String,
    id: Option<u32>,
    parent_id: Option<u32>,
    #[serde(default)]
    confidence: f64,
    geometry: WireGeometry,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireGeometry {
    #[serde(default)]
    polygon: Vec<WirePoint>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WirePoint {
    x: f64,
    y: f64,
}

impl From<WireBox> for NormalizedBox {
    fn from(b: WireBox) -> Self {
        NormalizedBox::new(b.left, b.top, b.width, b.height)
    }
}

impl From<WireLabel> for Label {
    fn from(label: WireLabel) -> Self {
        Label {
            name: label.name,
            confidence: label.confidence,
            instances: label
                .instances
                .into_iter()
                .map(|i| LabelInstance {
                    bounding_box: i.bounding_box.into(),
                    confidence: i.confidence,
                })
                .collect(),
            parents: label.parents.into_iter().map(|p| p.name).collect(),
        }
    }
}

impl TryFrom<WireText> for TextDetection {
    type Error = ServiceError;

    fn try_from(text: WireText) -> Result<Self, Self::Error> {
        let kind = match text.kind.as_str() {
            "LINE" => TextKind::Line,
            "WORD" => TextKind::Word,
            other => {
                return Err(ServiceError::InvalidResponse(format!("unknown text type '{}'", other)));
            }
        };
        Ok(TextDetection {
            text: text.detected_text,
            kind,
            id: text.id,
            parent_id: text.parent_id,
            confidence: text.confidence,
            polygon: NormalizedPolygon::new(
                text.geometry
                    .polygon
                    .into_iter()
                    .map(|p| NormalizedPoint { x: p.x, y: p.y })
                    .collect(),
            ),
        })
    }
}

/// Parse a label-detection response body
pub fn parse_labels(json: &str) -> Result<Vec<Label>, ServiceError> {
    let response: DetectLabelsResponse =
        serde_json::from_str(json).map_err(|e| ServiceError::InvalidResponse(e.to_string()))?;
    Ok(response.labels.into_iter().map(Label::from).collect())
}

/// Parse a text-detection response body
pub fn parse_text(json: &str) -> Result<Vec<TextDetection>, ServiceError> {
    let response: DetectTextResponse =
        serde_json::from_str(json).map_err(|e| ServiceError::InvalidResponse(e.to_string()))?;
    response
        .text_detections
        .into_iter()
        .map(TextDetection::try_from)
        .collect()
}

/// Replays recorded service responses from disk.
///
/// Files are read on every call, so a missing or malformed recording
/// surfaces as a [`ServiceError`] at the same point a live call would fail.
#[derive(Debug, Clone)]
pub struct FixtureClient {
    labels_path: PathBuf,
    text_path: Option<PathBuf>,
}

impl FixtureClient {
    pub fn new(labels_path: impl Into<PathBuf>) -> Self {
        Self {
            labels_path: labels_path.into(),
            text_path: None,
        }
    }

    /// Without a text recording the client reports no text
    pub fn with_text(mut self, text_path: impl Into<PathBuf>) -> Self {
        self.text_path = Some(text_path.into());
        self
    }

    fn read(path: &Path) -> Result<String, ServiceError> {
        std::fs::read_to_string(path).map_err(|source| ServiceError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl RecognitionClient for FixtureClient {
    fn detect_labels(&self, _image: &[u8], max_labels: usize) -> Result<Vec<Label>, ServiceError> {
        let mut labels = parse_labels(&Self::read(&self.labels_path)?)?;
        labels.truncate(max_labels);
        info!(count = labels.len(), source = %self.labels_path.display(), "Found labels");
        Ok(labels)
    }

    fn detect_text(&self, _image: &[u8]) -> Result<Vec<TextDetection>, ServiceError> {
        let Some(path) = &self.text_path else {
            return Ok(Vec::new());
        };
        let texts = parse_text(&Self::read(path)?)?;
        info!(count = texts.len(), source = %path.display(), "Found texts");
        Ok(texts)
    }
}
