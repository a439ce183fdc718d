use std::io::Cursor;
use std::sync::{Arc, Mutex};

use image::{ImageBuffer, ImageFormat, Rgb};
use labelcrop::{
    build_standard_pipeline, AnalysisConfig, Label, NormalizedBox, NormalizedPoint,
    NormalizedPolygon, OutputFormat, Pipeline, RecognitionClient, ServiceError, TextDetection,
    TextKind,
};

/// Encodes a gradient test image as PNG bytes, the way an upload would arrive.
pub fn create_test_image(width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([(x * 255 / width.max(1)) as u8, (y * 255 / height.max(1)) as u8, 128u8])
    });
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("Failed to encode test image");
    bytes
}

/// PNG output keeps pixel comparisons exact
pub fn png_config() -> AnalysisConfig {
    AnalysisConfig::new().with_format(OutputFormat::Png)
}

/// The "cat" label used across scenarios
pub fn cat_label() -> Label {
    Label::new("Cat", 98.0).with_instance(NormalizedBox::new(0.1, 0.2, 0.3, 0.4), 97.0)
}

pub fn make_text(text: &str, points: &[(f64, f64)]) -> TextDetection {
    TextDetection {
        text: text.to_string(),
        kind: TextKind::Line,
        id: None,
        parent_id: None,
        confidence: 95.0,
        polygon: NormalizedPolygon::new(
            points.iter().map(|&(x, y)| NormalizedPoint { x, y }).collect(),
        ),
    }
}

/// In-memory recognition service returning canned results
pub struct FakeClient {
    labels: Vec<Label>,
    texts: Vec<TextDetection>,
    label_error: Mutex<Option<ServiceError>>,
    text_error: Mutex<Option<ServiceError>>,
    text_requests: Mutex<Vec<Vec<u8>>>,
}

impl FakeClient {
    pub fn new(labels: Vec<Label>, texts: Vec<TextDetection>) -> Self {
        Self {
            labels,
            texts,
            label_error: Mutex::new(None),
            text_error: Mutex::new(None),
            text_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_labels(error: ServiceError) -> Self {
        let client = Self::new(Vec::new(), Vec::new());
        *client.label_error.lock().unwrap() = Some(error);
        client
    }

    pub fn failing_text(labels: Vec<Label>, error: ServiceError) -> Self {
        let client = Self::new(labels, Vec::new());
        *client.text_error.lock().unwrap() = Some(error);
        client
    }

    /// Images the text detector was called with
    pub fn text_requests(&self) -> Vec<Vec<u8>> {
        self.text_requests.lock().unwrap().clone()
    }
}

impl RecognitionClient for FakeClient {
    fn detect_labels(&self, _image: &[u8], max_labels: usize) -> Result<Vec<Label>, ServiceError> {
        if let Some(error) = self.label_error.lock().unwrap().take() {
            return Err(error);
        }
        Ok(self.labels.iter().take(max_labels).cloned().collect())
    }

    fn detect_text(&self, image: &[u8]) -> Result<Vec<TextDetection>, ServiceError> {
        self.text_requests.lock().unwrap().push(image.to_vec());
        if let Some(error) = self.text_error.lock().unwrap().take() {
            return Err(error);
        }
        Ok(self.texts.clone())
    }
}

/// Standard pipeline over a fake client, returning the client for inspection
pub fn fake_pipeline(config: AnalysisConfig, client: FakeClient) -> (Pipeline, Arc<FakeClient>) {
    let client = Arc::new(client);
    let pipeline = build_standard_pipeline(config, client.clone());
    (pipeline, client)
}
