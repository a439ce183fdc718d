//! In-memory pipeline outputs and their persistence.
//!
//! Steps only ever produce [`Artifact`] values. [`ArtifactStore`] is the one
//! place that touches the filesystem: it writes a whole run into a staging
//! directory and renames it to `<root>/<run id>` once every file is on disk.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbImage};
use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ArtifactWriteError;
use crate::pipeline::AnalysisRun;

pub const TEXT_LISTING_NAME: &str = "extracted_text.txt";
pub const REPORT_NAME: &str = "index.html";
pub const MANIFEST_NAME: &str = "manifest.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    AnnotatedImage,
    FinalAnnotatedImage,
    ElementCrop(usize),
    TextListing,
    Report,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::AnnotatedImage => "annotated_image",
            ArtifactKind::FinalAnnotatedImage => "final_annotated_image",
            ArtifactKind::ElementCrop(_) => "element_crop",
            ArtifactKind::TextListing => "text_listing",
            ArtifactKind::Report => "report",
        }
    }

    /// Sequence number of an element crop
    pub fn index(&self) -> Option<usize> {
        match self {
            ArtifactKind::ElementCrop(idx) => Some(*idx),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactPayload {
    Image(RgbImage),
    Text(String),
}

/// A named output of one run; `file_name` is relative to the run directory
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub file_name: String,
    pub kind: ArtifactKind,
    pub payload: ArtifactPayload,
}

impl Artifact {
    pub fn image(file_name: impl Into<String>, kind: ArtifactKind, image: RgbImage) -> Self {
        Self {
            file_name: file_name.into(),
            kind,
            payload: ArtifactPayload::Image(image),
        }
    }

    pub fn text(file_name: impl Into<String>, kind: ArtifactKind, text: String) -> Self {
        Self {
            file_name: file_name.into(),
            kind,
            payload: ArtifactPayload::Text(text),
        }
    }

    pub fn as_image(&self) -> Option<&RgbImage> {
        match &self.payload {
            ArtifactPayload::Image(image) => Some(image),
            ArtifactPayload::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.payload {
            ArtifactPayload::Text(text) => Some(text),
            ArtifactPayload::Image(_) => None,
        }
    }

    /// File contents; images are encoded by the extension of `file_name`
    pub fn encode(&self) -> Result<Vec<u8>, ArtifactWriteError> {
        match &self.payload {
            ArtifactPayload::Text(text) => Ok(text.as_bytes().to_vec()),
            ArtifactPayload::Image(image) => {
                let format = ImageFormat::from_path(&self.file_name).map_err(|source| {
                    ArtifactWriteError::Encode {
                        name: self.file_name.clone(),
                        source,
                    }
                })?;
                encode_image(image, format).map_err(|source| ArtifactWriteError::Encode {
                    name: self.file_name.clone(),
                    source,
                })
            }
        }
    }
}

/// Encode an RGB image into memory
pub fn encode_image(image: &RgbImage, format: ImageFormat) -> image::ImageResult<Vec<u8>> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), format)?;
    Ok(bytes)
}

#[derive(Debug, Serialize)]
pub struct ManifestEntry<'a> {
    pub file_name: &'a str,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

/// Summary of a persisted run, written as `manifest.json`
#[derive(Debug, Serialize)]
pub struct RunManifest<'a> {
    pub run_id: Uuid,
    pub created_at: String,
    pub source: &'a str,
    pub labels: Vec<&'a str>,
    pub text_lines: Vec<&'a str>,
    pub crop_count: usize,
    pub artifacts: Vec<ManifestEntry<'a>>,
}

impl<'a> RunManifest<'a> {
    pub fn from_run(
        run: &'a AnalysisRun,
        created_at: OffsetDateTime,
    ) -> Result<Self, ArtifactWriteError> {
        Ok(Self {
            run_id: run.run_id,
            created_at: created_at.format(&Rfc3339)?,
            source: &run.source_name,
            labels: run.labels.iter().map(|l| l.name.as_str()).collect(),
            text_lines: run.texts.iter().map(|t| t.text.as_str()).collect(),
            crop_count: run.crop_count,
            artifacts: run
                .artifacts
                .iter()
                .map(|a| ManifestEntry {
                    file_name: &a.file_name,
                    kind: a.kind.as_str(),
                    index: a.kind.index(),
                })
                .collect(),
        })
    }
}

/// Writes finished runs under `root`, one directory per run
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory a run is (or will be) persisted to
    pub fn run_dir(&self, run_id: Uuid) -> PathBuf {
        self.root.join(run_id.to_string())
    }

    /// Persist every artifact of `run` plus its manifest.
    ///
    /// Either the whole run directory appears or nothing does.
    pub fn persist(&self, run: &AnalysisRun) -> Result<PathBuf, ArtifactWriteError> {
        std::fs::create_dir_all(&self.root).map_err(|source| io_error(&self.root, source))?;

        // Dropping the staging dir on an early return removes partial output
        let staging = tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(&self.root)
            .map_err(|source| io_error(&self.root, source))?;

        for artifact in &run.artifacts {
            let path = staging.path().join(&artifact.file_name);
            let bytes = artifact.encode()?;
            std::fs::write(&path, bytes).map_err(|source| io_error(&path, source))?;
            debug!(file = %artifact.file_name, "Wrote artifact");
        }

        let manifest = RunManifest::from_run(run, OffsetDateTime::now_utc())?;
        let manifest_path = staging.path().join(MANIFEST_NAME);
        std::fs::write(&manifest_path, serde_json::to_vec_pretty(&manifest)?)
            .map_err(|source| io_error(&manifest_path, source))?;

        let run_dir = self.run_dir(run.run_id);
        std::fs::rename(staging.path(), &run_dir).map_err(|source| io_error(&run_dir, source))?;
        // The staging path no longer exists; TempDir's cleanup on drop ignores that.
        drop(staging);

        info!(dir = %run_dir.display(), artifacts = run.artifacts.len(), "Persisted run");
        Ok(run_dir)
    }
}

fn io_error(path: &Path, source: std::io::Error) -> ArtifactWriteError {
    ArtifactWriteError::Io {
        path: path.to_path_buf(),
        source,
    }
}
