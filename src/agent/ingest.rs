//! File attachments: pick a handling strategy by extension and turn the file
//! into a user-turn fragment.

use super::resources::ResourceTracker;
use crate::backend::{ActiveTool, FileBackend, RemoteResource, UploadPurpose};
use crate::conversation::Attachment;
use crate::error::{GaiaError, Result};
use std::path::Path;
use tracing::{debug, info};

/// Extensions sent to speech-to-text.
pub const AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "mpga", "m4a", "wav", "flac", "ogg", "opus", "aac", "webm",
];

/// Extensions uploaded for image understanding.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// How an attachment is handed to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Transcribe and inline the text.
    Transcription,
    /// Upload as an image.
    Vision,
    /// Upload and expose through a code-execution container.
    Document,
}

impl Strategy {
    /// Strategy for a path, decided by its extension alone (case-insensitive).
    pub fn for_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
            Strategy::Transcription
        } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Strategy::Vision
        } else {
            Strategy::Document
        }
    }
}

/// Result of ingesting one attachment.
#[derive(Debug, Clone, PartialEq)]
pub struct Ingestion {
    pub strategy: Strategy,
    pub attachment: Attachment,
    /// Remote resources created for this attachment, also registered with the tracker.
    pub resources: Vec<RemoteResource>,
    /// Extra tool offered to the model for this invocation only.
    pub supplemental_tool: Option<ActiveTool>,
}

pub struct FileIngestor<'a> {
    backend: &'a dyn FileBackend,
    transcript_label: &'a str,
}

impl<'a> FileIngestor<'a> {
    pub fn new(backend: &'a dyn FileBackend, transcript_label: &'a str) -> Self {
        Self {
            backend,
            transcript_label,
        }
    }

    /// Ingest the file at `path`.
    ///
    /// Every resource is registered with `tracker` as soon as it exists, so a
    /// failure halfway through leaves nothing untracked.
    pub async fn ingest(&self, path: &Path, tracker: &mut ResourceTracker) -> Result<Ingestion> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            GaiaError::Ingestion(format!("cannot read {}: {}", path.display(), e))
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string());

        let strategy = Strategy::for_path(path);
        info!(
            "Ingesting {} ({} bytes) as {:?}",
            file_name,
            bytes.len(),
            strategy
        );

        let mut resources = Vec::new();
        let mut track = |resource: RemoteResource| {
            tracker.register(resource.clone());
            resources.push(resource);
        };

        let (attachment, supplemental_tool) = match strategy {
            Strategy::Transcription => {
                let text = self.backend.transcribe(&file_name, bytes).await?;
                debug!("Transcript has {} chars", text.len());
                let fragment = format!("{}\n{}", self.transcript_label, text);
                (Attachment::Transcript(fragment), None)
            }
            Strategy::Vision => {
                let file_id = self
                    .backend
                    .upload(&file_name, bytes, UploadPurpose::Vision)
                    .await?;
                track(RemoteResource::file(&file_id));
                (Attachment::Image { file_id }, None)
            }
            Strategy::Document => {
                let file_id = self
                    .backend
                    .upload(&file_name, bytes, UploadPurpose::Assistants)
                    .await?;
                track(RemoteResource::file(&file_id));

                let container_id = self
                    .backend
                    .create_container(std::slice::from_ref(&file_id))
                    .await?;
                track(RemoteResource::container(&container_id));

                (
                    Attachment::Document { file_id },
                    Some(ActiveTool::CodeInterpreter { container_id }),
                )
            }
        };

        Ok(Ingestion {
            strategy,
            attachment,
            resources,
            supplemental_tool,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::testing::RecordingFiles;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"payload").unwrap();
        path
    }

    #[test]
    fn test_strategy_by_extension() {
        assert_eq!(Strategy::for_path(Path::new("a.mp3")), Strategy::Transcription);
        assert_eq!(Strategy::for_path(Path::new("a.WAV")), Strategy::Transcription);
        assert_eq!(Strategy::for_path(Path::new("a.PnG")), Strategy::Vision);
        assert_eq!(Strategy::for_path(Path::new("a.jpeg")), Strategy::Vision);
        assert_eq!(Strategy::for_path(Path::new("a.xlsx")), Strategy::Document);
        assert_eq!(Strategy::for_path(Path::new("a.weird")), Strategy::Document);
        assert_eq!(Strategy::for_path(Path::new("Makefile")), Strategy::Document);
    }

    #[tokio::test]
    async fn test_audio_is_transcribed_inline() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "recipe.mp3");
        let files = RecordingFiles::default().with_transcript("Add two cups of flour.");
        let mut tracker = ResourceTracker::new();

        let ingestion = FileIngestor::new(&files, "Audio transcript:")
            .ingest(&path, &mut tracker)
            .await
            .unwrap();

        assert_eq!(
            ingestion.attachment,
            Attachment::Transcript("Audio transcript:\nAdd two cups of flour.".to_string())
        );
        assert!(ingestion.resources.is_empty());
        assert!(ingestion.supplemental_tool.is_none());
        assert!(tracker.is_empty());
        assert_eq!(files.transcriptions(), vec!["recipe.mp3".to_string()]);
    }

    #[tokio::test]
    async fn test_image_is_uploaded_for_vision() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "board.png");
        let files = RecordingFiles::default();
        let mut tracker = ResourceTracker::new();

        let ingestion = FileIngestor::new(&files, "Audio transcript:")
            .ingest(&path, &mut tracker)
            .await
            .unwrap();

        assert_eq!(
            ingestion.attachment,
            Attachment::Image {
                file_id: "file-1".to_string()
            }
        );
        assert_eq!(files.uploads(), vec![("board.png".to_string(), UploadPurpose::Vision)]);
        assert_eq!(tracker.resources(), &[RemoteResource::file("file-1")]);
        assert!(ingestion.supplemental_tool.is_none());
    }

    #[tokio::test]
    async fn test_unknown_extension_gets_code_execution() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "sales.xyz");
        let files = RecordingFiles::default();
        let mut tracker = ResourceTracker::new();

        let ingestion = FileIngestor::new(&files, "Audio transcript:")
            .ingest(&path, &mut tracker)
            .await
            .unwrap();

        assert_eq!(ingestion.strategy, Strategy::Document);
        assert_eq!(
            ingestion.supplemental_tool,
            Some(ActiveTool::CodeInterpreter {
                container_id: "cntr-1".to_string()
            })
        );
        assert_eq!(files.containers(), vec![vec!["file-1".to_string()]]);
        assert_eq!(
            tracker.resources(),
            &[RemoteResource::file("file-1"), RemoteResource::container("cntr-1")]
        );
        assert_eq!(ingestion.resources, tracker.resources());
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_created_resources_tracked() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "data.csv");
        let files = RecordingFiles::default().failing_containers();
        let mut tracker = ResourceTracker::new();

        let result = FileIngestor::new(&files, "Audio transcript:")
            .ingest(&path, &mut tracker)
            .await;

        assert!(result.is_err());
        assert_eq!(tracker.resources(), &[RemoteResource::file("file-1")]);
    }

    #[tokio::test]
    async fn test_missing_file_is_an_ingestion_error() {
        let files = RecordingFiles::default();
        let mut tracker = ResourceTracker::new();

        let result = FileIngestor::new(&files, "Audio transcript:")
            .ingest(Path::new("/nonexistent/gaia/input.pdf"), &mut tracker)
            .await;

        assert!(matches!(result, Err(GaiaError::Ingestion(_))));
        assert!(files.uploads().is_empty());
    }
}
