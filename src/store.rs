//! In-memory artifact store backed by PNG files on disk.

use crate::error::{GenStudioError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{PoisonError, RwLock};

/// Message for ids the store has never issued.
pub const IMAGE_NOT_FOUND: &str = "Image not found";
/// Message for records whose file has been removed from disk.
pub const IMAGE_FILE_NOT_FOUND: &str = "Image file not found";

/// Lifecycle state of a generation. Generation is synchronous, so a record only
/// ever exists once it is complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    /// Image was fetched, decoded and written to disk.
    #[default]
    Completed,
}

impl GenerationStatus {
    /// Returns the wire name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stored generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    /// Operation id handed back to the client.
    pub id: String,
    /// The user's prompt, before style enrichment.
    pub prompt: String,
    /// Where the PNG was written.
    pub file_path: PathBuf,
    /// Always [`GenerationStatus::Completed`].
    pub status: GenerationStatus,
    /// When the record was inserted.
    pub created_at: DateTime<Utc>,
}

impl GenerationRecord {
    /// Relative URL the image is served from.
    pub fn image_url(&self) -> String {
        image_url(&self.id)
    }
}

/// Relative URL for an operation id.
pub fn image_url(id: &str) -> String {
    format!("/image/{id}")
}

/// Issues millisecond-timestamp ids that never repeat within a process.
///
/// When two calls land in the same millisecond (or the clock steps back) the
/// later call gets `last + 1` instead of a duplicate.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: AtomicI64,
}

impl IdGenerator {
    /// Creates a generator with no ids issued yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next id.
    pub fn next_id(&self) -> String {
        self.next_at(Utc::now().timestamp_millis()).to_string()
    }

    fn next_at(&self, now_ms: i64) -> i64 {
        let prev = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now_ms.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        now_ms.max(prev + 1)
    }
}

/// Maps operation ids to generation records.
///
/// Every inserted record has its file on disk at insertion time; files removed
/// afterwards are only noticed by [`ArtifactStore::locate`].
#[derive(Debug)]
pub struct ArtifactStore {
    images_dir: PathBuf,
    records: RwLock<HashMap<String, GenerationRecord>>,
    ids: IdGenerator,
}

impl ArtifactStore {
    /// Creates an empty store writing under `images_dir`. The directory is
    /// created lazily on first save.
    pub fn new(images_dir: impl Into<PathBuf>) -> Self {
        Self {
            images_dir: images_dir.into(),
            records: RwLock::new(HashMap::new()),
            ids: IdGenerator::new(),
        }
    }

    /// Creates an empty store and makes sure `images_dir` exists.
    pub fn open(images_dir: impl Into<PathBuf>) -> Result<Self> {
        let store = Self::new(images_dir);
        std::fs::create_dir_all(&store.images_dir)?;
        Ok(store)
    }

    /// Directory images are written to.
    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    /// Path a given id is (or would be) stored at.
    pub fn image_path(&self, id: &str) -> PathBuf {
        self.images_dir.join(format!("{id}.png"))
    }

    /// Encodes `image` as PNG under a fresh id and records it.
    ///
    /// Blocking: call from a blocking-capable context.
    pub fn save(&self, prompt: &str, image: &::image::DynamicImage) -> Result<GenerationRecord> {
        std::fs::create_dir_all(&self.images_dir)?;

        let id = self.ids.next_id();
        let file_path = self.image_path(&id);
        image.save_with_format(&file_path, ::image::ImageFormat::Png)?;

        let record = GenerationRecord {
            id: id.clone(),
            prompt: prompt.to_string(),
            file_path,
            status: GenerationStatus::Completed,
            created_at: Utc::now(),
        };

        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, record.clone());

        tracing::debug!(id = %record.id, path = %record.file_path.display(), "stored image");
        Ok(record)
    }

    /// Looks up a record by id.
    pub fn get(&self, id: &str) -> Option<GenerationRecord> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Looks up a record and confirms its file is still on disk.
    pub fn locate(&self, id: &str) -> Result<GenerationRecord> {
        let record = self
            .get(id)
            .ok_or_else(|| GenStudioError::NotFound(IMAGE_NOT_FOUND.into()))?;

        if !record.file_path.is_file() {
            tracing::warn!(id, path = %record.file_path.display(), "image file missing");
            return Err(GenStudioError::NotFound(IMAGE_FILE_NOT_FOUND.into()));
        }

        Ok(record)
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
