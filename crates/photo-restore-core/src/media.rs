use std::path::PathBuf;

use chrono::NaiveDateTime;
use image_hasher::ImageHash;

/// What a media file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

/// Fingerprint of one physical file.
#[derive(Debug, Clone)]
pub struct MediaRecord {
    /// Path on disk (used for reporting and copying only)
    pub path: PathBuf,
    /// SHA-256 hash hex of the exact file bytes; always present
    pub content_hash: String,
    /// 64-bit gradient hash; images that decoded only
    pub perceptual_hash: Option<ImageHash>,
    /// EXIF capture time, falling back to file mtime
    pub capture_time: Option<NaiveDateTime>,
    /// Pixel (width, height) from the decoded raster
    pub dimensions: Option<(u32, u32)>,
    /// File size in bytes
    pub size: u64,
    pub kind: MediaKind,
}

impl MediaRecord {
    /// Just the filename, for log lines and staging copies.
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
    }
}

/// One photographic moment: a single record, or a still image paired with
/// the short companion video Apple exports alongside it (Live Photo).
#[derive(Debug, Clone)]
pub struct LogicalUnit {
    /// The image record, or the sole record for singletons
    pub primary: MediaRecord,
    /// Companion video, present only for Live Photo units
    pub companion: Option<MediaRecord>,
}

impl LogicalUnit {
    pub fn singleton(record: MediaRecord) -> Self {
        Self {
            primary: record,
            companion: None,
        }
    }

    pub fn live_photo(image: MediaRecord, video: MediaRecord) -> Self {
        Self {
            primary: image,
            companion: Some(video),
        }
    }

    pub fn is_live_photo(&self) -> bool {
        self.companion.is_some()
    }

    /// Content hashes of every record in the unit.
    pub fn content_hashes(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary.content_hash.as_str())
            .chain(self.companion.iter().map(|c| c.content_hash.as_str()))
    }

    /// Records in the unit, primary first.
    pub fn records(&self) -> impl Iterator<Item = &MediaRecord> {
        std::iter::once(&self.primary).chain(self.companion.iter())
    }
}
