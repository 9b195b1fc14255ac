use std::collections::HashSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::media::MediaKind;

/// Extensions treated as still images (lowercase).
const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "heic", "heif", "png", "gif", "webp", "tiff", "tif", "bmp",
];

/// Extensions treated as videos (lowercase).
const VIDEO_EXTENSIONS: &[&str] = &["mov", "mp4", "m4v", "avi", "mkv", "3gp"];

/// A media file found during the folder walk, before fingerprinting.
#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub size: u64,
    pub kind: MediaKind,
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// Classify a path by extension, with a MIME-guess fallback for anything
/// the explicit lists miss.
pub fn media_kind(path: &Path) -> Option<MediaKind> {
    if let Some(ext) = extension(path) {
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            return Some(MediaKind::Image);
        }
        if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            return Some(MediaKind::Video);
        }
    }
    let mime = mime_guess::from_path(path).first()?;
    if mime.type_() == mime_guess::mime::IMAGE {
        Some(MediaKind::Image)
    } else if mime.type_() == mime_guess::mime::VIDEO {
        Some(MediaKind::Video)
    } else {
        None
    }
}

/// Recursively collect media files under `dir`, sorted by path for
/// deterministic downstream ordering. Unreadable entries are skipped.
pub fn scan_folder(dir: &Path) -> anyhow::Result<Vec<ScannedFile>> {
    anyhow::ensure!(dir.is_dir(), "not a directory: {}", dir.display());

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(kind) = media_kind(entry.path()) else {
            continue;
        };
        let Ok(meta) = entry.metadata() else { continue };
        files.push(ScannedFile {
            path: entry.path().to_path_buf(),
            size: meta.len(),
            kind,
        });
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(prefer_heic(files))
}

fn stem_upper(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_uppercase()
}

/// When a stem exists both as HEIC/HEIF and as JPG/JPEG, keep the HEIC
/// only. Amazon stores both for iPhone uploads; the JPEG is a derived copy
/// that would otherwise be reported missing from an all-HEIC iCloud export.
fn prefer_heic(files: Vec<ScannedFile>) -> Vec<ScannedFile> {
    let mut heic_stems: HashSet<String> = HashSet::new();
    for f in &files {
        if matches!(extension(&f.path).as_deref(), Some("heic") | Some("heif")) {
            heic_stems.insert(stem_upper(&f.path));
        }
    }

    if heic_stems.is_empty() {
        return files;
    }

    files
        .into_iter()
        .filter(|f| match extension(&f.path).as_deref() {
            Some("jpg") | Some("jpeg") => !heic_stems.contains(&stem_upper(&f.path)),
            _ => true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_media_kind() {
        assert_eq!(media_kind(Path::new("a/IMG_0001.HEIC")), Some(MediaKind::Image));
        assert_eq!(media_kind(Path::new("IMG_0001.MOV")), Some(MediaKind::Video));
        assert_eq!(media_kind(Path::new("clip.mp4")), Some(MediaKind::Video));
        assert_eq!(media_kind(Path::new("notes.txt")), None);
        assert_eq!(media_kind(Path::new("no_extension")), None);
    }

    #[test]
    fn test_scan_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.jpg"), b"b").unwrap();
        fs::write(dir.path().join("a.mov"), b"a").unwrap();
        fs::write(dir.path().join("skip.txt"), b"x").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/c.png"), b"c").unwrap();

        let files = scan_folder(dir.path()).unwrap();
        let names: Vec<_> = files.iter().map(|f| f.path.file_name().unwrap().to_str().unwrap().to_string()).collect();
        assert_eq!(names, vec!["a.mov", "b.jpg", "c.png"]);
        assert_eq!(files[0].kind, MediaKind::Video);
        assert_eq!(files[0].size, 1);
    }

    #[test]
    fn test_prefer_heic_over_jpg() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("IMG_0001.HEIC"), b"heic").unwrap();
        fs::write(dir.path().join("IMG_0001.jpg"), b"jpg").unwrap();
        fs::write(dir.path().join("IMG_0002.jpg"), b"jpg2").unwrap();

        let files = scan_folder(dir.path()).unwrap();
        let names: Vec<_> = files.iter().map(|f| f.path.file_name().unwrap().to_str().unwrap().to_string()).collect();
        assert_eq!(names, vec!["IMG_0001.HEIC", "IMG_0002.jpg"]);
    }

    #[test]
    fn test_scan_rejects_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(scan_folder(&dir.path().join("nope")).is_err());
    }
}
