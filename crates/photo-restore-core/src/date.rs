use std::io::Cursor;
use std::path::Path;

use chrono::NaiveDateTime;
use exif::{In, Reader, Tag};

/// Extract capture time from EXIF data in raw image bytes.
/// EXIF datetimes have no timezone info - they are local time as-is.
pub fn exif_capture_time(bytes: &[u8]) -> Option<NaiveDateTime> {
    let reader = Reader::new()
        .read_from_container(&mut Cursor::new(bytes))
        .ok()?;

    let tags = [Tag::DateTimeOriginal, Tag::DateTimeDigitized, Tag::DateTime];

    for tag in &tags {
        if let Some(field) = reader.get_field(*tag, In::PRIMARY) {
            let val = field.display_value().to_string();
            if let Some(dt) = parse_exif_datetime(&val) {
                return Some(dt);
            }
        }
    }

    None
}

fn parse_exif_datetime(s: &str) -> Option<NaiveDateTime> {
    let cleaned = s
        .replace('-', ":")
        .replace('/', ":")
        .replace('\\', ":")
        .replace('.', ":");

    if let Ok(dt) = NaiveDateTime::parse_from_str(&cleaned, "%Y:%m:%d %H:%M:%S") {
        return Some(dt);
    }

    if let Ok(d) = chrono::NaiveDate::parse_from_str(cleaned.split(' ').next()?, "%Y:%m:%d") {
        return Some(d.and_hms_opt(0, 0, 0)?);
    }

    None
}

/// File modification time as a naive local timestamp.
pub fn file_mtime(path: &Path) -> Option<NaiveDateTime> {
    let mtime = std::fs::metadata(path).ok()?.modified().ok()?;
    let local: chrono::DateTime<chrono::Local> = mtime.into();
    Some(local.naive_local())
}

/// Best-effort capture time: EXIF first (accuracy best), file mtime as
/// fallback. Both failing leaves the record without a timestamp.
pub fn capture_time(bytes: &[u8], path: &Path) -> Option<NaiveDateTime> {
    exif_capture_time(bytes).or_else(|| file_mtime(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exif_datetime() {
        let dt = parse_exif_datetime("2023:05:01 14:30:00").unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M:%S").to_string(), "2023-05-01 14:30:00");

        // Separator variants seen in the wild
        assert!(parse_exif_datetime("2023-05-01 14:30:00").is_some());
        assert!(parse_exif_datetime("2023/05/01 14:30:00").is_some());
        // Date-only falls back to midnight
        assert_eq!(
            parse_exif_datetime("2023:05:01").unwrap(),
            chrono::NaiveDate::from_ymd_opt(2023, 5, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
        assert!(parse_exif_datetime("not a date").is_none());
    }

    #[test]
    fn test_mtime_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mov");
        std::fs::write(&path, b"not an image").unwrap();

        // No EXIF in these bytes, so capture_time falls back to mtime
        assert!(exif_capture_time(b"not an image").is_none());
        assert!(capture_time(b"not an image", &path).is_some());
    }

    #[test]
    fn test_capture_time_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.jpg");
        assert!(capture_time(b"", &path).is_none());
    }
}
