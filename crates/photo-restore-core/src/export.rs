use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use filetime::FileTime;

use crate::matching::{Classification, MatchStatus};
use crate::media::{LogicalUnit, MediaRecord};
use crate::ThrottledProgress;

/// Result of the staging phase.
pub struct ExportResult {
    pub files_staged: u64,
    pub warnings: Vec<String>,
}

/// Pick a destination under `dir`, appending `(N)` before the extension
/// until the name is free both on disk and among paths staged this run.
fn unique_dest(dir: &Path, file_name: &str, used: &mut HashSet<PathBuf>) -> PathBuf {
    let base = dir.join(file_name);
    if !used.contains(&base) && !base.exists() {
        used.insert(base.clone());
        return base;
    }

    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("file");
    let ext = Path::new(file_name)
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("");

    let mut counter = 1u32;
    loop {
        let new_name = if ext.is_empty() {
            format!("{}({})", stem, counter)
        } else {
            format!("{}({}).{}", stem, counter, ext)
        };
        let candidate = dir.join(&new_name);
        if !used.contains(&candidate) && !candidate.exists() {
            used.insert(candidate.clone());
            break candidate;
        }
        counter += 1;
    }
}

/// Copy one record into the staging dir, carrying the source mtime over
/// so staged files keep their place in date-sorted views.
fn stage_record(
    record: &MediaRecord,
    dir: &Path,
    used: &mut HashSet<PathBuf>,
) -> anyhow::Result<()> {
    let dest = unique_dest(dir, record.file_name(), used);
    fs::copy(&record.path, &dest)?;
    if let Ok(meta) = fs::metadata(&record.path) {
        let mtime = FileTime::from_last_modification_time(&meta);
        filetime::set_file_mtime(&dest, mtime).ok();
    }
    Ok(())
}

/// Stage every record behind a Missing unit into `<output>/missing/` and
/// behind an Uncertain unit into `<output>/uncertain/`. Copy failures are
/// per-file warnings, never an abort; dry-run logs what would be copied
/// and touches nothing.
pub fn export_results(
    amazon_units: &[LogicalUnit],
    classifications: &[Classification],
    output: &Path,
    dry_run: bool,
    progress: &ThrottledProgress,
) -> anyhow::Result<ExportResult> {
    let missing_dir = output.join("missing");
    let uncertain_dir = output.join("uncertain");
    if !dry_run {
        fs::create_dir_all(&missing_dir)?;
        fs::create_dir_all(&uncertain_dir)?;
    }

    let mut used: HashSet<PathBuf> = HashSet::new();
    let mut files_staged = 0u64;
    let mut warnings = Vec::new();
    let total = amazon_units.len() as u64;

    for (index, (unit, classification)) in
        amazon_units.iter().zip(classifications).enumerate()
    {
        progress.report("export", index as u64, total, "Staging files");

        let dir = match classification.status {
            MatchStatus::Missing => &missing_dir,
            MatchStatus::Uncertain => &uncertain_dir,
            MatchStatus::Matched => continue,
        };

        for record in unit.records() {
            if dry_run {
                eprintln!(
                    "[dry-run] would copy {} -> {}",
                    record.path.display(),
                    dir.display()
                );
                files_staged += 1;
                continue;
            }
            match stage_record(record, dir, &mut used) {
                Ok(()) => files_staged += 1,
                Err(err) => warnings.push(format!(
                    "{}: copy failed: {}",
                    record.path.display(),
                    err
                )),
            }
        }
    }

    Ok(ExportResult {
        files_staged,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::MatchStrategy;
    use crate::media::MediaKind;

    fn record(path: &Path) -> MediaRecord {
        MediaRecord {
            path: path.to_path_buf(),
            content_hash: "h".into(),
            perceptual_hash: None,
            capture_time: None,
            dimensions: None,
            size: 1,
            kind: MediaKind::Image,
        }
    }

    fn classification(status: MatchStatus) -> Classification {
        Classification {
            status,
            matched: None,
            strategy: MatchStrategy::None,
            confidence: 0.0,
        }
    }

    fn noop(_: &str, _: u64, _: u64, _: &str) {}

    #[test]
    fn test_stages_missing_and_uncertain() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let a = src.path().join("a.jpg");
        let b = src.path().join("b.jpg");
        let c = src.path().join("c.jpg");
        for p in [&a, &b, &c] {
            fs::write(p, b"x").unwrap();
        }

        let units = vec![
            LogicalUnit::singleton(record(&a)),
            LogicalUnit::singleton(record(&b)),
            LogicalUnit::singleton(record(&c)),
        ];
        let classifications = vec![
            classification(MatchStatus::Missing),
            classification(MatchStatus::Uncertain),
            classification(MatchStatus::Matched),
        ];

        let cb: &crate::ProgressCallback = &noop;
        let progress = ThrottledProgress::new(cb);
        let result =
            export_results(&units, &classifications, out.path(), false, &progress).unwrap();

        assert_eq!(result.files_staged, 2);
        assert!(out.path().join("missing/a.jpg").exists());
        assert!(out.path().join("uncertain/b.jpg").exists());
        assert!(!out.path().join("missing/c.jpg").exists());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_collision_gets_counter_suffix() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let dir_a = src.path().join("2023");
        let dir_b = src.path().join("2023-copy");
        fs::create_dir_all(&dir_a).unwrap();
        fs::create_dir_all(&dir_b).unwrap();
        let a = dir_a.join("IMG.jpg");
        let b = dir_b.join("IMG.jpg");
        fs::write(&a, b"one").unwrap();
        fs::write(&b, b"two").unwrap();

        let units = vec![
            LogicalUnit::singleton(record(&a)),
            LogicalUnit::singleton(record(&b)),
        ];
        let classifications = vec![
            classification(MatchStatus::Missing),
            classification(MatchStatus::Missing),
        ];

        let cb: &crate::ProgressCallback = &noop;
        let progress = ThrottledProgress::new(cb);
        let result =
            export_results(&units, &classifications, out.path(), false, &progress).unwrap();

        assert_eq!(result.files_staged, 2);
        assert!(out.path().join("missing/IMG.jpg").exists());
        assert!(out.path().join("missing/IMG(1).jpg").exists());
    }

    #[test]
    fn test_live_photo_stages_both_halves() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let img = src.path().join("IMG_0001.HEIC");
        let vid = src.path().join("IMG_0001.MOV");
        fs::write(&img, b"img").unwrap();
        fs::write(&vid, b"vid").unwrap();

        let units = vec![LogicalUnit::live_photo(record(&img), record(&vid))];
        let classifications = vec![classification(MatchStatus::Missing)];

        let cb: &crate::ProgressCallback = &noop;
        let progress = ThrottledProgress::new(cb);
        let result =
            export_results(&units, &classifications, out.path(), false, &progress).unwrap();

        assert_eq!(result.files_staged, 2);
        assert!(out.path().join("missing/IMG_0001.HEIC").exists());
        assert!(out.path().join("missing/IMG_0001.MOV").exists());
    }

    #[test]
    fn test_dry_run_copies_nothing() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let a = src.path().join("a.jpg");
        fs::write(&a, b"x").unwrap();

        let units = vec![LogicalUnit::singleton(record(&a))];
        let classifications = vec![classification(MatchStatus::Missing)];

        let cb: &crate::ProgressCallback = &noop;
        let progress = ThrottledProgress::new(cb);
        let result =
            export_results(&units, &classifications, out.path(), true, &progress).unwrap();

        assert_eq!(result.files_staged, 1);
        assert!(!out.path().join("missing").exists());
    }

    #[test]
    fn test_unreadable_source_is_warning_not_abort() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let gone = src.path().join("gone.jpg");
        let ok = src.path().join("ok.jpg");
        fs::write(&ok, b"x").unwrap();

        let units = vec![
            LogicalUnit::singleton(record(&gone)),
            LogicalUnit::singleton(record(&ok)),
        ];
        let classifications = vec![
            classification(MatchStatus::Missing),
            classification(MatchStatus::Missing),
        ];

        let cb: &crate::ProgressCallback = &noop;
        let progress = ThrottledProgress::new(cb);
        let result =
            export_results(&units, &classifications, out.path(), false, &progress).unwrap();

        assert_eq!(result.files_staged, 1);
        assert_eq!(result.warnings.len(), 1);
        assert!(out.path().join("missing/ok.jpg").exists());
    }
}
