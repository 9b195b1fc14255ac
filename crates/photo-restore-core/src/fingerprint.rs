use std::sync::atomic::{AtomicU64, Ordering};

use image::GenericImageView;
use image_hasher::{HashAlg, Hasher, HasherConfig};
use rayon::prelude::*;
use sha2::{Digest, Sha256};

use crate::date;
use crate::media::{MediaKind, MediaRecord};
use crate::scan::ScannedFile;
use crate::ThrottledProgress;

/// Width of the perceptual hash in bits (8x8 gradient hash).
/// Hamming distances range over 0..=64.
pub const PERCEPTUAL_HASH_BITS: u32 = 64;

/// Hasher for the visual digest: gradient over a normalized 8x8 grayscale
/// raster, tolerant to recompression and resizing.
pub fn perceptual_hasher() -> Hasher {
    HasherConfig::new()
        .hash_size(8, 8)
        .hash_alg(HashAlg::Gradient)
        .to_hasher()
}

/// Fingerprint a single file: exact content hash, perceptual hash and
/// dimensions (images that decode), capture time.
///
/// Only a read failure is an error - the content hash must exist for every
/// record. A decode failure degrades to absent optional fields and returns
/// a warning alongside the record.
pub fn fingerprint(
    file: &ScannedFile,
    hasher: &Hasher,
) -> anyhow::Result<(MediaRecord, Option<String>)> {
    let bytes = std::fs::read(&file.path)?;
    let content_hash = hex::encode(Sha256::digest(&bytes));

    let mut warning = None;
    let (perceptual_hash, dimensions) = match file.kind {
        MediaKind::Image => match image::load_from_memory(&bytes) {
            Ok(img) => (Some(hasher.hash_image(&img)), Some(img.dimensions())),
            Err(err) => {
                warning = Some(format!(
                    "{}: image decode failed: {}",
                    file.path.display(),
                    err
                ));
                (None, None)
            }
        },
        MediaKind::Video => (None, None),
    };

    let capture_time = date::capture_time(&bytes, &file.path);

    Ok((
        MediaRecord {
            path: file.path.clone(),
            content_hash,
            perceptual_hash,
            capture_time,
            dimensions,
            size: file.size,
            kind: file.kind,
        },
        warning,
    ))
}

/// Fingerprint all scanned files in parallel, preserving input order.
/// Unreadable files are dropped with a warning; decode failures keep their
/// record and add a warning.
pub fn fingerprint_all(
    files: &[ScannedFile],
    progress: &ThrottledProgress,
    stage: &str,
) -> (Vec<MediaRecord>, Vec<String>) {
    let hasher = perceptual_hasher();
    let total = files.len() as u64;
    let counter = AtomicU64::new(0);

    let results: Vec<anyhow::Result<(MediaRecord, Option<String>)>> = files
        .par_iter()
        .map(|file| {
            let result = fingerprint(file, &hasher);
            let current = counter.fetch_add(1, Ordering::Relaxed);
            progress.report(stage, current, total, "Fingerprinting files");
            result
        })
        .collect();

    let mut records = Vec::with_capacity(files.len());
    let mut warnings = Vec::new();
    for (file, result) in files.iter().zip(results) {
        match result {
            Ok((record, warning)) => {
                records.push(record);
                warnings.extend(warning);
            }
            Err(err) => {
                warnings.push(format!("{}: unreadable, skipped: {}", file.path.display(), err));
            }
        }
    }

    (records, warnings)
}
