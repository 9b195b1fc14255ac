use std::collections::HashMap;
use std::path::Path;

use unicode_normalization::UnicodeNormalization;

use crate::media::{LogicalUnit, MediaKind, MediaRecord};

/// Max capture-time gap (seconds) between a still and its companion video.
pub const LIVE_PAIR_TOLERANCE_SECS: i64 = 5;

/// Suffix markers some exporters append to the video half of a Live Photo
/// (uppercase, compared against the normalized stem).
const LIVE_SUFFIX_MARKERS: &[&str] = &["_HEVC", "_LIVE"];

/// Normalized base filename stem: NFC, uppercased, Live-Photo markers
/// stripped. `IMG_0001.HEIC` and `IMG_0001_HEVC.MOV` share a stem.
fn normalized_stem(path: &Path) -> String {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
    let mut name: String = stem.nfc().collect::<String>().to_uppercase();
    for marker in LIVE_SUFFIX_MARKERS {
        if let Some(rest) = name.strip_suffix(marker) {
            name = rest.to_string();
            break;
        }
    }
    name
}

/// The companion must sit within tolerance of the image's capture time.
/// A video without a timestamp is paired on stem alone; an image without
/// one cannot vouch for adjacency, so its video stays unpaired.
fn within_live_tolerance(image: &MediaRecord, video: &MediaRecord) -> bool {
    match (image.capture_time, video.capture_time) {
        (_, None) => true,
        (Some(img), Some(vid)) => (img - vid).num_seconds().abs() <= LIVE_PAIR_TOLERANCE_SECS,
        (None, Some(_)) => false,
    }
}

/// Pair one stem group. Exactly one image plus exactly one video within
/// tolerance forms a Live Photo; every other shape stays singletons -
/// under-pairing over mis-pairing.
fn pair_group(group: Vec<MediaRecord>) -> Vec<LogicalUnit> {
    let images = group.iter().filter(|r| r.kind == MediaKind::Image).count();
    let videos = group.iter().filter(|r| r.kind == MediaKind::Video).count();

    if images == 1 && videos == 1 {
        let (mut imgs, mut vids): (Vec<_>, Vec<_>) = group
            .into_iter()
            .partition(|r| r.kind == MediaKind::Image);
        let image = imgs.remove(0);
        let video = vids.remove(0);
        if within_live_tolerance(&image, &video) {
            return vec![LogicalUnit::live_photo(image, video)];
        }
        return vec![
            LogicalUnit::singleton(image),
            LogicalUnit::singleton(video),
        ];
    }

    group.into_iter().map(LogicalUnit::singleton).collect()
}

/// Group records by normalized stem and pair Live Photos. Total function:
/// worst case every record becomes a singleton unit. Output order follows
/// the first appearance of each stem in the input.
pub fn resolve_units(records: Vec<MediaRecord>) -> Vec<LogicalUnit> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<MediaRecord>> = HashMap::new();

    for record in records {
        let stem = normalized_stem(&record.path);
        if !groups.contains_key(&stem) {
            order.push(stem.clone());
        }
        groups.entry(stem).or_default().push(record);
    }

    let mut units = Vec::new();
    for stem in &order {
        if let Some(group) = groups.remove(stem) {
            units.extend(pair_group(group));
        }
    }
    units
}
