use rayon::prelude::*;
use serde::Serialize;

use crate::fingerprint::PERCEPTUAL_HASH_BITS;
use crate::media::{LogicalUnit, MediaRecord};

/// Default Hamming-distance cutoff for the perceptual tier.
pub const DEFAULT_PERCEPTUAL_THRESHOLD: u32 = 5;

/// Capture times this close (seconds) agree in the metadata tier.
pub const METADATA_DATE_TOLERANCE_SECS: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Matched,
    Missing,
    Uncertain,
}

/// Which tier produced a match. `None` for Missing/Uncertain results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    Exact,
    Perceptual,
    Metadata,
    None,
}

/// Result of comparing one Amazon unit against the iCloud set.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub status: MatchStatus,
    /// Index into the iCloud unit list, present iff Matched
    pub matched: Option<usize>,
    pub strategy: MatchStrategy,
    /// In [0,1]; Exact 1.0, Perceptual scaled from distance, Metadata
    /// scaled from field agreement
    pub confidence: f64,
}

impl Classification {
    fn missing() -> Self {
        Self {
            status: MatchStatus::Missing,
            matched: None,
            strategy: MatchStrategy::None,
            confidence: 0.0,
        }
    }

    fn uncertain() -> Self {
        Self {
            status: MatchStatus::Uncertain,
            matched: None,
            strategy: MatchStrategy::None,
            confidence: 0.0,
        }
    }
}

/// One matching tier: evaluates an Amazon unit against the whole iCloud
/// set and either settles the unit or declines. Tiers run in fixed
/// priority order; the first that produces a result wins.
type Tier = fn(&LogicalUnit, &[LogicalUnit], u32) -> Option<Classification>;

const TIERS: &[Tier] = &[exact_tier, perceptual_tier, metadata_tier];

/// Identical bytes anywhere in the unit settle it. For Live Photos either
/// half may carry the match; all exact candidates are byte-identical, so
/// the earliest one is as good as any.
fn exact_tier(unit: &LogicalUnit, icloud: &[LogicalUnit], _threshold: u32) -> Option<Classification> {
    for (index, other) in icloud.iter().enumerate() {
        let shared = unit
            .content_hashes()
            .any(|hash| other.content_hashes().any(|h| h == hash));
        if shared {
            return Some(Classification {
                status: MatchStatus::Matched,
                matched: Some(index),
                strategy: MatchStrategy::Exact,
                confidence: 1.0,
            });
        }
    }
    None
}

/// Closest visual match within the threshold wins; ties keep the earliest
/// iCloud unit so results are reproducible across runs.
fn perceptual_tier(unit: &LogicalUnit, icloud: &[LogicalUnit], threshold: u32) -> Option<Classification> {
    let hash = unit.primary.perceptual_hash.as_ref()?;

    let mut best: Option<(usize, u32)> = None;
    for (index, other) in icloud.iter().enumerate() {
        let Some(other_hash) = other.primary.perceptual_hash.as_ref() else {
            continue;
        };
        let distance = hash.dist(other_hash);
        if distance <= threshold && best.map_or(true, |(_, d)| distance < d) {
            best = Some((index, distance));
        }
    }

    best.map(|(index, distance)| Classification {
        status: MatchStatus::Matched,
        matched: Some(index),
        strategy: MatchStrategy::Perceptual,
        confidence: (1.0 - f64::from(distance) / f64::from(PERCEPTUAL_HASH_BITS)).clamp(0.0, 1.0),
    })
}

/// Agreeing-field count between two records, or None when the pair is no
/// metadata candidate. A field present on both sides must agree; at least
/// two of the three must be present and agreeing - a lone size match would
/// pair up half the camera roll.
fn metadata_agreement(a: &MediaRecord, b: &MediaRecord) -> Option<u32> {
    let mut agreeing = 0;

    if let (Some(x), Some(y)) = (a.capture_time, b.capture_time) {
        if (x - y).num_seconds().abs() > METADATA_DATE_TOLERANCE_SECS {
            return None;
        }
        agreeing += 1;
    }

    if let (Some(x), Some(y)) = (a.dimensions, b.dimensions) {
        if x != y {
            return None;
        }
        agreeing += 1;
    }

    // Size is always present on both sides
    if a.size != b.size {
        return None;
    }
    agreeing += 1;

    if agreeing >= 2 {
        Some(agreeing)
    } else {
        None
    }
}

/// A unique best candidate matches; several candidates tied at the best
/// agreement count become Uncertain for manual review, never a guess.
fn metadata_tier(unit: &LogicalUnit, icloud: &[LogicalUnit], _threshold: u32) -> Option<Classification> {
    let mut best: Vec<usize> = Vec::new();
    let mut best_count = 0;

    for (index, other) in icloud.iter().enumerate() {
        let Some(count) = metadata_agreement(&unit.primary, &other.primary) else {
            continue;
        };
        if count > best_count {
            best_count = count;
            best.clear();
            best.push(index);
        } else if count == best_count {
            best.push(index);
        }
    }

    match best.len() {
        0 => None,
        1 => Some(Classification {
            status: MatchStatus::Matched,
            matched: Some(best[0]),
            strategy: MatchStrategy::Metadata,
            confidence: if best_count == 3 { 0.9 } else { 0.6 },
        }),
        _ => Some(Classification::uncertain()),
    }
}

/// Classify one Amazon unit against the iCloud set.
pub fn classify_unit(unit: &LogicalUnit, icloud: &[LogicalUnit], threshold: u32) -> Classification {
    for tier in TIERS {
        if let Some(result) = tier(unit, icloud, threshold) {
            return result;
        }
    }
    Classification::missing()
}

/// Classify every Amazon unit. Each classification is independent and the
/// iCloud set is read-only, so units fan out across cores; the output
/// preserves Amazon input order regardless of parallelism.
pub fn classify(amazon: &[LogicalUnit], icloud: &[LogicalUnit], threshold: u32) -> Vec<Classification> {
    amazon
        .par_iter()
        .map(|unit| classify_unit(unit, icloud, threshold))
        .collect()
}
