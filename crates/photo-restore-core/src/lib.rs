pub mod date;
pub mod export;
pub mod fingerprint;
pub mod matching;
pub mod media;
pub mod pairing;
pub mod report;
pub mod scan;

use std::path::PathBuf;
use std::time::Instant;

use serde::{Deserialize, Serialize};

pub use matching::{
    classify, Classification, MatchStatus, MatchStrategy, DEFAULT_PERCEPTUAL_THRESHOLD,
};
pub use media::{LogicalUnit, MediaKind, MediaRecord};
pub use report::CompareStats;

fn default_perceptual_threshold() -> u32 {
    DEFAULT_PERCEPTUAL_THRESHOLD
}

/// Options for one comparison run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareOptions {
    pub amazon_folder: PathBuf,
    pub icloud_folder: PathBuf,
    /// Destination for staged files and report.json
    pub output: PathBuf,
    /// Year being processed (report metadata only)
    pub year: i32,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default = "default_perceptual_threshold")]
    pub perceptual_threshold: u32,
}

/// What a run produced, for the caller's summary output.
#[derive(Debug)]
pub struct CompareOutcome {
    pub stats: CompareStats,
    pub report_path: PathBuf,
    pub warnings: Vec<String>,
}

/// Type alias for progress callback
pub type ProgressCallback = dyn Fn(&str, u64, u64, &str) + Send + Sync;

/// Throttled progress reporter - emits at most every 200ms or on completion.
pub struct ThrottledProgress<'a> {
    inner: &'a ProgressCallback,
    last_emit: std::sync::Mutex<Instant>,
}

impl<'a> ThrottledProgress<'a> {
    pub fn new(inner: &'a ProgressCallback) -> Self {
        Self {
            inner,
            last_emit: std::sync::Mutex::new(Instant::now() - std::time::Duration::from_secs(1)),
        }
    }

    pub fn report(&self, stage: &str, current: u64, total: u64, message: &str) {
        let is_done = current + 1 >= total;
        if !is_done {
            let mut last = self.last_emit.lock().unwrap();
            if last.elapsed().as_millis() < 200 {
                return;
            }
            *last = Instant::now();
        }
        (self.inner)(stage, current, total, message);
    }
}

/// Run the full comparison pipeline: scan both folders, fingerprint,
/// pair Live Photos, classify Amazon units against the iCloud set, stage
/// Missing/Uncertain files, and write the JSON report.
///
/// Per-file problems (decode failures, unreadable files, copy failures)
/// accumulate as warnings and never abort the run.
pub fn process(
    options: &CompareOptions,
    progress_callback: &ProgressCallback,
) -> anyhow::Result<CompareOutcome> {
    // The CLI validates the threshold; re-checked here so the engine can
    // assume it.
    anyhow::ensure!(
        options.perceptual_threshold <= fingerprint::PERCEPTUAL_HASH_BITS,
        "perceptual threshold must be within 0..={}",
        fingerprint::PERCEPTUAL_HASH_BITS
    );

    let tp = ThrottledProgress::new(progress_callback);
    let mut warnings: Vec<String> = Vec::new();

    // Stage 1: scan both source folders
    let amazon_files = scan::scan_folder(&options.amazon_folder)?;
    let icloud_files = scan::scan_folder(&options.icloud_folder)?;
    if options.verbose {
        eprintln!(
            "Found {} Amazon and {} iCloud media files",
            amazon_files.len(),
            icloud_files.len()
        );
    }

    // Stage 2: fingerprint, parallel per file (CPU-bound decode + hash)
    let (amazon_records, w) = fingerprint::fingerprint_all(&amazon_files, &tp, "amazon");
    warnings.extend(w);
    let (icloud_records, w) = fingerprint::fingerprint_all(&icloud_files, &tp, "icloud");
    warnings.extend(w);

    let mut stats = CompareStats {
        total_amazon_files: amazon_records.len() as u64,
        total_icloud_files: icloud_records.len() as u64,
        ..CompareStats::default()
    };

    // Stage 3: pair Live Photos, each source independently
    let amazon_units = pairing::resolve_units(amazon_records);
    let icloud_units = pairing::resolve_units(icloud_records);
    stats.amazon_live_pairs = amazon_units.iter().filter(|u| u.is_live_photo()).count() as u64;
    stats.icloud_live_pairs = icloud_units.iter().filter(|u| u.is_live_photo()).count() as u64;

    // Stage 4: classify
    let classifications =
        matching::classify(&amazon_units, &icloud_units, options.perceptual_threshold);
    stats.tally(&classifications);

    // Stage 5: stage Missing/Uncertain files for recovery
    let export = export::export_results(
        &amazon_units,
        &classifications,
        &options.output,
        options.dry_run,
        &tp,
    )?;
    stats.files_staged = export.files_staged;
    warnings.extend(export.warnings);
    stats.warnings = warnings.len() as u64;

    if options.verbose {
        for warning in &warnings {
            eprintln!("warning: {}", warning);
        }
    }

    // Stage 6: report
    let report_path = report::write_report(
        options,
        &stats,
        &amazon_units,
        &icloud_units,
        &classifications,
        &warnings,
    )?;

    Ok(CompareOutcome {
        stats,
        report_path,
        warnings,
    })
}
