use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use serde::Serialize;

use crate::matching::{Classification, MatchStatus, MatchStrategy};
use crate::media::LogicalUnit;
use crate::CompareOptions;

/// Counters for one comparison run, serialized into the report summary.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CompareStats {
    pub total_amazon_files: u64,
    pub total_icloud_files: u64,
    pub amazon_live_pairs: u64,
    pub icloud_live_pairs: u64,
    pub exact_matches: u64,
    pub perceptual_matches: u64,
    pub metadata_matches: u64,
    pub uncertain_matches: u64,
    pub missing_files: u64,
    pub files_staged: u64,
    pub warnings: u64,
}

impl CompareStats {
    /// Single pass over the classifications.
    pub fn tally(&mut self, classifications: &[Classification]) {
        for c in classifications {
            match c.status {
                MatchStatus::Matched => match c.strategy {
                    MatchStrategy::Exact => self.exact_matches += 1,
                    MatchStrategy::Perceptual => self.perceptual_matches += 1,
                    MatchStrategy::Metadata => self.metadata_matches += 1,
                    MatchStrategy::None => {}
                },
                MatchStatus::Uncertain => self.uncertain_matches += 1,
                MatchStatus::Missing => self.missing_files += 1,
            }
        }
    }
}

/// One Missing/Uncertain unit in the report.
#[derive(Debug, Serialize)]
pub struct ReportEntry {
    pub amazon_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amazon_video_path: Option<String>,
    pub status: MatchStatus,
    pub strategy: MatchStrategy,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_icloud_path: Option<String>,
}

#[derive(Serialize)]
struct Report<'a> {
    generated_at: String,
    year: i32,
    amazon_folder: String,
    icloud_folder: String,
    perceptual_threshold: u32,
    dry_run: bool,
    summary: &'a CompareStats,
    missing_files: Vec<ReportEntry>,
    uncertain_matches: Vec<ReportEntry>,
    warnings: &'a [String],
}

fn entry(
    unit: &LogicalUnit,
    classification: &Classification,
    icloud_units: &[LogicalUnit],
) -> ReportEntry {
    ReportEntry {
        amazon_path: unit.primary.path.display().to_string(),
        amazon_video_path: unit
            .companion
            .as_ref()
            .map(|c| c.path.display().to_string()),
        status: classification.status,
        strategy: classification.strategy,
        confidence: classification.confidence,
        matched_icloud_path: classification
            .matched
            .and_then(|i| icloud_units.get(i))
            .map(|u| u.primary.path.display().to_string()),
    }
}

/// Write `<output>/report.json`: run metadata, summary counts, and the
/// Missing/Uncertain units in Amazon input order. Written in dry-run mode
/// too - the report is the whole point of a dry run.
pub fn write_report(
    options: &CompareOptions,
    stats: &CompareStats,
    amazon_units: &[LogicalUnit],
    icloud_units: &[LogicalUnit],
    classifications: &[Classification],
    warnings: &[String],
) -> anyhow::Result<PathBuf> {
    let mut missing_files = Vec::new();
    let mut uncertain_matches = Vec::new();
    for (unit, classification) in amazon_units.iter().zip(classifications) {
        match classification.status {
            MatchStatus::Missing => {
                missing_files.push(entry(unit, classification, icloud_units));
            }
            MatchStatus::Uncertain => {
                uncertain_matches.push(entry(unit, classification, icloud_units));
            }
            MatchStatus::Matched => {}
        }
    }

    let report = Report {
        generated_at: chrono::Local::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
        year: options.year,
        amazon_folder: options.amazon_folder.display().to_string(),
        icloud_folder: options.icloud_folder.display().to_string(),
        perceptual_threshold: options.perceptual_threshold,
        dry_run: options.dry_run,
        summary: stats,
        missing_files,
        uncertain_matches,
        warnings,
    };

    std::fs::create_dir_all(&options.output)?;
    let path = options.output.join("report.json");
    let file = BufWriter::new(File::create(&path)?);
    serde_json::to_writer_pretty(file, &report)?;
    Ok(path)
}
