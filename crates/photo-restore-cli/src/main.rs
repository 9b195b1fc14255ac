use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use photo_restore_core::CompareOptions;

#[derive(Parser)]
#[command(
    name = "photo-restore",
    version,
    about = "Compare an Amazon Photos backup against an iCloud export and stage missing files"
)]
struct Cli {
    /// Amazon Photos backup folder
    #[arg(long)]
    amazon_folder: PathBuf,

    /// iCloud Photos export folder
    #[arg(long)]
    icloud_folder: PathBuf,

    /// Output folder for staged files and report.json
    #[arg(short, long)]
    output: PathBuf,

    /// Year being processed (report metadata)
    #[arg(long)]
    year: i32,

    /// Log all operations without copying files
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Hamming distance threshold for perceptual matching (smaller = stricter)
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u32).range(0..=64))]
    perceptual_threshold: u32,
}

/// One progress bar per pipeline stage; a stage change finishes the
/// previous bar and starts a fresh one.
struct StageBars {
    style: ProgressStyle,
    current: Mutex<Option<(String, ProgressBar)>>,
}

impl StageBars {
    fn new(style: ProgressStyle) -> Self {
        Self {
            style,
            current: Mutex::new(None),
        }
    }

    fn update(&self, stage: &str, current: u64, total: u64, message: &str) {
        let mut guard = self.current.lock().unwrap();
        let stale = guard.as_ref().map_or(true, |(name, _)| name != stage);
        if stale {
            if let Some((_, bar)) = guard.take() {
                bar.finish_and_clear();
            }
            let bar = ProgressBar::new(total);
            bar.set_style(self.style.clone());
            *guard = Some((stage.to_string(), bar));
        }
        if let Some((_, bar)) = guard.as_ref() {
            bar.set_message(format!("[{}] {}", stage, message));
            bar.set_position((current + 1).min(total));
        }
    }

    fn finish(&self) {
        if let Some((_, bar)) = self.current.lock().unwrap().take() {
            bar.finish_and_clear();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let t_total = std::time::Instant::now();

    anyhow::ensure!(
        cli.amazon_folder.is_dir(),
        "Amazon folder does not exist: {}",
        cli.amazon_folder.display()
    );
    anyhow::ensure!(
        cli.icloud_folder.is_dir(),
        "iCloud folder does not exist: {}",
        cli.icloud_folder.display()
    );

    let options = CompareOptions {
        amazon_folder: cli.amazon_folder,
        icloud_folder: cli.icloud_folder,
        output: cli.output,
        year: cli.year,
        dry_run: cli.dry_run,
        verbose: cli.verbose,
        perceptual_threshold: cli.perceptual_threshold,
    };

    let style = ProgressStyle::with_template("{msg} [{bar:40.cyan/blue}] {pos}/{len}")?
        .progress_chars("=>-");
    let bars = Arc::new(StageBars::new(style));

    let cb_bars = Arc::clone(&bars);
    let outcome = photo_restore_core::process(&options, &move |stage, current, total, message| {
        cb_bars.update(stage, current, total, message);
    })?;
    bars.finish();

    let s = &outcome.stats;
    println!("==================================================");
    println!("COMPARISON SUMMARY");
    println!("==================================================");
    println!("Total Amazon files:     {}", s.total_amazon_files);
    println!("Total iCloud files:     {}", s.total_icloud_files);
    println!(
        "Live Photo pairs:       {} (Amazon) / {} (iCloud)",
        s.amazon_live_pairs, s.icloud_live_pairs
    );
    println!("--------------------------------------------------");
    println!("Exact matches:          {}", s.exact_matches);
    println!("Perceptual matches:     {}", s.perceptual_matches);
    println!("Metadata matches:       {}", s.metadata_matches);
    println!("Uncertain (review):     {}", s.uncertain_matches);
    println!("Missing (to restore):   {}", s.missing_files);
    println!("--------------------------------------------------");
    println!("Files staged:           {}", s.files_staged);
    println!("Warnings:               {}", s.warnings);
    println!("Report: {}", outcome.report_path.display());
    if options.dry_run {
        println!();
        println!("[dry-run] No files were copied.");
    }

    eprintln!("Done in {:.2}s", t_total.elapsed().as_secs_f64());
    Ok(())
}
