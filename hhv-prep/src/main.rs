//! hhv-prep - source partition preparation
//!
//! **Usage:**
//! ```bash
//! hhv-prep convert Data_refined/harmless-base/train.json
//! hhv-prep merge --data-dir Data --refined-dir Data_refined
//! hhv-prep merge --data-dir Data --refined-dir Data_refined \
//!     --dataset red-team-attempts:red-team-attempts:red_team_attempts.jsonl
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hhv_prep::merge::MISSING_PREVIEW;
use hhv_prep::{convert_file, merge_dataset, DatasetSpec};
use tracing::info;

/// Data preparation for the review service
#[derive(Parser, Debug)]
#[command(name = "hhv-prep")]
#[command(about = "Prepare JSONL source partitions for hhv-review")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a JSON array file to JSONL
    Convert {
        /// JSON file containing an array of objects
        input: PathBuf,

        /// Output file (default: input with .jsonl extension)
        output: Option<PathBuf>,
    },

    /// Merge refined annotations with original conversations into train.jsonl
    Merge {
        /// Directory holding the original datasets
        #[arg(long, value_name = "DIR", default_value = "Data")]
        data_dir: PathBuf,

        /// Directory holding refined annotations; merged output goes here too
        #[arg(long, value_name = "DIR", default_value = "Data_refined")]
        refined_dir: PathBuf,

        /// Dataset as name[:original_folder[:original_file]] (repeatable;
        /// default: helpful-online, helpful-rejections-sampled, red-team-attempts)
        #[arg(long = "dataset", value_name = "SPEC")]
        datasets: Vec<DatasetSpec>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    match args.command {
        Command::Convert { input, output } => {
            let report = convert_file(&input, output.as_deref())
                .with_context(|| format!("Failed to convert {}", input.display()))?;
            println!(
                "Converted {} items to JSONL: {}",
                report.count,
                report.output.display()
            );
        }
        Command::Merge {
            data_dir,
            refined_dir,
            datasets,
        } => {
            let datasets = if datasets.is_empty() {
                DatasetSpec::defaults()
            } else {
                datasets
            };

            let mut total_merged = 0;
            let mut total_missing = 0;

            for dataset in &datasets {
                info!("Processing: {}", dataset.name);
                let report = merge_dataset(&data_dir, &refined_dir, dataset)
                    .with_context(|| format!("Failed to merge {}", dataset.name))?;

                if report.skipped {
                    println!("{}: skipped (input missing)", report.name);
                    continue;
                }
                println!("{}: {} merged", report.name, report.merged);
                if !report.missing.is_empty() {
                    let preview: Vec<&str> = report
                        .missing
                        .iter()
                        .take(MISSING_PREVIEW)
                        .map(String::as_str)
                        .collect();
                    println!(
                        "{}: {} annotation ids not found in original data (first: {})",
                        report.name,
                        report.missing.len(),
                        preview.join(", ")
                    );
                }

                total_merged += report.merged;
                total_missing += report.missing.len();
            }

            println!("Total merged: {}", total_merged);
            if total_missing > 0 {
                println!("Total missing: {}", total_missing);
            }
        }
    }

    Ok(())
}
