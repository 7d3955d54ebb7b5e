//! Batch classification command.

use std::path::Path;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use super::build_pipeline;
use crate::config::Settings;
use crate::models::ProcessedFileRecord;
use crate::pipeline::{list_inputs, write_output, ProcessOutcome};

/// Classify `input` (a file or a directory) and write the records to `output`.
pub async fn cmd_process(settings: &Settings, input: &Path, output: &Path) -> anyhow::Result<()> {
    let pipeline = build_pipeline(settings)?;

    let paths = if input.is_dir() {
        list_inputs(input)?
    } else if input.is_file() {
        vec![input.to_path_buf()]
    } else {
        anyhow::bail!("Input not found: {}", input.display());
    };

    println!(
        "{} Processing {} file(s) from {}",
        style("→").cyan(),
        paths.len(),
        input.display()
    );

    let progress = ProgressBar::new(paths.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")?
            .progress_chars("=>-"),
    );

    let mut records: Vec<ProcessedFileRecord> = Vec::new();
    let mut skipped = 0usize;
    for path in &paths {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        progress.set_message(name);

        match pipeline.process_path(path).await {
            ProcessOutcome::Recorded(record) => records.push(record),
            ProcessOutcome::Skipped(_) => skipped += 1,
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    write_output(output, &records)?;

    let unclassified = records.iter().filter(|r| r.result.is_empty()).count();
    println!(
        "{} {} document(s) recorded, {} skipped",
        style("✓").green(),
        records.len(),
        skipped
    );
    if unclassified > 0 {
        println!(
            "  {} {} document(s) have no classification",
            style("!").yellow(),
            unclassified
        );
    }
    println!("  Output written to {}", style(output.display()).bold());

    Ok(())
}
