use console::style;

use crate::config::Settings;
use crate::extract::TextExtractor;

/// Check if required OCR and PDF tools are installed.
pub fn cmd_ocr_check(settings: &Settings) -> anyhow::Result<()> {
    println!("\n{}", style("OCR Tool Status").bold());
    println!("{}", "-".repeat(50));

    let tools = TextExtractor::check_tools();
    let mut all_found = true;

    for (tool, available) in &tools {
        let status = if *available {
            style("✓ found").green()
        } else {
            all_found = false;
            style("✗ not found").red()
        };
        println!("  {:<15} {}", tool, status);
    }
    println!("  {:<15} {}", "language", settings.ocr_language);

    if !all_found {
        println!("\n{}", style("Install missing tools:").yellow());
        println!("  Debian/Ubuntu: apt install tesseract-ocr poppler-utils");
        println!("  macOS:         brew install tesseract poppler");
    }

    Ok(())
}
