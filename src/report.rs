//! Human-readable run summary.
//!
//! Fact files themselves are JSON (see `db`); this is the colored overview
//! printed after a run that wrote them to disk.

use colored::*;

use crate::index::PipelineSummary;

/// Print the summary of a run to standard output.
pub fn write_pretty(project_root: &str, units: usize, summaries: &[PipelineSummary]) {
    println!();
    print!("  ");
    print!("{}", "stmt-facts".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();

    print!("  {}", "Project: ".dimmed());
    println!("{}", project_root);
    print!("  {}", "Units:   ".dimmed());
    println!("{}", units);
    println!();

    for summary in summaries {
        println!("  {}", summary_line(summary));
    }
    println!();
}

fn summary_line(summary: &PipelineSummary) -> String {
    let mark = if summary.entries > 0 {
        "✓".green()
    } else {
        "○".yellow()
    };
    let mut line = format!(
        "{} {:<11} {} facts",
        mark,
        summary.pipeline.as_str().bold(),
        summary.entries
    );
    if let Some(output) = &summary.output {
        line.push_str(&format!("  {}", format!("→ {}", output.display()).dimmed()));
    }
    if summary.duplicates > 0 {
        line.push_str(&format!(
            "  {}",
            format!("({} repeated units skipped)", summary.duplicates).dimmed()
        ));
    }
    line
}
