use anyhow::{Context, Result};
use batch_checker::{CheckResult, RunSummary};
use colored::Colorize;
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub summary: &'a RunSummary,
    pub results: &'a [CheckResult],
}

/// Write the report to `output`, or to stdout when no path is given.
pub fn write_report(
    summary: &RunSummary,
    results: &[CheckResult],
    output: Option<&Path>,
    live_only: bool,
) -> Result<()> {
    let mut writer: Box<dyn Write> = match output {
        Some(path) => Box::new(io::BufWriter::new(
            std::fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    };

    write_to(&mut writer, summary, results, live_only)
}

/// Write the report as pretty JSON, or live identifiers one per line.
pub fn write_to<W: Write>(
    writer: &mut W,
    summary: &RunSummary,
    results: &[CheckResult],
    live_only: bool,
) -> Result<()> {
    if live_only {
        for result in results.iter().filter(|r| r.is_live()) {
            writeln!(writer, "{}", result.id)?;
        }
    } else {
        serde_json::to_writer_pretty(&mut *writer, &Report { summary, results })
            .context("Failed to serialize report")?;
        writeln!(writer)?;
    }

    writer.flush().context("Failed to flush report")?;
    Ok(())
}

/// One-line colored summary for stderr.
pub fn summary_line(summary: &RunSummary) -> String {
    let mut line = format!(
        "{} checked in {:.1}s: {} live, {} dead",
        summary.total,
        summary.elapsed_ms as f64 / 1000.0,
        summary.live.to_string().bright_green().bold(),
        (summary.dead - summary.unverified).to_string().bright_red(),
    );
    if summary.unverified > 0 {
        line.push_str(&format!(
            ", {} unverified",
            summary.unverified.to_string().bright_yellow()
        ));
    }
    if summary.cancelled {
        line.push_str(&format!(" {}", "(cancelled)".bright_yellow()));
    }
    line
}
