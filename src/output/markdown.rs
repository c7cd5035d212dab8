//! Markdown report generation
//!
//! Renders a finished run as a small human-readable report.

use crate::output::CrawlSummary;
use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use std::path::Path;

/// Everything the markdown report describes
#[derive(Debug, Clone)]
pub struct RunReport {
    pub seed: String,
    pub store_root: String,
    pub config_hash: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub summary: CrawlSummary,
}

/// Writes the markdown report to `output_path`
pub fn generate_markdown_summary(report: &RunReport, output_path: &Path) -> std::io::Result<()> {
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output_path, format_markdown_summary(report))
}

/// Formats a run report as markdown
pub fn format_markdown_summary(report: &RunReport) -> String {
    let summary = &report.summary;
    let mut md = String::new();

    md.push_str("# PDF Harvest Summary\n\n");

    md.push_str("## Run Information\n\n");
    let _ = writeln!(md, "- **Seed**: {}", report.seed);
    let _ = writeln!(md, "- **Store Root**: {}", report.store_root);
    let _ = writeln!(md, "- **Started**: {}", report.started_at.to_rfc3339());
    let _ = writeln!(md, "- **Finished**: {}", report.finished_at.to_rfc3339());
    let _ = writeln!(
        md,
        "- **Duration**: {:.1} seconds",
        summary.elapsed.as_secs_f64()
    );
    let _ = writeln!(
        md,
        "- **Status**: {}",
        if summary.cancelled {
            "stopped"
        } else {
            "completed"
        }
    );
    let _ = writeln!(md, "- **Config Hash**: {}\n", report.config_hash);

    md.push_str("## Fetching\n\n");
    md.push_str("| Outcome | Count |\n");
    md.push_str("|---------|-------|\n");
    let _ = writeln!(md, "| Pages fetched | {} |", summary.pages_fetched);
    let _ = writeln!(md, "| Documents fetched | {} |", summary.documents_fetched);
    let _ = writeln!(md, "| Served from cache | {} |", summary.cache_hits);
    let _ = writeln!(md, "| Failed | {} |", summary.failed);
    let _ = writeln!(md, "| Skipped | {} |", summary.skipped);
    let _ = writeln!(md, "| Denied by robots.txt | {} |\n", summary.robots_denied);
    let _ = writeln!(md, "Failure rate: {:.2}%\n", summary.failure_rate());

    md.push_str("## PDFs\n\n");
    md.push_str("| Outcome | Count |\n");
    md.push_str("|---------|-------|\n");
    let _ = writeln!(md, "| Emitted | {} |", summary.pdfs_emitted);
    let _ = writeln!(md, "| Written | {} |", summary.pdfs_written);
    let _ = writeln!(md, "| Write failures | {} |", summary.write_failures);

    md
}
