//! `prodlog report` command handler

use std::io::Write;

use serde::Serialize;
use tracing::info;

use prodlog_core::config::ProdlogConfig;
use prodlog_pipeline::{PageReport, PipelineConfig, iterate_path_with};

use crate::cli::ReportArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `report` command.
pub async fn execute(
    args: ReportArgs,
    config: &ProdlogConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let pipeline_config = PipelineConfig::from_core(&config.pipeline);
    let entries = iterate_path_with(&args.file, pipeline_config)?;

    let mut pages = PageReport::from_entries(entries);
    info!(
        file = %args.file.display(),
        entries = pages.entries,
        pages = pages.pages().len(),
        "built page report"
    );
    if let Some(top) = args.top {
        pages.truncate(top);
    }

    let report = PageSummary {
        file: args.file.display().to_string(),
        report: pages,
    };
    writer.render(&report)
}

/// Page report for one log file.
#[derive(Serialize)]
pub struct PageSummary {
    pub file: String,
    #[serde(flatten)]
    pub report: PageReport,
}

impl Render for PageSummary {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(
            w,
            "Page report: {} ({} requests, {} without a page)",
            self.file.bold(),
            self.report.entries,
            self.report.skipped
        )?;

        if self.report.is_empty() {
            writeln!(w, "  {}", "no requests found".yellow())?;
            return Ok(());
        }

        writeln!(
            w,
            "{:<40} {:>7} {:>12} {:>10} {:>10} {:>10} {:>8}",
            "PAGE", "COUNT", "TOTAL", "AVG", "AVG VIEW", "AVG DB", "QUERIES"
        )?;
        writeln!(w, "{}", "-".repeat(103))?;

        for page in self.report.pages() {
            writeln!(
                w,
                "{:<40} {:>7} {:>12.3} {:>10.3} {:>10.3} {:>10.3} {:>8}",
                page.page,
                page.count,
                page.total_request_time,
                page.avg_request_time(),
                page.avg_render_time(),
                page.avg_db_time(),
                page.total_queries,
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prodlog_core::types::LogEntry;

    fn entry(page: &str, request: f64) -> LogEntry {
        LogEntry {
            page: Some(page.to_owned()),
            request_time: request,
            ..LogEntry::default()
        }
    }

    #[test]
    fn test_render_text_orders_by_total_time() {
        let summary = PageSummary {
            file: "production.log".to_owned(),
            report: PageReport::from_entries(vec![
                entry("/fast", 1.0),
                entry("/slow", 100.0),
            ]),
        };
        let mut buf = Vec::new();
        summary.render_text(&mut buf).expect("render should succeed");
        let text = String::from_utf8(buf).expect("valid UTF-8");

        let slow = text.find("/slow").expect("slow page listed");
        let fast = text.find("/fast").expect("fast page listed");
        assert!(slow < fast, "slowest page should come first");
    }

    #[test]
    fn test_render_text_empty_report() {
        let summary = PageSummary {
            file: "empty.log".to_owned(),
            report: PageReport::from_entries(Vec::new()),
        };
        let mut buf = Vec::new();
        summary.render_text(&mut buf).expect("render should succeed");
        let text = String::from_utf8(buf).expect("valid UTF-8");
        assert!(text.contains("no requests found"));
    }

    #[test]
    fn test_json_flattens_report() {
        let summary = PageSummary {
            file: "production.log".to_owned(),
            report: PageReport::from_entries(vec![entry("/a", 2.0)]),
        };
        let json = serde_json::to_value(&summary).expect("should serialize");
        assert_eq!(json["file"], "production.log");
        assert_eq!(json["entries"], 1);
        assert_eq!(json["pages"][0]["page"], "/a");
        assert_eq!(json["pages"][0]["total_request_time"], 2.0);
    }
}
