//! `prodlog parse` command handler

use std::io::Write;

use serde::Serialize;
use tracing::info;

use prodlog_core::config::ProdlogConfig;
use prodlog_core::types::LogEntry;
use prodlog_pipeline::{PipelineConfig, iterate_path_with};

use crate::cli::ParseArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `parse` command.
pub async fn execute(
    args: ParseArgs,
    config: &ProdlogConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let pipeline_config = PipelineConfig::from_core(&config.pipeline);
    let entries: Vec<LogEntry> = iterate_path_with(&args.file, pipeline_config)?.collect();

    info!(file = %args.file.display(), entries = entries.len(), "parsed log file");

    let report = ParseReport {
        file: args.file.display().to_string(),
        show_queries: args.queries,
        entries,
    };
    writer.render(&report)
}

/// Every request found in one log file.
#[derive(Serialize)]
pub struct ParseReport {
    pub file: String,
    /// Text output only
    #[serde(skip)]
    pub show_queries: bool,
    pub entries: Vec<LogEntry>,
}

impl Render for ParseReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Requests in {}: {}", self.file.bold(), self.entries.len())?;
        writeln!(
            w,
            "{:<40} {:<16} {:>10} {:>10} {:>10} {:>8} {:>10}",
            "PAGE", "IP", "REQUEST", "RENDER", "DB", "QUERIES", "QUERY TIME"
        )?;
        writeln!(w, "{}", "-".repeat(110))?;

        for entry in &self.entries {
            writeln!(
                w,
                "{:<40} {:<16} {:>10.3} {:>10.3} {:>10.3} {:>8} {:>10.4}",
                entry.page.as_deref().unwrap_or("-"),
                entry.ip.as_deref().unwrap_or("-"),
                entry.request_time,
                entry.render_time,
                entry.db_time,
                entry.queries.len(),
                entry.query_time(),
            )?;

            if self.show_queries {
                for query in &entry.queries {
                    writeln!(w, "    {:<36} {:>10.4}", query.label.dimmed(), query.elapsed)?;
                }
            }
        }

        Ok(())
    }
}
