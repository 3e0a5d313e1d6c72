//! `prodlog grep` command handler

use std::io::{BufWriter, Write};

use serde::Serialize;
use tracing::info;

use prodlog_core::config::ProdlogConfig;
use prodlog_pipeline::{ClosedGroup, PipelineConfig, grep_matches, grep_with};

use crate::cli::{GrepArgs, OutputFormat};
use crate::error::CliError;
use crate::output::OutputWriter;

/// Execute the `grep` command.
///
/// Text output streams the raw lines of each matching request as they
/// complete. JSON output collects the matches into a single document.
pub async fn execute(
    args: GrepArgs,
    config: &ProdlogConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let pipeline_config = PipelineConfig::for_grep(&config.pipeline);

    match writer.format() {
        OutputFormat::Text => {
            let stdout = std::io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            let printed = grep_with(&args.action, &args.file, pipeline_config, &mut out)?;
            out.flush()?;
            info!(action = %args.action, file = %args.file.display(), printed, "grep finished");
        }
        OutputFormat::Json => {
            let report = build_report(&args, pipeline_config)?;
            writer.render_json(&report)?;
        }
    }

    Ok(())
}

fn build_report(args: &GrepArgs, config: PipelineConfig) -> Result<GrepReport, CliError> {
    let matches = grep_matches(&args.action, &args.file, config)?;
    let action = matches.action_filter().to_string();
    let requests = matches.map(GrepMatch::from).collect();

    Ok(GrepReport {
        action,
        file: args.file.display().to_string(),
        requests,
    })
}

/// Matching requests for one action.
#[derive(Serialize)]
pub struct GrepReport {
    /// Validated action name (after URL conversion)
    pub action: String,
    /// Log file that was searched
    pub file: String,
    /// Completed requests handled by the action, in completion order
    pub requests: Vec<GrepMatch>,
}

/// Raw lines of one completed request.
#[derive(Serialize)]
pub struct GrepMatch {
    /// `host-program-pid` of the emitting process
    pub process: String,
    pub lines: Vec<String>,
}

impl From<ClosedGroup> for GrepMatch {
    fn from(group: ClosedGroup) -> Self {
        Self {
            process: group.key.to_string(),
            lines: group.lines,
        }
    }
}
