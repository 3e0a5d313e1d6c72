//! CLI-specific error types and exit code mapping

use prodlog_core::error::ProdlogError;
use prodlog_pipeline::LogPipelineError;

/// CLI-specific error type.
///
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from prodlog-core.
    #[error("{0}")]
    Core(#[from] ProdlogError),

    /// Log pipeline domain error.
    #[error("{0}")]
    Pipeline(#[from] LogPipelineError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                                   |
    /// |------|-------------------------------------------|
    /// | 0    | Success                                   |
    /// | 1    | General / command error                   |
    /// | 2    | Configuration error                       |
    /// | 3    | Invalid argument (action name, log file)  |
    /// | 10   | IO error                                  |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Io(_) => 10,
            Self::Core(e) => match e {
                ProdlogError::Config(_) => 2,
                ProdlogError::InvalidArgument(_) => 3,
                ProdlogError::Io(_) => 10,
            },
            Self::Pipeline(e) if e.is_argument_error() => 3,
            Self::Pipeline(LogPipelineError::Config { .. }) => 2,
            Self::Pipeline(LogPipelineError::Io(_)) => 10,
            Self::Pipeline(_) | Self::JsonSerialize(_) | Self::Command(_) => 1,
        }
    }
}
