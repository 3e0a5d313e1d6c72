//! Command handlers -- one module per subcommand

pub mod config;
pub mod grep;
pub mod parse;
pub mod report;
