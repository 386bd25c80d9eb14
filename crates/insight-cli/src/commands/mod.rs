//! Subcommand implementations

pub mod insights;
pub mod status;
