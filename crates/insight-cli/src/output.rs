//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print any response as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Render a loaded/not-loaded flag
pub fn format_loaded(loaded: bool) -> String {
    if loaded {
        "loaded".green().to_string()
    } else {
        "not loaded".red().to_string()
    }
}

/// Color a cluster label by its concept tag
pub fn color_label(label: &str, concept_tag: Option<&str>) -> String {
    match concept_tag {
        Some("fast_learner") => label.cyan().to_string(),
        Some("consistent_learner") => label.green().to_string(),
        Some("reflective_learner") => label.blue().to_string(),
        Some("struggling_learner") => label.yellow().to_string(),
        _ => label.to_string(),
    }
}

/// Shorten long text for table cells
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}
