//! Output formatting utilities.

use colored::Colorize;
use serde::Serialize;

/// Print a section header
pub(crate) fn section(title: &str) {
    println!("\n{}", format!("=== {title} ===").cyan().bold());
}

/// Print a key-value pair
pub(crate) fn kv(key: &str, value: impl std::fmt::Display) {
    println!("  {}: {}", key.white().bold(), value);
}

/// Print a success message to stderr, keeping stdout for data
pub(crate) fn success(msg: &str) {
    eprintln!("{} {}", "[OK]".green().bold(), msg);
}

/// Print a value as pretty JSON
pub(crate) fn json<T: Serialize>(value: &T) -> crate::error::Result<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| crate::error::CliError::Epiml(format!("JSON output failed: {e}")))?;
    println!("{text}");
    Ok(())
}

/// Format a metric, `NaN` shown as `n/a`
pub(crate) fn metric(value: f64) -> String {
    if value.is_nan() {
        "n/a".dimmed().to_string()
    } else {
        format!("{value:.4}")
    }
}
