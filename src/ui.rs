use colored::Colorize;
use reconcile::{Diagnostic, Severity};

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Print one diagnostic raised while working on `address`.
pub fn diagnostic(address: &str, diag: &Diagnostic) {
    let location = match &diag.attribute {
        Some(attr) => format!("{address}.{attr}"),
        None => address.to_string(),
    };
    match diag.severity {
        Severity::Error => {
            eprintln!("{} {} {}", "✗".red(), diag.summary.red().bold(), location.dimmed());
            if !diag.detail.is_empty() {
                eprintln!("    {}", diag.detail);
            }
        }
        Severity::Warning => {
            println!("{} {} {}", "⚠".yellow(), diag.summary.yellow(), location.dimmed());
            if !diag.detail.is_empty() {
                println!("    {}", diag.detail.dimmed());
            }
        }
    }
}

/// Placeholder shown instead of a sensitive value.
pub const SENSITIVE: &str = "(sensitive value)";

/// Shorten a value for single-line display.
pub fn truncate(value: &str, max_len: usize) -> String {
    if value.chars().count() <= max_len {
        value.to_string()
    } else if max_len <= 3 {
        "...".to_string()
    } else {
        let kept: String = value.chars().take(max_len - 3).collect();
        format!("{kept}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a long value here", 10), "a long ...");
        assert_eq!(truncate("abcdef", 3), "...");
    }

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate("héllo wörld", 8), "héllo...");
    }
}
