use colored::Colorize;
use serde_json::Value as Json;
use similar::{ChangeTag, TextDiff};

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

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

// ============================================================================
// Attribute Formatting
// ============================================================================

/// Render a JSON attribute value on one line, strings unquoted
pub fn format_value(value: &Json) -> String {
    match value {
        Json::String(s) => s.clone(),
        Json::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Line diff of two JSON documents, pretty-printed
///
/// Returns `(tag, line)` pairs without trailing newlines.
pub fn json_diff_lines(before: &Json, after: &Json) -> Vec<(ChangeTag, String)> {
    let old = serde_json::to_string_pretty(before).unwrap_or_default();
    let new = serde_json::to_string_pretty(after).unwrap_or_default();
    TextDiff::from_lines(&old, &new)
        .iter_all_changes()
        .map(|change| (change.tag(), change.value().trim_end_matches('\n').to_string()))
        .collect()
}

/// Print a line diff of two JSON documents
pub fn print_json_diff(before: &Json, after: &Json, indent: &str) {
    for (tag, line) in json_diff_lines(before, after) {
        match tag {
            ChangeTag::Delete => println!("{indent}{}", format!("- {line}").red()),
            ChangeTag::Insert => println!("{indent}{}", format!("+ {line}").green()),
            ChangeTag::Equal => println!("{indent}{}", format!("  {line}").dimmed()),
        }
    }
}

/// Whether a value is large enough to deserve a line diff
pub fn is_structured(value: &Json) -> bool {
    match value {
        Json::Array(items) => !items.is_empty(),
        Json::Object(map) => !map.is_empty(),
        _ => false,
    }
}

// ============================================================================
// Tests
// ============================================================================
