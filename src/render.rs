//! Terminal rendering of entries and errors

use colored::Colorize;

use devtail_types::{Emphasis, Entry, PriorityLevel};

use crate::error::CliError;

/// Format one entry, continuation lines included. Ends with a newline.
pub fn format_entry<P: PriorityLevel>(entry: &Entry<P>) -> String {
    let emphasis = entry.priority.emphasis();
    let tag = entry.display_tag();
    let head = format!("{} |", entry.priority.letter());

    let mut out = format!(
        "{} {} {} {} {}\n",
        format!("[{}]", entry.timestamp.format("%H:%M:%S")).dimmed(),
        paint(&head, emphasis),
        paint(tag, emphasis).bold(),
        paint("▶", emphasis),
        paint(entry.message(), emphasis),
    );

    // Continuation lines line up under the message column.
    let rest = &entry.messages[1..];
    let indent = " ".repeat(tag.len() + 16);
    for (index, line) in rest.iter().enumerate() {
        let gutter = if index == rest.len() - 1 { "└" } else { "│" };
        out.push_str(&format!(
            "{indent}{} {}\n",
            paint(gutter, emphasis),
            paint(line, emphasis)
        ));
    }
    out
}

pub fn print_entry<P: PriorityLevel>(entry: &Entry<P>) {
    print!("{}", format_entry(entry));
}

pub fn format_error(err: &CliError) -> String {
    format!("{} {err}", "✖ error ▶".red().bold())
}

fn paint(text: &str, emphasis: Emphasis) -> colored::ColoredString {
    match emphasis {
        Emphasis::Error => text.red(),
        Emphasis::Warning => text.yellow(),
        Emphasis::Dim => text.dimmed(),
        Emphasis::Plain => text.normal(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};
    use devtail_types::{AndroidPriority, Platform};

    fn entry(messages: &[&str]) -> Entry<AndroidPriority> {
        Entry {
            timestamp: Local.with_ymd_and_hms(2024, 3, 1, 10, 30, 45).unwrap(),
            pid: 1234,
            priority: AndroidPriority::Info,
            tag: Some("storaged".to_string()),
            app_id: None,
            messages: messages.iter().map(|m| m.to_string()).collect(),
            platform: Platform::Android,
        }
    }

    #[test]
    fn test_single_line_layout() {
        colored::control::set_override(false);
        let text = format_entry(&entry(&["getDiskStats failed"]));
        assert_eq!(text, "[10:30:45] I | storaged ▶ getDiskStats failed\n");
    }

    #[test]
    fn test_continuation_gutters() {
        colored::control::set_override(false);
        let text = format_entry(&entry(&["first", "second", "third"]));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "[10:30:45] I | storaged ▶ first");
        assert!(lines[1].trim_start().starts_with("│ second"));
        assert!(lines[2].trim_start().starts_with("└ third"));
        // Both continuation lines share the same indent.
        let indent = |line: &str| line.len() - line.trim_start().len();
        assert_eq!(indent(lines[1]), indent(lines[2]));
    }

    #[test]
    fn test_error_message_includes_cause() {
        colored::control::set_override(false);
        let err = CliError::UnsupportedFilter { filter: "app" };
        let text = format_error(&err);
        assert!(text.contains("✖ error ▶"));
        assert!(text.contains("only available on Android"));
    }
}
