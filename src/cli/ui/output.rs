use console::style;

use crate::benchmark::{ERROR_PREFIX, ResultEntry, Snapshot};
use crate::types::OutputKind;

const PREVIEW_WIDTH: usize = 72;

pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", style("✓").green(), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning(&self, message: &str) {
        println!("{} {}", style("⚠").yellow(), message);
    }

    pub fn info(&self, message: &str) {
        println!("{} {}", style("ℹ").blue(), message);
    }

    pub fn section(&self, message: &str) {
        println!("\n{}", style(message).bold());
        println!("{}", "─".repeat(40));
    }

    /// One line per entry: mark, key, duration, preview
    pub fn entries(&self, snapshot: &Snapshot) {
        for (key, entry) in &snapshot.results {
            let mark = if entry.output.starts_with(ERROR_PREFIX) {
                style("✗").red()
            } else {
                style("✓").green()
            };
            let duration = entry
                .duration_ms
                .map(|ms| format!(" {:.1}s", ms as f64 / 1000.0))
                .unwrap_or_default();
            println!(
                "{} {}{}  {}",
                mark,
                style(key).bold(),
                style(duration).dim(),
                preview(entry)
            );
        }
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

/// Short single-line view of an entry's payload
pub fn preview(entry: &ResultEntry) -> String {
    if entry.kind == OutputKind::Image {
        return format!("<image, {} bytes>", entry.output.len());
    }

    let first_line = entry.output.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    let line_count = entry.output.lines().count();

    let mut text: String = first_line.trim().chars().take(PREVIEW_WIDTH).collect();
    if first_line.trim().chars().count() > PREVIEW_WIDTH {
        text.push('…');
    }
    if line_count > 1 {
        text.push_str(&format!(" (+{} lines)", line_count - 1));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_preview_text() {
        let entry = ResultEntry::success("\n<html>\n<body></body>\n</html>", OutputKind::Text, Utc::now(), None);
        assert_eq!(preview(&entry), "<html> (+3 lines)");
    }

    #[test]
    fn test_preview_truncates() {
        let long = "x".repeat(100);
        let entry = ResultEntry::success(long, OutputKind::Text, Utc::now(), None);
        let shown = preview(&entry);
        assert!(shown.ends_with('…'));
        assert_eq!(shown.chars().count(), PREVIEW_WIDTH + 1);
    }

    #[test]
    fn test_preview_image() {
        let entry = ResultEntry::success("data:image/jpeg;base64,AAAA", OutputKind::Image, Utc::now(), None);
        assert_eq!(preview(&entry), "<image, 27 bytes>");
    }
}
