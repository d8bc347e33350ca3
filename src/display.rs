//! Box-drawn terminal output.

use crate::config::{ConfigSourceMap, ResolvedConfig};
use crate::git::ChangeSet;

/// Widest content line rendered inside a box before wrapping is left to the terminal.
const MAX_BOX_WIDTH: usize = 100;

/// Draw `body` inside a rounded box with `title` on the top edge.
pub fn render_box(title: &str, body: &str) -> String {
    let lines: Vec<&str> = if body.is_empty() { vec![""] } else { body.lines().collect() };
    let content_width = lines
        .iter()
        .map(|l| l.chars().count())
        .max()
        .unwrap_or(0)
        .max(title.chars().count() + 2)
        .min(MAX_BOX_WIDTH);

    let mut out = String::new();
    let title_part = format!(" {} ", title);
    let fill = (content_width + 2).saturating_sub(title_part.chars().count() + 1);
    out.push_str(&format!("╭─{}{}╮\n", title_part, "─".repeat(fill)));

    for line in lines {
        let truncated: String = line.chars().take(content_width).collect();
        let pad = content_width - truncated.chars().count();
        out.push_str(&format!("│ {}{} │\n", truncated, " ".repeat(pad)));
    }

    out.push_str(&format!("╰{}╯", "─".repeat(content_width + 2)));
    out
}

pub fn change_summary(changes: &ChangeSet) -> String {
    let header = format!(
        "{} ({})",
        changes.stats,
        if changes.staged { "staged" } else { "unstaged" }
    );
    render_box("Changes", &format!("{}\n\n{}", header, changes.file_summary))
}

pub fn message_box(message: &str) -> String {
    render_box("Commit message", message)
}

/// `key  value  (source)` table for `config sources`.
pub fn sources_table(config: &ResolvedConfig, sources: &ConfigSourceMap) -> String {
    let values = serde_json::to_value(config).unwrap_or_default();
    let entries = sources.entries();
    let key_width = entries.iter().map(|(k, _)| k.len()).max().unwrap_or(0);

    entries
        .iter()
        .map(|(key, source)| {
            let value = lookup(&values, key)
                .map(summarize_value)
                .unwrap_or_default();
            format!("{:<width$}  {:<12}  {}", key, source.as_str(), value, width = key_width)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn lookup<'a>(value: &'a serde_json::Value, dotted: &str) -> Option<&'a serde_json::Value> {
    dotted.split('.').try_fold(value, |v, key| v.get(key))
}

fn summarize_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Array(items) => format!("[{} entries]", items.len()),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
