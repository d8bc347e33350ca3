//! Prompt assembly for commit message generation.

use std::sync::LazyLock;

use regex_lite::Regex;

use crate::git::ChangeSet;

/// Diff budget, in characters, before truncation.
pub const MAX_DIFF_CHARS: usize = 12_000;

static ANSI_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1B\[[0-9;?]*[ -/]*[@-~]").expect("Invalid regex"));

/// Strip ANSI escapes and control characters, keeping newlines and tabs.
pub fn sanitize_diff(diff: &str) -> String {
    let without_ansi = ANSI_ESCAPE.replace_all(diff, "");
    without_ansi
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

/// Cut `diff` at a line boundary so it fits in `max_chars`.
///
/// When anything is dropped a marker line reports how many lines and how
/// many further files were left out.
pub fn truncate_diff(diff: &str, max_chars: usize) -> String {
    if diff.len() <= max_chars {
        return diff.to_string();
    }

    let mut kept = String::with_capacity(max_chars);
    let mut lines = diff.lines();
    for line in lines.by_ref() {
        if kept.len() + line.len() + 1 > max_chars {
            let rest: Vec<&str> = std::iter::once(line).chain(lines).collect();
            let omitted_files = rest.iter().filter(|l| starts_file(l)).count();
            kept.push_str(&format!(
                "\n[... diff truncated: {} more line{} omitted, {} more file{} not shown ...]\n",
                rest.len(),
                if rest.len() == 1 { "" } else { "s" },
                omitted_files,
                if omitted_files == 1 { "" } else { "s" },
            ));
            return kept;
        }
        kept.push_str(line);
        kept.push('\n');
    }
    kept
}

fn starts_file(line: &str) -> bool {
    line.starts_with("diff --git ") || line.starts_with("new untracked file: ")
}

/// Build the full prompt: system prompt, optional context, change summary, diff.
pub fn build_commit_prompt(system: &str, context: Option<&str>, changes: &ChangeSet) -> String {
    let diff = truncate_diff(&sanitize_diff(&changes.diff), MAX_DIFF_CHARS);

    let mut prompt = String::with_capacity(system.len() + diff.len() + 512);
    prompt.push_str(system.trim_end());
    prompt.push_str("\n\n");

    if let Some(context) = context.map(str::trim).filter(|c| !c.is_empty()) {
        prompt.push_str("## Context\n");
        prompt.push_str(context);
        prompt.push_str("\n\n");
    }

    prompt.push_str(&format!(
        "## Changes ({}, {})\n{}\n\n",
        changes.stats,
        if changes.staged { "staged" } else { "not staged" },
        changes.file_summary
    ));

    prompt.push_str("## Diff\n```diff\n");
    prompt.push_str(diff.trim_end());
    prompt.push_str("\n```\n");
    prompt
}
