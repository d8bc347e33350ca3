//! Built-in system prompts and the custom prompt file.

use std::path::Path;

use tracing::debug;

use crate::config::{PromptTemplate, ResolvedConfig};

const DEFAULT_PROMPT: &str = r#"You are an expert software engineer writing a git commit message for the changes below.

Rules:
- First line: a concise summary in the imperative mood ("Add", "Fix", "Remove"), at most 72 characters, no trailing period.
- If the change needs explanation, add a blank line and a short body explaining why the change was made.
- Describe the intent of the change, not a file-by-file list.
- Output ONLY the commit message. No preamble, no quotes, no code fences."#;

const CONVENTIONAL_PROMPT: &str = r#"You are an expert software engineer writing a git commit message that follows the Conventional Commits specification.

Rules:
- Subject format: `type(scope): description`
- Type is one of: feat, fix, build, chore, ci, docs, style, refactor, perf, test
- Scope is optional; infer it from the primary module affected.
- Description: imperative mood, lowercase after the colon, no trailing period, whole subject at most 72 characters.
- Add `!` after the type/scope and a `BREAKING CHANGE:` footer when the change breaks compatibility.
- Optional body after a blank line explaining why the change was made.
- Output ONLY the commit message. No preamble, no quotes, no code fences."#;

const SIMPLE_PROMPT: &str = r#"Write a single-line git commit message (at most 72 characters, imperative mood, no trailing period) summarizing the changes below.
Output ONLY the commit message."#;

const DETAILED_PROMPT: &str = r#"You are an expert software engineer writing a thorough git commit message for the changes below.

Rules:
- First line: a concise summary in the imperative mood, at most 72 characters, no trailing period.
- Then a blank line.
- Then a body wrapped at 72 characters that explains what problem the change solves, why this approach was chosen, and any side effects reviewers should know about.
- Use a bulleted list in the body when the change touches several unrelated areas.
- Output ONLY the commit message. No preamble, no quotes, no code fences."#;

const EMOJI_ON: &str = "Start the subject line with a single relevant gitmoji (for example ✨ for features, 🐛 for fixes, 📝 for docs).";
const EMOJI_OFF: &str = "Do not use emojis.";

/// Built-in text for a template.
pub fn builtin_prompt(template: PromptTemplate) -> &'static str {
    match template {
        PromptTemplate::Default => DEFAULT_PROMPT,
        PromptTemplate::Conventional => CONVENTIONAL_PROMPT,
        PromptTemplate::Simple => SIMPLE_PROMPT,
        PromptTemplate::Detailed => DETAILED_PROMPT,
    }
}

/// Contents of the custom prompt file, if it exists and is non-empty.
pub fn custom_prompt(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(content) if !content.trim().is_empty() => {
            debug!("Using custom prompt from {}", path.display());
            Some(content.trim().to_string())
        }
        Ok(_) => None,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                debug!("Could not read prompt file {}: {}", path.display(), e);
            }
            None
        }
    }
}

/// System prompt for a run: the custom file when present, else the
/// configured template, followed by the emoji instruction.
pub fn system_prompt(config: &ResolvedConfig) -> String {
    let base = custom_prompt(&config.prompt_file)
        .unwrap_or_else(|| builtin_prompt(config.prompt_template).to_string());
    let emoji = if config.use_emojis { EMOJI_ON } else { EMOJI_OFF };
    format!("{}\n\n{}", base, emoji)
}
