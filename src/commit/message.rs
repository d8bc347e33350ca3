//! Commit message cleanup and the printable commit command.

use std::sync::LazyLock;

use regex_lite::Regex;

use crate::error::ModelError;

static THINK_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("Invalid regex"));

/// Turn a raw model response into a commit message.
///
/// Removes reasoning blocks, a wrapping code fence, and wrapping quotes.
/// An empty result is an [`ModelError::EmptyResponse`].
pub fn clean_message(raw: &str) -> Result<String, ModelError> {
    let without_think = THINK_BLOCK.replace_all(raw, "");
    let mut message = without_think.trim();

    // An unterminated reasoning block swallows everything after it.
    if let Some(idx) = message.find("<think>") {
        message = message[..idx].trim();
    }

    let message = strip_code_fence(message);
    let message = strip_quotes(message);

    if message.is_empty() {
        return Err(ModelError::EmptyResponse);
    }
    Ok(message.to_string())
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let Some(inner) = rest.strip_suffix("```") else {
        return text;
    };
    // Drop the language tag on the opening fence line, if any.
    match inner.split_once('\n') {
        Some((first, body)) if !first.trim().contains(' ') => body.trim(),
        _ => inner.trim(),
    }
}

fn strip_quotes(text: &str) -> &str {
    for quote in ['"', '\'', '`'] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            return text[1..text.len() - 1].trim();
        }
    }
    text
}

/// Shell command that commits `message`, for printing in non-interactive mode.
pub fn commit_command(message: &str, staged: bool) -> String {
    let escaped = message.replace('\'', r"'\''");
    if staged {
        format!("git commit -m '{}'", escaped)
    } else {
        format!("git add -A && git commit -m '{}'", escaped)
    }
}
