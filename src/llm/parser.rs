//! Response parsing for LLM outputs.
//!
//! Models often wrap SQL in a markdown code fence even when told not to.
//! The accepted shape is:
//!
//! ```text
//! response := ws* ( fence tag? newline )? body ( fence )? ws*
//! fence    := "```"
//! tag      := a SQL language name alone on the opening line, e.g. "sql"
//! ```
//!
//! Text that does not open with a fence is returned trimmed and otherwise
//! untouched. Any other word on the opening line is kept as part of the body,
//! so a fence opened as "```SELECT" loses nothing.

const FENCE: &str = "```";

/// Language names models put after the opening fence.
const LANGUAGE_TAGS: &[&str] = &[
    "sql", "postgresql", "postgres", "pgsql", "psql", "plpgsql", "sqlite", "sqlite3",
];

/// Removes one surrounding markdown code fence, if present.
pub fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();

    let Some(after_open) = trimmed.strip_prefix(FENCE) else {
        return trimmed;
    };

    let body = match after_open.split_once('\n') {
        Some((first_line, rest)) if is_tag(first_line) => rest,
        Some(_) => after_open,
        None => strip_inline_tag(after_open),
    };

    body.trim()
        .strip_suffix(FENCE)
        .unwrap_or(body)
        .trim()
}

/// True for an empty opening line or one holding only a SQL language name.
fn is_tag(line: &str) -> bool {
    let line = line.trim();
    line.is_empty() || LANGUAGE_TAGS.iter().any(|tag| line.eq_ignore_ascii_case(tag))
}

/// Handles single-line fences such as "```sql SELECT 1```".
fn strip_inline_tag(line: &str) -> &str {
    match line.split_once(char::is_whitespace) {
        Some((word, rest)) if word.eq_ignore_ascii_case("sql") => rest,
        _ => line,
    }
}
