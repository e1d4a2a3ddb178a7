//! Operational markers embedded in transcript text
//!
//! Assistant runtimes inject tagged blocks (`<system-reminder>`,
//! `<environment_context>`, ...) into user turns. They are never part of an
//! emitted message, but reminder blocks sometimes carry a directory listing
//! whose root line is the only record of the project directory.
//!
//! [`extract_project_path`] is the single home of that heuristic.

use std::sync::LazyLock;

use regex::Regex;

use crate::utils::canonical_project_path;

pub const SYSTEM_REMINDER_TAG: &str = "system-reminder";

static REMINDER_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<system-reminder>(.*?)</system-reminder>").expect("valid reminder regex")
});

// Root line of a tree listing: "- /abs/path/"
static LISTING_ROOT_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-\s+(/\S.*?)\s*$").expect("valid listing regex"));

fn tagged_block(tag: &str) -> Regex {
    let tag = regex::escape(tag);
    Regex::new(&format!(r"(?s)<{tag}>(.*?)</{tag}>")).expect("escaped tag forms a valid regex")
}

/// Recovers a project directory from a directory listing inside reminder blocks
///
/// Scans every `<system-reminder>` block in order and returns the first
/// listing root line that is a valid absolute path.
///
/// # Examples
///
/// ```
/// use ai_session_sync::parsers::markers::extract_project_path;
///
/// let text = "<system-reminder>\nResult of the listing:\n- /Users/me/app/\n  - src/\n</system-reminder>hi";
/// assert_eq!(extract_project_path(text).as_deref(), Some("/Users/me/app"));
/// ```
pub fn extract_project_path(text: &str) -> Option<String> {
    REMINDER_BLOCK
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .flat_map(|block| block.as_str().lines())
        .filter_map(|line| LISTING_ROOT_LINE.captures(line.trim_end()))
        .filter_map(|caps| caps.get(1))
        .find_map(|path| canonical_project_path(path.as_str()))
}

/// Removes every `<system-reminder>` block and trims the remainder
pub fn strip_reminders(text: &str) -> String {
    REMINDER_BLOCK.replace_all(text, "").trim().to_string()
}

/// Removes every `<tag>...</tag>` block and trims the remainder
pub fn strip_tagged_blocks(text: &str, tag: &str) -> String {
    if !text.contains(&format!("<{}>", tag)) {
        return text.trim().to_string();
    }
    tagged_block(tag).replace_all(text, "").trim().to_string()
}

/// First `<tag>value</tag>` value, trimmed
pub fn extract_tag_value(text: &str, tag: &str) -> Option<String> {
    if !text.contains(&format!("<{}>", tag)) {
        return None;
    }
    tagged_block(tag)
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|v| !v.is_empty())
}
