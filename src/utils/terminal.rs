//! Terminal output sanitization
//!
//! Error messages and session ids shown by `status` originate from third-party
//! files. They are stripped of escape sequences and flattened to one line
//! before printing.

/// Strips ANSI CSI escape sequences and control characters (except tab,
/// newline and carriage return)
///
/// # Examples
///
/// ```
/// use ai_session_sync::utils::strip_ansi_codes;
///
/// assert_eq!(strip_ansi_codes("\x1b[31mRed text\x1b[0m"), "Red text");
/// ```
pub fn strip_ansi_codes(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            // CSI sequences end at the first letter
            while let Some(next_ch) = chars.next() {
                if next_ch.is_ascii_alphabetic() {
                    break;
                }
            }
            continue;
        }

        if ch.is_control() && ch != '\t' && ch != '\n' && ch != '\r' {
            continue;
        }

        result.push(ch);
    }

    result
}

/// Sanitizes `text` for a single report line, truncating to `max_chars`
pub fn single_line(text: &str, max_chars: usize) -> String {
    let cleaned = strip_ansi_codes(text);
    let flattened = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    if flattened.chars().count() <= max_chars {
        return flattened;
    }

    let mut truncated: String = flattened.chars().take(max_chars.saturating_sub(1)).collect();
    truncated.push('…');
    truncated
}
