//! Text cleanup shared by every free-text field of a dictionary entry.

use once_cell::sync::Lazy;
use regex::Regex;

/// Control, format, unassigned, private-use and separator characters.
static NON_PRINTABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\p{C}\p{Z}]$").expect("static regex"));

/// The escaped line break left behind by [`render_listing`].
pub const ESCAPED_LINE_BREAK: &str = r"\r\n";

/// Drops apostrophes, maps full-width quotes and parentheses to ASCII and
/// strips escaped line breaks. Applying it twice changes nothing.
pub fn normalize(text: &str) -> String {
    let mut cleaned: String = text
        .chars()
        .filter(|c| *c != '\'')
        .map(|c| match c {
            '“' | '”' => '"',
            '（' => '(',
            '）' => ')',
            other => other,
        })
        .collect();

    // Removing one marker can join the halves of another
    while cleaned.contains(ESCAPED_LINE_BREAK) {
        cleaned = cleaned.replace(ESCAPED_LINE_BREAK, "");
    }
    cleaned
}

/// Renders text nodes as `['first', 'second']`: every node quoted and every
/// non-printable character other than a plain space escaped. Detailed definitions are cut out of
/// this form by character offset, so the layout must stay stable.
pub fn render_listing<S: AsRef<str>>(nodes: &[S]) -> String {
    let quoted: Vec<String> = nodes.iter().map(|n| quote(n.as_ref())).collect();
    format!("[{}]", quoted.join(", "))
}

fn quote(text: &str) -> String {
    let delimiter = if text.contains('\'') && !text.contains('"') {
        '"'
    } else {
        '\''
    };

    let mut out = String::with_capacity(text.len() + 2);
    out.push(delimiter);
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == delimiter => {
                out.push('\\');
                out.push(c);
            }
            c if c != ' ' && is_non_printable(c) => {
                let code = c as u32;
                if code <= 0xff {
                    out.push_str(&format!("\\x{:02x}", code));
                } else if code <= 0xffff {
                    out.push_str(&format!("\\u{:04x}", code));
                } else {
                    out.push_str(&format!("\\U{:08x}", code));
                }
            }
            c => out.push(c),
        }
    }
    out.push(delimiter);
    out
}

fn is_non_printable(c: char) -> bool {
    let mut buf = [0u8; 4];
    NON_PRINTABLE.is_match(c.encode_utf8(&mut buf))
}

/// Character offset of `needle` in `haystack`, or -1 when absent.
pub fn char_find(haystack: &[char], needle: &str) -> isize {
    let needle: Vec<char> = needle.chars().collect();
    if needle.is_empty() {
        return 0;
    }
    haystack
        .windows(needle.len())
        .position(|w| w == needle.as_slice())
        .map_or(-1, |i| i as isize)
}

/// Characters in `[start, end)`. Negative bounds count back from the end,
/// out-of-range bounds are clamped and an inverted window is empty.
pub fn char_window(chars: &[char], start: isize, end: isize) -> String {
    let len = chars.len() as isize;
    let clamp = |i: isize| -> usize {
        let i = if i < 0 { i + len } else { i };
        i.clamp(0, len) as usize
    };
    let (start, end) = (clamp(start), clamp(end));
    if start >= end {
        return String::new();
    }
    chars[start..end].iter().collect()
}
