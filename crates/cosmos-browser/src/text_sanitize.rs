//! Makes upstream text safe to paint into a terminal cell.
//!
//! Titles and dates come straight from a public API; an embedded escape
//! sequence would otherwise move the cursor, retitle the window, or recolour
//! the rest of the screen.

use std::iter::Peekable;
use std::str::Chars;

pub const MAX_FIELD_CHARS: usize = 512;

const ESC: char = '\x1b';
const BEL: char = '\x07';

/// Strips escape sequences and control characters, folds runs of whitespace
/// (including newlines) into one space, and caps the result at `max_chars`.
pub fn sanitize_field(input: &str, max_chars: usize) -> String {
    let mut out = String::with_capacity(input.len().min(max_chars));
    let mut count = 0usize;
    let mut pending_space = false;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == ESC {
            skip_escape(&mut chars);
            continue;
        }
        if c.is_whitespace() {
            pending_space = count > 0;
            continue;
        }
        if c.is_control() || is_bidi_control(c) {
            continue;
        }
        if count >= max_chars {
            out.push('…');
            return out;
        }
        if pending_space {
            out.push(' ');
            count += 1;
            pending_space = false;
        }
        out.push(c);
        count += 1;
    }
    out
}

pub fn sanitize(input: &str) -> String {
    sanitize_field(input, MAX_FIELD_CHARS)
}

/// Consumes the remainder of a sequence whose ESC was already read.
fn skip_escape(chars: &mut Peekable<Chars<'_>>) {
    match chars.next() {
        // CSI: parameters then a final byte in '@'..='~'.
        Some('[') => {
            for c in chars.by_ref() {
                if ('@'..='~').contains(&c) {
                    break;
                }
            }
        }
        // OSC: ends at BEL or ST.
        Some(']') => skip_until_terminator(chars, true),
        // DCS, SOS, PM, APC: end at ST only.
        Some('P' | 'X' | '^' | '_') => skip_until_terminator(chars, false),
        // Two-character sequence (or a lone ESC at the end).
        _ => {}
    }
}

fn skip_until_terminator(chars: &mut Peekable<Chars<'_>>, bel_ends: bool) {
    while let Some(c) = chars.next() {
        if bel_ends && c == BEL {
            return;
        }
        if c == ESC && chars.peek() == Some(&'\\') {
            chars.next();
            return;
        }
    }
}

fn is_bidi_control(c: char) -> bool {
    matches!(c, '\u{061C}' | '\u{200E}' | '\u{200F}')
        || ('\u{202A}'..='\u{202E}').contains(&c)
        || ('\u{2066}'..='\u{2069}').contains(&c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_csi_and_osc_sequences() {
        let input = "Mars \u{1b}[31mred\u{1b}[0m \u{1b}]0;pwned\u{7}planet";
        assert_eq!(sanitize(input), "Mars red planet");
    }

    #[test]
    fn strips_string_terminated_sequences() {
        assert_eq!(sanitize("a\u{1b}Ppayload\u{1b}\\b"), "ab");
    }

    #[test]
    fn folds_whitespace_and_drops_bidi_controls() {
        assert_eq!(sanitize("  Apollo\t11\r\n\n launch\u{202e} "), "Apollo 11 launch");
    }

    #[test]
    fn caps_long_fields() {
        assert_eq!(sanitize_field("abcdef", 3), "abc…");
        assert_eq!(sanitize_field("abc", 3), "abc");
    }
}
