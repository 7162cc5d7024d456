//! ASCII approximation of Unicode text.
//!
//! Accented letters are decomposed (NFKD) and their combining marks
//! dropped. Letters without a decomposition and common typographic
//! punctuation are replaced from a small table. Anything else outside
//! ASCII is kept.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

const REPLACEMENTS: &[(char, &str)] = &[
    ('ß', "ss"),
    ('ẞ', "SS"),
    ('æ', "ae"),
    ('Æ', "AE"),
    ('œ', "oe"),
    ('Œ', "OE"),
    ('ø', "o"),
    ('Ø', "O"),
    ('ł', "l"),
    ('Ł', "L"),
    ('đ', "d"),
    ('Đ', "D"),
    ('ð', "d"),
    ('Ð', "D"),
    ('þ', "th"),
    ('Þ', "Th"),
    ('ı', "i"),
    ('ȷ', "j"),
    ('‐', "-"),
    ('‑', "-"),
    ('‒', "-"),
    ('–', "-"),
    ('—', "-"),
    ('‘', "'"),
    ('’', "'"),
    ('‚', ","),
    ('“', "\""),
    ('”', "\""),
    ('„', "\""),
    ('«', "\""),
    ('»', "\""),
];

/// Approximate `input` with ASCII characters.
pub fn fold(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.nfkd() {
        if c.is_ascii() {
            out.push(c);
        } else if is_combining_mark(c) {
            continue;
        } else if let Some((_, replacement)) = REPLACEMENTS.iter().find(|(from, _)| *from == c) {
            out.push_str(replacement);
        } else {
            out.push(c);
        }
    }
    out
}
