//! Conversion between LaTeX escapes and Unicode text.
//!
//! Decoding understands accent commands (`\"o`, `{\"o}`, `\c{c}`), the
//! usual special letters (`\ss`, `\o`, `\ae`, ...), escaped reserved
//! characters and a handful of text formatting macros whose argument is
//! kept. Unknown macros are left untouched. Braced groups holding fewer
//! than two characters lose their braces; longer groups keep them.
//!
//! Encoding only touches non-ASCII characters and wraps every
//! replacement in braces (`ö` becomes `{\"o}`). Characters without a known
//! replacement are kept as they are.

/// Accent commands made of a single symbol.
const SYMBOL_ACCENTS: &str = "`'^\"~=.";

/// Accent commands spelled as a letter, taking an argument.
const LETTER_ACCENTS: &[&str] = &["u", "r", "H", "v", "c", "k", "d"];

/// Combining marks used when no precomposed character exists.
const COMBINING: &[(char, char)] = &[
    ('`', '\u{0300}'),
    ('\'', '\u{0301}'),
    ('^', '\u{0302}'),
    ('~', '\u{0303}'),
    ('=', '\u{0304}'),
    ('u', '\u{0306}'),
    ('.', '\u{0307}'),
    ('"', '\u{0308}'),
    ('r', '\u{030A}'),
    ('H', '\u{030B}'),
    ('v', '\u{030C}'),
    ('c', '\u{0327}'),
    ('k', '\u{0328}'),
    ('d', '\u{0323}'),
];

/// Macros producing a single letter.
const SPECIAL_LETTERS: &[(&str, char)] = &[
    ("ss", 'ß'),
    ("o", 'ø'),
    ("O", 'Ø'),
    ("ae", 'æ'),
    ("AE", 'Æ'),
    ("oe", 'œ'),
    ("OE", 'Œ'),
    ("aa", 'å'),
    ("AA", 'Å'),
    ("l", 'ł'),
    ("L", 'Ł'),
    ("i", 'ı'),
    ("j", 'ȷ'),
];

/// Macros whose argument is kept and whose command is dropped.
const FORMATTING: &[&str] = &[
    "emph", "textbf", "textit", "texttt", "textsc", "textrm", "textsf", "textsl", "textup", "mbox",
];

/// Characters that are escaped with a plain backslash.
const ESCAPED: &str = "&%$_#{}";

/// `(accent, base, composed)` for every precomposed Latin letter.
const COMPOSED: &[(char, char, char)] = &[
    ('`', 'a', 'à'), ('`', 'e', 'è'), ('`', 'i', 'ì'), ('`', 'n', 'ǹ'),
    ('`', 'o', 'ò'), ('`', 'u', 'ù'), ('`', 'w', 'ẁ'), ('`', 'y', 'ỳ'),
    ('`', 'A', 'À'), ('`', 'E', 'È'), ('`', 'I', 'Ì'), ('`', 'N', 'Ǹ'),
    ('`', 'O', 'Ò'), ('`', 'U', 'Ù'), ('`', 'W', 'Ẁ'), ('`', 'Y', 'Ỳ'),
    ('\'', 'a', 'á'), ('\'', 'c', 'ć'), ('\'', 'e', 'é'), ('\'', 'g', 'ǵ'),
    ('\'', 'i', 'í'), ('\'', 'k', 'ḱ'), ('\'', 'l', 'ĺ'), ('\'', 'm', 'ḿ'),
    ('\'', 'n', 'ń'), ('\'', 'o', 'ó'), ('\'', 'p', 'ṕ'), ('\'', 'r', 'ŕ'),
    ('\'', 's', 'ś'), ('\'', 'u', 'ú'), ('\'', 'w', 'ẃ'), ('\'', 'y', 'ý'),
    ('\'', 'z', 'ź'), ('\'', 'A', 'Á'), ('\'', 'C', 'Ć'), ('\'', 'E', 'É'),
    ('\'', 'G', 'Ǵ'), ('\'', 'I', 'Í'), ('\'', 'K', 'Ḱ'), ('\'', 'L', 'Ĺ'),
    ('\'', 'M', 'Ḿ'), ('\'', 'N', 'Ń'), ('\'', 'O', 'Ó'), ('\'', 'P', 'Ṕ'),
    ('\'', 'R', 'Ŕ'), ('\'', 'S', 'Ś'), ('\'', 'U', 'Ú'), ('\'', 'W', 'Ẃ'),
    ('\'', 'Y', 'Ý'), ('\'', 'Z', 'Ź'),
    ('^', 'a', 'â'), ('^', 'c', 'ĉ'), ('^', 'e', 'ê'), ('^', 'g', 'ĝ'),
    ('^', 'h', 'ĥ'), ('^', 'i', 'î'), ('^', 'j', 'ĵ'), ('^', 'o', 'ô'),
    ('^', 's', 'ŝ'), ('^', 'u', 'û'), ('^', 'w', 'ŵ'), ('^', 'y', 'ŷ'),
    ('^', 'z', 'ẑ'), ('^', 'A', 'Â'), ('^', 'C', 'Ĉ'), ('^', 'E', 'Ê'),
    ('^', 'G', 'Ĝ'), ('^', 'H', 'Ĥ'), ('^', 'I', 'Î'), ('^', 'J', 'Ĵ'),
    ('^', 'O', 'Ô'), ('^', 'S', 'Ŝ'), ('^', 'U', 'Û'), ('^', 'W', 'Ŵ'),
    ('^', 'Y', 'Ŷ'), ('^', 'Z', 'Ẑ'),
    ('~', 'a', 'ã'), ('~', 'e', 'ẽ'), ('~', 'i', 'ĩ'), ('~', 'n', 'ñ'),
    ('~', 'o', 'õ'), ('~', 'u', 'ũ'), ('~', 'v', 'ṽ'), ('~', 'y', 'ỹ'),
    ('~', 'A', 'Ã'), ('~', 'E', 'Ẽ'), ('~', 'I', 'Ĩ'), ('~', 'N', 'Ñ'),
    ('~', 'O', 'Õ'), ('~', 'U', 'Ũ'), ('~', 'V', 'Ṽ'), ('~', 'Y', 'Ỹ'),
    ('=', 'a', 'ā'), ('=', 'e', 'ē'), ('=', 'g', 'ḡ'), ('=', 'i', 'ī'),
    ('=', 'o', 'ō'), ('=', 'u', 'ū'), ('=', 'y', 'ȳ'), ('=', 'A', 'Ā'),
    ('=', 'E', 'Ē'), ('=', 'G', 'Ḡ'), ('=', 'I', 'Ī'), ('=', 'O', 'Ō'),
    ('=', 'U', 'Ū'), ('=', 'Y', 'Ȳ'),
    ('u', 'a', 'ă'), ('u', 'e', 'ĕ'), ('u', 'g', 'ğ'), ('u', 'i', 'ĭ'),
    ('u', 'o', 'ŏ'), ('u', 'u', 'ŭ'), ('u', 'A', 'Ă'), ('u', 'E', 'Ĕ'),
    ('u', 'G', 'Ğ'), ('u', 'I', 'Ĭ'), ('u', 'O', 'Ŏ'), ('u', 'U', 'Ŭ'),
    ('.', 'a', 'ȧ'), ('.', 'b', 'ḃ'), ('.', 'c', 'ċ'), ('.', 'd', 'ḋ'),
    ('.', 'e', 'ė'), ('.', 'f', 'ḟ'), ('.', 'g', 'ġ'), ('.', 'h', 'ḣ'),
    ('.', 'm', 'ṁ'), ('.', 'n', 'ṅ'), ('.', 'o', 'ȯ'), ('.', 'p', 'ṗ'),
    ('.', 'r', 'ṙ'), ('.', 's', 'ṡ'), ('.', 't', 'ṫ'), ('.', 'w', 'ẇ'),
    ('.', 'x', 'ẋ'), ('.', 'y', 'ẏ'), ('.', 'z', 'ż'), ('.', 'A', 'Ȧ'),
    ('.', 'B', 'Ḃ'), ('.', 'C', 'Ċ'), ('.', 'D', 'Ḋ'), ('.', 'E', 'Ė'),
    ('.', 'F', 'Ḟ'), ('.', 'G', 'Ġ'), ('.', 'H', 'Ḣ'), ('.', 'I', 'İ'),
    ('.', 'M', 'Ṁ'), ('.', 'N', 'Ṅ'), ('.', 'O', 'Ȯ'), ('.', 'P', 'Ṗ'),
    ('.', 'R', 'Ṙ'), ('.', 'S', 'Ṡ'), ('.', 'T', 'Ṫ'), ('.', 'W', 'Ẇ'),
    ('.', 'X', 'Ẋ'), ('.', 'Y', 'Ẏ'), ('.', 'Z', 'Ż'),
    ('"', 'a', 'ä'), ('"', 'e', 'ë'), ('"', 'h', 'ḧ'), ('"', 'i', 'ï'),
    ('"', 'o', 'ö'), ('"', 't', 'ẗ'), ('"', 'u', 'ü'), ('"', 'w', 'ẅ'),
    ('"', 'x', 'ẍ'), ('"', 'y', 'ÿ'), ('"', 'A', 'Ä'), ('"', 'E', 'Ë'),
    ('"', 'H', 'Ḧ'), ('"', 'I', 'Ï'), ('"', 'O', 'Ö'), ('"', 'U', 'Ü'),
    ('"', 'W', 'Ẅ'), ('"', 'X', 'Ẍ'), ('"', 'Y', 'Ÿ'),
    ('r', 'a', 'å'), ('r', 'u', 'ů'), ('r', 'w', 'ẘ'), ('r', 'y', 'ẙ'),
    ('r', 'A', 'Å'), ('r', 'U', 'Ů'),
    ('H', 'o', 'ő'), ('H', 'u', 'ű'), ('H', 'O', 'Ő'), ('H', 'U', 'Ű'),
    ('v', 'a', 'ǎ'), ('v', 'c', 'č'), ('v', 'd', 'ď'), ('v', 'e', 'ě'),
    ('v', 'g', 'ǧ'), ('v', 'h', 'ȟ'), ('v', 'i', 'ǐ'), ('v', 'j', 'ǰ'),
    ('v', 'k', 'ǩ'), ('v', 'l', 'ľ'), ('v', 'n', 'ň'), ('v', 'o', 'ǒ'),
    ('v', 'r', 'ř'), ('v', 's', 'š'), ('v', 't', 'ť'), ('v', 'u', 'ǔ'),
    ('v', 'z', 'ž'), ('v', 'A', 'Ǎ'), ('v', 'C', 'Č'), ('v', 'D', 'Ď'),
    ('v', 'E', 'Ě'), ('v', 'G', 'Ǧ'), ('v', 'H', 'Ȟ'), ('v', 'I', 'Ǐ'),
    ('v', 'K', 'Ǩ'), ('v', 'L', 'Ľ'), ('v', 'N', 'Ň'), ('v', 'O', 'Ǒ'),
    ('v', 'R', 'Ř'), ('v', 'S', 'Š'), ('v', 'T', 'Ť'), ('v', 'U', 'Ǔ'),
    ('v', 'Z', 'Ž'),
    ('c', 'c', 'ç'), ('c', 'd', 'ḑ'), ('c', 'e', 'ȩ'), ('c', 'g', 'ģ'),
    ('c', 'h', 'ḩ'), ('c', 'k', 'ķ'), ('c', 'l', 'ļ'), ('c', 'n', 'ņ'),
    ('c', 'r', 'ŗ'), ('c', 's', 'ş'), ('c', 't', 'ţ'), ('c', 'C', 'Ç'),
    ('c', 'D', 'Ḑ'), ('c', 'E', 'Ȩ'), ('c', 'G', 'Ģ'), ('c', 'H', 'Ḩ'),
    ('c', 'K', 'Ķ'), ('c', 'L', 'Ļ'), ('c', 'N', 'Ņ'), ('c', 'R', 'Ŗ'),
    ('c', 'S', 'Ş'), ('c', 'T', 'Ţ'),
    ('k', 'a', 'ą'), ('k', 'e', 'ę'), ('k', 'i', 'į'), ('k', 'o', 'ǫ'),
    ('k', 'u', 'ų'), ('k', 'A', 'Ą'), ('k', 'E', 'Ę'), ('k', 'I', 'Į'),
    ('k', 'O', 'Ǫ'), ('k', 'U', 'Ų'),
    ('d', 'a', 'ạ'), ('d', 'b', 'ḅ'), ('d', 'd', 'ḍ'), ('d', 'e', 'ẹ'),
    ('d', 'h', 'ḥ'), ('d', 'i', 'ị'), ('d', 'k', 'ḳ'), ('d', 'l', 'ḷ'),
    ('d', 'm', 'ṃ'), ('d', 'n', 'ṇ'), ('d', 'o', 'ọ'), ('d', 'r', 'ṛ'),
    ('d', 's', 'ṣ'), ('d', 't', 'ṭ'), ('d', 'u', 'ụ'), ('d', 'v', 'ṿ'),
    ('d', 'w', 'ẉ'), ('d', 'y', 'ỵ'), ('d', 'z', 'ẓ'), ('d', 'A', 'Ạ'),
    ('d', 'B', 'Ḅ'), ('d', 'D', 'Ḍ'), ('d', 'E', 'Ẹ'), ('d', 'H', 'Ḥ'),
    ('d', 'I', 'Ị'), ('d', 'K', 'Ḳ'), ('d', 'L', 'Ḷ'), ('d', 'M', 'Ṃ'),
    ('d', 'N', 'Ṇ'), ('d', 'O', 'Ọ'), ('d', 'R', 'Ṛ'), ('d', 'S', 'Ṣ'),
    ('d', 'T', 'Ṭ'), ('d', 'U', 'Ụ'), ('d', 'V', 'Ṿ'), ('d', 'W', 'Ẉ'),
    ('d', 'Y', 'Ỵ'), ('d', 'Z', 'Ẓ'),
];

/// Decode LaTeX escapes into Unicode.
pub fn decode(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut decoder = Decoder { chars, pos: 0 };
    decoder.sequence(false).0
}

/// Encode non-ASCII characters as brace-protected LaTeX escapes.
pub fn encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if c.is_ascii() {
            out.push(c);
        } else if let Some((accent, base)) = decompose(c) {
            if SYMBOL_ACCENTS.contains(accent) {
                out.push_str(&format!("{{\\{}{}}}", accent, base));
            } else {
                out.push_str(&format!("{{\\{}{{{}}}}}", accent, base));
            }
        } else if let Some((name, _)) = SPECIAL_LETTERS.iter().find(|(_, letter)| *letter == c) {
            out.push_str(&format!("{{\\{}}}", name));
        } else {
            out.push(c);
        }
    }
    out
}

fn compose(accent: char, base: &str) -> String {
    let mut base_chars = base.chars();
    if let (Some(mut b), None) = (base_chars.next(), base_chars.next()) {
        if b == 'ı' {
            b = 'i';
        }
        if let Some((_, _, composed)) = COMPOSED
            .iter()
            .find(|(a, letter, _)| *a == accent && *letter == b)
        {
            return composed.to_string();
        }
    }

    let mut out = base.to_string();
    if let Some((_, mark)) = COMBINING.iter().find(|(a, _)| *a == accent) {
        out.push(*mark);
    }
    out
}

fn decompose(c: char) -> Option<(char, char)> {
    COMPOSED
        .iter()
        .find(|(_, _, composed)| *composed == c)
        .map(|(accent, base, _)| (*accent, *base))
}

struct Decoder {
    chars: Vec<char>,
    pos: usize,
}

impl Decoder {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    /// Decode until the end of input, or the closing brace of a group.
    /// The flag tells whether a closing brace ended the sequence.
    fn sequence(&mut self, in_group: bool) -> (String, bool) {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            match c {
                '\\' => {
                    self.pos += 1;
                    out.push_str(&self.command());
                }
                '{' => {
                    self.pos += 1;
                    let (content, closed) = self.sequence(true);
                    if !closed {
                        out.push('{');
                        out.push_str(&content);
                    } else if content.chars().count() < 2 {
                        out.push_str(&content);
                    } else {
                        out.push('{');
                        out.push_str(&content);
                        out.push('}');
                    }
                }
                '}' if in_group => {
                    self.pos += 1;
                    return (out, true);
                }
                _ => {
                    self.pos += 1;
                    out.push(c);
                }
            }
        }
        (out, false)
    }

    /// Decode the command following a backslash.
    fn command(&mut self) -> String {
        let Some(c) = self.peek() else {
            return "\\".to_string();
        };

        if SYMBOL_ACCENTS.contains(c) {
            self.pos += 1;
            let arg = self.argument();
            return compose(c, &arg);
        }
        if ESCAPED.contains(c) {
            self.pos += 1;
            return c.to_string();
        }
        if !c.is_ascii_alphabetic() {
            self.pos += 1;
            return format!("\\{}", c);
        }

        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
            self.pos += 1;
        }
        let name: String = self.chars[start..self.pos].iter().collect();

        if LETTER_ACCENTS.contains(&name.as_str()) {
            self.skip_whitespace();
            let arg = self.argument();
            let accent = name.chars().next().unwrap_or_default();
            return compose(accent, &arg);
        }
        if let Some((_, letter)) = SPECIAL_LETTERS.iter().find(|(n, _)| *n == name) {
            self.skip_whitespace();
            if self.chars.get(self.pos) == Some(&'{') && self.chars.get(self.pos + 1) == Some(&'}')
            {
                self.pos += 2;
            }
            return letter.to_string();
        }
        if FORMATTING.contains(&name.as_str()) {
            let gap = self.pos;
            self.skip_whitespace();
            if self.peek() == Some('{') {
                self.pos += 1;
                let opening: String = self.chars[gap..self.pos].iter().collect();
                let (content, closed) = self.sequence(true);
                if closed {
                    return content;
                }
                return format!("\\{}{}{}", name, opening, content);
            }
        }
        format!("\\{}", name)
    }

    /// A braced group or a single (possibly escaped) character.
    fn argument(&mut self) -> String {
        match self.peek() {
            Some('{') => {
                self.pos += 1;
                self.sequence(true).0
            }
            Some('\\') => {
                self.pos += 1;
                self.command()
            }
            Some(c) => {
                self.pos += 1;
                c.to_string()
            }
            None => String::new(),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_accents() {
        assert_eq!(decode(r#"K{\"o}rper"#), "Körper");
        assert_eq!(decode(r#"K\"orper"#), "Körper");
        assert_eq!(decode(r#"K\"{o}rper"#), "Körper");
        assert_eq!(decode(r"Fran\c{c}ois"), "François");
        assert_eq!(decode(r"Erd\H{o}s"), "Erdős");
        assert_eq!(decode(r"\'{\i}"), "í");
    }

    #[test]
    fn test_decode_specials() {
        assert_eq!(decode(r"Stra{\ss}e"), "Straße");
        assert_eq!(decode(r"Stra\ss e"), "Straße");
        assert_eq!(decode(r"{\O}rsted"), "Ørsted");
        assert_eq!(decode(r"Smith \& Sons, 50\%"), "Smith & Sons, 50%");
    }

    #[test]
    fn test_decode_groups_and_macros() {
        assert_eq!(decode("{Acme Corp.}"), "{Acme Corp.}");
        assert_eq!(decode(r"\emph{very} good"), "very good");
        assert_eq!(decode(r"\unknown{x}"), r"\unknown{x}");
        assert_eq!(decode("plain text"), "plain text");
        assert_eq!(decode(r#" title = {K{\"o}rper"#), " title = {Körper");
    }

    #[test]
    fn test_decode_unterminated_macro() {
        assert_eq!(decode(r"\emph{"), r"\emph{");
        assert_eq!(decode(r"see \textbf {bold text"), r"see \textbf {bold text");
        assert_eq!(decode(r#"\emph{K\"orper"#), r"\emph{Körper");
    }

    #[test]
    fn test_encode() {
        assert_eq!(encode("Körper"), r#"K{\"o}rper"#);
        assert_eq!(encode("François"), r"Fran{\c{c}}ois");
        assert_eq!(encode("Straße"), r"Stra{\ss}e");
        assert_eq!(encode("Smith & Sons"), "Smith & Sons");
        assert_eq!(encode("日本"), "日本");
    }

    #[test]
    fn test_encode_then_decode() {
        for text in ["Körper", "Erdős", "Ørsted", "Dvořák"] {
            assert_eq!(decode(&encode(text)), text);
        }
    }
}
