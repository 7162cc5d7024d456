//! Entry labels: validation, disambiguation suffixes and suffix trimming.

use crate::error::{BibError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// Enumerator used to generate disambiguation suffixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LabelSuffix {
    /// `a, b, ..., z, aa, ab, ...`
    #[default]
    Alpha,
    /// `A, B, ..., Z, AA, AB, ...`
    Capital,
    /// `1, 2, 3, ...`
    Numeric,
}

impl LabelSuffix {
    /// Render the 1-based suffix `n`.
    ///
    /// Alphabetic suffixes continue past `z` as `aa, ab, ...` (bijective
    /// base 26), so every `n` has a distinct suffix.
    pub fn render(self, n: u64) -> String {
        let base = match self {
            LabelSuffix::Numeric => return n.to_string(),
            LabelSuffix::Alpha => b'a',
            LabelSuffix::Capital => b'A',
        };

        let mut n = n.max(1);
        let mut letters = Vec::new();
        while n > 0 {
            n -= 1;
            letters.push((base + (n % 26) as u8) as char);
            n /= 26;
        }
        letters.iter().rev().collect()
    }

    /// Recover the number a suffix was rendered from.
    pub fn reverse(self, suffix: &str) -> Option<u64> {
        if suffix.is_empty() {
            return None;
        }
        match self {
            LabelSuffix::Numeric => suffix.parse().ok(),
            LabelSuffix::Alpha | LabelSuffix::Capital => {
                let base = if self == LabelSuffix::Alpha { b'a' } else { b'A' };
                suffix.bytes().try_fold(0u64, |acc, b| {
                    let digit = b.checked_sub(base).filter(|d| *d < 26)?;
                    acc.checked_mul(26)?.checked_add(u64::from(digit) + 1)
                })
            }
        }
    }

    /// Determine which enumerator could have produced `suffix`.
    pub fn suffix_type(suffix: &str) -> Option<LabelSuffix> {
        if suffix.is_empty() || !suffix.is_ascii() {
            return None;
        }
        if suffix.bytes().all(|b| b.is_ascii_digit()) {
            Some(LabelSuffix::Numeric)
        } else if suffix.bytes().all(|b| b.is_ascii_lowercase()) {
            Some(LabelSuffix::Alpha)
        } else if suffix.bytes().all(|b| b.is_ascii_uppercase()) {
            Some(LabelSuffix::Capital)
        } else {
            None
        }
    }

    /// Split a disambiguation suffix off `label`.
    ///
    /// Returns the label without its suffix and the suffix's value, or the
    /// unchanged label and `0` when it does not end in a suffix of this kind.
    /// An empty separator treats the last character as the suffix.
    pub fn trim_label(self, label: &str, separator: &str) -> (String, u64) {
        let split = if separator.is_empty() {
            label
                .char_indices()
                .last()
                .filter(|(idx, _)| *idx > 0)
                .map(|(idx, _)| (&label[..idx], &label[idx..]))
        } else {
            label.rsplit_once(separator)
        };

        let Some((raw, suffix)) = split else {
            return (label.to_string(), 0);
        };

        match LabelSuffix::suffix_type(suffix) {
            Some(kind) if kind != self => {
                info!(
                    label = %label,
                    "Suffix kind does not match the configured one, not treating it as a suffix"
                );
                (label.to_string(), 0)
            }
            _ => match self.reverse(suffix) {
                Some(value) => (raw.to_string(), value),
                None => (label.to_string(), 0),
            },
        }
    }
}

impl fmt::Display for LabelSuffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelSuffix::Alpha => write!(f, "alpha"),
            LabelSuffix::Capital => write!(f, "capital"),
            LabelSuffix::Numeric => write!(f, "numeric"),
        }
    }
}

/// Check that `label` can be written as a record anchor line `<label>:`.
pub fn validate_label(label: &str) -> Result<()> {
    let reason = if label.is_empty() {
        "label is empty"
    } else if label.contains('\n') || label.contains('\r') {
        "label contains a line break"
    } else if label.contains(':') {
        "label contains ':'"
    } else if label.starts_with(char::is_whitespace) {
        "label starts with whitespace"
    } else if label.starts_with('#') {
        "label starts with '#'"
    } else if label == "---" || label == "..." {
        "label is a block marker"
    } else {
        return Ok(());
    };

    Err(BibError::InvalidLabel {
        label: label.to_string(),
        reason: reason.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render() {
        assert_eq!(LabelSuffix::Alpha.render(1), "a");
        assert_eq!(LabelSuffix::Alpha.render(26), "z");
        assert_eq!(LabelSuffix::Alpha.render(27), "aa");
        assert_eq!(LabelSuffix::Alpha.render(28), "ab");
        assert_eq!(LabelSuffix::Capital.render(3), "C");
        assert_eq!(LabelSuffix::Numeric.render(12), "12");
    }

    #[test]
    fn test_reverse_inverts_render() {
        for kind in [LabelSuffix::Alpha, LabelSuffix::Capital, LabelSuffix::Numeric] {
            for n in [1, 2, 25, 26, 27, 52, 53, 700, 703] {
                assert_eq!(kind.reverse(&kind.render(n)), Some(n), "{} {}", kind, n);
            }
        }
        assert_eq!(LabelSuffix::Alpha.reverse("A"), None);
        assert_eq!(LabelSuffix::Numeric.reverse("x"), None);
    }

    #[test]
    fn test_suffix_type() {
        assert_eq!(LabelSuffix::suffix_type("a"), Some(LabelSuffix::Alpha));
        assert_eq!(LabelSuffix::suffix_type("B"), Some(LabelSuffix::Capital));
        assert_eq!(LabelSuffix::suffix_type("10"), Some(LabelSuffix::Numeric));
        assert_eq!(LabelSuffix::suffix_type("hello123"), None);
        assert_eq!(LabelSuffix::suffix_type("ä"), None);
    }

    #[test]
    fn test_trim_label() {
        let alpha = LabelSuffix::Alpha;
        assert_eq!(alpha.trim_label("Einstein1905_b", "_"), ("Einstein1905".to_string(), 2));
        assert_eq!(alpha.trim_label("Einstein1905", "_"), ("Einstein1905".to_string(), 0));
        assert_eq!(alpha.trim_label("Einstein1905_B", "_"), ("Einstein1905_B".to_string(), 0));
        assert_eq!(alpha.trim_label("a_b_c", "_"), ("a_b".to_string(), 3));
        assert_eq!(alpha.trim_label("Einstein1905b", ""), ("Einstein1905".to_string(), 2));
        assert_eq!(
            LabelSuffix::Numeric.trim_label("Einstein_12", "_"),
            ("Einstein".to_string(), 12)
        );
    }

    #[test]
    fn test_validate_label() {
        assert!(validate_label("einstein").is_ok());
        assert!(validate_label("Einstein 1905").is_ok());
        assert!(validate_label("").is_err());
        assert!(validate_label("a:b").is_err());
        assert!(validate_label("a\nb").is_err());
        assert!(validate_label(" a").is_err());
        assert!(validate_label("...").is_err());
        assert!(validate_label("#tag2020").is_err());
        assert!(validate_label("tag#2020").is_ok());
    }
}
