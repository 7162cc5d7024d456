//! Field values and the coercion rules applied when fields are set.

use crate::author::Author;
use serde::{Deserialize, Serialize};

/// The value of a single entry field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    Str(String),
    Int(i64),
    List(Vec<String>),
    Authors(Vec<Author>),
}

/// BibTeX month macros, in calendar order.
pub const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_authors(&self) -> Option<&[Author]> {
        match self {
            Value::Authors(authors) => Some(authors),
            _ => None,
        }
    }

    /// Short name of the variant, used in log messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Int(_) => "integer",
            Value::List(_) => "list",
            Value::Authors(_) => "author list",
        }
    }

    /// Render as a single string, joining lists with `separator`.
    pub fn join(&self, separator: &str) -> String {
        match self {
            Value::Str(s) => s.clone(),
            Value::Int(n) => n.to_string(),
            Value::List(items) => items.join(separator),
            Value::Authors(authors) => Author::join(authors),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::List(items)
    }
}

impl From<Vec<Author>> for Value {
    fn from(authors: Vec<Author>) -> Self {
        Value::Authors(authors)
    }
}

/// Interpret a decimal string as an integer.
///
/// Only plain ASCII digits qualify. A leading zero (other than `"0"` itself)
/// keeps the string, so that values like `"007"` are not altered.
pub fn coerce_numeric(s: &str) -> Option<i64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if s.len() > 1 && s.starts_with('0') {
        return None;
    }
    s.parse().ok()
}

/// Map a month given as a number or a name to its three-letter macro.
pub fn normalize_month(value: &Value) -> Option<String> {
    match value {
        Value::Int(n) => month_from_number(*n),
        Value::Str(s) => {
            let s = s.trim();
            if MONTHS.contains(&s) {
                return Some(s.to_string());
            }
            if let Ok(n) = s.parse::<i64>() {
                return month_from_number(n);
            }
            let prefix: String = s.chars().take(3).collect::<String>().to_lowercase();
            MONTHS
                .iter()
                .find(|month| **month == prefix)
                .map(|month| month.to_string())
        }
        _ => None,
    }
}

fn month_from_number(n: i64) -> Option<String> {
    if (1..=12).contains(&n) {
        Some(MONTHS[(n - 1) as usize].to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_numeric() {
        assert_eq!(coerce_numeric("2021"), Some(2021));
        assert_eq!(coerce_numeric("0"), Some(0));
        assert_eq!(coerce_numeric("007"), None);
        assert_eq!(coerce_numeric("12a"), None);
        assert_eq!(coerce_numeric("-3"), None);
        assert_eq!(coerce_numeric(""), None);
        assert_eq!(coerce_numeric("99999999999999999999999"), None);
    }

    #[test]
    fn test_normalize_month() {
        assert_eq!(normalize_month(&Value::Int(4)).as_deref(), Some("apr"));
        assert_eq!(normalize_month(&Value::from("12")).as_deref(), Some("dec"));
        assert_eq!(normalize_month(&Value::from("April")).as_deref(), Some("apr"));
        assert_eq!(normalize_month(&Value::from("sep")).as_deref(), Some("sep"));
        assert_eq!(normalize_month(&Value::Int(13)), None);
        assert_eq!(normalize_month(&Value::from("Spring")), None);
    }

    #[test]
    fn test_join() {
        let tags = Value::List(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(tags.join(", "), "a, b");
        assert_eq!(Value::Int(7).join(", "), "7");
    }
}
