//! Author names.
//!
//! An author is either a structured person name or a verbatim literal, the
//! latter being used for organisations (`{Acme Corp.}`) and for single
//! tokens that cannot be split reliably.

use crate::error::{BibError, Result};
use crate::latex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A structured person name.
///
/// Renders as `particle last, suffix, first`, omitting the absent parts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuthorName {
    pub first: String,
    pub last: String,
    #[serde(default)]
    pub particle: Option<String>,
    #[serde(default)]
    pub suffix: Option<String>,
}

/// One element of an entry's `author` list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Author {
    Person(AuthorName),
    Verbatim(String),
}

impl AuthorName {
    pub fn new(first: impl Into<String>, last: impl Into<String>) -> Self {
        AuthorName {
            first: first.into(),
            last: last.into(),
            particle: None,
            suffix: None,
        }
    }

    pub fn with_particle(mut self, particle: impl Into<String>) -> Self {
        self.particle = Some(particle.into());
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    /// Parse a free-form author string.
    ///
    /// Understood forms are `First von Last`, `von Last, First` and
    /// `von Last, Suffix, First`. Input fully wrapped in braces, and
    /// single-token input, are returned verbatim.
    ///
    /// # Example
    /// ```
    /// use bibkeep_core::{Author, AuthorName};
    /// let author = AuthorName::parse("von Neumann, John").unwrap();
    /// assert_eq!(
    ///     author,
    ///     Author::Person(AuthorName::new("John", "Neumann").with_particle("von"))
    /// );
    /// ```
    pub fn parse(input: &str) -> Result<Author> {
        let trimmed = input.trim();
        if trimmed.is_empty() || (trimmed.starts_with('{') && trimmed.ends_with('}')) {
            return Ok(Author::Verbatim(trimmed.to_string()));
        }

        let commas = trimmed.matches(',').count();
        match commas {
            0 => Ok(Self::parse_natural(trimmed)),
            1 | 2 => {
                let mut parts = trimmed.splitn(3, ',');
                let prefixed_last = parts.next().unwrap_or_default();
                let (suffix, first) = if commas == 1 {
                    (None, parts.next().unwrap_or_default())
                } else {
                    let suffix = parts.next().unwrap_or_default().trim();
                    (Some(suffix.to_string()), parts.next().unwrap_or_default())
                };

                let (particle, last) = split_particle(prefixed_last);
                Ok(Author::Person(AuthorName {
                    first: first.trim().to_string(),
                    last,
                    particle,
                    suffix,
                }))
            }
            _ => Err(BibError::MalformedAuthor {
                author: trimmed.to_string(),
                commas,
            }),
        }
    }

    /// `First [middle] [von] Last` with no commas.
    fn parse_natural(input: &str) -> Author {
        let parts: Vec<&str> = input.split_whitespace().collect();
        if parts.len() < 2 {
            return Author::Verbatim(input.to_string());
        }

        let mut first = parts[0].to_string();
        let last = parts[parts.len() - 1].to_string();
        let mut particle: Option<String> = None;
        for part in &parts[1..parts.len() - 1] {
            if starts_lowercase(part) {
                match particle {
                    Some(ref mut p) => {
                        p.push(' ');
                        p.push_str(part);
                    }
                    None => particle = Some(part.to_string()),
                }
            } else {
                first.push(' ');
                first.push_str(part);
            }
        }

        Author::Person(AuthorName {
            first,
            last,
            particle,
            suffix: None,
        })
    }
}

/// Split `von der Last` into the lowercase particle and the last name.
fn split_particle(prefixed_last: &str) -> (Option<String>, String) {
    let tokens: Vec<&str> = prefixed_last.split_whitespace().collect();
    if tokens.len() <= 1 {
        return (None, tokens.first().copied().unwrap_or_default().to_string());
    }

    let (particle, last): (Vec<&str>, Vec<&str>) =
        tokens.iter().partition(|token| starts_lowercase(token));

    // An all-lowercase name still needs a last name.
    if last.is_empty() {
        let (rest, final_token) = tokens.split_at(tokens.len() - 1);
        return (Some(rest.join(" ")), final_token.join(" "));
    }

    let particle = if particle.is_empty() {
        None
    } else {
        Some(particle.join(" "))
    };
    (particle, last.join(" "))
}

fn starts_lowercase(token: &str) -> bool {
    token.chars().next().map(char::is_lowercase).unwrap_or(false)
}

impl fmt::Display for AuthorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref particle) = self.particle {
            write!(f, "{} ", particle)?;
        }
        write!(f, "{}", self.last)?;
        if let Some(ref suffix) = self.suffix {
            write!(f, ", {}", suffix)?;
        }
        write!(f, ", {}", self.first)
    }
}

impl Author {
    /// Parse one author as written in a bibliography.
    ///
    /// LaTeX escapes are decoded before parsing, except for fully braced
    /// literals which are kept exactly as given.
    pub fn from_text(input: &str) -> Result<Author> {
        let trimmed = input.trim();
        if trimmed.starts_with('{') && trimmed.ends_with('}') {
            return Ok(Author::Verbatim(trimmed.to_string()));
        }
        AuthorName::parse(&latex::decode(trimmed))
    }

    /// Parse an `" and "`-joined author list.
    pub fn parse_list(input: &str) -> Result<Vec<Author>> {
        split_list(input).into_iter().map(Author::from_text).collect()
    }

    /// Join authors into a single BibLaTeX style string.
    pub fn join(authors: &[Author]) -> String {
        authors
            .iter()
            .map(|author| author.to_string())
            .collect::<Vec<_>>()
            .join(" and ")
    }

    pub fn as_person(&self) -> Option<&AuthorName> {
        match self {
            Author::Person(name) => Some(name),
            Author::Verbatim(_) => None,
        }
    }
}

/// Split an author list on `" and "` outside of braces.
pub fn split_list(input: &str) -> Vec<&str> {
    const DELIMITER: &str = " and ";
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut idx = 0;
    while idx < input.len() {
        let rest = &input[idx..];
        if depth == 0 && rest.starts_with(DELIMITER) {
            parts.push(&input[start..idx]);
            idx += DELIMITER.len();
            start = idx;
            continue;
        }
        match rest.as_bytes()[0] {
            b'{' => depth += 1,
            b'}' => depth = depth.saturating_sub(1),
            _ => {}
        }
        idx += rest.chars().next().map_or(1, char::len_utf8);
    }
    parts.push(&input[start..]);
    parts
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Author::Person(name) => fmt::Display::fmt(name, f),
            Author::Verbatim(text) => f.write_str(text),
        }
    }
}

impl From<AuthorName> for Author {
    fn from(name: AuthorName) -> Self {
        Author::Person(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(author: Author) -> AuthorName {
        match author {
            Author::Person(name) => name,
            Author::Verbatim(text) => panic!("expected a person, got verbatim '{}'", text),
        }
    }

    #[test]
    fn test_first_last() {
        let name = person(AuthorName::parse("Albert Einstein").unwrap());
        assert_eq!(name, AuthorName::new("Albert", "Einstein"));
    }

    #[test]
    fn test_first_von_last() {
        let name = person(AuthorName::parse("Ludwig van der Beethoven").unwrap());
        assert_eq!(name.first, "Ludwig");
        assert_eq!(name.particle.as_deref(), Some("van der"));
        assert_eq!(name.last, "Beethoven");

        let name = person(AuthorName::parse("John Ronald Reuel Tolkien").unwrap());
        assert_eq!(name.first, "John Ronald Reuel");
        assert_eq!(name.particle, None);
    }

    #[test]
    fn test_von_last_first() {
        let name = person(AuthorName::parse("von Neumann, John").unwrap());
        assert_eq!(name, AuthorName::new("John", "Neumann").with_particle("von"));
    }

    #[test]
    fn test_von_last_suffix_first() {
        let name = person(AuthorName::parse("de la Fontaine, Jr., Jean").unwrap());
        assert_eq!(name.first, "Jean");
        assert_eq!(name.last, "Fontaine");
        assert_eq!(name.particle.as_deref(), Some("de la"));
        assert_eq!(name.suffix.as_deref(), Some("Jr."));
    }

    #[test]
    fn test_verbatim() {
        assert_eq!(
            AuthorName::parse("{Acme Corp.}").unwrap(),
            Author::Verbatim("{Acme Corp.}".to_string())
        );
        assert_eq!(
            AuthorName::parse("Plato").unwrap(),
            Author::Verbatim("Plato".to_string())
        );
    }

    #[test]
    fn test_too_many_commas() {
        let err = AuthorName::parse("a, b, c, d").unwrap_err();
        assert!(matches!(err, BibError::MalformedAuthor { commas: 3, .. }));
    }

    #[test]
    fn test_display() {
        let name = AuthorName::new("Jean", "Fontaine")
            .with_particle("de la")
            .with_suffix("Jr.");
        assert_eq!(name.to_string(), "de la Fontaine, Jr., Jean");
        assert_eq!(AuthorName::new("D.", "Dummy").to_string(), "Dummy, D.");
    }

    #[test]
    fn test_display_parse_is_lossless() {
        let names = vec![
            AuthorName::new("Albert", "Einstein"),
            AuthorName::new("John", "Neumann").with_particle("von"),
            AuthorName::new("Martin Luther", "King").with_suffix("Jr."),
            AuthorName::new("Jean", "Fontaine")
                .with_particle("de la")
                .with_suffix("III"),
        ];
        for name in names {
            let reparsed = AuthorName::parse(&name.to_string()).unwrap();
            assert_eq!(reparsed, Author::Person(name));
        }
    }

    #[test]
    fn test_parse_list_and_join() {
        let authors = Author::parse_list("Albert Einstein and {CERN} and Bohr, Niels").unwrap();
        assert_eq!(authors.len(), 3);
        assert_eq!(authors[1], Author::Verbatim("{CERN}".to_string()));
        assert_eq!(
            Author::join(&authors),
            "Einstein, Albert and {CERN} and Bohr, Niels"
        );
    }

    #[test]
    fn test_from_text_decodes_latex() {
        assert_eq!(
            Author::from_text(r#"G{\"o}del, Kurt"#).unwrap(),
            Author::Person(AuthorName::new("Kurt", "Gödel"))
        );
        assert_eq!(
            Author::from_text("{A}").unwrap(),
            Author::Verbatim("{A}".to_string())
        );
    }

    #[test]
    fn test_parse_list_keeps_braced_and() {
        let authors = Author::parse_list("{Barnes and Noble} and Einstein, Albert").unwrap();
        assert_eq!(
            authors,
            vec![
                Author::Verbatim("{Barnes and Noble}".to_string()),
                Author::Person(AuthorName::new("Albert", "Einstein")),
            ]
        );
        assert_eq!(split_list("{a and {b}} and c"), vec!["{a and {b}}", "c"]);
        assert_eq!(split_list("Körper and Ørsted"), vec!["Körper", "Ørsted"]);
    }
}
