//! The database file format.
//!
//! The database is a stream of YAML documents, one per entry:
//!
//! ```text
//! ---
//! einstein:
//!     ENTRYTYPE: article
//!     author:
//!       - first: Albert
//!         last: Einstein
//!     year: 1905
//! ...
//! ```
//!
//! Each block starts with an anchor line `<label>:` at column 0 and ends
//! with a line holding only `...`. Blocks are usually preceded by a `---`
//! separator. The label is taken from the anchor line verbatim and the
//! indented body is parsed as a YAML mapping.
//!
//! Writing sorts fields by name and picks the plainest scalar style that
//! reads back to the same string: plain, a `|-` block for multi-line text,
//! or a double-quoted string otherwise.

use crate::author::{Author, AuthorName};
use crate::config::{AuthorFormat, Config, ListSeparators};
use crate::entry::Entry;
use crate::error::{BibError, Result};
use crate::label::validate_label;
use crate::value::Value;
use indexmap::IndexMap;
use serde_yaml::Value as Yaml;
use tracing::{debug, warn};

/// Line separating two blocks.
pub const SEPARATOR: &str = "---";

/// Line terminating a block.
pub const END_MARKER: &str = "...";

const FIELD_INDENT: &str = "    ";
const ITEM_INDENT: &str = "      - ";
const NESTED_INDENT: &str = "        ";

/// Position of one entry block within the lines of a database file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub label: String,
    /// Index of the `---` line directly above the anchor, if any
    pub separator: Option<usize>,
    /// Index of the `<label>:` line
    pub anchor: usize,
    /// Index of the `...` line
    pub end: usize,
}

/// The label named by an anchor line, if `line` is one.
pub fn anchor_label(line: &str) -> Option<&str> {
    let label = line.strip_suffix(':')?;
    validate_label(label).ok()?;
    Some(label)
}

fn trim_cr(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}

/// A non-blank line starting at column 0 that is not a comment.
fn is_top_level(line: &str) -> bool {
    !line.is_empty() && !line.starts_with(char::is_whitespace) && !line.starts_with('#')
}

/// Locate every entry block.
///
/// A block whose `...` line is missing, i.e. that runs into another
/// top-level line or the end of input, is an error. Error line numbers are
/// 1-based.
pub fn scan_blocks(lines: &[&str]) -> Result<Vec<Block>> {
    let mut blocks = Vec::new();
    let mut idx = 0;
    while idx < lines.len() {
        let line = trim_cr(lines[idx]);
        if line == SEPARATOR
            || line == END_MARKER
            || line.trim().is_empty()
            || line.starts_with('#')
        {
            idx += 1;
            continue;
        }

        let Some(label) = anchor_label(line) else {
            return Err(BibError::malformed(
                idx + 1,
                format!("expected an entry label, found '{}'", line),
            ));
        };
        let separator = (idx > 0 && trim_cr(lines[idx - 1]) == SEPARATOR).then(|| idx - 1);

        let mut end = idx + 1;
        loop {
            let Some(body) = lines.get(end).map(|l| trim_cr(l)) else {
                return Err(BibError::malformed(
                    end,
                    format!("entry '{}' is not terminated by '{}'", label, END_MARKER),
                ));
            };
            if body == END_MARKER {
                break;
            }
            if is_top_level(body) {
                return Err(BibError::malformed(
                    end + 1,
                    format!("entry '{}' is not terminated by '{}'", label, END_MARKER),
                ));
            }
            end += 1;
        }

        blocks.push(Block {
            label: label.to_string(),
            separator,
            anchor: idx,
            end,
        });
        idx = end + 1;
    }
    Ok(blocks)
}

/// Reads and writes entry blocks.
#[derive(Debug, Clone, Default)]
pub struct YamlCodec {
    author_format: AuthorFormat,
    separators: ListSeparators,
}

impl YamlCodec {
    pub fn new(author_format: AuthorFormat, separators: ListSeparators) -> Self {
        YamlCodec {
            author_format,
            separators,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        YamlCodec::new(
            config.database.format.author_format,
            config.database.stringify.list_separator.clone(),
        )
    }

    pub fn separators(&self) -> &ListSeparators {
        &self.separators
    }

    /// Parse a whole database. Later duplicates of a label replace earlier
    /// ones, keeping the position of the first.
    pub fn parse(&self, text: &str) -> Result<IndexMap<String, Entry>> {
        let lines: Vec<&str> = text.split('\n').collect();
        let blocks = scan_blocks(&lines)?;

        let mut entries = IndexMap::with_capacity(blocks.len());
        for block in blocks {
            let body: Vec<&str> = lines[block.anchor + 1..block.end]
                .iter()
                .map(|l| trim_cr(l))
                .collect();
            let fields = self.parse_body(&block.label, &body, block.anchor + 2)?;
            let entry = Entry::from_fields(block.label.clone(), fields, &self.separators)?;

            if entries.contains_key(&block.label) {
                warn!(
                    entry = %block.label,
                    line = block.anchor + 1,
                    "Label was already encountered earlier in the database, the later entry wins"
                );
            }
            entries.insert(block.label, entry);
        }
        Ok(entries)
    }

    fn parse_body(
        &self,
        label: &str,
        body: &[&str],
        first_line: usize,
    ) -> Result<Vec<(String, Value)>> {
        let indent = body
            .iter()
            .filter(|l| !l.trim().is_empty() && !l.trim_start().starts_with('#'))
            .map(|l| l.len() - l.trim_start().len())
            .min()
            .unwrap_or(0);
        let text = body
            .iter()
            .map(|l| match l.get(..indent) {
                Some(prefix) if prefix.chars().all(char::is_whitespace) => &l[indent..],
                _ => l.trim_start(),
            })
            .collect::<Vec<_>>()
            .join("\n");

        let doc: Yaml = serde_yaml::from_str(&text).map_err(|e| {
            let line = e
                .location()
                .map(|loc| first_line + loc.line().saturating_sub(1))
                .unwrap_or(first_line);
            BibError::malformed(line, format!("entry '{}': {}", label, e))
        })?;

        let mapping = match doc {
            Yaml::Mapping(mapping) => mapping,
            Yaml::Null => return Ok(Vec::new()),
            _ => {
                return Err(BibError::malformed(
                    first_line,
                    format!("entry '{}' is not a mapping of fields", label),
                ))
            }
        };

        let mut fields = Vec::with_capacity(mapping.len());
        for (key, value) in mapping {
            let name = match key {
                Yaml::String(name) => name,
                other => scalar_text(label, "<key>", other),
            };
            let value = convert(label, &name, value)?;
            fields.push((name, value));
        }
        Ok(fields)
    }

    /// Render one entry as a framed block.
    pub fn serialize(&self, entry: &Entry) -> String {
        debug!(entry = %entry.label(), "Converting entry to YAML");
        let mut out = format!("{}\n{}:\n", SEPARATOR, entry.label());

        let mut fields: Vec<(&String, &Value)> = entry.fields().iter().collect();
        fields.sort_by(|a, b| a.0.cmp(b.0));
        for (name, value) in fields {
            self.emit_field(&mut out, name, value);
        }

        out.push_str(END_MARKER);
        out.push('\n');
        out
    }

    fn emit_field(&self, out: &mut String, name: &str, value: &Value) {
        let key = key_text(name);
        match value {
            Value::Str(s) => {
                let text = scalar_text_for(s, true);
                out.push_str(&format!("{}{}: {}\n", FIELD_INDENT, key, text));
            }
            Value::Int(n) => out.push_str(&format!("{}{}: {}\n", FIELD_INDENT, key, n)),
            Value::List(items) if items.is_empty() => {
                out.push_str(&format!("{}{}: []\n", FIELD_INDENT, key));
            }
            Value::List(items) => {
                out.push_str(&format!("{}{}:\n", FIELD_INDENT, key));
                for item in items {
                    out.push_str(&format!("{}{}\n", ITEM_INDENT, scalar_text_for(item, true)));
                }
            }
            Value::Authors(authors) if self.author_format == AuthorFormat::Biblatex => {
                let text = scalar_text_for(&Author::join(authors), true);
                out.push_str(&format!("{}{}: {}\n", FIELD_INDENT, key, text));
            }
            Value::Authors(authors) if authors.is_empty() => {
                out.push_str(&format!("{}{}: []\n", FIELD_INDENT, key));
            }
            Value::Authors(authors) => {
                out.push_str(&format!("{}{}:\n", FIELD_INDENT, key));
                for author in authors {
                    match author {
                        Author::Person(name) => emit_person(out, name),
                        Author::Verbatim(raw) => {
                            let text = scalar_text_for(raw, false);
                            out.push_str(&format!("{}{}\n", ITEM_INDENT, text));
                        }
                    }
                }
            }
        }
    }
}

fn emit_person(out: &mut String, name: &AuthorName) {
    let mut parts = vec![("first", name.first.as_str()), ("last", name.last.as_str())];
    if let Some(ref particle) = name.particle {
        parts.push(("particle", particle.as_str()));
    }
    if let Some(ref suffix) = name.suffix {
        parts.push(("suffix", suffix.as_str()));
    }

    for (idx, (key, value)) in parts.into_iter().enumerate() {
        let prefix = if idx == 0 { ITEM_INDENT } else { NESTED_INDENT };
        out.push_str(&format!("{}{}: {}\n", prefix, key, scalar_text_for(value, false)));
    }
}

/// Convert one parsed field value.
fn convert(label: &str, name: &str, value: Yaml) -> Result<Value> {
    let value = match value {
        Yaml::String(s) => Value::Str(s),
        Yaml::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => {
                warn!(entry = %label, field = %name, "Storing non-integer number as a string");
                Value::Str(n.to_string())
            }
        },
        Yaml::Null => Value::Str(String::new()),
        Yaml::Sequence(items) if name == "author" => Value::Authors(
            items
                .into_iter()
                .map(|item| author_from_yaml(label, item))
                .collect::<Result<Vec<_>>>()?,
        ),
        Yaml::Sequence(items) => Value::List(
            items
                .into_iter()
                .map(|item| scalar_text(label, name, item))
                .collect(),
        ),
        other => Value::Str(scalar_text(label, name, other)),
    };
    Ok(value)
}

fn author_from_yaml(label: &str, item: Yaml) -> Result<Author> {
    match item {
        Yaml::Mapping(_) => Ok(Author::Person(serde_yaml::from_value::<AuthorName>(item)?)),
        Yaml::String(text) => Author::from_text(&text),
        other => Author::from_text(&scalar_text(label, "author", other)),
    }
}

/// A scalar rendered as text; nested structures are kept as YAML source.
fn scalar_text(label: &str, name: &str, value: Yaml) -> String {
    match value {
        Yaml::String(s) => s,
        Yaml::Number(n) => n.to_string(),
        Yaml::Null => String::new(),
        Yaml::Bool(b) => {
            warn!(entry = %label, field = %name, "Storing boolean as a string");
            b.to_string()
        }
        other => {
            warn!(
                entry = %label,
                field = %name,
                "Unsupported field shape, storing its YAML source"
            );
            serde_yaml::to_string(&other)
                .map(|s| s.trim_end().to_string())
                .unwrap_or_default()
        }
    }
}

/// True if `doc`, a one-entry mapping under key `k`, reads back as `expected`.
fn reads_back(doc: &str, expected: &str) -> bool {
    match serde_yaml::from_str::<Yaml>(doc) {
        Ok(Yaml::Mapping(mapping)) => mapping.get("k").and_then(Yaml::as_str) == Some(expected),
        _ => false,
    }
}

fn plain_candidate(s: &str) -> bool {
    const INDICATORS: &str = "-?:,[]{}#&*!|>'\"%@`";
    let Some(first) = s.chars().next() else {
        return false;
    };
    s.trim() == s
        && !INDICATORS.contains(first)
        && !s.chars().any(char::is_control)
        && !s.contains(": ")
        && !s.contains(" #")
        && !s.ends_with(':')
}

fn block_candidate(s: &str) -> bool {
    s.contains('\n')
        && !s.starts_with(char::is_whitespace)
        && !s.ends_with('\n')
        && !s.chars().any(|c| c.is_control() && c != '\n' && c != '\t')
}

fn block_text(s: &str) -> String {
    let body = s
        .split('\n')
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{}{}", NESTED_INDENT, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!("|-\n{}", body)
}

fn quoted_text(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("'{}'", s.replace('\'', "''")))
}

/// The text following `key: ` or `- ` for a string value.
fn scalar_text_for(s: &str, allow_block: bool) -> String {
    if plain_candidate(s) && reads_back(&format!("k: {}\n", s), s) {
        return s.to_string();
    }
    if allow_block && block_candidate(s) {
        let block = block_text(s);
        if reads_back(&format!("k: {}\n", block), s) {
            return block;
        }
    }
    quoted_text(s)
}

fn key_text(name: &str) -> String {
    let plain = plain_candidate(name)
        && matches!(serde_yaml::from_str::<Yaml>(name), Ok(Yaml::String(ref s)) if s == name);
    if plain {
        name.to_string()
    } else {
        quoted_text(name)
    }
}
