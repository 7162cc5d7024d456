//! Bibliographic entries.
//!
//! An [`Entry`] is a label plus an ordered map of free-form fields. A few
//! well-known fields have typed setters that normalise their input:
//!
//! - `author`: parsed into a list of [`Author`]s (LaTeX decoded first)
//! - `tags`, `url`: always lists, a delimited string is split
//! - `file`: like `tags`, with each path stored home-relative
//! - `month`: the three-letter BibTeX macro
//!
//! Any other field holding a plain decimal string is stored as an integer.

use crate::author::{self, Author};
use crate::config::ListSeparators;
use crate::error::Result;
use crate::filter::CompiledFilter;
use crate::label::validate_label;
use crate::latex;
use crate::paths;
use crate::search::{self, FileSearcher, Match, SearchOptions};
use crate::value::{coerce_numeric, normalize_month, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// The field holding the BibLaTeX entry type.
pub const ENTRYTYPE: &str = "ENTRYTYPE";

/// Separator used for list fields without a configured one.
const DEFAULT_LIST_SEPARATOR: &str = ", ";

/// A single bibliographic record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    label: String,
    fields: IndexMap<String, Value>,
}

impl Entry {
    /// Create an entry without fields.
    pub fn new(label: impl Into<String>) -> Result<Self> {
        let label = label.into();
        validate_label(&label)?;
        Ok(Entry {
            label,
            fields: IndexMap::new(),
        })
    }

    /// Create an entry from raw fields, running every typed setter.
    pub fn from_fields<I>(
        label: impl Into<String>,
        fields: I,
        separators: &ListSeparators,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let mut entry = Entry::new(label)?;
        debug!(entry = %entry.label, "Initializing entry");
        for (name, value) in fields {
            entry.set_field_with(&name, value, separators)?;
        }
        Ok(entry)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Change the label of this entry.
    ///
    /// This does not re-key the entry in a store; use
    /// [`RecordStore::relabel`](crate::RecordStore::relabel) for that.
    pub fn set_label(&mut self, label: impl Into<String>) -> Result<()> {
        let label = label.into();
        validate_label(&label)?;
        debug!(old = %self.label, new = %label, "Changing label");
        self.label = label;
        Ok(())
    }

    pub fn fields(&self) -> &IndexMap<String, Value> {
        &self.fields
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn contains_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn remove_field(&mut self, field: &str) -> Option<Value> {
        self.fields.shift_remove(field)
    }

    /// The BibLaTeX entry type, `misc` if unset.
    pub fn entry_type(&self) -> &str {
        self.fields
            .get(ENTRYTYPE)
            .and_then(Value::as_str)
            .unwrap_or("misc")
    }

    pub fn authors(&self) -> &[Author] {
        self.fields
            .get("author")
            .and_then(Value::as_authors)
            .unwrap_or_default()
    }

    pub fn tags(&self) -> &[String] {
        self.list_field("tags")
    }

    pub fn files(&self) -> &[String] {
        self.list_field("file")
    }

    pub fn urls(&self) -> &[String] {
        self.list_field("url")
    }

    pub fn month(&self) -> Option<&str> {
        self.fields.get("month").and_then(Value::as_str)
    }

    fn list_field(&self, field: &str) -> &[String] {
        self.fields
            .get(field)
            .and_then(Value::as_list)
            .unwrap_or_default()
    }

    /// Set a field using the default list separators.
    pub fn set_field(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.set_field_with(name, value.into(), &ListSeparators::default())
    }

    /// Set a field, normalising known fields.
    ///
    /// Fails only when an author string cannot be parsed.
    pub fn set_field_with(
        &mut self,
        name: &str,
        value: Value,
        separators: &ListSeparators,
    ) -> Result<()> {
        let value = match name {
            "ID" => {
                info!(
                    entry = %self.label,
                    field = "ID",
                    "Dropping field, the id is inferred from the entry label"
                );
                return Ok(());
            }
            "author" => self.normalize_authors(value)?,
            "tags" | "url" => self.normalize_list(name, value, separators),
            "file" => match self.normalize_list(name, value, separators) {
                Value::List(files) => {
                    Value::List(files.iter().map(|file| paths::abbreviate(file)).collect())
                }
                other => other,
            },
            "month" => self.normalize_month(value),
            _ => match value.as_str().and_then(coerce_numeric) {
                Some(n) => {
                    info!(
                        entry = %self.label,
                        field = %name,
                        value = n,
                        "Converting field to integer"
                    );
                    Value::Int(n)
                }
                None => value,
            },
        };

        self.fields.insert(name.to_string(), value);
        Ok(())
    }

    fn normalize_authors(&self, value: Value) -> Result<Value> {
        let raw: Vec<String> = match value {
            Value::Authors(authors) => return Ok(Value::Authors(authors)),
            Value::Str(s) => author::split_list(&s).into_iter().map(str::to_string).collect(),
            Value::List(items) => items,
            Value::Int(n) => vec![n.to_string()],
        };

        let authors = raw
            .iter()
            .map(|author| Author::from_text(author))
            .collect::<Result<Vec<_>>>()?;
        debug!(entry = %self.label, count = authors.len(), "Parsed authors");
        Ok(Value::Authors(authors))
    }

    fn normalize_list(&self, name: &str, value: Value, separators: &ListSeparators) -> Value {
        match value {
            Value::List(items) => Value::List(items),
            Value::Str(s) => {
                let separator = separators.for_field(name).unwrap_or(DEFAULT_LIST_SEPARATOR);
                let items: Vec<String> = s.split(separator).map(str::to_string).collect();
                if items.len() > 1 {
                    info!(entry = %self.label, field = %name, "Converted the field to a list");
                }
                Value::List(items)
            }
            Value::Int(n) => Value::List(vec![n.to_string()]),
            Value::Authors(authors) => {
                warn!(
                    entry = %self.label,
                    field = %name,
                    "Storing an author list as plain strings"
                );
                Value::List(authors.iter().map(|author| author.to_string()).collect())
            }
        }
    }

    fn normalize_month(&self, value: Value) -> Value {
        match normalize_month(&value) {
            Some(month) => {
                if value.as_str() != Some(month.as_str()) {
                    info!(
                        entry = %self.label,
                        field = "month",
                        from = %value.join(", "),
                        to = %month,
                        "Converting month"
                    );
                }
                Value::Str(month)
            }
            None => {
                warn!(
                    entry = %self.label,
                    field = "month",
                    value = %value.join(", "),
                    "Month could not be interpreted, keeping it as is"
                );
                value
            }
        }
    }

    /// All fields as strings, with the label under `"label"`.
    ///
    /// Lists are joined with their configured separator and authors with
    /// `" and "`. With `encode_latex`, non-ASCII characters are replaced by
    /// LaTeX escapes.
    pub fn stringify(
        &self,
        encode_latex: bool,
        separators: &ListSeparators,
    ) -> IndexMap<String, String> {
        let mut data = IndexMap::with_capacity(self.fields.len() + 1);
        data.insert("label".to_string(), self.label.clone());
        for (name, value) in &self.fields {
            let separator = separators.for_field(name).unwrap_or(DEFAULT_LIST_SEPARATOR);
            let text = value.join(separator);
            let text = if encode_latex { latex::encode(&text) } else { text };
            data.insert(name.clone(), text);
        }
        data
    }

    /// Merge the fields of `other` into this entry.
    ///
    /// With `ours`, existing values win and only missing fields are added.
    /// Otherwise values from `other` overwrite existing ones.
    pub fn merge(&mut self, other: &Entry, ours: bool) {
        for (name, value) in &other.fields {
            if ours && self.fields.contains_key(name) {
                continue;
            }
            self.fields.insert(name.clone(), value.clone());
        }
    }

    /// Check this entry against a compiled filter.
    pub fn matches(&self, filter: &CompiledFilter, separators: &ListSeparators) -> bool {
        debug!(entry = %self.label, "Checking whether entry matches");
        filter.matches(&self.stringify(false, separators))
    }

    /// Search this entry and its attached files for each query.
    pub fn search(
        &self,
        queries: &[String],
        options: &SearchOptions,
        searcher: &dyn FileSearcher,
        separators: &ListSeparators,
    ) -> Result<Vec<Match>> {
        search::search_entry(self, queries, options, searcher, separators)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::author::AuthorName;

    fn seps() -> ListSeparators {
        ListSeparators::default()
    }

    #[test]
    fn test_invalid_label() {
        assert!(Entry::new("").is_err());
        assert!(Entry::new("a:b").is_err());
        let mut entry = Entry::new("ok").unwrap();
        assert!(entry.set_label("bad\nlabel").is_err());
        assert_eq!(entry.label(), "ok");
    }

    #[test]
    fn test_author_from_string() {
        let mut entry = Entry::new("einstein").unwrap();
        entry
            .set_field("author", r#"Albert Einstein and {CERN} and G{\"o}del, Kurt"#)
            .unwrap();
        let authors = entry.authors();
        assert_eq!(authors[0], Author::Person(AuthorName::new("Albert", "Einstein")));
        assert_eq!(authors[1], Author::Verbatim("{CERN}".to_string()));
        assert_eq!(authors[2], Author::Person(AuthorName::new("Kurt", "Gödel")));
    }

    #[test]
    fn test_malformed_author_propagates() {
        let mut entry = Entry::new("x").unwrap();
        assert!(entry.set_field("author", "a, b, c, d").is_err());
        assert!(!entry.contains_field("author"));
    }

    #[test]
    fn test_list_fields() {
        let mut entry = Entry::new("x").unwrap();
        entry.set_field("tags", "physics, relativity").unwrap();
        assert_eq!(entry.tags(), ["physics", "relativity"]);

        entry.set_field("url", "https://example.org").unwrap();
        assert_eq!(entry.urls(), ["https://example.org"]);

        let custom = ListSeparators {
            tags: "; ".to_string(),
            ..ListSeparators::default()
        };
        entry
            .set_field_with("tags", Value::from("a, b; c"), &custom)
            .unwrap();
        assert_eq!(entry.tags(), ["a, b", "c"]);
    }

    #[test]
    fn test_file_paths_are_absolute() {
        let mut entry = Entry::new("x").unwrap();
        entry.set_field("file", "/tmp/../tmp/a.pdf").unwrap();
        let file = &entry.files()[0];
        assert!(file.starts_with('/') || file.starts_with('~'));
        assert!(file.ends_with("a.pdf"));
        assert!(!file.contains(".."));
    }

    #[test]
    fn test_numeric_coercion() {
        let mut entry = Entry::new("x").unwrap();
        entry.set_field("year", "1905").unwrap();
        entry.set_field("number", "007").unwrap();
        assert_eq!(entry.get("year"), Some(&Value::Int(1905)));
        assert_eq!(entry.get("number"), Some(&Value::from("007")));
    }

    #[test]
    fn test_month() {
        let mut entry = Entry::new("x").unwrap();
        entry.set_field("month", 3i64).unwrap();
        assert_eq!(entry.month(), Some("mar"));
        entry.set_field("month", "September").unwrap();
        assert_eq!(entry.month(), Some("sep"));
        entry.set_field("month", "Summer").unwrap();
        assert_eq!(entry.get("month"), Some(&Value::from("Summer")));
    }

    #[test]
    fn test_id_is_dropped() {
        let fields = vec![
            ("ID".to_string(), Value::from("einstein")),
            ("title".to_string(), Value::from("Relativity")),
        ];
        let entry = Entry::from_fields("einstein", fields, &seps()).unwrap();
        assert!(!entry.contains_field("ID"));
        assert!(entry.contains_field("title"));
    }

    #[test]
    fn test_stringify() {
        let mut entry = Entry::new("einstein").unwrap();
        entry.set_field("author", "Albert Einstein and Niels Bohr").unwrap();
        entry.set_field("tags", vec!["a".to_string(), "b".to_string()]).unwrap();
        entry.set_field("title", "Zur Elektrodynamik bewegter Körper").unwrap();
        entry.set_field("year", 1905i64).unwrap();

        let data = entry.stringify(false, &seps());
        assert_eq!(data["label"], "einstein");
        assert_eq!(data["author"], "Einstein, Albert and Bohr, Niels");
        assert_eq!(data["tags"], "a, b");
        assert_eq!(data["year"], "1905");
        assert_eq!(data["title"], "Zur Elektrodynamik bewegter Körper");

        let encoded = entry.stringify(true, &seps());
        assert_eq!(encoded["title"], r#"Zur Elektrodynamik bewegter K{\"o}rper"#);
    }

    #[test]
    fn test_merge() {
        let mut ours = Entry::new("x").unwrap();
        ours.set_field("title", "Ours").unwrap();
        let mut theirs = Entry::new("x").unwrap();
        theirs.set_field("title", "Theirs").unwrap();
        theirs.set_field("year", 2020i64).unwrap();

        let mut keep = ours.clone();
        keep.merge(&theirs, true);
        assert_eq!(keep.get("title"), Some(&Value::from("Ours")));
        assert_eq!(keep.get("year"), Some(&Value::Int(2020)));

        ours.merge(&theirs, false);
        assert_eq!(ours.get("title"), Some(&Value::from("Theirs")));
    }

    #[test]
    fn test_equality_ignores_field_order() {
        let mut a = Entry::new("x").unwrap();
        a.set_field("title", "T").unwrap();
        a.set_field("year", 1i64).unwrap();
        let mut b = Entry::new("x").unwrap();
        b.set_field("year", 1i64).unwrap();
        b.set_field("title", "T").unwrap();
        assert_eq!(a, b);
    }
}
