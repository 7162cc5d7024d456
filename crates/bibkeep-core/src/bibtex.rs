//! BibTeX rendering.
//!
//! The rendered form is what full-text search runs over and what `export`
//! writes:
//!
//! ```text
//! @article{einstein,
//!  author = {Einstein, Albert},
//!  month = jun,
//!  title = {Zur Elektrodynamik bewegter K{\"o}rper},
//!  year = {1905}
//! }
//! ```

use crate::config::ListSeparators;
use crate::entry::{Entry, ENTRYTYPE};
use tracing::debug;

/// Render one entry. Fields are sorted by name; `month` is a bare macro.
pub fn render(entry: &Entry, separators: &ListSeparators, encode_latex: bool) -> String {
    debug!(entry = %entry.label(), "Converting entry to BibTeX");
    let mut fields = entry.stringify(encode_latex, separators);
    fields.shift_remove("label");
    fields.shift_remove(ENTRYTYPE);
    fields.sort_keys();

    let mut out = format!("@{}{{{}", entry.entry_type(), entry.label());
    for (name, value) in &fields {
        if name == "month" && entry.month().is_some() {
            out.push_str(&format!(",\n {} = {}", name, value));
        } else {
            out.push_str(&format!(",\n {} = {{{}}}", name, value));
        }
    }
    out.push_str("\n}\n");
    out
}

/// Render several entries separated by blank lines.
pub fn render_all<'a, I>(entries: I, separators: &ListSeparators, encode_latex: bool) -> String
where
    I: IntoIterator<Item = &'a Entry>,
{
    entries
        .into_iter()
        .map(|entry| render(entry, separators, encode_latex))
        .collect::<Vec<_>>()
        .join("\n")
}
