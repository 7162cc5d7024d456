//! Full-text search over entries and their attached files.
//!
//! An entry is searched through its BibTeX rendering, line by line. Every
//! line containing a hit yields one [`Match`]: the line itself plus up to
//! `context` lines before and after it. The context walk stops early at
//! lines that contain a hit themselves, so neighbouring matches never
//! swallow each other's lines.
//!
//! Lines can be transliterated before matching (LaTeX escapes decoded,
//! Unicode approximated by ASCII). The match text always shows the original
//! lines; spans index into the transliterated window.
//!
//! Attached files are handed to a [`FileSearcher`], by default an external
//! grep-like program.

use crate::ascii;
use crate::bibtex;
use crate::config::{ListSeparators, SearchConfig};
use crate::entry::Entry;
use crate::error::{BibError, Result};
use crate::latex;
use crate::paths;
use crate::pattern::Pattern;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

/// Byte range of a query hit within a match's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }
}

/// Where a match was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchSource {
    /// The entry's own BibTeX text
    Entry,
    /// An attached file
    File(PathBuf),
}

/// A window of contiguous lines around a hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Match {
    pub source: MatchSource,
    pub text: String,
    pub spans: Vec<Span>,
}

impl Match {
    pub fn lines(&self) -> Vec<&str> {
        self.text.split('\n').collect()
    }
}

/// Options controlling a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    /// Lines of context before and after each hit
    pub context: usize,
    pub ignore_case: bool,
    /// Do not search attached files
    pub skip_files: bool,
    /// Approximate Unicode with ASCII before matching
    pub decode_unicode: bool,
    /// Decode LaTeX escapes before matching
    pub decode_latex: bool,
    /// Number of errors allowed in literal queries
    pub fuzziness: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            context: 1,
            ignore_case: false,
            skip_files: false,
            decode_unicode: false,
            decode_latex: false,
            fuzziness: 0,
        }
    }
}

impl SearchOptions {
    pub fn from_config(config: &SearchConfig) -> Self {
        SearchOptions {
            context: config.context,
            ignore_case: config.ignore_case,
            ..SearchOptions::default()
        }
    }

    pub fn with_context(mut self, context: usize) -> Self {
        self.context = context;
        self
    }

    pub fn with_ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }

    pub fn with_skip_files(mut self, skip_files: bool) -> Self {
        self.skip_files = skip_files;
        self
    }

    pub fn with_decode_unicode(mut self, decode: bool) -> Self {
        self.decode_unicode = decode;
        self
    }

    pub fn with_decode_latex(mut self, decode: bool) -> Self {
        self.decode_latex = decode;
        self
    }

    pub fn with_fuzziness(mut self, fuzziness: usize) -> Self {
        self.fuzziness = fuzziness;
        self
    }

    /// Apply the configured decodings to one line.
    fn transliterate(&self, line: &str) -> String {
        let mut out = if self.decode_latex {
            latex::decode(line)
        } else {
            line.to_string()
        };
        if self.decode_unicode {
            out = ascii::fold(&out);
        }
        out
    }
}

/// Full-text search inside an attached file.
///
/// Implementations return the raw text of each matching block, context
/// lines included.
pub trait FileSearcher: Send + Sync {
    fn search_file(&self, query: &str, path: &Path, context: usize) -> Result<Vec<String>>;
}

/// Runs `<program> <args...> -C<context> <query> <path>` and splits its
/// output on `--` separator lines.
#[derive(Debug, Clone)]
pub struct GrepSearcher {
    program: String,
    args: Vec<String>,
}

impl GrepSearcher {
    pub fn new(program: impl Into<String>) -> Self {
        GrepSearcher {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn from_config(config: &SearchConfig) -> Self {
        GrepSearcher::new(config.grep.clone()).with_args(config.grep_args.clone())
    }

    fn tool_error(&self, reason: impl Into<String>) -> BibError {
        BibError::ExternalTool {
            program: self.program.clone(),
            reason: reason.into(),
        }
    }
}

impl FileSearcher for GrepSearcher {
    fn search_file(&self, query: &str, path: &Path, context: usize) -> Result<Vec<String>> {
        debug!(program = %self.program, path = %path.display(), "Searching attached file");
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(format!("-C{}", context))
            .arg(query)
            .arg(path)
            .output()
            .map_err(|e| self.tool_error(e.to_string()))?;

        match output.status.code() {
            Some(0) => {}
            // grep convention: no lines selected
            Some(1) => return Ok(Vec::new()),
            _ => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(self.tool_error(format!("{}: {}", output.status, stderr.trim())));
            }
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_blocks(&stdout))
    }
}

/// Split grep-style context output into blocks.
pub fn parse_blocks(stdout: &str) -> Vec<String> {
    stdout
        .split("\n--\n")
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .map(str::to_string)
        .collect()
}

/// Search `text` line by line for `pattern`.
pub fn search_text(text: &str, pattern: &Pattern, options: &SearchOptions) -> Vec<Match> {
    let lines: Vec<&str> = text.trim_end_matches('\n').split('\n').collect();
    let searched: Vec<String> = lines.iter().map(|line| options.transliterate(line)).collect();
    let hits: Vec<Vec<(usize, usize)>> =
        searched.iter().map(|line| pattern.find_iter(line)).collect();
    let is_hit = |idx: usize| !hits[idx].is_empty();

    let mut matches = Vec::new();
    for (idx, line_hits) in hits.iter().enumerate() {
        if line_hits.is_empty() {
            continue;
        }

        let mut start = idx;
        while start > 0 && idx - (start - 1) <= options.context && !is_hit(start - 1) {
            start -= 1;
        }
        let mut stop = idx;
        while stop + 1 < lines.len() && (stop + 1) - idx <= options.context && !is_hit(stop + 1) {
            stop += 1;
        }

        let offset: usize = searched[start..idx].iter().map(|line| line.len() + 1).sum();
        matches.push(Match {
            source: MatchSource::Entry,
            text: lines[start..=stop].join("\n"),
            spans: line_hits
                .iter()
                .map(|(s, e)| Span::new(s + offset, e + offset))
                .collect(),
        });
    }
    matches
}

/// Search an entry and, unless skipped, its attached files.
///
/// Invalid queries are an error. Problems with attached files are logged
/// and skipped.
pub fn search_entry(
    entry: &Entry,
    queries: &[String],
    options: &SearchOptions,
    searcher: &dyn FileSearcher,
    separators: &ListSeparators,
) -> Result<Vec<Match>> {
    let patterns = queries
        .iter()
        .map(|query| Pattern::compile(query, options.ignore_case, options.fuzziness))
        .collect::<Result<Vec<_>>>()?;

    debug!(entry = %entry.label(), "Searching entry");
    let text = bibtex::render(entry, separators, false);

    let mut matches = Vec::new();
    for pattern in &patterns {
        matches.extend(search_text(&text, pattern, options));

        if options.skip_files {
            debug!(entry = %entry.label(), "Skipping the search in attached files");
            continue;
        }
        for file in entry.files() {
            matches.extend(search_attached(entry, file, pattern, options, searcher));
        }
    }
    Ok(matches)
}

fn search_attached(
    entry: &Entry,
    file: &str,
    pattern: &Pattern,
    options: &SearchOptions,
    searcher: &dyn FileSearcher,
) -> Vec<Match> {
    let path = paths::expand_home(Path::new(file));
    if !path.exists() {
        warn!(entry = %entry.label(), file = %file, "Attached file does not exist");
        return Vec::new();
    }

    match searcher.search_file(pattern.source(), &path, options.context) {
        Ok(blocks) => blocks
            .into_iter()
            .map(|block| {
                let spans = pattern
                    .find_iter(&block)
                    .into_iter()
                    .map(|(s, e)| Span::new(s, e))
                    .collect();
                Match {
                    source: MatchSource::File(path.clone()),
                    text: block,
                    spans,
                }
            })
            .collect(),
        Err(e) => {
            warn!(
                entry = %entry.label(),
                file = %file,
                error = %e,
                "Search in attached file failed"
            );
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct StubSearcher {
        blocks: Vec<String>,
        calls: Mutex<Vec<(String, PathBuf, usize)>>,
    }

    impl StubSearcher {
        fn new(blocks: &[&str]) -> Self {
            StubSearcher {
                blocks: blocks.iter().map(|b| b.to_string()).collect(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl FileSearcher for StubSearcher {
        fn search_file(&self, query: &str, path: &Path, context: usize) -> Result<Vec<String>> {
            self.calls
                .lock()
                .unwrap()
                .push((query.to_string(), path.to_path_buf(), context));
            Ok(self.blocks.clone())
        }
    }

    struct FailingSearcher;

    impl FileSearcher for FailingSearcher {
        fn search_file(&self, _query: &str, _path: &Path, _context: usize) -> Result<Vec<String>> {
            Err(BibError::ExternalTool {
                program: "missing-grep".to_string(),
                reason: "No such file or directory".to_string(),
            })
        }
    }

    fn options() -> SearchOptions {
        SearchOptions::default()
    }

    #[test]
    fn test_context_window() {
        let pattern = Pattern::regex("match", false).unwrap();
        let matches = search_text("A\nB match\nC", &pattern, &options());
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].lines(), vec!["A", "B match", "C"]);
        assert_eq!(matches[0].spans, vec![Span::new(4, 9)]);
    }

    #[test]
    fn test_adjacent_matches_do_not_share_lines() {
        let pattern = Pattern::regex("match", false).unwrap();
        let text = "A\nB match\nC match\nD";
        let matches = search_text(text, &pattern, &options());
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].lines(), vec!["A", "B match"]);
        assert_eq!(matches[1].lines(), vec!["C match", "D"]);
        assert_eq!(matches[1].spans, vec![Span::new(2, 7)]);
    }

    #[test]
    fn test_context_trimmed_at_boundaries() {
        let pattern = Pattern::regex("first|last", false).unwrap();
        let matches = search_text("first\nx\ny\nz\nlast", &pattern, &options().with_context(2));
        assert_eq!(matches[0].lines(), vec!["first", "x", "y"]);
        assert_eq!(matches[1].lines(), vec!["y", "z", "last"]);

        let matches = search_text("first\nx\nlast", &pattern, &options().with_context(0));
        assert_eq!(matches[0].lines(), vec!["first"]);
    }

    fn search_dummy() -> Entry {
        let mut entry = Entry::new("search_dummy").unwrap();
        entry.set_field("ENTRYTYPE", "article").unwrap();
        entry
            .set_field("abstract", "search_query\nsomething else\nanother line")
            .unwrap();
        entry
            .set_field("journal", "The Journal of Physical Chemistry Letters")
            .unwrap();
        entry
            .set_field("title", r#"Zur Elektrodynamik bewegter K{\"o}rper"#)
            .unwrap();
        entry
    }

    fn run(entry: &Entry, query: &str, options: &SearchOptions) -> Vec<Match> {
        let searcher = StubSearcher::new(&[]);
        entry
            .search(&[query.to_string()], options, &searcher, &ListSeparators::default())
            .unwrap()
    }

    #[test]
    fn test_entry_search() {
        let matches = run(&search_dummy(), "search_query", &options());
        assert_eq!(matches.len(), 1);
        assert_eq!(
            matches[0].text,
            "@article{search_dummy,\n abstract = {search_query\nsomething else"
        );
        assert_eq!(matches[0].spans, vec![Span::new(36, 48)]);
        assert_eq!(matches[0].source, MatchSource::Entry);
    }

    #[test]
    fn test_entry_search_ignore_case() {
        assert!(run(&search_dummy(), "SEARCH_QUERY", &options()).is_empty());
        let matches = run(&search_dummy(), "SEARCH_QUERY", &options().with_ignore_case(true));
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn test_entry_search_fuzzy() {
        let matches = run(&search_dummy(), "Lettesr", &options().with_fuzziness(1));
        assert_eq!(matches.len(), 1);
        let journal = matches[0]
            .lines()
            .into_iter()
            .position(|line| line.starts_with(" journal"))
            .unwrap();
        let offset: usize = matches[0].lines()[..journal].iter().map(|l| l.len() + 1).sum();
        assert_eq!(matches[0].spans, vec![Span::new(offset + 46, offset + 52)]);
    }

    #[test]
    fn test_entry_search_decode_latex() {
        assert!(run(&search_dummy(), "Kör", &options()).is_empty());

        let matches = run(&search_dummy(), "Kör", &options().with_decode_latex(true));
        assert_eq!(matches.len(), 1);
        assert!(matches[0].text.contains(r#"K{\"o}rper"#));
        let title = matches[0]
            .lines()
            .into_iter()
            .position(|line| line.starts_with(" title"))
            .unwrap();
        let offset: usize = matches[0].lines()[..title].iter().map(|l| l.len() + 1).sum();
        assert_eq!(matches[0].spans, vec![Span::new(offset + 38, offset + 42)]);
    }

    #[test]
    fn test_entry_search_decode_unicode() {
        let mut entry = Entry::new("koerper").unwrap();
        entry.set_field("title", "Körper").unwrap();
        assert!(run(&entry, "Kor", &options()).is_empty());
        let matches = run(&entry, "Kor", &options().with_decode_unicode(true));
        assert_eq!(matches.len(), 1);
        assert!(matches[0].text.contains("Körper"));
    }

    #[test]
    fn test_invalid_query() {
        let searcher = StubSearcher::new(&[]);
        let result = search_dummy().search(
            &["(".to_string()],
            &options(),
            &searcher,
            &ListSeparators::default(),
        );
        assert!(matches!(result, Err(BibError::InvalidPattern { .. })));
    }

    #[test]
    fn test_attached_files() {
        let dir = TempDir::new().unwrap();
        let existing = dir.path().join("paper.txt");
        std::fs::write(&existing, "irrelevant").unwrap();
        let missing = dir.path().join("missing.txt");

        let mut entry = Entry::new("files").unwrap();
        entry
            .set_field(
                "file",
                vec![
                    missing.to_string_lossy().into_owned(),
                    existing.to_string_lossy().into_owned(),
                ],
            )
            .unwrap();

        let searcher = StubSearcher::new(&["before\nthe query here\nafter"]);
        let matches = entry
            .search(
                &["query".to_string()],
                &options().with_context(3),
                &searcher,
                &ListSeparators::default(),
            )
            .unwrap();

        let calls = searcher.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "query");
        assert_eq!(calls[0].2, 3);

        let file_matches: Vec<&Match> = matches
            .iter()
            .filter(|m| matches!(m.source, MatchSource::File(_)))
            .collect();
        assert_eq!(file_matches.len(), 1);
        assert_eq!(file_matches[0].spans, vec![Span::new(11, 16)]);
    }

    #[test]
    fn test_skip_files_and_tool_failure() {
        let dir = TempDir::new().unwrap();
        let existing = dir.path().join("paper.txt");
        std::fs::write(&existing, "query").unwrap();

        let mut entry = Entry::new("files").unwrap();
        entry
            .set_field("file", existing.to_string_lossy().into_owned())
            .unwrap();

        let searcher = StubSearcher::new(&["query"]);
        let matches = entry
            .search(
                &["query".to_string()],
                &options().with_skip_files(true),
                &searcher,
                &ListSeparators::default(),
            )
            .unwrap();
        assert!(matches.is_empty());
        assert!(searcher.calls.lock().unwrap().is_empty());

        let matches = entry
            .search(
                &["query".to_string()],
                &options(),
                &FailingSearcher,
                &ListSeparators::default(),
            )
            .unwrap();
        assert!(matches.is_empty());
    }

    #[test]
    fn test_parse_blocks() {
        let out = "a\nb match\nc\n--\nx match\ny\n";
        assert_eq!(parse_blocks(out), vec!["a\nb match\nc", "x match\ny"]);
        assert!(parse_blocks("").is_empty());
    }

    #[test]
    fn test_grep_missing_program() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("paper.txt");
        std::fs::write(&path, "alpha\n").unwrap();

        let searcher = GrepSearcher::new("bibkeep-no-such-grep");
        let err = searcher.search_file("alpha", &path, 0).unwrap_err();
        assert!(matches!(
            err,
            BibError::ExternalTool { ref program, .. } if program == "bibkeep-no-such-grep"
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_grep_exit_codes() {
        if Command::new("grep").arg("--version").output().is_err() {
            return;
        }
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("paper.txt");
        std::fs::write(&path, "alpha\nbeta\ngamma\n").unwrap();
        let searcher = GrepSearcher::new("grep");

        assert!(searcher.search_file("delta", &path, 0).unwrap().is_empty());
        assert_eq!(searcher.search_file("beta", &path, 0).unwrap(), vec!["beta"]);
        assert_eq!(
            searcher.search_file("beta", &path, 1).unwrap(),
            vec!["alpha\nbeta\ngamma"]
        );

        let missing = temp.path().join("missing.txt");
        assert!(matches!(
            searcher.search_file("beta", &missing, 0),
            Err(BibError::ExternalTool { .. })
        ));
    }
}
