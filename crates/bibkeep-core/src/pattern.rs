//! Compiled query patterns.
//!
//! A pattern is either a regular expression or, when errors are allowed,
//! an approximate matcher for literal text that accepts up to `k`
//! insertions, deletions or substitutions.

use crate::error::{BibError, Result};
use regex::{Regex, RegexBuilder};
use std::fmt;
use tracing::warn;

/// A query pattern ready for matching.
#[derive(Clone)]
pub struct Pattern {
    source: String,
    matcher: Matcher,
}

#[derive(Clone)]
enum Matcher {
    Regex(Regex),
    Approx(ApproxMatcher),
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.matcher {
            Matcher::Regex(_) => "regex",
            Matcher::Approx(_) => "approx",
        };
        f.debug_struct("Pattern")
            .field("source", &self.source)
            .field("kind", &kind)
            .finish()
    }
}

impl Pattern {
    /// Compile a regex pattern.
    pub fn regex(pattern: &str, ignore_case: bool) -> Result<Self> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(ignore_case)
            .build()
            .map_err(|e| BibError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Pattern {
            source: pattern.to_string(),
            matcher: Matcher::Regex(regex),
        })
    }

    /// Compile a pattern allowing up to `fuzziness` errors.
    ///
    /// Approximate matching is only available for literal patterns. A
    /// pattern using regex syntax falls back to exact matching.
    pub fn compile(pattern: &str, ignore_case: bool, fuzziness: usize) -> Result<Self> {
        if fuzziness == 0 {
            return Self::regex(pattern, ignore_case);
        }
        if !is_literal(pattern) {
            warn!(
                pattern = %pattern,
                fuzziness,
                "Approximate matching needs a literal pattern, falling back to fuzziness 0"
            );
            return Self::regex(pattern, ignore_case);
        }
        Ok(Pattern {
            source: pattern.to_string(),
            matcher: Matcher::Approx(ApproxMatcher::new(pattern, fuzziness, ignore_case)),
        })
    }

    /// The pattern as written.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_fuzzy(&self) -> bool {
        matches!(self.matcher, Matcher::Approx(_))
    }

    pub fn is_match(&self, text: &str) -> bool {
        match self.matcher {
            Matcher::Regex(ref re) => re.is_match(text),
            Matcher::Approx(ref approx) => !approx.find_iter(text).is_empty(),
        }
    }

    /// Byte ranges of all non-overlapping matches in `text`.
    pub fn find_iter(&self, text: &str) -> Vec<(usize, usize)> {
        match self.matcher {
            Matcher::Regex(ref re) => re
                .find_iter(text)
                .filter(|m| !m.as_str().is_empty())
                .map(|m| (m.start(), m.end()))
                .collect(),
            Matcher::Approx(ref approx) => approx.find_iter(text),
        }
    }
}

/// True if `pattern` has no regex meta characters.
pub fn is_literal(pattern: &str) -> bool {
    !pattern.contains(|c: char| r"\.+*?()|[]{}^$".contains(c))
}

/// Bounded edit distance search (Sellers' algorithm).
#[derive(Debug, Clone)]
struct ApproxMatcher {
    pattern: Vec<char>,
    max_errors: usize,
    ignore_case: bool,
}

impl ApproxMatcher {
    fn new(pattern: &str, max_errors: usize, ignore_case: bool) -> Self {
        let pattern = pattern
            .chars()
            .map(|c| fold(c, ignore_case))
            .collect::<Vec<_>>();
        ApproxMatcher {
            pattern,
            max_errors,
            ignore_case,
        }
    }

    fn find_iter(&self, text: &str) -> Vec<(usize, usize)> {
        let indexed: Vec<(usize, char)> = text.char_indices().collect();
        let chars: Vec<char> = indexed
            .iter()
            .map(|(_, c)| fold(*c, self.ignore_case))
            .collect();
        let byte_at = |idx: usize| indexed.get(idx).map(|(b, _)| *b).unwrap_or(text.len());

        let mut spans = Vec::new();
        let mut from = 0;
        while from < chars.len() {
            let Some(end) = self.first_end(&chars, from) else {
                break;
            };
            let start = self.best_start(&chars, from, end);
            spans.push((byte_at(start), byte_at(end)));
            from = end;
        }
        spans
    }

    /// End (exclusive) of the first approximate occurrence at or after
    /// `from`, extended for as long as the cost does not rise.
    fn first_end(&self, text: &[char], from: usize) -> Option<usize> {
        let m = self.pattern.len();
        if m == 0 {
            return None;
        }

        let mut column: Vec<usize> = (0..=m).collect();
        let mut best: Option<(usize, usize)> = None;
        for (j, &t) in text.iter().enumerate().skip(from) {
            let mut next = vec![0; m + 1];
            for i in 1..=m {
                let substitution = column[i - 1] + usize::from(self.pattern[i - 1] != t);
                next[i] = substitution.min(column[i] + 1).min(next[i - 1] + 1);
            }
            column = next;

            let cost = column[m];
            match best {
                Some((_, best_cost)) if cost <= best_cost => best = Some((j + 1, cost)),
                Some((end, _)) => return Some(end),
                None if cost <= self.max_errors => best = Some((j + 1, cost)),
                None => {}
            }
        }
        best.map(|(end, _)| end)
    }

    /// Start of the cheapest occurrence ending at `end`, preferring the
    /// longest one on ties.
    fn best_start(&self, text: &[char], from: usize, end: usize) -> usize {
        let m = self.pattern.len();
        let lowest = end
            .saturating_sub(m + self.max_errors)
            .max(from);

        // Edit distance of reversed pattern prefixes against text[s..end].
        let mut row: Vec<usize> = (0..=m).collect();
        let mut best = (end.saturating_sub(1).max(lowest), usize::MAX);
        for s in (lowest..end).rev() {
            let t = text[s];
            let mut next = vec![end - s; m + 1];
            for i in 1..=m {
                let p = self.pattern[m - i];
                let substitution = row[i - 1] + usize::from(p != t);
                next[i] = substitution.min(row[i] + 1).min(next[i - 1] + 1);
            }
            row = next;
            if row[m] <= best.1 {
                best = (s, row[m]);
            }
        }
        best.0
    }
}

fn fold(c: char, ignore_case: bool) -> char {
    if ignore_case {
        c.to_lowercase().next().unwrap_or(c)
    } else {
        c
    }
}
