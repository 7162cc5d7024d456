//! Per-field entry filtering.
//!
//! A [`Filter`] maps `(field, positive)` keys to lists of regex patterns.
//! Every pattern contributes one boolean to the result: for a positive key
//! it is `true` when the pattern matches the field, for a negative key when
//! it does not. A field missing from an entry contributes `!positive`. The
//! booleans are combined with AND, or with OR when requested.
//!
//! | filter                            | or    | meaning                           |
//! | --------------------------------- | ----- | --------------------------------- |
//! | `year=2020`                       | any   | year contains 2020                |
//! | `not year=2020`                   | any   | year does not contain 2020        |
//! | `year=2020`, `year=2021`          | true  | year contains 2020 or 2021        |
//! | `not year=2020`, `not year=2021`  | false | year contains neither             |

use crate::ascii;
use crate::error::Result;
use crate::latex;
use crate::pattern::Pattern;
use indexmap::IndexMap;

/// A declarative filter over entry fields.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    rules: IndexMap<(String, bool), Vec<String>>,
    or: bool,
    ignore_case: bool,
    decode_unicode: bool,
    decode_latex: bool,
    fuzziness: usize,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `field` to match `pattern`.
    pub fn include(self, field: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.with_rule(field, true, pattern)
    }

    /// Require `field` not to match `pattern`.
    pub fn exclude(self, field: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.with_rule(field, false, pattern)
    }

    /// Add a pattern under the `(field, positive)` key.
    pub fn with_rule(
        mut self,
        field: impl Into<String>,
        positive: bool,
        pattern: impl Into<String>,
    ) -> Self {
        self.rules
            .entry((field.into(), positive))
            .or_default()
            .push(pattern.into());
        self
    }

    /// Combine the individual results with OR instead of AND.
    pub fn with_or(mut self, or: bool) -> Self {
        self.or = or;
        self
    }

    pub fn with_ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }

    /// Approximate field values with ASCII before matching.
    pub fn with_decode_unicode(mut self, decode: bool) -> Self {
        self.decode_unicode = decode;
        self
    }

    /// Decode LaTeX escapes in field values before matching.
    pub fn with_decode_latex(mut self, decode: bool) -> Self {
        self.decode_latex = decode;
        self
    }

    pub fn with_fuzziness(mut self, fuzziness: usize) -> Self {
        self.fuzziness = fuzziness;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Compile every pattern. Invalid patterns are an error.
    pub fn compile(&self) -> Result<CompiledFilter> {
        let mut rules = Vec::with_capacity(self.rules.len());
        for ((field, positive), patterns) in &self.rules {
            let compiled = patterns
                .iter()
                .map(|p| Pattern::compile(p, self.ignore_case, self.fuzziness))
                .collect::<Result<Vec<_>>>()?;
            rules.push(CompiledRule {
                field: field.clone(),
                positive: *positive,
                patterns: compiled,
            });
        }
        Ok(CompiledFilter {
            rules,
            or: self.or,
            decode_unicode: self.decode_unicode,
            decode_latex: self.decode_latex,
        })
    }
}

#[derive(Debug, Clone)]
struct CompiledRule {
    field: String,
    positive: bool,
    patterns: Vec<Pattern>,
}

/// A filter with all patterns compiled, ready to be applied to entries.
#[derive(Debug, Clone)]
pub struct CompiledFilter {
    rules: Vec<CompiledRule>,
    or: bool,
    decode_unicode: bool,
    decode_latex: bool,
}

impl CompiledFilter {
    /// Evaluate against stringified entry fields.
    ///
    /// An empty filter matches everything.
    pub fn matches(&self, fields: &IndexMap<String, String>) -> bool {
        if self.rules.is_empty() {
            return true;
        }

        let mut results = Vec::new();
        for rule in &self.rules {
            let Some(raw) = fields.get(&rule.field) else {
                results.push(!rule.positive);
                continue;
            };

            let mut data = if self.decode_latex {
                latex::decode(raw)
            } else {
                raw.clone()
            };
            if self.decode_unicode {
                data = ascii::fold(&data);
            }

            for pattern in &rule.patterns {
                let hit = pattern.is_match(&data);
                results.push(if hit { rule.positive } else { !rule.positive });
            }
        }

        if self.or {
            results.into_iter().any(|r| r)
        } else {
            results.into_iter().all(|r| r)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_positive_and_negative() {
        let y2020 = fields(&[("year", "2020")]);
        let y2021 = fields(&[("year", "2021")]);

        let filter = Filter::new().include("year", "2020").compile().unwrap();
        assert!(filter.matches(&y2020));
        assert!(!filter.matches(&y2021));

        let filter = Filter::new().exclude("year", "2020").compile().unwrap();
        assert!(!filter.matches(&y2020));
        assert!(filter.matches(&y2021));
    }

    #[test]
    fn test_or_and_semantics() {
        let both = fields(&[("year", "2020"), ("author", "Einstein, Albert")]);
        let one = fields(&[("year", "2020"), ("author", "Bohr, Niels")]);

        let and = Filter::new()
            .include("year", "2020")
            .include("author", "Einstein")
            .compile()
            .unwrap();
        assert!(and.matches(&both));
        assert!(!and.matches(&one));

        let or = Filter::new()
            .include("year", "2020")
            .include("author", "Einstein")
            .with_or(true)
            .compile()
            .unwrap();
        assert!(or.matches(&both));
        assert!(or.matches(&one));
    }

    #[test]
    fn test_patterns_under_one_key() {
        let filter = Filter::new()
            .include("year", "2020")
            .include("year", "2021")
            .with_or(true)
            .compile()
            .unwrap();
        assert!(filter.matches(&fields(&[("year", "2021")])));

        let filter = Filter::new()
            .include("year", "2020")
            .include("year", "2021")
            .compile()
            .unwrap();
        assert!(!filter.matches(&fields(&[("year", "2021")])));
    }

    #[test]
    fn test_missing_field() {
        let entry = fields(&[("title", "Something")]);
        let positive = Filter::new().include("year", "2020").compile().unwrap();
        assert!(!positive.matches(&entry));
        let negative = Filter::new().exclude("year", "2020").compile().unwrap();
        assert!(negative.matches(&entry));
    }

    #[test]
    fn test_ignore_case_and_decoding() {
        let entry = fields(&[("title", r#"Zur Elektrodynamik bewegter K{\"o}rper"#)]);

        let filter = Filter::new().include("title", "körper").compile().unwrap();
        assert!(!filter.matches(&entry));

        let filter = Filter::new()
            .include("title", "körper")
            .with_ignore_case(true)
            .with_decode_latex(true)
            .compile()
            .unwrap();
        assert!(filter.matches(&entry));

        let filter = Filter::new()
            .include("title", "Korper")
            .with_decode_latex(true)
            .with_decode_unicode(true)
            .compile()
            .unwrap();
        assert!(filter.matches(&entry));
    }

    #[test]
    fn test_fuzzy_filter() {
        let entry = fields(&[("author", "Einstein, Albert")]);
        let filter = Filter::new()
            .include("author", "Einstien")
            .with_fuzziness(2)
            .compile()
            .unwrap();
        assert!(filter.matches(&entry));
    }

    #[test]
    fn test_empty_filter_matches() {
        let filter = Filter::new().with_or(true).compile().unwrap();
        assert!(filter.matches(&fields(&[("year", "2020")])));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(Filter::new().include("year", "(").compile().is_err());
    }
}
