//! Search command - full-text search in entries and attached files.

use crate::app::App;
use crate::OutputFormat;
use bibkeep_core::{Config, GrepSearcher, Match, MatchSource, Pattern, SearchOptions};
use rayon::prelude::*;
use std::time::Instant;

/// Command-line overrides of the configured search options.
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub context: Option<usize>,
    pub ignore_case: bool,
    pub skip_files: bool,
    pub decode_latex: bool,
    pub decode_unicode: bool,
    pub fuzziness: usize,
}

impl Options {
    fn resolve(&self, config: &Config) -> SearchOptions {
        let base = SearchOptions::from_config(&config.search);
        let context = self.context.unwrap_or(base.context);
        let ignore_case = self.ignore_case || base.ignore_case;
        base.with_context(context)
            .with_ignore_case(ignore_case)
            .with_skip_files(self.skip_files)
            .with_decode_latex(self.decode_latex)
            .with_decode_unicode(self.decode_unicode)
            .with_fuzziness(self.fuzziness)
    }
}

/// Run the search command.
pub fn run(
    config: Config,
    queries: &[String],
    options: Options,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let app = App::new(config)?;
    let options = options.resolve(&app.config);
    let searcher = GrepSearcher::from_config(&app.config.search);
    let separators = app.separators();

    for query in queries {
        Pattern::regex(query, options.ignore_case)?;
    }

    let start = Instant::now();
    let entries: Vec<_> = app.store.iter().map(|(_, entry)| entry).collect();
    let results: Vec<(&str, Vec<Match>)> = entries
        .par_iter()
        .map(|entry| {
            entry
                .search(queries, &options, &searcher, separators)
                .map(|matches| (entry.label(), matches))
        })
        .filter(|result| !matches!(result, Ok((_, matches)) if matches.is_empty()))
        .collect::<bibkeep_core::Result<_>>()?;
    let elapsed = start.elapsed();

    match output {
        OutputFormat::Text => {
            for (label, matches) in &results {
                println!("{}", label);
                for m in matches {
                    if let MatchSource::File(ref path) = m.source {
                        println!("  [{}]", path.display());
                    }
                    for line in m.lines() {
                        println!("    {}", line);
                    }
                    println!("    --");
                }
            }

            let total: usize = results.iter().map(|(_, matches)| matches.len()).sum();
            eprintln!();
            eprintln!(
                "Found {} matches in {} entries in {:.3}ms",
                total,
                results.len(),
                elapsed.as_secs_f64() * 1000.0
            );
        }
        OutputFormat::Json => {
            let json_results: Vec<serde_json::Value> = results
                .iter()
                .map(|(label, matches)| {
                    serde_json::json!({
                        "label": label,
                        "matches": matches,
                    })
                })
                .collect();

            println!("{}", serde_json::to_string_pretty(&json_results)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_uses_config_defaults() {
        let mut config = Config::default();
        config.search.context = 3;
        config.search.ignore_case = true;

        let resolved = Options::default().resolve(&config);
        assert_eq!(resolved.context, 3);
        assert!(resolved.ignore_case);

        let resolved = Options {
            context: Some(0),
            fuzziness: 1,
            ..Options::default()
        }
        .resolve(&config);
        assert_eq!(resolved.context, 0);
        assert_eq!(resolved.fuzziness, 1);
    }
}
