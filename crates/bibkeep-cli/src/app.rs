//! Application state management.

use crate::FilterArgs;
use anyhow::Context;
use bibkeep_core::{CompiledFilter, Config, Filter, ListSeparators, RecordStore};
use tracing::info;

/// Shared application state.
pub struct App {
    /// Configuration
    pub config: Config,

    /// The bibliography database
    pub store: RecordStore,
}

impl App {
    /// Create a new application instance, reading the database.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let store = RecordStore::open(&config)?;

        info!(
            path = %store.path().display(),
            entries = store.len(),
            "Application initialized"
        );

        Ok(App { config, store })
    }

    pub fn separators(&self) -> &ListSeparators {
        &self.config.database.stringify.list_separator
    }

    /// Save all pending changes to disk.
    pub fn save(&mut self) -> anyhow::Result<()> {
        self.store.save()?;
        Ok(())
    }
}

/// Build a compiled filter from command-line filter options.
pub fn build_filter(args: &FilterArgs) -> anyhow::Result<CompiledFilter> {
    let mut filter = Filter::new()
        .with_or(args.or)
        .with_ignore_case(args.ignore_case)
        .with_decode_latex(args.decode_latex)
        .with_decode_unicode(args.decode_unicode)
        .with_fuzziness(args.fuzziness);

    for (raw, positive) in args
        .include
        .iter()
        .map(|raw| (raw, true))
        .chain(args.exclude.iter().map(|raw| (raw, false)))
    {
        let (field, pattern) = raw
            .split_once('=')
            .with_context(|| format!("Filter '{}' is not of the form FIELD=REGEX", raw))?;
        filter = filter.with_rule(field, positive, pattern);
    }

    Ok(filter.compile()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bibkeep_core::Entry;

    fn entry(fields: &[(&str, &str)]) -> Entry {
        let mut entry = Entry::new("test").unwrap();
        for (name, value) in fields {
            entry.set_field(name, *value).unwrap();
        }
        entry
    }

    fn args(include: &[&str], exclude: &[&str]) -> FilterArgs {
        FilterArgs {
            include: include.iter().map(|s| s.to_string()).collect(),
            exclude: exclude.iter().map(|s| s.to_string()).collect(),
            ..FilterArgs::default()
        }
    }

    #[test]
    fn test_build_filter() {
        let seps = ListSeparators::default();
        let filter = build_filter(&args(&["year=2020"], &["tags=read"])).unwrap();
        assert!(entry(&[("year", "2020")]).matches(&filter, &seps));
        assert!(!entry(&[("year", "2020"), ("tags", "read")]).matches(&filter, &seps));
        assert!(!entry(&[("year", "2021")]).matches(&filter, &seps));
    }

    #[test]
    fn test_malformed_filter() {
        assert!(build_filter(&args(&["year"], &[])).is_err());
        assert!(build_filter(&args(&["year=("], &[])).is_err());
    }
}
