//! Export command - write entries as BibTeX.

use crate::app::{build_filter, App};
use crate::FilterArgs;
use anyhow::Context;
use bibkeep_core::{bibtex, Config};
use std::fs;
use std::path::Path;

/// Run the export command.
pub fn run(config: Config, file: &Path, args: &FilterArgs, encode: bool) -> anyhow::Result<()> {
    let app = App::new(config)?;
    let filter = build_filter(args)?;
    let separators = app.separators();

    let entries: Vec<_> = app
        .store
        .iter()
        .map(|(_, entry)| entry)
        .filter(|entry| entry.matches(&filter, separators))
        .collect();
    let text = bibtex::render_all(entries.iter().copied(), separators, encode);

    if file == Path::new("-") {
        print!("{}", text);
    } else {
        fs::write(file, text).with_context(|| format!("Could not write {}", file.display()))?;
        eprintln!("Exported {} entries to {}", entries.len(), file.display());
    }

    Ok(())
}
