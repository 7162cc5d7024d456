//! Add command - add entries from a file in the database format.

use crate::app::App;
use anyhow::Context;
use bibkeep_core::Config;
use std::fs;
use std::io;
use std::path::Path;
use tracing::info;

/// Run the add command.
pub fn run(config: Config, file: &Path, overwrite: bool) -> anyhow::Result<()> {
    let mut app = App::new(config)?;

    let text = if file == Path::new("-") {
        io::read_to_string(io::stdin())?
    } else {
        fs::read_to_string(file).with_context(|| format!("Could not read {}", file.display()))?
    };
    let entries = app.store.codec().parse(&text)?;

    let mut added = 0;
    for (label, mut entry) in entries {
        if !overwrite {
            let unique = app.store.disambiguate_label_for(&label, &entry);
            if unique != label {
                info!(old = %label, new = %unique, "Adding entry under a new label");
                entry.set_label(unique)?;
            }
        }
        println!("Added '{}'", entry.label());
        app.store.insert(entry);
        added += 1;
    }
    app.save()?;

    eprintln!("Added {} entries to {}", added, app.store.path().display());
    Ok(())
}
