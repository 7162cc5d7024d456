//! Show command - print one entry.

use crate::app::App;
use bibkeep_core::{bibtex, Config};

/// Run the show command.
pub fn run(config: Config, label: &str, as_bibtex: bool) -> anyhow::Result<()> {
    let app = App::new(config)?;
    let entry = app.store.require(label)?;

    if as_bibtex {
        print!("{}", bibtex::render(entry, app.separators(), true));
    } else {
        print!("{}", app.store.codec().serialize(entry));
    }

    Ok(())
}
