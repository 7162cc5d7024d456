//! Rename command - change the label of an entry.

use crate::app::App;
use bibkeep_core::Config;

/// Run the rename command.
pub fn run(config: Config, old: &str, new: &str) -> anyhow::Result<()> {
    let mut app = App::new(config)?;

    app.store.relabel(old, new)?;
    app.save()?;

    println!("Renamed '{}' to '{}'.", old, new);
    Ok(())
}
