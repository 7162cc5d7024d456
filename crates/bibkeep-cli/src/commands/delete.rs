//! Delete command - remove entries.

use crate::app::App;
use bibkeep_core::Config;

/// Run the delete command.
pub fn run(config: Config, labels: &[String]) -> anyhow::Result<()> {
    let mut app = App::new(config)?;

    for label in labels {
        app.store.remove(label)?;
    }
    app.save()?;

    println!("Removed {} entries.", labels.len());
    Ok(())
}
