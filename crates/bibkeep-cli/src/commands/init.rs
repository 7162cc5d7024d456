//! Init command - create an empty database file.

use bibkeep_core::{Config, RecordStore};

/// Run the init command.
pub fn run(config: Config) -> anyhow::Result<()> {
    let store = RecordStore::from_config(&config)?;

    if store.init()? {
        println!("Initialized empty database at {}", store.path().display());
    } else {
        println!("Database {} already exists, leaving it untouched.", store.path().display());
    }

    Ok(())
}
