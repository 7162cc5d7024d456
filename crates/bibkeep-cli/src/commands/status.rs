//! Status command - show database status.

use crate::app::App;
use bibkeep_core::{Cache, Config};
use chrono::{DateTime, Local};
use std::collections::BTreeMap;
use std::fs;

/// Run the status command.
pub fn run(config: Config) -> anyhow::Result<()> {
    let app = App::new(config)?;
    let path = app.store.path();

    println!("bibkeep Database Status");
    println!("=======================");
    println!();
    println!("Database file: {}", path.display());

    let metadata = fs::metadata(path)?;
    println!("  Size:          {} bytes", metadata.len());
    if let Ok(modified) = metadata.modified() {
        let modified: DateTime<Local> = modified.into();
        println!("  Last modified: {}", modified.format("%Y-%m-%d %H:%M:%S"));
    }

    if app.store.is_empty() {
        println!();
        println!("Database is empty. Run 'bibkeep add <file>' to add entries.");
        return Ok(());
    }

    let mut types: BTreeMap<&str, usize> = BTreeMap::new();
    let mut files = 0;
    for (_, entry) in app.store.iter() {
        *types.entry(entry.entry_type()).or_default() += 1;
        files += entry.files().len();
    }

    println!();
    println!("Summary:");
    println!("  Total entries:  {}", app.store.len());
    println!("  Attached files: {}", files);
    for (kind, count) in &types {
        println!("    {:<12} {}", kind, count);
    }

    println!();
    match app.config.cache_dir()? {
        Some(dir) => {
            let cache = Cache::new(dir).path_for(path);
            let state = if cache.exists() { "present" } else { "not written yet" };
            println!("Cache: {} ({})", cache.display(), state);
        }
        None => println!("Cache: disabled"),
    }

    Ok(())
}
