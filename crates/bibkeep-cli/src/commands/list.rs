//! List command - print entries matching a filter.

use crate::app::{build_filter, App};
use crate::{FilterArgs, OutputFormat};
use bibkeep_core::Config;

/// Run the list command.
pub fn run(config: Config, args: &FilterArgs, output: OutputFormat) -> anyhow::Result<()> {
    let app = App::new(config)?;
    let filter = build_filter(args)?;
    let separators = app.separators();

    let entries: Vec<_> = app
        .store
        .iter()
        .filter(|(_, entry)| entry.matches(&filter, separators))
        .collect();

    match output {
        OutputFormat::Text => {
            let width = entries.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
            for (label, entry) in &entries {
                let title = entry
                    .get("title")
                    .map(|title| title.join(", "))
                    .unwrap_or_default();
                println!("{:width$}  {:<14} {}", label, entry.entry_type(), title);
            }

            eprintln!();
            eprintln!("{} of {} entries", entries.len(), app.store.len());
        }
        OutputFormat::Json => {
            let json_entries: Vec<_> = entries
                .iter()
                .map(|(_, entry)| entry.stringify(false, separators))
                .collect();

            println!("{}", serde_json::to_string_pretty(&json_entries)?);
        }
    }

    Ok(())
}
