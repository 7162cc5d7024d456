//! # bibkeep CLI
//!
//! Command-line interface for the bibkeep bibliography manager.
//!
//! ## Commands
//!
//! - `bibkeep init` - Create an empty database file
//! - `bibkeep add <file>` - Add the entries of a YAML file
//! - `bibkeep list` - List entries, optionally filtered per field
//! - `bibkeep show <label>` - Print one entry
//! - `bibkeep search <query>...` - Full-text search in entries and attached files
//! - `bibkeep delete <label>...` - Remove entries
//! - `bibkeep rename <old> <new>` - Change the label of an entry
//! - `bibkeep export <file>` - Write the database as BibTeX
//! - `bibkeep status` - Show database status
//!
//! ## Example Usage
//!
//! ```bash
//! bibkeep init
//! bibkeep add einstein.yaml
//! bibkeep list -f year=1905 -x tags=read
//! bibkeep search -c 2 --decode-latex Körper
//! ```

mod app;
mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// bibkeep - A plain-text bibliography manager
#[derive(Parser)]
#[command(name = "bibkeep")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by the commands that select entries by field.
#[derive(clap::Args, Clone, Debug, Default)]
pub struct FilterArgs {
    /// Keep entries whose FIELD matches REGEX (FIELD=REGEX, repeatable)
    #[arg(short = 'f', long = "filter", value_name = "FIELD=REGEX")]
    include: Vec<String>,

    /// Drop entries whose FIELD matches REGEX (FIELD=REGEX, repeatable)
    #[arg(short = 'x', long = "exclude", value_name = "FIELD=REGEX")]
    exclude: Vec<String>,

    /// Combine filters with OR instead of AND
    #[arg(long)]
    or: bool,

    /// Match filters case-insensitively
    #[arg(short = 'i', long)]
    ignore_case: bool,

    /// Decode LaTeX escapes before matching
    #[arg(long)]
    decode_latex: bool,

    /// Approximate Unicode with ASCII before matching
    #[arg(long)]
    decode_unicode: bool,

    /// Allowed number of edits for literal patterns
    #[arg(short = 'z', long, default_value = "0")]
    fuzziness: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty database file
    Init,

    /// Add the entries of a YAML file to the database
    Add {
        /// File in the database format ("-" for stdin)
        file: PathBuf,

        /// Replace entries with the same label instead of disambiguating
        #[arg(long)]
        overwrite: bool,
    },

    /// List entries
    #[command(alias = "ls")]
    List {
        #[command(flatten)]
        filter: FilterArgs,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        output: OutputFormat,
    },

    /// Print one entry
    Show {
        label: String,

        /// Print BibTeX instead of the database format
        #[arg(short, long)]
        bibtex: bool,
    },

    /// Search entries and their attached files
    Search {
        /// Regular expressions to search for
        #[arg(required = true)]
        queries: Vec<String>,

        /// Lines of context around each match (default from config)
        #[arg(short = 'C', long)]
        context: Option<usize>,

        /// Search case-insensitively
        #[arg(short = 'i', long)]
        ignore_case: bool,

        /// Do not search attached files
        #[arg(long)]
        skip_files: bool,

        /// Decode LaTeX escapes before searching
        #[arg(long)]
        decode_latex: bool,

        /// Approximate Unicode with ASCII before searching
        #[arg(long)]
        decode_unicode: bool,

        /// Allowed number of edits for literal queries
        #[arg(short = 'z', long, default_value = "0")]
        fuzziness: usize,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        output: OutputFormat,
    },

    /// Remove entries
    #[command(alias = "rm")]
    Delete {
        #[arg(required = true)]
        labels: Vec<String>,
    },

    /// Change the label of an entry
    #[command(alias = "mv")]
    Rename { old: String, new: String },

    /// Export entries as BibTeX
    Export {
        /// Output file ("-" for stdout)
        file: PathBuf,

        #[command(flatten)]
        filter: FilterArgs,

        /// Keep non-ASCII characters instead of writing LaTeX escapes
        #[arg(long)]
        no_encode: bool,
    },

    /// Show database status
    Status,
}

#[derive(Clone, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match &cli.config {
        Some(path) => bibkeep_core::Config::load_from(path)?,
        None => bibkeep_core::Config::load()?,
    };

    // Setup logging
    let log_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => config.general.log_level.as_str(),
            1 => "debug",
            _ => "trace",
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .init();

    // Execute command
    match cli.command {
        Commands::Init => commands::init::run(config),
        Commands::Add { file, overwrite } => commands::add::run(config, &file, overwrite),
        Commands::List { filter, output } => commands::list::run(config, &filter, output),
        Commands::Show { label, bibtex } => commands::show::run(config, &label, bibtex),
        Commands::Search {
            queries,
            context,
            ignore_case,
            skip_files,
            decode_latex,
            decode_unicode,
            fuzziness,
            output,
        } => {
            let options = commands::search::Options {
                context,
                ignore_case,
                skip_files,
                decode_latex,
                decode_unicode,
                fuzziness,
            };
            commands::search::run(config, &queries, options, output)
        }
        Commands::Delete { labels } => commands::delete::run(config, &labels),
        Commands::Rename { old, new } => commands::rename::run(config, &old, &new),
        Commands::Export {
            file,
            filter,
            no_encode,
        } => commands::export::run(config, &file, &filter, !no_encode),
        Commands::Status => commands::status::run(config),
    }
}
