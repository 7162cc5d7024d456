//! # bibkeep core library
//!
//! This crate provides the record store, filtering and search functionality
//! for bibkeep, a bibliography manager that keeps its entries in a single
//! plain-text YAML file meant to live under version control.
//!
//! ## Architecture
//!
//! - **Entries** (`entry`, `value`, `author`): the data model and the
//!   normalisation applied when fields are set
//! - **Format** (`yaml`, `bibtex`, `latex`, `ascii`): the database file
//!   format, BibTeX rendering, LaTeX escapes and ASCII transliteration
//! - **Store** (`store`, `cache`): the in-memory collection with
//!   minimal-diff saving and an optional binary parse cache
//! - **Queries** (`pattern`, `filter`, `search`): per-field filters and
//!   context-windowed full-text search
//! - **Config** (`config`, `label`, `paths`): configuration, label
//!   disambiguation and attached-file paths
//!
//! ## Example
//!
//! ```rust,ignore
//! use bibkeep_core::{Config, Filter, RecordStore};
//!
//! let config = Config::load()?;
//! let mut store = RecordStore::open(&config)?;
//!
//! let filter = Filter::new().include("year", "2020").compile()?;
//! let separators = &config.database.stringify.list_separator;
//! for (label, entry) in store.iter() {
//!     if entry.matches(&filter, separators) {
//!         println!("{}", label);
//!     }
//! }
//!
//! store.remove("knuth")?;
//! store.save()?;
//! ```

pub mod ascii;
pub mod author;
pub mod bibtex;
pub mod cache;
pub mod config;
pub mod entry;
pub mod error;
pub mod filter;
pub mod label;
pub mod latex;
pub mod paths;
pub mod pattern;
pub mod search;
pub mod store;
pub mod value;
pub mod yaml;

// Re-export commonly used types
pub use author::{Author, AuthorName};
pub use cache::Cache;
pub use config::{AuthorFormat, Config, ListSeparators};
pub use entry::{Entry, ENTRYTYPE};
pub use error::{BibError, Result};
pub use filter::{CompiledFilter, Filter};
pub use label::LabelSuffix;
pub use pattern::Pattern;
pub use search::{FileSearcher, GrepSearcher, Match, MatchSource, SearchOptions, Span};
pub use store::RecordStore;
pub use value::Value;
pub use yaml::YamlCodec;
