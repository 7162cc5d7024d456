//! Binary cache of parsed databases.
//!
//! One cache file is kept per database file. Its name is derived from the
//! database path by joining the path components with `%2f`, so
//! `/home/me/literature.yaml` is cached as `home%2fme%2fliterature.cache`.
//!
//! ## Cache File Format
//!
//! ```text
//! [Header: bincode]
//!   - Magic: "BIBK" (4 bytes)
//!   - Version: u32
//!   - Flags: u32 - compression
//!   - Entry count: u64
//!   - Written at: i64 (milliseconds since the Unix epoch)
//!
//! [Entries: variable]
//!   - bincode data, LZ4 compressed when flagged
//!
//! [Footer: 8 bytes]
//!   - CRC32 checksum of the entries section: u32
//!   - Magic: "KBIB" (4 bytes)
//! ```
//!
//! A cache written before the database file was last modified is stale and
//! ignored.

use crate::entry::Entry;
use crate::error::{BibError, Result};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

/// Magic bytes at the start of cache files
pub const MAGIC_HEADER: &[u8; 4] = b"BIBK";
/// Magic bytes at the end of cache files (reversed)
pub const MAGIC_FOOTER: &[u8; 4] = b"KBIB";
/// Current cache format version
pub const CACHE_VERSION: u32 = 1;

const FLAG_LZ4: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheHeader {
    magic: [u8; 4],
    version: u32,
    flags: u32,
    entry_count: u64,
    written_at: i64,
}

impl CacheHeader {
    fn validate(&self) -> Result<()> {
        if self.magic != *MAGIC_HEADER {
            return Err(BibError::cache("invalid magic bytes in header"));
        }
        if self.version != CACHE_VERSION {
            return Err(BibError::cache(format!(
                "unsupported cache version {} (expected {})",
                self.version, CACHE_VERSION
            )));
        }
        Ok(())
    }
}

/// Location and settings of the parse cache.
#[derive(Debug, Clone)]
pub struct Cache {
    dir: PathBuf,
    use_compression: bool,
}

impl Cache {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Cache {
            dir: dir.as_ref().to_path_buf(),
            use_compression: true,
        }
    }

    /// Set whether to use compression when storing.
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.use_compression = compress;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The cache file used for `database`.
    pub fn path_for(&self, database: &Path) -> PathBuf {
        let database = database
            .canonicalize()
            .unwrap_or_else(|_| database.to_path_buf());
        let name = database
            .components()
            .filter_map(|component| match component {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("%2f");
        self.dir.join(name).with_extension("cache")
    }

    /// Load the cached entries of `database`.
    ///
    /// Returns `Ok(None)` when there is no cache yet or it is older than the
    /// database file.
    pub fn load(&self, database: &Path) -> Result<Option<IndexMap<String, Entry>>> {
        let cache_path = self.path_for(database);
        if !cache_path.exists() {
            debug!(path = %cache_path.display(), "The database has not been cached yet");
            return Ok(None);
        }

        let file = File::open(&cache_path)?;
        let mut reader = BufReader::new(file);
        let header: CacheHeader = bincode::deserialize_from(&mut reader)?;
        header.validate()?;

        let modified = modified_millis(database)?;
        if header.written_at < modified {
            debug!(path = %cache_path.display(), "The cached database is outdated");
            return Ok(None);
        }

        let mut rest = Vec::new();
        reader.read_to_end(&mut rest)?;
        if rest.len() < 8 {
            return Err(BibError::cache("truncated cache file"));
        }
        let (data, footer) = rest.split_at(rest.len() - 8);

        if &footer[4..8] != MAGIC_FOOTER {
            return Err(BibError::cache("invalid footer magic bytes"));
        }
        let stored_checksum = u32::from_le_bytes([footer[0], footer[1], footer[2], footer[3]]);
        let computed_checksum = crc32fast::hash(data);
        if stored_checksum != computed_checksum {
            return Err(BibError::cache(format!(
                "checksum mismatch: expected {:08x}, got {:08x}",
                stored_checksum, computed_checksum
            )));
        }

        let entries: Vec<Entry> = if header.flags & FLAG_LZ4 != 0 {
            let bytes = lz4_flex::decompress_size_prepended(data)
                .map_err(|e| BibError::cache(format!("decompression failed: {}", e)))?;
            bincode::deserialize(&bytes)?
        } else {
            bincode::deserialize(data)?
        };
        if entries.len() as u64 != header.entry_count {
            return Err(BibError::cache("entry count does not match the header"));
        }

        info!(
            path = %cache_path.display(),
            entries = entries.len(),
            "Read the database from the cache"
        );
        Ok(Some(
            entries
                .into_iter()
                .map(|entry| (entry.label().to_string(), entry))
                .collect(),
        ))
    }

    /// Store `entries` as the cache of `database`.
    ///
    /// Uses atomic write (write to temp, then rename).
    pub fn store(&self, database: &Path, entries: &IndexMap<String, Entry>) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let cache_path = self.path_for(database);

        let records: Vec<&Entry> = entries.values().collect();
        let bytes = bincode::serialize(&records)?;
        let (flags, data) = if self.use_compression {
            (FLAG_LZ4, lz4_flex::compress_prepend_size(&bytes))
        } else {
            (0, bytes)
        };

        let header = CacheHeader {
            magic: *MAGIC_HEADER,
            version: CACHE_VERSION,
            flags,
            entry_count: records.len() as u64,
            written_at: Utc::now().timestamp_millis(),
        };

        let temp_path = cache_path.with_extension("cache.tmp");
        {
            let file = File::create(&temp_path)?;
            let mut writer = BufWriter::new(file);
            bincode::serialize_into(&mut writer, &header)?;
            writer.write_all(&data)?;
            writer.write_all(&crc32fast::hash(&data).to_le_bytes())?;
            writer.write_all(MAGIC_FOOTER)?;
            writer.flush()?;
        }
        fs::rename(&temp_path, &cache_path)?;

        debug!(
            path = %cache_path.display(),
            entries = records.len(),
            compressed = self.use_compression,
            "Cached the database"
        );
        Ok(())
    }

    /// Delete the cache of `database`, if any.
    pub fn clear(&self, database: &Path) -> Result<()> {
        let cache_path = self.path_for(database);
        if cache_path.exists() {
            fs::remove_file(&cache_path)?;
            info!(path = %cache_path.display(), "Removed the cached database");
        }
        Ok(())
    }
}

fn modified_millis(path: &Path) -> Result<i64> {
    let modified = fs::metadata(path)?.modified()?;
    Ok(DateTime::<Utc>::from(modified).timestamp_millis())
}
