//! The record store.
//!
//! [`RecordStore`] holds the parsed database as an ordered map from label to
//! [`Entry`], mirroring the order of the blocks in the file. Mutations are
//! tracked in a pending overlay:
//!
//! - `Some(label)`: the entry under this key changed, or was renamed to `label`
//! - `None`: the entry was deleted
//!
//! [`RecordStore::save`] rewrites only the blocks named in the overlay and
//! copies every other line of the file through unchanged. Entries without
//! a block in the file are appended at the end.
//!
//! The store has no internal locking. One instance is created per process
//! and passed to whatever needs it.

use crate::cache::Cache;
use crate::config::Config;
use crate::entry::Entry;
use crate::error::{BibError, Result};
use crate::label::LabelSuffix;
use crate::yaml::{self, YamlCodec};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub struct RecordStore {
    path: PathBuf,
    entries: IndexMap<String, Entry>,
    pending: IndexMap<String, Option<String>>,
    codec: YamlCodec,
    label_separator: String,
    label_suffix: LabelSuffix,
    cache: Option<Cache>,
}

impl RecordStore {
    /// Create an empty store backed by `path`. Nothing is read yet.
    pub fn new(path: impl AsRef<Path>) -> Self {
        RecordStore {
            path: path.as_ref().to_path_buf(),
            entries: IndexMap::new(),
            pending: IndexMap::new(),
            codec: YamlCodec::default(),
            label_separator: "_".to_string(),
            label_suffix: LabelSuffix::default(),
            cache: None,
        }
    }

    /// Create an unread store with every setting taken from `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let format = &config.database.format;
        Ok(RecordStore::new(config.database_file()?)
            .with_codec(YamlCodec::from_config(config))
            .with_label_format(format.label_separator.clone(), format.label_suffix)
            .with_cache(config.cache_dir()?.map(Cache::new)))
    }

    /// Create a store from `config` and read the database.
    pub fn open(config: &Config) -> Result<Self> {
        let mut store = RecordStore::from_config(config)?;
        store.read()?;
        Ok(store)
    }

    pub fn with_codec(mut self, codec: YamlCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Set the separator and enumerator used to disambiguate labels.
    pub fn with_label_format(mut self, separator: impl Into<String>, suffix: LabelSuffix) -> Self {
        self.label_separator = separator.into();
        self.label_suffix = suffix;
        self
    }

    pub fn with_cache(mut self, cache: Option<Cache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn codec(&self) -> &YamlCodec {
        &self.codec
    }

    /// Create an empty database file. Returns `false` if one already exists.
    pub fn init(&self) -> Result<bool> {
        if self.path.exists() {
            warn!(path = %self.path.display(), "Database file already exists");
            return Ok(false);
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, "")?;
        info!(path = %self.path.display(), "Initialized an empty database");
        Ok(true)
    }

    /// Reload everything from the database file, discarding pending changes.
    pub fn read(&mut self) -> Result<()> {
        self.read_with(false)
    }

    /// Like [`read`](Self::read), optionally ignoring the cache.
    pub fn read_with(&mut self, bypass_cache: bool) -> Result<()> {
        if !self.path.exists() {
            return Err(BibError::DatabaseMissing {
                path: self.path.clone(),
            });
        }

        if let (Some(cache), false) = (&self.cache, bypass_cache) {
            match cache.load(&self.path) {
                Ok(Some(entries)) => {
                    self.entries = entries;
                    self.pending.clear();
                    return Ok(());
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Ignoring the cached database"),
            }
        }

        info!(path = %self.path.display(), "Loading database file");
        let text = self.read_file()?;
        self.entries = self.codec.parse(&text)?;
        self.pending.clear();
        debug!(entries = self.entries.len(), "Database loaded");

        self.refresh_cache();
        Ok(())
    }

    fn read_file(&self) -> Result<String> {
        fs::read_to_string(&self.path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => BibError::DatabaseMissing {
                path: self.path.clone(),
            },
            _ => BibError::Io(e),
        })
    }

    fn refresh_cache(&self) {
        if let Some(ref cache) = self.cache {
            if let Err(e) = cache.store(&self.path, &self.entries) {
                warn!(error = %e, "Could not cache the database");
            }
        }
    }

    pub fn get(&self, label: &str) -> Option<&Entry> {
        self.entries.get(label)
    }

    /// Like [`get`](Self::get), failing when the label is absent.
    pub fn require(&self, label: &str) -> Result<&Entry> {
        self.entries
            .get(label)
            .ok_or_else(|| BibError::not_found(label))
    }

    pub fn contains(&self, label: &str) -> bool {
        self.entries.contains_key(label)
    }

    /// Entries in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Entry)> {
        self.entries.iter()
    }

    pub fn labels(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn entries(&self) -> &IndexMap<String, Entry> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The changes not yet written by [`save`](Self::save).
    pub fn pending(&self) -> &IndexMap<String, Option<String>> {
        &self.pending
    }

    pub fn is_dirty(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Insert or replace entries, marking each one as changed.
    pub fn upsert<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (String, Entry)>,
    {
        for (label, entry) in entries {
            debug!(entry = %label, "Updating entry");
            self.pending.insert(label.clone(), Some(label.clone()));
            self.entries.insert(label, entry);
        }
    }

    /// Insert or replace one entry under its own label.
    pub fn insert(&mut self, entry: Entry) {
        let label = entry.label().to_string();
        self.upsert([(label, entry)]);
    }

    /// Change an entry in place and mark it as changed.
    pub fn modify<F>(&mut self, label: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut Entry) -> Result<()>,
    {
        let entry = self
            .entries
            .get_mut(label)
            .ok_or_else(|| BibError::not_found(label))?;
        f(entry)?;
        debug!(entry = %label, "Modified entry");
        self.pending.insert(label.to_string(), Some(label.to_string()));
        Ok(())
    }

    pub fn remove(&mut self, label: &str) -> Result<Entry> {
        let entry = self
            .entries
            .shift_remove(label)
            .ok_or_else(|| BibError::not_found(label))?;
        debug!(entry = %label, "Removing entry");
        self.pending.insert(label.to_string(), None);
        Ok(entry)
    }

    /// Record that the block of `old` is to be written as the entry `new`.
    ///
    /// The entries themselves are not touched; see [`relabel`](Self::relabel).
    pub fn rename(&mut self, old: &str, new: &str) {
        debug!(old = %old, new = %new, "Renaming entry");
        for target in self.pending.values_mut() {
            if target.as_deref() == Some(old) {
                *target = Some(new.to_string());
            }
        }
        self.pending.insert(old.to_string(), Some(new.to_string()));
    }

    /// Rename an entry: change its label, re-key it in place and record the
    /// rename.
    pub fn relabel(&mut self, old: &str, new: &str) -> Result<()> {
        if old == new {
            return Ok(());
        }
        if self.entries.contains_key(new) {
            return Err(BibError::InvalidLabel {
                label: new.to_string(),
                reason: "label is already in use".to_string(),
            });
        }

        let (idx, _, mut entry) = self
            .entries
            .shift_remove_full(old)
            .ok_or_else(|| BibError::not_found(old))?;
        if let Err(e) = entry.set_label(new) {
            self.entries.shift_insert(idx, old.to_string(), entry);
            return Err(e);
        }
        self.entries.shift_insert(idx, new.to_string(), entry);
        self.rename(old, new);
        Ok(())
    }

    /// A label not used by any entry, derived from `candidate`.
    ///
    /// Returns `candidate` itself when it is free, otherwise the first free
    /// `candidate + separator + suffix(n)` for `n = 1, 2, ...`.
    pub fn disambiguate_label(&self, candidate: &str) -> String {
        if !self.entries.contains_key(candidate) {
            debug!(label = %candidate, "Label does not exist yet");
            return candidate.to_string();
        }

        warn!(label = %candidate, "Label already exists, running disambiguation");
        let mut n = 0u64;
        loop {
            n += 1;
            let label = format!(
                "{}{}{}",
                candidate,
                self.label_separator,
                self.label_suffix.render(n)
            );
            if !self.entries.contains_key(&label) {
                info!(label = %label, "Found new unique label");
                return label;
            }
            warn!(
                label = %label,
                original = %candidate,
                "Label also exists, these entries may be related"
            );
        }
    }

    /// Like [`disambiguate_label`](Self::disambiguate_label), but keeps
    /// `candidate` when the entry stored under it equals `entry`.
    pub fn disambiguate_label_for(&self, candidate: &str, entry: &Entry) -> String {
        if self.entries.get(candidate) == Some(entry) {
            info!(
                label = %candidate,
                "Label exists but the entry is identical, no disambiguation needed"
            );
            return candidate.to_string();
        }
        self.disambiguate_label(candidate)
    }

    /// Labels related to `label`.
    ///
    /// The first list holds labels equal to `label` modulo a disambiguation
    /// suffix, the second those that merely start with the same text.
    pub fn find_related_labels(&self, label: &str) -> (Vec<String>, Vec<String>) {
        let (trimmed, _) = self.label_suffix.trim_label(label, &self.label_separator);

        let mut direct = Vec::new();
        let mut indirect = Vec::new();
        for existing in self.entries.keys() {
            if !existing.starts_with(&trimmed) {
                continue;
            }
            let (raw, _) = self
                .label_suffix
                .trim_label(existing, &self.label_separator);
            if raw == trimmed {
                direct.push(existing.clone());
            } else {
                indirect.push(existing.clone());
            }
        }
        (direct, indirect)
    }

    /// Write all pending changes to the database file.
    ///
    /// Blocks of changed entries are replaced in place, blocks of deleted
    /// entries are dropped together with the `---` line directly above
    /// them, and new entries are appended in store order. All other lines
    /// are kept byte for byte. The new content is written to a temporary
    /// file that replaces the database, so the database is never partially
    /// written. A badly framed file is reported as an error and left alone.
    pub fn save(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            debug!("Nothing to save");
            return Ok(());
        }

        let text = self.read_file()?;
        let lines: Vec<&str> = text.split('\n').collect();
        let blocks = yaml::scan_blocks(&lines)?;

        let mut pending = self.pending.clone();
        // Labels whose block is in the output, unchanged or rewritten
        let mut written: HashSet<String> = HashSet::new();
        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;

        for block in blocks {
            let Some(target) = pending.shift_remove(&block.label) else {
                written.insert(block.label);
                continue;
            };
            let entry = target
                .as_deref()
                .and_then(|label| self.entries.get(label));

            let keep_until = match (entry, block.separator) {
                (None, Some(separator)) if separator >= cursor => separator,
                _ => block.anchor,
            };
            push_lines(&mut out, &lines, cursor, keep_until);
            cursor = block.end + 1;

            match entry {
                Some(entry) => {
                    debug!(entry = %block.label, new = %entry.label(), "Replacing entry block");
                    let serialized = self.codec.serialize(entry);
                    let body = serialized
                        .split_once('\n')
                        .map(|(_, body)| body)
                        .unwrap_or_default();
                    out.push_str(body);
                    written.insert(entry.label().to_string());
                }
                None => debug!(entry = %block.label, "Dropping entry block"),
            }
        }
        push_lines(&mut out, &lines, cursor, lines.len());

        for (label, entry) in &self.entries {
            if written.contains(label) {
                continue;
            }
            debug!(entry = %label, "Appending new entry");
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&self.codec.serialize(entry));
        }

        self.write_file(&out)?;
        info!(
            path = %self.path.display(),
            changes = self.pending.len(),
            "Saved database"
        );
        self.pending.clear();
        self.refresh_cache();
        Ok(())
    }

    fn write_file(&self, contents: &str) -> Result<()> {
        let mut temp_path = self.path.clone().into_os_string();
        temp_path.push(".tmp");
        let temp_path = PathBuf::from(temp_path);

        fs::write(&temp_path, contents)?;
        if let Err(e) = fs::rename(&temp_path, &self.path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }
        Ok(())
    }
}

/// Append `lines[from..to]` with the line breaks they had in the file.
fn push_lines(out: &mut String, lines: &[&str], from: usize, to: usize) {
    let last = lines.len().saturating_sub(1);
    for (idx, line) in lines.iter().enumerate().take(to).skip(from) {
        out.push_str(line);
        if idx < last {
            out.push('\n');
        }
    }
}
