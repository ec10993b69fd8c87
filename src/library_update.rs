//! Library maintenance: make the player library mirror the content tree.
//!
//! The first pass walks the live library by position and removes entries
//! that have no path, point at missing files or duplicate an earlier entry.
//! The second pass adds every tree file the library does not reference yet.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{debug, info, warn};

use crate::config::{DuplicateAction, OutsideTreeAction};
use crate::content_tree::ContentTree;
use crate::media_file_discovery::file_mtime_unix_ms;
use crate::player::{BridgeError, FieldValue, LibraryEntry, MusicLibrary, TrackField};
use crate::tag_sync;

#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    #[error("invalid position: {position} ({len} entries)")]
    InvalidPosition { position: usize, len: usize },
    #[error("player unavailable: {0}")]
    Host(#[source] BridgeError),
}

#[derive(Debug, Clone)]
pub struct UpdateOptions {
    /// Start the first pass at this library position and skip the second.
    pub start_position: Option<usize>,
    pub sync_metadata: bool,
    pub outside_tree_action: OutsideTreeAction,
    pub duplicate_action: DuplicateAction,
    pub progress_interval: usize,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            start_position: None,
            sync_metadata: false,
            outside_tree_action: OutsideTreeAction::Report,
            duplicate_action: DuplicateAction::Delete,
            progress_interval: 1_000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    pub processed: usize,
    pub removed_without_path: usize,
    pub removed_missing: usize,
    pub removed_outside_tree: usize,
    pub removed_duplicates: usize,
    pub outside_tree: usize,
    pub duplicates: usize,
    pub metadata_synced: usize,
    pub added: usize,
    pub failures: usize,
}

impl UpdateSummary {
    pub fn removed(&self) -> usize {
        self.removed_without_path
            + self.removed_missing
            + self.removed_outside_tree
            + self.removed_duplicates
    }
}

/// What the first pass decided for one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Keep,
    Remove(RemovalReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RemovalReason {
    NoPath,
    Missing,
    OutsideTree,
    Duplicate,
}

struct Pass<'a, L: MusicLibrary> {
    library: &'a mut L,
    tree: &'a ContentTree,
    options: &'a UpdateOptions,
    first_sightings: HashSet<PathBuf>,
    summary: UpdateSummary,
}

/// Runs both maintenance passes against `library`.
///
/// Per-entry failures are logged and counted; only a lost player connection
/// or an out-of-range start position aborts the run.
pub fn update_library<L: MusicLibrary>(
    library: &mut L,
    tree: &ContentTree,
    options: &UpdateOptions,
) -> Result<UpdateSummary, UpdateError> {
    let mut pass = Pass {
        library,
        tree,
        options,
        first_sightings: HashSet::new(),
        summary: UpdateSummary::default(),
    };

    info!("Checking library files against music player database");
    let started = Instant::now();
    pass.check_library()?;
    info!(
        "Checked {} entries in {:.2} seconds",
        pass.summary.processed,
        started.elapsed().as_secs_f64()
    );

    if options.start_position.is_none() {
        info!("Checking music player database against tree files");
        let started = Instant::now();
        let checked = pass.add_missing_files()?;
        info!(
            "Checked {} files in {:.2} seconds",
            checked,
            started.elapsed().as_secs_f64()
        );
    }

    Ok(pass.summary)
}

impl<L: MusicLibrary> Pass<'_, L> {
    /// Logs and counts a per-entry failure; a lost host is fatal.
    fn tolerate<T>(&mut self, result: Result<T, BridgeError>) -> Result<Option<T>, UpdateError> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_host_unavailable() => Err(UpdateError::Host(err)),
            Err(err) => {
                warn!("{}", err);
                self.summary.failures += 1;
                Ok(None)
            }
        }
    }

    fn check_library(&mut self) -> Result<(), UpdateError> {
        let mut len = self.library.entry_count().map_err(UpdateError::Host)?;
        let mut position = self.options.start_position.unwrap_or(0);
        if position > len {
            return Err(UpdateError::InvalidPosition { position, len });
        }

        let progress_interval = self.options.progress_interval.max(1);
        let mut progress_started = Instant::now();

        while position < len {
            let entry = self.library.entry_at(position);
            let Some(entry) = self.tolerate(entry)? else {
                position += 1;
                continue;
            };

            self.summary.processed += 1;
            if self.summary.processed.is_multiple_of(progress_interval) {
                let elapsed = progress_started.elapsed().as_secs_f64().max(f64::EPSILON);
                info!(
                    "Index {} ({} entries per second)",
                    self.summary.processed,
                    (progress_interval as f64 / elapsed) as u64
                );
                progress_started = Instant::now();
            }

            let verdict = self.judge(&entry)?;
            match verdict {
                Verdict::Keep => position += 1,
                Verdict::Remove(reason) => {
                    let deleted = self.library.delete_entry(&entry);
                    if self.tolerate(deleted)?.is_some() {
                        self.count_removal(reason);
                        len -= 1;
                    } else {
                        position += 1;
                    }
                }
            }
        }
        Ok(())
    }

    fn judge(&mut self, entry: &LibraryEntry) -> Result<Verdict, UpdateError> {
        let Some(path) = entry.path.as_deref() else {
            info!("Removing invalid entry {} (no path defined)", entry.index);
            return Ok(Verdict::Remove(RemovalReason::NoPath));
        };
        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        if !self.tree.contains(&path) {
            if !path.is_file() {
                info!("Removing non-existing: {}", path.display());
                return Ok(Verdict::Remove(RemovalReason::Missing));
            }
            return Ok(match self.options.outside_tree_action {
                OutsideTreeAction::Report => {
                    info!("File outside tree: {}", path.display());
                    self.summary.outside_tree += 1;
                    Verdict::Keep
                }
                OutsideTreeAction::Delete => {
                    info!("Removing file outside tree: {}", path.display());
                    Verdict::Remove(RemovalReason::OutsideTree)
                }
            });
        }

        if self.first_sightings.contains(&path) {
            return Ok(match self.options.duplicate_action {
                DuplicateAction::Delete => {
                    info!("Removing duplicate: {}", path.display());
                    Verdict::Remove(RemovalReason::Duplicate)
                }
                DuplicateAction::Report => {
                    info!("Duplicate entry {}: {}", entry.index, path.display());
                    self.summary.duplicates += 1;
                    Verdict::Keep
                }
            });
        }

        if self.options.sync_metadata {
            self.sync_metadata(entry, &path)?;
        }
        self.first_sightings.insert(path);
        Ok(Verdict::Keep)
    }

    fn sync_metadata(&mut self, entry: &LibraryEntry, path: &Path) -> Result<(), UpdateError> {
        let Some(file_mtime) = file_mtime_unix_ms(path) else {
            return Ok(());
        };
        let modified = self.library.read_field(entry, TrackField::ModificationDate);
        let Some(modified) = self.tolerate(modified)? else {
            return Ok(());
        };
        if let Some(FieldValue::Date(modified)) = modified {
            if modified.timestamp() >= file_mtime.div_euclid(1_000) {
                return Ok(());
            }
        }

        let synced = tag_sync::sync_entry(&mut *self.library, entry, path);
        if let Some(written) = self.tolerate(synced)? {
            if written > 0 {
                debug!("Synced {} fields of {}", written, path.display());
                self.summary.metadata_synced += 1;
            }
        }
        Ok(())
    }

    fn count_removal(&mut self, reason: RemovalReason) {
        match reason {
            RemovalReason::NoPath => self.summary.removed_without_path += 1,
            RemovalReason::Missing => self.summary.removed_missing += 1,
            RemovalReason::OutsideTree => self.summary.removed_outside_tree += 1,
            RemovalReason::Duplicate => self.summary.removed_duplicates += 1,
        }
    }

    fn add_missing_files(&mut self) -> Result<usize, UpdateError> {
        let mut checked = 0;
        for path in self.tree.files() {
            checked += 1;
            if !self.first_sightings.contains(path) {
                info!("Adding: {}", path.display());
                let added = self.library.add_file(path);
                if self.tolerate(added)?.is_some() {
                    self.summary.added += 1;
                }
            }
            if checked % 1_000 == 0 {
                debug!("Processed: {} entries", checked);
            }
        }
        Ok(checked)
    }
}
