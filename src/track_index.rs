//! SQLite cache of player track identifiers and the files they point at.
//!
//! The index answers "which library entry is this file" for index-assisted
//! playback and is rebuilt by reconciling it against a full enumeration of
//! the player library. One process is expected to own writes at a time;
//! concurrent readers rely on SQLite's WAL mode.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rusqlite::{params, Connection, OptionalExtension};

use crate::media_file_discovery::file_mtime_unix_ms;
use crate::player::{BridgeError, LibraryEntry};

const DEFAULT_PROGRESS_INTERVAL: usize = 1000;

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("track index {operation} failed: {source}")]
    Storage {
        operation: &'static str,
        #[source]
        source: rusqlite::Error,
    },
    #[error("track not in index database: {}", .0.display())]
    NotIndexed(PathBuf),
    #[error("library entry {0} has no resolvable path")]
    UnresolvablePath(i64),
    #[error("library enumeration failed: {0}")]
    Enumeration(#[from] BridgeError),
    #[error("could not create index directory {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn storage(operation: &'static str) -> impl FnOnce(rusqlite::Error) -> IndexError {
    move |source| IndexError::Storage { operation, source }
}

/// One persisted index row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub key: i64,
    pub path: PathBuf,
    /// File modification time in unix milliseconds when last recorded.
    pub mtime: Option<i64>,
    pub added: DateTime<Utc>,
}

/// What a single [`TrackIndex::record`] call did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Inserted,
    Updated,
    Unchanged,
    /// The row existed but its file can no longer be stat'ed.
    Removed,
    /// No row and no readable file; nothing stored.
    Skipped,
}

/// How `reconcile` treats a storage failure while recording one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconcileMode {
    /// Log the failure, count it and continue with the next entry.
    #[default]
    Lenient,
    /// Abort the pass and return the failure.
    Strict,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub processed: usize,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub removed: usize,
    pub skipped: usize,
    pub unresolvable: usize,
    pub failed: usize,
    pub pruned: usize,
}

impl ReconcileSummary {
    fn count(&mut self, outcome: RecordOutcome) {
        match outcome {
            RecordOutcome::Inserted => self.inserted += 1,
            RecordOutcome::Updated => self.updated += 1,
            RecordOutcome::Unchanged => self.unchanged += 1,
            RecordOutcome::Removed => self.removed += 1,
            RecordOutcome::Skipped => self.skipped += 1,
        }
    }

    /// Number of rows written, updated or deleted by the pass.
    pub fn writes(&self) -> usize {
        self.inserted + self.updated + self.removed + self.pruned
    }
}

pub struct TrackIndex {
    conn: Connection,
    path: PathBuf,
    progress_interval: usize,
}

impl TrackIndex {
    /// Opens (creating if needed) the index database at `path`.
    pub fn open(path: &Path) -> Result<Self, IndexError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| IndexError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let conn = Connection::open(path).map_err(storage("open"))?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
        .map_err(storage("open"))?;

        let index = Self {
            conn,
            path: path.to_path_buf(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        };
        index.initialize_schema()?;
        Ok(index)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, IndexError> {
        let conn = Connection::open_in_memory().map_err(storage("open"))?;
        let index = Self {
            conn,
            path: PathBuf::from(":memory:"),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        };
        index.initialize_schema()?;
        Ok(index)
    }

    fn initialize_schema(&self) -> Result<(), IndexError> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS track_index (
                    key INTEGER PRIMARY KEY,
                    path TEXT NOT NULL,
                    mtime INTEGER,
                    added TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_track_index_path ON track_index(path);",
            )
            .map_err(storage("schema bootstrap"))
    }

    /// Logs reconcile progress every `entries` processed entries.
    pub fn with_progress_interval(mut self, entries: usize) -> Self {
        self.progress_interval = entries.max(1);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> Result<usize, IndexError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM track_index", [], |row| row.get(0))
            .map_err(storage("count"))?;
        Ok(count as usize)
    }

    pub fn entry(&self, key: i64) -> Result<Option<IndexEntry>, IndexError> {
        self.conn
            .query_row(
                "SELECT key, path, mtime, added FROM track_index WHERE key = ?1",
                params![key],
                |row| {
                    let added: String = row.get(3)?;
                    let added = DateTime::parse_from_rfc3339(&added)
                        .map_err(|err| {
                            rusqlite::Error::FromSqlConversionFailure(
                                3,
                                rusqlite::types::Type::Text,
                                Box::new(err),
                            )
                        })?
                        .with_timezone(&Utc);
                    Ok(IndexEntry {
                        key: row.get(0)?,
                        path: PathBuf::from(row.get::<_, String>(1)?),
                        mtime: row.get(2)?,
                        added,
                    })
                },
            )
            .optional()
            .map_err(storage("read entry"))
    }

    /// Records one live library entry, writing only when something changed.
    ///
    /// Paths are stored canonicalized so they join with canonical lookups.
    /// A known key whose file vanished is deleted; an unknown key whose file
    /// cannot be stat'ed is never stored.
    pub fn record(&self, entry: &LibraryEntry) -> Result<RecordOutcome, IndexError> {
        let reported = entry
            .path
            .as_deref()
            .ok_or(IndexError::UnresolvablePath(entry.index))?;
        let canonical = reported.canonicalize().ok();
        let path = canonical.as_deref().unwrap_or(reported);
        let path_text = path.to_string_lossy().to_string();

        let existing: Option<(String, Option<i64>)> = self
            .conn
            .query_row(
                "SELECT path, mtime FROM track_index WHERE key = ?1",
                params![entry.index],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(storage("select"))?;
        let mtime = file_mtime_unix_ms(path);

        match (existing, mtime) {
            (Some((stored_path, stored_mtime)), Some(mtime)) => {
                if stored_mtime == Some(mtime) && stored_path == path_text {
                    return Ok(RecordOutcome::Unchanged);
                }
                self.conn
                    .execute(
                        "UPDATE track_index SET path = ?1, mtime = ?2 WHERE key = ?3",
                        params![path_text, mtime, entry.index],
                    )
                    .map_err(storage("update"))?;
                debug!("Index updated {} {}", entry.index, path.display());
                Ok(RecordOutcome::Updated)
            }
            (Some(_), None) => {
                self.conn
                    .execute(
                        "DELETE FROM track_index WHERE key = ?1",
                        params![entry.index],
                    )
                    .map_err(storage("delete"))?;
                debug!("Index removed {} {}", entry.index, path.display());
                Ok(RecordOutcome::Removed)
            }
            (None, Some(mtime)) => {
                self.conn
                    .execute(
                        "INSERT INTO track_index (key, path, mtime, added) VALUES (?1, ?2, ?3, ?4)",
                        params![entry.index, path_text, mtime, Utc::now().to_rfc3339()],
                    )
                    .map_err(storage("insert"))?;
                debug!("Index added {} {}", entry.index, path.display());
                Ok(RecordOutcome::Inserted)
            }
            (None, None) => Ok(RecordOutcome::Skipped),
        }
    }

    /// Brings the index in line with a full library enumeration.
    ///
    /// Entries without a path are skipped. An enumeration error aborts the
    /// pass before anything is pruned.
    pub fn reconcile<I>(
        &mut self,
        entries: I,
        mode: ReconcileMode,
    ) -> Result<ReconcileSummary, IndexError>
    where
        I: IntoIterator<Item = Result<LibraryEntry, BridgeError>>,
    {
        let mut summary = ReconcileSummary::default();
        let mut seen = HashSet::new();

        for entry in entries {
            let entry = entry?;
            summary.processed += 1;
            if summary.processed.is_multiple_of(self.progress_interval) {
                info!("Index update: {} entries processed", summary.processed);
            }

            if entry.path.is_none() {
                debug!("Skipping library entry {} without a path", entry.index);
                summary.unresolvable += 1;
                continue;
            }

            match self.record(&entry) {
                Ok(outcome) => summary.count(outcome),
                Err(err) if mode == ReconcileMode::Lenient => {
                    warn!("Failed to index library entry {}: {}", entry.index, err);
                    summary.failed += 1;
                }
                Err(err) => return Err(err),
            }
            seen.insert(entry.index);
        }

        summary.pruned = self.prune(&seen)?;
        info!(
            "Index update finished: {} processed, {} added, {} updated, {} removed, {} pruned, {} without path, {} failed",
            summary.processed,
            summary.inserted,
            summary.updated,
            summary.removed,
            summary.pruned,
            summary.unresolvable,
            summary.failed
        );
        Ok(summary)
    }

    /// Deletes every row whose key is not in `seen` in one statement.
    pub fn prune(&mut self, seen: &HashSet<i64>) -> Result<usize, IndexError> {
        let tx = self.conn.transaction().map_err(storage("prune"))?;
        tx.execute_batch(
            "CREATE TEMP TABLE IF NOT EXISTS seen_keys (key INTEGER PRIMARY KEY);
             DELETE FROM seen_keys;",
        )
        .map_err(storage("prune"))?;
        {
            let mut stmt = tx
                .prepare("INSERT OR IGNORE INTO seen_keys (key) VALUES (?1)")
                .map_err(storage("prune"))?;
            for key in seen {
                stmt.execute(params![key]).map_err(storage("prune"))?;
            }
        }
        let pruned = tx
            .execute(
                "DELETE FROM track_index WHERE key NOT IN (SELECT key FROM seen_keys)",
                [],
            )
            .map_err(storage("prune"))?;
        tx.execute("DELETE FROM seen_keys", [])
            .map_err(storage("prune"))?;
        tx.commit().map_err(storage("prune"))?;
        Ok(pruned)
    }

    /// Returns the key recorded for exactly `path`.
    pub fn lookup(&self, path: &Path) -> Result<i64, IndexError> {
        let path_text = path.to_string_lossy().to_string();
        self.conn
            .query_row(
                "SELECT key FROM track_index WHERE path = ?1 ORDER BY key LIMIT 1",
                params![path_text],
                |row| row.get(0),
            )
            .optional()
            .map_err(storage("lookup"))?
            .ok_or_else(|| IndexError::NotIndexed(path.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media_file_discovery::testing::TempTree;
    use crate::player::library::testing::FakeLibrary;
    use crate::player::MusicLibrary;

    fn live(index: i64, path: &Path) -> LibraryEntry {
        LibraryEntry::new(index, Some(path.to_path_buf()))
    }

    fn entries(list: Vec<LibraryEntry>) -> Vec<Result<LibraryEntry, BridgeError>> {
        list.into_iter().map(Ok).collect()
    }

    #[test]
    fn test_open_bootstraps_schema_idempotently() {
        let tree = TempTree::new("index_open");
        let db_path = tree.root.join("nested/dir/Tracks.sqlite");
        let track = tree.file("a.mp3");
        {
            let index = TrackIndex::open(&db_path).unwrap();
            index.record(&live(1, &track)).unwrap();
        }
        let reopened = TrackIndex::open(&db_path).unwrap();
        assert_eq!(reopened.len().unwrap(), 1);
        assert_eq!(reopened.path(), db_path.as_path());
    }

    #[test]
    fn test_record_inserts_with_mtime_and_added() {
        let tree = TempTree::new("index_insert");
        let track = tree.file("a.mp3");
        tree.set_mtime_secs(&track, 1_500_000_000);
        let index = TrackIndex::open_in_memory().unwrap();

        let before = Utc::now();
        assert_eq!(index.record(&live(7, &track)).unwrap(), RecordOutcome::Inserted);

        let stored = index.entry(7).unwrap().expect("row should exist");
        assert_eq!(stored.path, track);
        assert_eq!(stored.mtime, Some(1_500_000_000_000));
        assert!(stored.added >= before - chrono::Duration::seconds(1));
    }

    #[test]
    fn test_record_rerecording_same_key_does_not_duplicate() {
        let tree = TempTree::new("index_same_key");
        let track = tree.file("a.mp3");
        let index = TrackIndex::open_in_memory().unwrap();
        index.record(&live(1, &track)).unwrap();
        assert_eq!(index.record(&live(1, &track)).unwrap(), RecordOutcome::Unchanged);
        assert_eq!(index.len().unwrap(), 1);
    }

    #[test]
    fn test_record_updates_changed_mtime_only() {
        let tree = TempTree::new("index_update");
        let track = tree.file("a.mp3");
        tree.set_mtime_secs(&track, 1_000);
        let index = TrackIndex::open_in_memory().unwrap();
        index.record(&live(1, &track)).unwrap();
        let added = index.entry(1).unwrap().unwrap().added;

        tree.set_mtime_secs(&track, 2_000);
        assert_eq!(index.record(&live(1, &track)).unwrap(), RecordOutcome::Updated);
        let stored = index.entry(1).unwrap().unwrap();
        assert_eq!(stored.mtime, Some(2_000_000));
        assert_eq!(stored.added, added);
    }

    #[test]
    fn test_record_follows_moved_file_for_same_key() {
        let tree = TempTree::new("index_moved");
        let old = tree.file("old.mp3");
        let new = tree.file("new.mp3");
        let index = TrackIndex::open_in_memory().unwrap();
        index.record(&live(1, &old)).unwrap();

        index.record(&live(1, &new)).unwrap();
        assert_eq!(index.lookup(&new).unwrap(), 1);
        assert!(matches!(index.lookup(&old), Err(IndexError::NotIndexed(_))));
    }

    #[test]
    fn test_record_removes_row_when_file_vanished() {
        let tree = TempTree::new("index_vanished");
        let track = tree.file("a.mp3");
        let index = TrackIndex::open_in_memory().unwrap();
        index.record(&live(1, &track)).unwrap();

        std::fs::remove_file(&track).unwrap();
        assert_eq!(index.record(&live(1, &track)).unwrap(), RecordOutcome::Removed);
        assert_eq!(index.entry(1).unwrap(), None);
    }

    #[test]
    fn test_record_never_stores_unreadable_file() {
        let tree = TempTree::new("index_unreadable");
        let index = TrackIndex::open_in_memory().unwrap();
        let missing = tree.root.join("missing.mp3");
        assert_eq!(index.record(&live(1, &missing)).unwrap(), RecordOutcome::Skipped);
        assert_eq!(index.len().unwrap(), 0);
    }

    #[test]
    fn test_record_without_path_is_unresolvable() {
        let index = TrackIndex::open_in_memory().unwrap();
        assert!(matches!(
            index.record(&LibraryEntry::new(3, None)),
            Err(IndexError::UnresolvablePath(3))
        ));
    }

    #[test]
    fn test_reconcile_fresh_store_scenario() {
        let tree = TempTree::new("index_scenario");
        let a = tree.file("music/a.mp3");
        let b = tree.file("music/b.mp3");
        tree.set_mtime_secs(&a, 1_111);
        tree.set_mtime_secs(&b, 2_222);
        let mut index = TrackIndex::open_in_memory().unwrap();

        let summary = index
            .reconcile(
                entries(vec![live(1, &a), live(2, &b), LibraryEntry::new(3, None)]),
                ReconcileMode::Lenient,
            )
            .unwrap();

        assert_eq!(summary.processed, 3);
        assert_eq!(summary.inserted, 2);
        assert_eq!(summary.unresolvable, 1);
        assert_eq!(index.len().unwrap(), 2);
        assert_eq!(index.entry(1).unwrap().unwrap().mtime, Some(1_111_000));
        assert_eq!(index.entry(2).unwrap().unwrap().mtime, Some(2_222_000));
        assert_eq!(index.entry(3).unwrap(), None);
        assert_eq!(index.lookup(&a).unwrap(), 1);
        assert!(matches!(
            index.lookup(&tree.root.join("music/c.mp3")),
            Err(IndexError::NotIndexed(path)) if path.ends_with("music/c.mp3")
        ));
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let tree = TempTree::new("index_idempotent");
        let a = tree.file("a.mp3");
        let b = tree.file("b.mp3");
        let mut library = FakeLibrary::with_entries(vec![(1, Some(a.as_path())), (2, Some(b.as_path())), (3, None)]);
        let mut index = TrackIndex::open_in_memory().unwrap();

        let first = index
            .reconcile(library.entries(), ReconcileMode::Lenient)
            .unwrap();
        assert_eq!(first.writes(), 2);

        let second = index
            .reconcile(library.entries(), ReconcileMode::Lenient)
            .unwrap();
        assert_eq!(second.writes(), 0);
        assert_eq!(second.unchanged, 2);
    }

    #[test]
    fn test_reconcile_purges_entry_whose_file_was_deleted() {
        let tree = TempTree::new("index_purge");
        let a = tree.file("music/a.mp3");
        let mut index = TrackIndex::open_in_memory().unwrap();
        index.record(&live(1, &a)).unwrap();

        std::fs::remove_file(&a).unwrap();
        let summary = index
            .reconcile(entries(vec![live(1, &a)]), ReconcileMode::Lenient)
            .unwrap();

        assert_eq!(summary.removed, 1);
        assert_eq!(index.entry(1).unwrap(), None);
    }

    #[test]
    fn test_reconcile_prunes_keys_missing_from_library() {
        let tree = TempTree::new("index_prune_pass");
        let a = tree.file("a.mp3");
        let b = tree.file("b.mp3");
        let mut index = TrackIndex::open_in_memory().unwrap();
        index.record(&live(1, &a)).unwrap();
        index.record(&live(2, &b)).unwrap();

        let summary = index
            .reconcile(entries(vec![live(2, &b)]), ReconcileMode::Lenient)
            .unwrap();
        assert_eq!(summary.pruned, 1);
        assert_eq!(index.entry(1).unwrap(), None);
        assert!(index.entry(2).unwrap().is_some());
    }

    #[test]
    fn test_reconcile_enumeration_failure_does_not_prune() {
        let tree = TempTree::new("index_enum_fail");
        let a = tree.file("a.mp3");
        let mut index = TrackIndex::open_in_memory().unwrap();
        index.record(&live(1, &a)).unwrap();

        let result = index.reconcile(
            vec![Err(BridgeError::HostUnavailable("Music"))],
            ReconcileMode::Lenient,
        );
        assert!(matches!(
            result,
            Err(IndexError::Enumeration(BridgeError::HostUnavailable(_)))
        ));
        assert_eq!(index.len().unwrap(), 1);
    }

    #[test]
    fn test_reconcile_strict_mode_surfaces_storage_failure() {
        let tree = TempTree::new("index_strict");
        let a = tree.file("a.mp3");
        let b = tree.file("b.mp3");
        let mut index = TrackIndex::open_in_memory().unwrap();
        index.conn.execute_batch("DROP TABLE track_index;").unwrap();

        let strict = index.reconcile(
            entries(vec![live(1, &a), live(2, &b)]),
            ReconcileMode::Strict,
        );
        assert!(matches!(
            strict,
            Err(IndexError::Storage { operation: "select", .. })
        ));
    }

    #[test]
    fn test_reconcile_lenient_mode_counts_failures_then_fails_prune() {
        let tree = TempTree::new("index_lenient");
        let a = tree.file("a.mp3");
        let mut index = TrackIndex::open_in_memory().unwrap();
        index.conn.execute_batch("DROP TABLE track_index;").unwrap();

        // Every record fails, and with the table gone the final prune is fatal.
        let result = index.reconcile(entries(vec![live(1, &a)]), ReconcileMode::Lenient);
        assert!(matches!(
            result,
            Err(IndexError::Storage { operation: "prune", .. })
        ));
    }

    #[test]
    fn test_reconcile_lenient_mode_continues_past_one_failed_entry() {
        let tree = TempTree::new("index_lenient_partial");
        let a = tree.file("a.mp3");
        let b = tree.file("b.mp3");
        let c = tree.file("c.mp3");
        let gone = tree.file("gone.mp3");
        tree.set_mtime_secs(&b, 1_000);
        let mut index = TrackIndex::open_in_memory().unwrap();
        index.record(&live(2, &b)).unwrap();
        index.record(&live(9, &gone)).unwrap();
        index
            .conn
            .execute_batch(
                "CREATE TRIGGER reject_key_2 BEFORE UPDATE ON track_index
                 WHEN NEW.key = 2
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .unwrap();

        tree.set_mtime_secs(&b, 2_000);
        let summary = index
            .reconcile(
                entries(vec![live(1, &a), live(2, &b), live(3, &c)]),
                ReconcileMode::Lenient,
            )
            .unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.inserted, 2);
        assert_eq!(summary.pruned, 1);
        assert!(index.entry(1).unwrap().is_some());
        assert!(index.entry(3).unwrap().is_some());
        assert_eq!(index.entry(2).unwrap().unwrap().mtime, Some(1_000_000));
        assert_eq!(index.entry(9).unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_record_stores_canonical_path_for_symlinked_location() {
        let tree = TempTree::new("index_symlink");
        let real = tree.file("real/a.mp3");
        std::os::unix::fs::symlink(tree.root.join("real"), tree.root.join("link")).unwrap();
        let linked = tree.root.join("link/a.mp3");
        let index = TrackIndex::open_in_memory().unwrap();

        assert_eq!(index.record(&live(42, &linked)).unwrap(), RecordOutcome::Inserted);
        assert_eq!(index.entry(42).unwrap().unwrap().path, real);
        assert_eq!(index.lookup(&real).unwrap(), 42);
        assert_eq!(index.record(&live(42, &real)).unwrap(), RecordOutcome::Unchanged);

        std::fs::remove_file(&real).unwrap();
        assert_eq!(index.record(&live(42, &linked)).unwrap(), RecordOutcome::Removed);
    }

    #[test]
    fn test_progress_interval_is_at_least_one_entry() {
        let index = TrackIndex::open_in_memory().unwrap();
        assert_eq!(index.progress_interval, DEFAULT_PROGRESS_INTERVAL);
        let index = index.with_progress_interval(0);
        assert_eq!(index.progress_interval, 1);

        let tree = TempTree::new("index_progress");
        let a = tree.file("a.mp3");
        let mut index = index.with_progress_interval(250);
        let summary = index
            .reconcile(entries(vec![live(1, &a)]), ReconcileMode::Lenient)
            .unwrap();
        assert_eq!(summary.inserted, 1);
        assert_eq!(index.progress_interval, 250);
    }

    #[test]
    fn test_prune_keeps_only_seen_keys() {
        let tree = TempTree::new("index_prune");
        let index_files: Vec<PathBuf> = (1..=5)
            .map(|n| tree.file(&format!("{n}.mp3")))
            .collect();
        let mut index = TrackIndex::open_in_memory().unwrap();
        for (offset, path) in index_files.iter().enumerate() {
            index.record(&live(offset as i64 + 1, path)).unwrap();
        }

        let seen: HashSet<i64> = [2, 4, 99].into_iter().collect();
        assert_eq!(index.prune(&seen).unwrap(), 3);
        for key in 1..=5 {
            assert_eq!(index.entry(key).unwrap().is_some(), seen.contains(&key));
        }
    }

    #[test]
    fn test_prune_with_empty_seen_set_clears_store() {
        let tree = TempTree::new("index_prune_empty");
        let a = tree.file("a.mp3");
        let mut index = TrackIndex::open_in_memory().unwrap();
        index.record(&live(1, &a)).unwrap();
        assert_eq!(index.prune(&HashSet::new()).unwrap(), 1);
        assert_eq!(index.len().unwrap(), 0);
    }

    #[test]
    fn test_lookup_not_indexed_is_distinct_from_storage_error() {
        let index = TrackIndex::open_in_memory().unwrap();
        assert!(matches!(
            index.lookup(Path::new("/music/none.mp3")),
            Err(IndexError::NotIndexed(_))
        ));
        index.conn.execute_batch("DROP TABLE track_index;").unwrap();
        assert!(matches!(
            index.lookup(Path::new("/music/none.mp3")),
            Err(IndexError::Storage { operation: "lookup", .. })
        ));
    }
}
