//! Library enumeration and editing surface of the host player.

use std::path::{Path, PathBuf};

use super::error::BridgeError;
use super::fields::{FieldValue, TrackField};

/// One entry of the player library as seen during an enumeration pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryEntry {
    /// Player-assigned identifier, stable for the lifetime of the entry.
    pub index: i64,
    /// Resolved file location, absent for streaming or unresolvable entries.
    pub path: Option<PathBuf>,
}

impl LibraryEntry {
    pub fn new(index: i64, path: Option<PathBuf>) -> Self {
        Self { index, path }
    }
}

/// Operations the index and maintenance tools need from the player library.
///
/// Positions are zero-based offsets into the player's own library ordering.
/// Deleting an entry shifts every later entry down by one position.
pub trait MusicLibrary {
    fn entry_count(&mut self) -> Result<usize, BridgeError>;

    fn entry_at(&mut self, position: usize) -> Result<LibraryEntry, BridgeError>;

    fn delete_entry(&mut self, entry: &LibraryEntry) -> Result<(), BridgeError>;

    fn add_file(&mut self, path: &Path) -> Result<(), BridgeError>;

    fn read_field(
        &mut self,
        entry: &LibraryEntry,
        field: TrackField,
    ) -> Result<Option<FieldValue>, BridgeError>;

    fn write_field(
        &mut self,
        entry: &LibraryEntry,
        field: TrackField,
        value: &FieldValue,
    ) -> Result<(), BridgeError>;

    /// Starts a fresh lazy enumeration of the whole library.
    fn entries(&mut self) -> LibraryEntries<'_, Self>
    where
        Self: Sized,
    {
        LibraryEntries::new(self)
    }
}

/// Lazy, finite pass over a [`MusicLibrary`].
///
/// The entry count is fetched on the first call to `next`. The iterator
/// fuses after yielding its first error.
pub struct LibraryEntries<'a, L: MusicLibrary> {
    library: &'a mut L,
    position: usize,
    len: Option<usize>,
    failed: bool,
}

impl<'a, L: MusicLibrary> LibraryEntries<'a, L> {
    pub fn new(library: &'a mut L) -> Self {
        Self {
            library,
            position: 0,
            len: None,
            failed: false,
        }
    }
}

impl<L: MusicLibrary> Iterator for LibraryEntries<'_, L> {
    type Item = Result<LibraryEntry, BridgeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let len = match self.len {
            Some(len) => len,
            None => match self.library.entry_count() {
                Ok(len) => {
                    self.len = Some(len);
                    len
                }
                Err(err) => {
                    self.failed = true;
                    return Some(Err(err));
                }
            },
        };
        if self.position >= len {
            return None;
        }
        let position = self.position;
        self.position += 1;
        match self.library.entry_at(position) {
            Ok(entry) => Some(Ok(entry)),
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory library used by index and maintenance tests.

    use std::collections::HashMap;
    use std::path::{Path, PathBuf};

    use super::*;

    #[derive(Debug, Default)]
    pub(crate) struct FakeLibrary {
        pub(crate) entries: Vec<LibraryEntry>,
        pub(crate) fields: HashMap<(i64, TrackField), FieldValue>,
        pub(crate) added: Vec<PathBuf>,
        pub(crate) deleted: Vec<i64>,
        pub(crate) writes: Vec<(i64, TrackField, FieldValue)>,
        pub(crate) unavailable: bool,
        pub(crate) next_index: i64,
    }

    impl FakeLibrary {
        pub(crate) fn with_entries(entries: Vec<(i64, Option<&Path>)>) -> Self {
            let next_index = entries.iter().map(|(index, _)| *index).max().unwrap_or(0) + 1;
            Self {
                entries: entries
                    .into_iter()
                    .map(|(index, path)| LibraryEntry::new(index, path.map(Path::to_path_buf)))
                    .collect(),
                next_index,
                ..Self::default()
            }
        }

        pub(crate) fn indexes(&self) -> Vec<i64> {
            self.entries.iter().map(|entry| entry.index).collect()
        }

        fn check_available(&self) -> Result<(), BridgeError> {
            if self.unavailable {
                Err(BridgeError::HostUnavailable("Music"))
            } else {
                Ok(())
            }
        }
    }

    impl MusicLibrary for FakeLibrary {
        fn entry_count(&mut self) -> Result<usize, BridgeError> {
            self.check_available()?;
            Ok(self.entries.len())
        }

        fn entry_at(&mut self, position: usize) -> Result<LibraryEntry, BridgeError> {
            self.check_available()?;
            self.entries
                .get(position)
                .cloned()
                .ok_or(BridgeError::InvalidPosition(position))
        }

        fn delete_entry(&mut self, entry: &LibraryEntry) -> Result<(), BridgeError> {
            self.check_available()?;
            self.entries.retain(|candidate| candidate.index != entry.index);
            self.deleted.push(entry.index);
            Ok(())
        }

        fn add_file(&mut self, path: &Path) -> Result<(), BridgeError> {
            self.check_available()?;
            self.entries
                .push(LibraryEntry::new(self.next_index, Some(path.to_path_buf())));
            self.next_index += 1;
            self.added.push(path.to_path_buf());
            Ok(())
        }

        fn read_field(
            &mut self,
            entry: &LibraryEntry,
            field: TrackField,
        ) -> Result<Option<FieldValue>, BridgeError> {
            self.check_available()?;
            Ok(self.fields.get(&(entry.index, field)).cloned())
        }

        fn write_field(
            &mut self,
            entry: &LibraryEntry,
            field: TrackField,
            value: &FieldValue,
        ) -> Result<(), BridgeError> {
            self.check_available()?;
            value.check_writable(field)?;
            self.fields.insert((entry.index, field), value.clone());
            self.writes.push((entry.index, field, value.clone()));
            Ok(())
        }
    }
}
