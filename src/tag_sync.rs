//! Pushes file tags into player library entries, writing only changed fields.

use std::path::Path;

use log::debug;

use crate::metadata_tags::{read_file_tags, FileTags};
use crate::player::{BridgeError, FieldValue, LibraryEntry, MusicLibrary, TrackField};

/// Writes `value` to `field` unless the player already holds it.
///
/// Returns whether a write happened.
pub fn update_field<L: MusicLibrary>(
    library: &mut L,
    entry: &LibraryEntry,
    field: TrackField,
    value: FieldValue,
) -> Result<bool, BridgeError> {
    if library.read_field(entry, field)?.as_ref() == Some(&value) {
        return Ok(false);
    }
    debug!("Updating {} of entry {} to {}", field, entry.index, value);
    library.write_field(entry, field, &value)?;
    Ok(true)
}

/// Pushes every non-empty tag value. Returns the number of fields written.
pub fn sync_tags<L: MusicLibrary>(
    library: &mut L,
    entry: &LibraryEntry,
    tags: &FileTags,
) -> Result<usize, BridgeError> {
    let text_fields = [
        (TrackField::Artist, &tags.artist),
        (TrackField::Album, &tags.album),
        (TrackField::Name, &tags.title),
        (TrackField::Genre, &tags.genre),
    ];
    let integer_fields = [(TrackField::Year, tags.year), (TrackField::Bpm, tags.bpm)];

    let mut written = 0;
    for (field, value) in text_fields {
        if value.is_empty() {
            continue;
        }
        if update_field(library, entry, field, FieldValue::Text(value.clone()))? {
            written += 1;
        }
    }
    for (field, value) in integer_fields {
        if let Some(value) = value.filter(|value| *value > 0) {
            if update_field(library, entry, field, FieldValue::Integer(value))? {
                written += 1;
            }
        }
    }
    Ok(written)
}

/// Track number from a leading `NN ` filename prefix and track count from the
/// number of same-extension files next to `path`.
pub fn track_numbering(path: &Path) -> (Option<i64>, Option<i64>) {
    let number = path
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| {
            let digits: String = name.chars().take_while(char::is_ascii_digit).collect();
            let rest = &name[digits.len()..];
            if digits.is_empty() || !rest.starts_with(' ') {
                return None;
            }
            digits.parse::<i64>().ok()
        });

    let count = match (path.parent(), path.extension()) {
        (Some(directory), Some(extension)) => std::fs::read_dir(directory).ok().map(|entries| {
            entries
                .filter_map(Result::ok)
                .filter(|entry| entry.file_type().is_ok_and(|file_type| !file_type.is_dir()))
                .filter(|entry| {
                    entry.path().extension().is_some_and(|candidate| {
                        candidate.eq_ignore_ascii_case(extension)
                    })
                })
                .count() as i64
        }),
        _ => None,
    };

    (number, count.filter(|count| *count > 0))
}

/// Brings one entry's tags and numbering in line with its file.
pub fn sync_entry<L: MusicLibrary>(
    library: &mut L,
    entry: &LibraryEntry,
    path: &Path,
) -> Result<usize, BridgeError> {
    let mut written = match read_file_tags(path) {
        Some(tags) => sync_tags(library, entry, &tags)?,
        None => 0,
    };

    let (number, count) = track_numbering(path);
    if let Some(number) = number {
        if update_field(library, entry, TrackField::TrackNumber, FieldValue::Integer(number))? {
            written += 1;
        }
    }
    if let Some(count) = count {
        if update_field(library, entry, TrackField::TrackCount, FieldValue::Integer(count))? {
            written += 1;
        }
    }
    Ok(written)
}
