//! Embedded tag reader backed by `lofty`.

use std::path::Path;

use lofty::file::TaggedFileExt;
use lofty::prelude::Accessor;
use lofty::read_from_path;
use lofty::tag::{ItemKey, Tag};
use log::debug;

/// Tag values pushed into the player library by metadata sync.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileTags {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub genre: String,
    pub year: Option<i64>,
    pub bpm: Option<i64>,
}

fn first_non_empty_value<F>(primary_tag: Option<&Tag>, tags: &[Tag], mut extractor: F) -> String
where
    F: FnMut(&Tag) -> Option<String>,
{
    primary_tag
        .into_iter()
        .chain(tags.iter())
        .filter_map(|tag| extractor(tag))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .unwrap_or_default()
}

fn derive_year_from_date(date: &str) -> Option<i64> {
    let year: String = date.chars().take(4).collect();
    if year.chars().count() == 4 {
        year.parse().ok()
    } else {
        None
    }
}

/// Parses a BPM tag, which some taggers write as a decimal. Zero means unset.
fn parse_bpm(value: &str) -> Option<i64> {
    let value = value.trim();
    let bpm = value
        .parse::<i64>()
        .ok()
        .or_else(|| value.parse::<f64>().ok().map(|bpm| bpm.round() as i64))?;
    (bpm > 0).then_some(bpm)
}

/// Reads the synced tag set from a media file.
pub fn read_file_tags(path: &Path) -> Option<FileTags> {
    let tagged_file = match read_from_path(path) {
        Ok(tagged_file) => tagged_file,
        Err(err) => {
            debug!("Failed to read tags from {}: {}", path.display(), err);
            return None;
        }
    };
    let primary_tag = tagged_file.primary_tag();
    let tags = tagged_file.tags();

    let title = first_non_empty_value(primary_tag, tags, |tag| {
        tag.title().map(|value| value.into_owned())
    });
    let artist = first_non_empty_value(primary_tag, tags, |tag| {
        tag.artist().map(|value| value.into_owned())
    });
    let album = first_non_empty_value(primary_tag, tags, |tag| {
        tag.album().map(|value| value.into_owned())
    });
    let genre = first_non_empty_value(primary_tag, tags, |tag| {
        tag.genre().map(|value| value.into_owned())
    });
    let date = first_non_empty_value(primary_tag, tags, |tag| {
        tag.get_string(ItemKey::Year)
            .or_else(|| tag.get_string(ItemKey::RecordingDate))
            .or_else(|| tag.get_string(ItemKey::OriginalReleaseDate))
            .map(str::to_string)
    });
    let bpm = first_non_empty_value(primary_tag, tags, |tag| {
        tag.get_string(ItemKey::IntegerBpm)
            .or_else(|| tag.get_string(ItemKey::Bpm))
            .map(str::to_string)
    });

    Some(FileTags {
        title,
        artist,
        album,
        genre,
        year: derive_year_from_date(&date),
        bpm: parse_bpm(&bpm),
    })
}
