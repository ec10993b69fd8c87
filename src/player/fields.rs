//! Static registry of player track attributes and their value types.
//!
//! Every attribute the bridge may read or write is declared once here with
//! its script-facing property name, value class and writability. Callers
//! resolve a name to a [`TrackField`] up front and get typed values back.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};

use super::error::BridgeError;

/// Value class of a track attribute; each class has its own coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    Float,
    Date,
    Text,
}

/// Track attributes understood by the bridge.
///
/// Discriminants index into `FIELD_SPECS`; keep both lists in the same order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackField {
    Id,
    Index,
    PersistentId,
    Name,
    Album,
    AlbumArtist,
    Artist,
    Comment,
    Composer,
    Genre,
    Grouping,
    Kind,
    Time,
    Lyrics,
    SortName,
    SortAlbum,
    SortArtist,
    SortAlbumArtist,
    SortComposer,
    Year,
    TrackNumber,
    TrackCount,
    DiscNumber,
    DiscCount,
    Rating,
    AlbumRating,
    PlayedCount,
    SkippedCount,
    Bpm,
    BitRate,
    SampleRate,
    Size,
    VolumeAdjustment,
    Duration,
    Start,
    Finish,
    Bookmark,
    DateAdded,
    ModificationDate,
    PlayedDate,
    SkippedDate,
    ReleaseDate,
}

struct FieldSpec {
    field: TrackField,
    name: &'static str,
    script_name: &'static str,
    kind: FieldKind,
    read_only: bool,
}

const fn spec(
    field: TrackField,
    name: &'static str,
    script_name: &'static str,
    kind: FieldKind,
    read_only: bool,
) -> FieldSpec {
    FieldSpec {
        field,
        name,
        script_name,
        kind,
        read_only,
    }
}

const FIELD_SPECS: [FieldSpec; 42] = [
    spec(TrackField::Id, "id", "id", FieldKind::Integer, true),
    spec(TrackField::Index, "index", "index", FieldKind::Integer, true),
    spec(
        TrackField::PersistentId,
        "persistent_ID",
        "persistent ID",
        FieldKind::Text,
        true,
    ),
    spec(TrackField::Name, "name", "name", FieldKind::Text, false),
    spec(TrackField::Album, "album", "album", FieldKind::Text, false),
    spec(
        TrackField::AlbumArtist,
        "album_artist",
        "album artist",
        FieldKind::Text,
        false,
    ),
    spec(TrackField::Artist, "artist", "artist", FieldKind::Text, false),
    spec(TrackField::Comment, "comment", "comment", FieldKind::Text, false),
    spec(TrackField::Composer, "composer", "composer", FieldKind::Text, false),
    spec(TrackField::Genre, "genre", "genre", FieldKind::Text, false),
    spec(TrackField::Grouping, "grouping", "grouping", FieldKind::Text, false),
    spec(TrackField::Kind, "kind", "kind", FieldKind::Text, true),
    spec(TrackField::Time, "time", "time", FieldKind::Text, true),
    spec(TrackField::Lyrics, "lyrics", "lyrics", FieldKind::Text, false),
    spec(TrackField::SortName, "sort_name", "sort name", FieldKind::Text, false),
    spec(TrackField::SortAlbum, "sort_album", "sort album", FieldKind::Text, false),
    spec(
        TrackField::SortArtist,
        "sort_artist",
        "sort artist",
        FieldKind::Text,
        false,
    ),
    spec(
        TrackField::SortAlbumArtist,
        "sort_album_artist",
        "sort album artist",
        FieldKind::Text,
        false,
    ),
    spec(
        TrackField::SortComposer,
        "sort_composer",
        "sort composer",
        FieldKind::Text,
        false,
    ),
    spec(TrackField::Year, "year", "year", FieldKind::Integer, false),
    spec(
        TrackField::TrackNumber,
        "track_number",
        "track number",
        FieldKind::Integer,
        false,
    ),
    spec(
        TrackField::TrackCount,
        "track_count",
        "track count",
        FieldKind::Integer,
        false,
    ),
    spec(
        TrackField::DiscNumber,
        "disc_number",
        "disc number",
        FieldKind::Integer,
        false,
    ),
    spec(
        TrackField::DiscCount,
        "disc_count",
        "disc count",
        FieldKind::Integer,
        false,
    ),
    spec(TrackField::Rating, "rating", "rating", FieldKind::Integer, false),
    spec(
        TrackField::AlbumRating,
        "album_rating",
        "album rating",
        FieldKind::Integer,
        false,
    ),
    spec(
        TrackField::PlayedCount,
        "played_count",
        "played count",
        FieldKind::Integer,
        false,
    ),
    spec(
        TrackField::SkippedCount,
        "skipped_count",
        "skipped count",
        FieldKind::Integer,
        false,
    ),
    spec(TrackField::Bpm, "bpm", "bpm", FieldKind::Integer, false),
    spec(TrackField::BitRate, "bit_rate", "bit rate", FieldKind::Integer, true),
    spec(
        TrackField::SampleRate,
        "sample_rate",
        "sample rate",
        FieldKind::Integer,
        true,
    ),
    spec(TrackField::Size, "size", "size", FieldKind::Integer, true),
    spec(
        TrackField::VolumeAdjustment,
        "volume_adjustment",
        "volume adjustment",
        FieldKind::Integer,
        false,
    ),
    spec(TrackField::Duration, "duration", "duration", FieldKind::Float, true),
    spec(TrackField::Start, "start", "start", FieldKind::Float, false),
    spec(TrackField::Finish, "finish", "finish", FieldKind::Float, false),
    spec(TrackField::Bookmark, "bookmark", "bookmark", FieldKind::Float, false),
    spec(
        TrackField::DateAdded,
        "date_added",
        "date added",
        FieldKind::Date,
        true,
    ),
    spec(
        TrackField::ModificationDate,
        "modification_date",
        "modification date",
        FieldKind::Date,
        true,
    ),
    spec(
        TrackField::PlayedDate,
        "played_date",
        "played date",
        FieldKind::Date,
        false,
    ),
    spec(
        TrackField::SkippedDate,
        "skipped_date",
        "skipped date",
        FieldKind::Date,
        false,
    ),
    spec(
        TrackField::ReleaseDate,
        "release_date",
        "release date",
        FieldKind::Date,
        true,
    ),
];

impl TrackField {
    fn spec(self) -> &'static FieldSpec {
        &FIELD_SPECS[self as usize]
    }

    /// Attribute name as used on the command line and in diagnostics.
    pub fn name(self) -> &'static str {
        self.spec().name
    }

    /// Property name in the player's scripting dictionary.
    pub fn script_name(self) -> &'static str {
        self.spec().script_name
    }

    pub fn kind(self) -> FieldKind {
        self.spec().kind
    }

    pub fn read_only(self) -> bool {
        self.spec().read_only
    }

    /// Resolves an attribute name, accepting the `title`, `date` and `ID` aliases.
    pub fn from_name(name: &str) -> Result<TrackField, BridgeError> {
        let canonical = match name {
            "title" => "name",
            "date" => "year",
            "ID" => "id",
            other => other,
        };
        FIELD_SPECS
            .iter()
            .find(|spec| spec.name == canonical)
            .map(|spec| spec.field)
            .ok_or_else(|| BridgeError::UnknownField(name.to_string()))
    }
}

impl fmt::Display for TrackField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed attribute value read from or written to the player.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Date(DateTime<Utc>),
    Text(String),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Integer(_) => FieldKind::Integer,
            FieldValue::Float(_) => FieldKind::Float,
            FieldValue::Date(_) => FieldKind::Date,
            FieldValue::Text(_) => FieldKind::Text,
        }
    }

    /// Checks that this value may be written to `field`.
    pub fn check_writable(&self, field: TrackField) -> Result<(), BridgeError> {
        if field.read_only() {
            return Err(BridgeError::ReadOnlyField(field));
        }
        if self.kind() != field.kind() {
            return Err(BridgeError::InvalidValue {
                field: field.name(),
                kind: field.kind(),
                value: self.to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(value) => write!(f, "{value}"),
            FieldValue::Float(value) => write!(f, "{value}"),
            FieldValue::Date(value) => write!(f, "{}", value.format("%Y-%m-%d %H:%M:%S")),
            FieldValue::Text(value) => f.write_str(value),
        }
    }
}

impl FieldKind {
    /// Coerces a raw textual value into this kind.
    ///
    /// Empty input and the player's `missing value` marker yield `None`.
    /// Integers accept a leading `YYYY-` style date and keep the first number,
    /// so `"2003-04-01"` becomes `2003`.
    pub fn parse(self, field: TrackField, raw: &str) -> Result<Option<FieldValue>, BridgeError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == "missing value" {
            return Ok(None);
        }
        let invalid = || BridgeError::InvalidValue {
            field: field.name(),
            kind: self,
            value: trimmed.to_string(),
        };
        let value = match self {
            FieldKind::Integer => {
                let leading = trimmed.split('-').next().unwrap_or(trimmed);
                let leading = if leading.is_empty() { trimmed } else { leading };
                match leading.parse::<i64>() {
                    Ok(value) => FieldValue::Integer(value),
                    Err(_) => {
                        let as_float = trimmed.parse::<f64>().map_err(|_| invalid())?;
                        FieldValue::Integer(as_float.round() as i64)
                    }
                }
            }
            FieldKind::Float => FieldValue::Float(trimmed.parse::<f64>().map_err(|_| invalid())?),
            FieldKind::Date => {
                if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
                    FieldValue::Date(parsed.with_timezone(&Utc))
                } else if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
                    let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(invalid)?;
                    FieldValue::Date(midnight.and_utc())
                } else {
                    let seconds = trimmed.parse::<i64>().map_err(|_| invalid())?;
                    FieldValue::Date(DateTime::from_timestamp(seconds, 0).ok_or_else(invalid)?)
                }
            }
            FieldKind::Text => FieldValue::Text(trimmed.to_string()),
        };
        Ok(Some(value))
    }
}
