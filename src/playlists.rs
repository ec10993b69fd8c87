//! Playlist listing and maintenance over [`PlaylistLibrary`].

use std::collections::BTreeMap;

use log::{info, warn};

use crate::player::{BridgeError, FieldValue, PlaylistInfo, PlaylistLibrary, PlaylistTrack, TrackField};

#[derive(Debug, thiserror::Error)]
pub enum PlaylistError {
    #[error(transparent)]
    Player(#[from] BridgeError),
    #[error("invalid track format {0:?}: unclosed attribute placeholder")]
    InvalidFormat(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(TrackField),
}

/// Track line template with `{attribute}` placeholders, e.g.
/// `"{artist} - {title}"`. `{{` and `}}` are literal braces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackFormat {
    segments: Vec<Segment>,
}

impl TrackFormat {
    pub fn parse(template: &str) -> Result<Self, PlaylistError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars().peekable();
        while let Some(ch) = chars.next() {
            match ch {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(ch) => name.push(ch),
                            None => return Err(PlaylistError::InvalidFormat(template.to_string())),
                        }
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field(TrackField::from_name(name.trim())?));
                }
                ch => literal.push(ch),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(Self { segments })
    }

    /// Attributes the template reads, in first-use order.
    pub fn fields(&self) -> Vec<TrackField> {
        let mut fields = Vec::new();
        for segment in &self.segments {
            if let Segment::Field(field) = segment {
                if !fields.contains(field) {
                    fields.push(*field);
                }
            }
        }
        fields
    }

    /// Missing values render as empty text.
    pub fn render(&self, track: &PlaylistTrack) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(text) => text.clone(),
                Segment::Field(field) => track
                    .get(*field)
                    .map(FieldValue::to_string)
                    .unwrap_or_default(),
            })
            .collect()
    }
}

/// Shell-style match supporting `*` and `?`.
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;
    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some(&ch) if ch == '?' || ch == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match backtrack {
                Some((star, matched)) => {
                    p = star + 1;
                    t = matched + 1;
                    backtrack = Some((star, matched + 1));
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|ch| *ch == '*')
}

/// Keeps playlists whose path or name matches one of `patterns` (all when
/// empty). Smart playlists are kept only when asked for.
pub fn select_playlists(
    playlists: Vec<PlaylistInfo>,
    patterns: &[String],
    include_smart: bool,
) -> Vec<PlaylistInfo> {
    playlists
        .into_iter()
        .filter(|playlist| include_smart || !playlist.smart)
        .filter(|playlist| {
            patterns.is_empty()
                || patterns.iter().any(|pattern| {
                    glob_match(pattern, &playlist.path) || glob_match(pattern, &playlist.name)
                })
        })
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub include_smart: bool,
    /// Group tracks by year, sorted by artist within a year.
    pub yearly: bool,
    pub format: Option<TrackFormat>,
}

fn text_of(track: &PlaylistTrack, field: TrackField) -> String {
    track.get(field).map(FieldValue::to_string).unwrap_or_default()
}

fn year_of(track: &PlaylistTrack) -> i64 {
    match track.get(TrackField::Year) {
        Some(FieldValue::Integer(year)) => *year,
        _ => 0,
    }
}

/// Output lines for `playlists list`: playlist paths when no playlist is
/// named, otherwise the tracks of every matching playlist.
pub fn list_lines<L: PlaylistLibrary>(
    library: &mut L,
    patterns: &[String],
    options: &ListOptions,
) -> Result<Vec<String>, PlaylistError> {
    let playlists = select_playlists(library.playlists()?, patterns, options.include_smart);
    if patterns.is_empty() {
        return Ok(playlists.into_iter().map(|playlist| playlist.path).collect());
    }

    let mut fields = vec![TrackField::Year, TrackField::Artist, TrackField::Name];
    if let Some(format) = &options.format {
        for field in format.fields() {
            if !fields.contains(&field) {
                fields.push(field);
            }
        }
    }

    let mut lines = Vec::new();
    for playlist in playlists {
        let tracks = library.playlist_tracks(&playlist.name, &fields)?;
        if !options.yearly {
            lines.extend(tracks.iter().map(|track| match &options.format {
                Some(format) => format.render(track),
                None => format!(
                    "{} - {}",
                    text_of(track, TrackField::Artist),
                    text_of(track, TrackField::Name)
                ),
            }));
            continue;
        }

        let mut years: BTreeMap<i64, Vec<PlaylistTrack>> = BTreeMap::new();
        for track in tracks {
            years.entry(year_of(&track)).or_default().push(track);
        }
        for (year, mut tracks) in years {
            tracks.sort_by_key(|track| text_of(track, TrackField::Artist));
            for (position, track) in tracks.iter().enumerate() {
                let artist = text_of(track, TrackField::Artist);
                let name = text_of(track, TrackField::Name);
                lines.push(match &options.format {
                    Some(format) => format.render(track),
                    None if position == 0 => format!("{year:4}\t{artist}\t{name}"),
                    None => format!("\t{artist}\t{name}"),
                });
            }
        }
    }
    Ok(lines)
}

pub fn create_playlists<L: PlaylistLibrary>(
    library: &mut L,
    names: &[String],
) -> Result<(), PlaylistError> {
    for name in names {
        library.create_playlist(name)?;
        info!("Created playlist {}", name);
    }
    Ok(())
}

/// Removes every playlist carrying each name. A failure is logged and the
/// remaining names are still processed; returns the number of failures.
pub fn remove_playlists<L: PlaylistLibrary>(library: &mut L, names: &[String]) -> usize {
    let mut failures = 0;
    for name in names {
        match library.delete_playlist(name) {
            Ok(0) => warn!("No such playlist: {}", name),
            Ok(removed) => info!("Removed {} playlist(s) named {}", removed, name),
            Err(err) if err.is_host_unavailable() => {
                warn!("Error removing playlist {}: {}", name, err);
                return failures + 1;
            }
            Err(err) => {
                warn!("Error removing playlist {}: {}", name, err);
                failures += 1;
            }
        }
    }
    failures
}
