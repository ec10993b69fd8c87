//! Scripting bridge backed by the system `osascript` tool.
//!
//! Each call renders a small AppleScript snippet addressed to the detected
//! player and parses the textual result. The connection state is explicit:
//! [`HostConnection::ensure_connected`] checks that the player is running and
//! every bridge call goes through it first.

use std::path::Path;
use std::process::Command;

use chrono::{Duration, Utc};
use log::{debug, info};

use super::app::PlayerApp;
use super::control::{PlayerControl, PlayerState, TrackSummary};
use super::error::BridgeError;
use super::fields::{FieldKind, FieldValue, TrackField};
use super::library::{LibraryEntry, MusicLibrary};
use super::playlist::{PlaylistInfo, PlaylistLibrary, PlaylistTrack};

/// Separates values in multi-value script results (ASCII record separator).
const FIELD_SEPARATOR: char = '\u{1e}';
/// Ends each row of multi-row script results (ASCII unit separator).
const ROW_SEPARATOR: char = '\u{1f}';
/// AppleScript error number for "application isn't running".
const APP_NOT_RUNNING_ERROR: &str = "-600";
/// AppleScript error number for "invalid index".
const INVALID_INDEX_ERROR: &str = "-1719";
/// Returned by the playlist track script when no playlist has the name.
const MISSING_PLAYLIST: &str = "missing playlist";

/// Runs one AppleScript program and returns its standard output.
pub trait ScriptRunner {
    fn run(&self, script: &str) -> Result<String, BridgeError>;
}

/// Executes scripts through `/usr/bin/osascript`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsascriptRunner;

impl ScriptRunner for OsascriptRunner {
    fn run(&self, script: &str) -> Result<String, BridgeError> {
        let output = Command::new("osascript")
            .arg("-e")
            .arg(script)
            .output()
            .map_err(|source| BridgeError::Spawn { source })?;
        if !output.status.success() {
            return Err(BridgeError::Script {
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout)
            .trim_end_matches(['\r', '\n'])
            .to_string())
    }
}

/// Result of checking whether the host player can be scripted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostStatus {
    Connected,
    Unavailable,
}

/// Connection holder for one host player.
#[derive(Debug)]
pub struct HostConnection {
    app: PlayerApp,
    connected: bool,
}

impl HostConnection {
    pub fn new(app: PlayerApp) -> Self {
        Self {
            app,
            connected: false,
        }
    }

    pub fn app(&self) -> PlayerApp {
        self.app
    }

    /// Checks the player process once and caches a positive answer.
    pub fn ensure_connected<R: ScriptRunner>(&mut self, runner: &R) -> HostStatus {
        if self.connected {
            return HostStatus::Connected;
        }
        let script = format!(
            "application \"{}\" is running",
            self.app.script_name()
        );
        match runner.run(&script) {
            Ok(output) if output.trim() == "true" => {
                debug!("Connected to {}", self.app.script_name());
                self.connected = true;
                HostStatus::Connected
            }
            Ok(_) => HostStatus::Unavailable,
            Err(err) => {
                debug!(
                    "Could not query {} process state: {}",
                    self.app.script_name(),
                    err
                );
                HostStatus::Unavailable
            }
        }
    }

    /// Forgets the cached connection so the next call re-checks the host.
    pub fn disconnect(&mut self) {
        if self.connected {
            info!("Lost connection to {}", self.app.script_name());
        }
        self.connected = false;
    }
}

/// Escapes a value for use inside an AppleScript string literal.
fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

fn path_literal(path: &Path) -> Result<String, BridgeError> {
    let text = path
        .to_str()
        .ok_or_else(|| BridgeError::NonUtf8Path(path.to_path_buf()))?;
    Ok(format!("(POSIX file {})", quote(text)))
}

fn track_reference(index: i64) -> String {
    format!("(first file track of library playlist 1 whose id is {index})")
}

fn value_literal(value: &FieldValue) -> String {
    match value {
        FieldValue::Integer(value) => value.to_string(),
        FieldValue::Float(value) => value.to_string(),
        FieldValue::Text(value) => quote(value),
        FieldValue::Date(value) => {
            let offset = value.signed_duration_since(Utc::now()).num_seconds();
            format!("((current date) + ({offset}))")
        }
    }
}

fn unexpected(output: &str, reason: &str) -> BridgeError {
    BridgeError::UnexpectedOutput {
        output: output.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_int(output: &str) -> Result<i64, BridgeError> {
    let trimmed = output.trim();
    trimmed
        .parse::<i64>()
        .or_else(|_| trimmed.parse::<f64>().map(|value| value.round() as i64))
        .map_err(|_| unexpected(output, "expected a number"))
}

fn parse_bool(output: &str) -> Result<bool, BridgeError> {
    match output.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(unexpected(output, "expected true or false")),
    }
}

fn parse_entry(output: &str) -> Result<LibraryEntry, BridgeError> {
    let (index, path) = output
        .split_once(FIELD_SEPARATOR)
        .ok_or_else(|| unexpected(output, "expected id and location"))?;
    let index = parse_int(index)?;
    let path = path.trim_end_matches(['\r', '\n']);
    let path = (!path.is_empty()).then(|| path.into());
    Ok(LibraryEntry::new(index, path))
}

const CURRENT_TRACK_FIELDS: [TrackField; 12] = [
    TrackField::Id,
    TrackField::Name,
    TrackField::Artist,
    TrackField::Album,
    TrackField::AlbumArtist,
    TrackField::Genre,
    TrackField::Comment,
    TrackField::Time,
    TrackField::Year,
    TrackField::TrackNumber,
    TrackField::TrackCount,
    TrackField::Bpm,
];

fn current_track_script() -> String {
    let mut script = String::from(
        "try\nset t to current track\non error\nreturn \"\"\nend try\nset sep to ASCII character 30\nset trackPath to \"\"\ntry\nset trackPath to POSIX path of (get location of t)\nend try\nset out to trackPath",
    );
    for field in CURRENT_TRACK_FIELDS {
        script.push_str(&format!(
            "\nset v to \"\"\ntry\nset v to ({} of t) as text\nend try\nset out to out & sep & v",
            field.script_name()
        ));
    }
    script.push_str("\nreturn out");
    script
}

fn parse_current_track(output: &str) -> Result<Option<TrackSummary>, BridgeError> {
    if output.trim().is_empty() {
        return Ok(None);
    }
    let values: Vec<&str> = output.split(FIELD_SEPARATOR).collect();
    if values.len() != CURRENT_TRACK_FIELDS.len() + 1 {
        return Err(unexpected(output, "wrong number of track fields"));
    }
    let text = |position: usize| -> String {
        match values[position].trim() {
            "missing value" => String::new(),
            value => value.to_string(),
        }
    };
    let number = |position: usize| -> i64 {
        let field = CURRENT_TRACK_FIELDS[position - 1];
        match field.kind().parse(field, values[position]) {
            Ok(Some(FieldValue::Integer(value))) => value,
            _ => 0,
        }
    };
    let path = text(0);
    Ok(Some(TrackSummary {
        id: parse_int(values[1])?,
        path: (!path.is_empty()).then(|| path.into()),
        name: text(2),
        artist: text(3),
        album: text(4),
        album_artist: text(5),
        genre: text(6),
        comment: text(7),
        time: text(8),
        year: number(9),
        track_number: number(10),
        track_count: number(11),
        bpm: number(12),
    }))
}

fn parse_playlists(output: &str) -> Result<Vec<PlaylistInfo>, BridgeError> {
    output
        .split(ROW_SEPARATOR)
        .filter(|row| !row.trim().is_empty())
        .map(|row| {
            let mut values = row.split(FIELD_SEPARATOR);
            match (values.next(), values.next(), values.next()) {
                (Some(path), Some(name), Some(smart)) => Ok(PlaylistInfo {
                    name: name.to_string(),
                    path: path.trim_start_matches(['\r', '\n']).to_string(),
                    smart: parse_bool(smart)?,
                }),
                _ => Err(unexpected(row, "expected path, name and smart flag")),
            }
        })
        .collect()
}

fn playlist_tracks_script(name: &str, fields: &[TrackField]) -> String {
    let mut script = format!(
        "try\nset pl to first user playlist whose name is {}\non error\nreturn \"{MISSING_PLAYLIST}\"\nend try\nset sep to ASCII character 30\nset rowEnd to ASCII character 31\nset out to \"\"\nrepeat with t in file tracks of pl\nset row to \"\"",
        quote(name)
    );
    for field in fields {
        script.push_str(&format!(
            "\nset v to \"\"\ntry\nset v to ({} of t) as text\nend try\nset row to row & sep & v",
            field.script_name()
        ));
    }
    script.push_str("\nset out to out & row & rowEnd\nend repeat\nreturn out");
    script
}

/// Values that do not coerce to the field's kind, such as localized dates,
/// are kept as text.
fn parse_playlist_tracks(
    output: &str,
    fields: &[TrackField],
) -> Result<Vec<PlaylistTrack>, BridgeError> {
    output
        .split(ROW_SEPARATOR)
        .filter(|row| !row.trim().is_empty())
        .map(|row| {
            let raw: Vec<&str> = row.split(FIELD_SEPARATOR).skip(1).collect();
            if raw.len() != fields.len() {
                return Err(unexpected(row, "wrong number of playlist track fields"));
            }
            let values = fields
                .iter()
                .zip(raw)
                .map(|(field, raw)| {
                    let value = field
                        .kind()
                        .parse(*field, raw)
                        .unwrap_or_else(|_| Some(FieldValue::Text(raw.trim().to_string())));
                    (*field, value)
                })
                .collect();
            Ok(PlaylistTrack::new(values))
        })
        .collect()
}

/// Player bridge speaking AppleScript to Music or iTunes.
pub struct OsascriptBridge<R: ScriptRunner = OsascriptRunner> {
    runner: R,
    connection: HostConnection,
}

impl OsascriptBridge<OsascriptRunner> {
    pub fn new(app: PlayerApp) -> Self {
        Self::with_runner(app, OsascriptRunner)
    }
}

impl<R: ScriptRunner> OsascriptBridge<R> {
    pub fn with_runner(app: PlayerApp, runner: R) -> Self {
        Self {
            runner,
            connection: HostConnection::new(app),
        }
    }

    pub fn app(&self) -> PlayerApp {
        self.connection.app()
    }

    pub fn ensure_connected(&mut self) -> HostStatus {
        self.connection.ensure_connected(&self.runner)
    }

    fn require_connected(&mut self) -> Result<(), BridgeError> {
        match self.ensure_connected() {
            HostStatus::Connected => Ok(()),
            HostStatus::Unavailable => Err(BridgeError::HostUnavailable(
                self.app().script_name(),
            )),
        }
    }

    /// Runs `body` inside a `tell application` block for the player.
    fn tell(&mut self, body: &str) -> Result<String, BridgeError> {
        self.require_connected()?;
        let script = format!(
            "tell application {}\n{}\nend tell",
            quote(self.app().script_name()),
            body
        );
        match self.runner.run(&script) {
            Err(BridgeError::Script { message }) if message.contains(APP_NOT_RUNNING_ERROR) => {
                self.connection.disconnect();
                Err(BridgeError::HostUnavailable(self.app().script_name()))
            }
            result => result,
        }
    }
}

impl<R: ScriptRunner> MusicLibrary for OsascriptBridge<R> {
    fn entry_count(&mut self) -> Result<usize, BridgeError> {
        let output = self.tell("count file tracks of library playlist 1")?;
        usize::try_from(parse_int(&output)?).map_err(|_| unexpected(&output, "negative count"))
    }

    fn entry_at(&mut self, position: usize) -> Result<LibraryEntry, BridgeError> {
        let body = format!(
            "set t to file track {} of library playlist 1\nset trackPath to \"\"\ntry\nset trackPath to POSIX path of (get location of t)\nend try\nreturn ((id of t) as text) & (ASCII character 30) & trackPath",
            position + 1
        );
        match self.tell(&body) {
            Ok(output) => parse_entry(&output),
            Err(BridgeError::Script { message }) if message.contains(INVALID_INDEX_ERROR) => {
                Err(BridgeError::InvalidPosition(position))
            }
            Err(err) => Err(err),
        }
    }

    fn delete_entry(&mut self, entry: &LibraryEntry) -> Result<(), BridgeError> {
        self.tell(&format!("delete {}", track_reference(entry.index)))?;
        Ok(())
    }

    fn add_file(&mut self, path: &Path) -> Result<(), BridgeError> {
        self.tell(&format!("add {} to library playlist 1", path_literal(path)?))?;
        Ok(())
    }

    fn read_field(
        &mut self,
        entry: &LibraryEntry,
        field: TrackField,
    ) -> Result<Option<FieldValue>, BridgeError> {
        let reference = track_reference(entry.index);
        if field.kind() == FieldKind::Date {
            // Dates cross the bridge as second offsets from the host clock.
            let body = format!(
                "set d to {} of {}\nif d is missing value then return \"missing value\"\nreturn (d - (current date)) as text",
                field.script_name(),
                reference
            );
            let output = self.tell(&body)?;
            if output.trim() == "missing value" {
                return Ok(None);
            }
            let offset = parse_int(&output)?;
            return Ok(Some(FieldValue::Date(Utc::now() + Duration::seconds(offset))));
        }
        let output = self.tell(&format!(
            "get {} of {}",
            field.script_name(),
            reference
        ))?;
        field.kind().parse(field, &output)
    }

    fn write_field(
        &mut self,
        entry: &LibraryEntry,
        field: TrackField,
        value: &FieldValue,
    ) -> Result<(), BridgeError> {
        value.check_writable(field)?;
        self.tell(&format!(
            "set {} of {} to {}",
            field.script_name(),
            track_reference(entry.index),
            value_literal(value)
        ))?;
        Ok(())
    }
}

impl<R: ScriptRunner> PlayerControl for OsascriptBridge<R> {
    fn state(&mut self) -> Result<PlayerState, BridgeError> {
        let output = self.tell("get player state as text")?;
        PlayerState::from_script_value(&output)
            .ok_or_else(|| unexpected(&output, "unknown player state"))
    }

    fn current_track(&mut self) -> Result<Option<TrackSummary>, BridgeError> {
        let output = self.tell(&current_track_script())?;
        parse_current_track(&output)
    }

    fn position(&mut self) -> Result<f64, BridgeError> {
        let output = self.tell("get player position")?;
        match output.trim() {
            "missing value" | "" => Ok(0.0),
            value => value
                .parse::<f64>()
                .map_err(|_| unexpected(&output, "expected seconds")),
        }
    }

    fn play(&mut self) -> Result<(), BridgeError> {
        self.tell("play")?;
        Ok(())
    }

    fn play_entry(&mut self, index: i64) -> Result<(), BridgeError> {
        self.tell(&format!("play {}", track_reference(index)))?;
        Ok(())
    }

    fn play_file(&mut self, path: &Path) -> Result<(), BridgeError> {
        self.tell(&format!("play {}", path_literal(path)?))?;
        Ok(())
    }

    fn pause(&mut self) -> Result<(), BridgeError> {
        self.tell("pause")?;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), BridgeError> {
        self.tell("stop")?;
        Ok(())
    }

    fn next_track(&mut self) -> Result<(), BridgeError> {
        self.tell("next track")?;
        Ok(())
    }

    fn previous_track(&mut self) -> Result<(), BridgeError> {
        self.tell("previous track")?;
        Ok(())
    }

    fn volume(&mut self) -> Result<u8, BridgeError> {
        let output = self.tell("get sound volume")?;
        let volume = parse_int(&output)?;
        u8::try_from(volume.clamp(0, 100)).map_err(|_| unexpected(&output, "volume out of range"))
    }

    fn set_volume(&mut self, volume: u8) -> Result<(), BridgeError> {
        self.tell(&format!("set sound volume to {}", volume.min(100)))?;
        Ok(())
    }

    fn shuffle(&mut self) -> Result<bool, BridgeError> {
        let output = self.tell("get shuffle enabled")?;
        parse_bool(&output)
    }

    fn set_shuffle(&mut self, enabled: bool) -> Result<(), BridgeError> {
        self.tell(&format!("set shuffle enabled to {enabled}"))?;
        Ok(())
    }
}

impl<R: ScriptRunner> PlaylistLibrary for OsascriptBridge<R> {
    fn playlists(&mut self) -> Result<Vec<PlaylistInfo>, BridgeError> {
        let output = self.tell(
            "set sep to ASCII character 30\nset rowEnd to ASCII character 31\nset out to \"\"\nrepeat with p in user playlists\nif special kind of p is none then\nset playlistPath to name of p\nset q to p\ntry\nrepeat\nset q to parent of q\nset playlistPath to (name of q) & \"/\" & playlistPath\nend repeat\nend try\nset out to out & playlistPath & sep & (name of p) & sep & ((smart of p) as text) & rowEnd\nend if\nend repeat\nreturn out",
        )?;
        parse_playlists(&output)
    }

    fn playlist_tracks(
        &mut self,
        name: &str,
        fields: &[TrackField],
    ) -> Result<Vec<PlaylistTrack>, BridgeError> {
        let output = self.tell(&playlist_tracks_script(name, fields))?;
        if output.trim() == MISSING_PLAYLIST {
            return Err(BridgeError::NoSuchPlaylist(name.to_string()));
        }
        parse_playlist_tracks(&output, fields)
    }

    fn create_playlist(&mut self, name: &str) -> Result<(), BridgeError> {
        self.tell(&format!(
            "make new user playlist with properties {{name:{}}}",
            quote(name)
        ))?;
        Ok(())
    }

    fn delete_playlist(&mut self, name: &str) -> Result<usize, BridgeError> {
        let output = self.tell(&format!(
            "set removed to 0\nrepeat with p in (get every user playlist whose name is {})\ndelete p\nset removed to removed + 1\nend repeat\nreturn removed",
            quote(name)
        ))?;
        usize::try_from(parse_int(&output)?).map_err(|_| unexpected(&output, "negative count"))
    }
}
