use std::fmt;
use std::path::{Path, PathBuf};

use super::error::BridgeError;

/// Player transport state as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Playing,
    Paused,
    Stopped,
    FastForwarding,
    Rewinding,
}

impl PlayerState {
    pub fn from_script_value(value: &str) -> Option<Self> {
        match value.trim() {
            "playing" => Some(PlayerState::Playing),
            "paused" => Some(PlayerState::Paused),
            "stopped" => Some(PlayerState::Stopped),
            "fast forwarding" => Some(PlayerState::FastForwarding),
            "rewinding" => Some(PlayerState::Rewinding),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PlayerState::Playing => "playing",
            PlayerState::Paused => "paused",
            PlayerState::Stopped => "stopped",
            PlayerState::FastForwarding => "fast forwarding",
            PlayerState::Rewinding => "rewinding",
        }
    }
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the current track used by `info` and the play monitor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackSummary {
    pub id: i64,
    pub path: Option<PathBuf>,
    pub name: String,
    pub artist: String,
    pub album: String,
    pub album_artist: String,
    pub genre: String,
    pub comment: String,
    pub time: String,
    pub year: i64,
    pub track_number: i64,
    pub track_count: i64,
    pub bpm: i64,
}

impl TrackSummary {
    /// Multi-line human readable description.
    pub fn describe(&self) -> String {
        format!(
            "Artist  {}\nAlbum   {}\nTitle   {}\nGenre   {}\nTrack   {}/{}\nLength  {}\nYear    {}\nBPM     {}\nComment {}",
            self.artist,
            self.album,
            self.name,
            self.genre,
            self.track_number,
            self.track_count,
            self.time,
            self.year,
            self.bpm,
            self.comment,
        )
    }
}

/// Transport and mixer controls of the host player.
pub trait PlayerControl {
    fn state(&mut self) -> Result<PlayerState, BridgeError>;

    /// Currently selected track, or `None` when nothing is loaded.
    fn current_track(&mut self) -> Result<Option<TrackSummary>, BridgeError>;

    /// Playback position within the current track, in seconds.
    fn position(&mut self) -> Result<f64, BridgeError>;

    fn play(&mut self) -> Result<(), BridgeError>;

    /// Jumps straight to a library entry by its player-assigned identifier.
    fn play_entry(&mut self, index: i64) -> Result<(), BridgeError>;

    fn play_file(&mut self, path: &Path) -> Result<(), BridgeError>;

    fn pause(&mut self) -> Result<(), BridgeError>;

    fn stop(&mut self) -> Result<(), BridgeError>;

    fn next_track(&mut self) -> Result<(), BridgeError>;

    fn previous_track(&mut self) -> Result<(), BridgeError>;

    fn volume(&mut self) -> Result<u8, BridgeError>;

    fn set_volume(&mut self, volume: u8) -> Result<(), BridgeError>;

    fn shuffle(&mut self) -> Result<bool, BridgeError>;

    fn set_shuffle(&mut self, enabled: bool) -> Result<(), BridgeError>;
}
