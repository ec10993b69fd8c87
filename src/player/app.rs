//! Supported host player applications and their on-disk layout.

use std::path::{Path, PathBuf};

use crate::config::PlayerChoice;

use super::error::BridgeError;

/// File in the player data directory naming a custom content tree root.
pub const LIBRARY_PATH_FILENAME: &str = "library_path.txt";

/// Host player application controlled through the scripting bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerApp {
    Music,
    ITunes,
}

impl PlayerApp {
    /// Detection order: the current player before the legacy one.
    pub const ALL: [PlayerApp; 2] = [PlayerApp::Music, PlayerApp::ITunes];

    /// Application name as addressed by `tell application`.
    pub fn script_name(self) -> &'static str {
        match self {
            PlayerApp::Music => "Music",
            PlayerApp::ITunes => "iTunes",
        }
    }

    pub fn binary_path(self) -> &'static Path {
        match self {
            PlayerApp::Music => Path::new("/System/Applications/Music.app/Contents/MacOS/Music"),
            PlayerApp::ITunes => Path::new("/Applications/iTunes.app/Contents/MacOS/iTunes"),
        }
    }

    pub fn data_directory(self, home: &Path) -> PathBuf {
        match self {
            PlayerApp::Music => home.join("Music/Music/Music Library.musiclibrary"),
            PlayerApp::ITunes => home.join("Music/iTunes"),
        }
    }

    pub fn default_music_directory(self, home: &Path) -> PathBuf {
        match self {
            PlayerApp::Music => home.join("Music/Music/Media/Music"),
            PlayerApp::ITunes => home.join("Music/iTunes/iTunes Media/Music"),
        }
    }

    pub fn index_database_filename(self) -> &'static str {
        match self {
            PlayerApp::Music => "Tracks.sqlite",
            PlayerApp::ITunes => "iTunes Track Index.sqlite",
        }
    }

    pub fn default_index_database(self, home: &Path) -> PathBuf {
        self.data_directory(home)
            .join(self.index_database_filename())
    }

    /// Picks the first installed player.
    pub fn detect() -> Result<Self, BridgeError> {
        Self::detect_with(|path| path.is_file())
    }

    fn detect_with<F>(is_installed: F) -> Result<Self, BridgeError>
    where
        F: Fn(&Path) -> bool,
    {
        Self::ALL
            .into_iter()
            .find(|app| is_installed(app.binary_path()))
            .ok_or(BridgeError::NotInstalled)
    }

    pub fn from_choice(choice: PlayerChoice) -> Result<Self, BridgeError> {
        match choice {
            PlayerChoice::Auto => Self::detect(),
            PlayerChoice::Music => Ok(PlayerApp::Music),
            PlayerChoice::Itunes => Ok(PlayerApp::ITunes),
        }
    }
}
