//! Transport commands layered over [`PlayerControl`], with index-assisted
//! "play this file" resolution.

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, warn};

use crate::media_file_discovery::collect_audio_files_from_folder;
use crate::player::{BridgeError, PlayerControl, PlayerState};
use crate::track_index::{IndexError, TrackIndex};

/// Pause between single-step volume changes while fading.
pub const VOLUME_FADE_STEP_DELAY: Duration = Duration::from_millis(10);

#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error(transparent)]
    Player(#[from] BridgeError),
    #[error("cannot play {}: {source}", .path.display())]
    Path {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no audio files in {}", .0.display())]
    EmptyDirectory(PathBuf),
    #[error("invalid volume value {0}")]
    InvalidVolume(String),
}

/// How a play-by-path request was satisfied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayOutcome {
    /// Jumped straight to the indexed library entry.
    Jumped(i64),
    /// Handed the file itself to the player.
    File(PathBuf),
}

/// A `volume` argument: `N` sets, `+N` / `-N` fades relative to the current level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeRequest {
    Absolute(u8),
    Relative(i32),
}

impl VolumeRequest {
    pub fn parse(value: &str) -> Result<Self, PlaybackError> {
        let invalid = || PlaybackError::InvalidVolume(value.to_string());
        let trimmed = value.trim();
        if let Some(delta) = trimmed.strip_prefix('+') {
            return delta
                .parse::<u8>()
                .map(|delta| VolumeRequest::Relative(i32::from(delta)))
                .map_err(|_| invalid());
        }
        if let Some(delta) = trimmed.strip_prefix('-') {
            return delta
                .parse::<u8>()
                .map(|delta| VolumeRequest::Relative(-i32::from(delta)))
                .map_err(|_| invalid());
        }
        match trimmed.parse::<u8>() {
            Ok(volume) if volume <= 100 => Ok(VolumeRequest::Absolute(volume)),
            _ => Err(invalid()),
        }
    }

    /// Target level for a player currently at `current`.
    pub fn target(self, current: u8) -> u8 {
        match self {
            VolumeRequest::Absolute(volume) => volume,
            VolumeRequest::Relative(delta) => (i32::from(current) + delta).clamp(0, 100) as u8,
        }
    }
}

pub struct PlaybackController<'a, P: PlayerControl> {
    player: &'a mut P,
    index: Option<&'a TrackIndex>,
}

impl<'a, P: PlayerControl> PlaybackController<'a, P> {
    /// `index` is optional; without it every play request hands over the file.
    pub fn new(player: &'a mut P, index: Option<&'a TrackIndex>) -> Self {
        Self { player, index }
    }

    /// Plays a file, or the first audio file of a directory.
    ///
    /// A path found in the index is played by jumping to its library entry;
    /// anything else, including a rejected jump, falls back to the file.
    pub fn play_path(&mut self, path: &Path) -> Result<PlayOutcome, PlaybackError> {
        let path = path.canonicalize().map_err(|source| PlaybackError::Path {
            path: path.to_path_buf(),
            source,
        })?;
        let path = if path.is_dir() {
            collect_audio_files_from_folder(&path)
                .into_iter()
                .next()
                .ok_or(PlaybackError::EmptyDirectory(path))?
        } else {
            path
        };

        if let Some(key) = self.indexed_key(&path) {
            match self.player.play_entry(key) {
                Ok(()) => return Ok(PlayOutcome::Jumped(key)),
                Err(err) if err.is_host_unavailable() => return Err(err.into()),
                Err(err) => debug!("Jump to entry {} failed, playing file: {}", key, err),
            }
        }

        self.player.play_file(&path)?;
        Ok(PlayOutcome::File(path))
    }

    fn indexed_key(&self, path: &Path) -> Option<i64> {
        match self.index?.lookup(path) {
            Ok(key) => Some(key),
            Err(IndexError::NotIndexed(_)) => None,
            Err(err) => {
                warn!("Track index lookup failed: {}", err);
                None
            }
        }
    }

    /// Pauses while playing, otherwise starts playback.
    pub fn toggle(&mut self) -> Result<PlayerState, PlaybackError> {
        if self.player.state()? == PlayerState::Playing {
            self.player.pause()?;
        } else {
            self.player.play()?;
        }
        Ok(self.player.state()?)
    }

    /// Stops only when something is playing or paused.
    pub fn stop(&mut self) -> Result<(), PlaybackError> {
        if matches!(
            self.player.state()?,
            PlayerState::Playing | PlayerState::Paused
        ) {
            self.player.stop()?;
        }
        Ok(())
    }

    /// Applies a volume request and returns the resulting level.
    ///
    /// Relative requests move one step at a time with `step_delay` between
    /// steps.
    pub fn apply_volume(
        &mut self,
        request: VolumeRequest,
        step_delay: Duration,
    ) -> Result<u8, PlaybackError> {
        let current = self.player.volume()?;
        let target = request.target(current);
        match request {
            VolumeRequest::Absolute(_) => self.player.set_volume(target)?,
            VolumeRequest::Relative(_) => {
                let mut level = current;
                while level != target {
                    level = if level < target { level + 1 } else { level - 1 };
                    self.player.set_volume(level)?;
                    if !step_delay.is_zero() {
                        std::thread::sleep(step_delay);
                    }
                }
            }
        }
        Ok(target)
    }
}
