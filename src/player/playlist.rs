//! Playlist surface of the host player.

use super::error::BridgeError;
use super::fields::{FieldValue, TrackField};

/// A user playlist as listed by the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistInfo {
    pub name: String,
    /// Enclosing folder names and the playlist name, joined with `/`.
    pub path: String,
    pub smart: bool,
}

/// Attribute values of one playlist track, as requested from the player.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaylistTrack {
    values: Vec<(TrackField, Option<FieldValue>)>,
}

impl PlaylistTrack {
    pub fn new(values: Vec<(TrackField, Option<FieldValue>)>) -> Self {
        Self { values }
    }

    pub fn get(&self, field: TrackField) -> Option<&FieldValue> {
        self.values
            .iter()
            .find(|(candidate, _)| *candidate == field)
            .and_then(|(_, value)| value.as_ref())
    }
}

pub trait PlaylistLibrary {
    /// User playlists, skipping folders and the player's special playlists.
    fn playlists(&mut self) -> Result<Vec<PlaylistInfo>, BridgeError>;

    /// Reads `fields` for every track of the playlist called `name`.
    fn playlist_tracks(
        &mut self,
        name: &str,
        fields: &[TrackField],
    ) -> Result<Vec<PlaylistTrack>, BridgeError>;

    fn create_playlist(&mut self, name: &str) -> Result<(), BridgeError>;

    /// Deletes every user playlist called `name` and returns how many went.
    fn delete_playlist(&mut self, name: &str) -> Result<usize, BridgeError>;
}

#[cfg(test)]
pub mod testing {
    use std::collections::HashMap;

    use super::*;

    #[derive(Debug, Default)]
    pub struct FakePlaylists {
        pub playlists: Vec<PlaylistInfo>,
        pub tracks: HashMap<String, Vec<PlaylistTrack>>,
        pub requested_fields: Vec<TrackField>,
        pub failing_deletes: Vec<String>,
    }

    impl FakePlaylists {
        pub fn add(&mut self, path: &str, smart: bool, tracks: Vec<PlaylistTrack>) {
            let name = path.rsplit('/').next().unwrap_or(path).to_string();
            self.tracks.insert(name.clone(), tracks);
            self.playlists.push(PlaylistInfo {
                name,
                path: path.to_string(),
                smart,
            });
        }
    }

    impl PlaylistLibrary for FakePlaylists {
        fn playlists(&mut self) -> Result<Vec<PlaylistInfo>, BridgeError> {
            Ok(self.playlists.clone())
        }

        fn playlist_tracks(
            &mut self,
            name: &str,
            fields: &[TrackField],
        ) -> Result<Vec<PlaylistTrack>, BridgeError> {
            self.requested_fields = fields.to_vec();
            self.tracks
                .get(name)
                .cloned()
                .ok_or_else(|| BridgeError::NoSuchPlaylist(name.to_string()))
        }

        fn create_playlist(&mut self, name: &str) -> Result<(), BridgeError> {
            self.add(name, false, Vec::new());
            Ok(())
        }

        fn delete_playlist(&mut self, name: &str) -> Result<usize, BridgeError> {
            if self.failing_deletes.iter().any(|failing| failing == name) {
                return Err(BridgeError::Script {
                    message: format!("cannot delete {name}"),
                });
            }
            let before = self.playlists.len();
            self.playlists.retain(|playlist| playlist.name != name);
            self.tracks.remove(name);
            Ok(before - self.playlists.len())
        }
    }
}
