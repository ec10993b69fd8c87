use std::path::PathBuf;

use super::fields::{FieldKind, TrackField};

/// Failures talking to the host player through the scripting bridge.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The player is not running or refused the connection.
    #[error("{0} is not running")]
    HostUnavailable(&'static str),
    /// Neither supported player application is installed.
    #[error("error detecting music player application")]
    NotInstalled,
    #[error("could not start osascript: {source}")]
    Spawn {
        #[source]
        source: std::io::Error,
    },
    #[error("player script failed: {message}")]
    Script { message: String },
    #[error("unexpected player response {output:?}: {reason}")]
    UnexpectedOutput { output: String, reason: String },
    #[error("invalid {kind:?} value for {field}: {value}")]
    InvalidValue {
        field: &'static str,
        kind: FieldKind,
        value: String,
    },
    #[error("track attribute {} is read-only", .0.name())]
    ReadOnlyField(TrackField),
    #[error("invalid track attribute: {0}")]
    UnknownField(String),
    #[error("no library entry at position {0}")]
    InvalidPosition(usize),
    #[error("no such playlist: {0}")]
    NoSuchPlaylist(String),
    #[error("path is not valid UTF-8: {}", .0.display())]
    NonUtf8Path(PathBuf),
}

impl BridgeError {
    pub fn is_host_unavailable(&self) -> bool {
        matches!(self, BridgeError::HostUnavailable(_))
    }
}
