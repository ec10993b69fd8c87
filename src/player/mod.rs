//! Host player façade: application detection, the scripting bridge and the
//! typed library/transport surfaces the rest of the crate programs against.

pub(crate) mod app;
pub(crate) mod control;
pub(crate) mod error;
pub(crate) mod fields;
pub(crate) mod library;
pub(crate) mod osascript;
pub(crate) mod playlist;

pub(crate) use app::PlayerApp;
pub(crate) use control::{PlayerControl, PlayerState, TrackSummary};
pub(crate) use error::BridgeError;
pub(crate) use fields::{FieldValue, TrackField};
pub(crate) use library::{LibraryEntry, MusicLibrary};
pub(crate) use osascript::OsascriptBridge;
pub(crate) use playlist::{PlaylistInfo, PlaylistLibrary, PlaylistTrack};
