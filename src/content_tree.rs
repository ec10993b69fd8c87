//! The directory tree whose audio files the player library should mirror.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::media_file_discovery::collect_audio_files_from_folder;
use crate::player::app::{PlayerApp, LIBRARY_PATH_FILENAME};

#[derive(Debug, thiserror::Error)]
pub enum ContentTreeError {
    #[error("content tree {} is not a directory", .0.display())]
    NotADirectory(PathBuf),
    #[error("failed to resolve content tree {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Picks the content tree root: explicit setting, then the player's
/// `library_path.txt`, then the player's default media folder.
pub fn resolve_root(configured: Option<PathBuf>, app: PlayerApp, home: &Path) -> PathBuf {
    if let Some(configured) = configured {
        return configured;
    }

    let pointer = app.data_directory(home).join(LIBRARY_PATH_FILENAME);
    match std::fs::read_to_string(&pointer) {
        Ok(content) => {
            let trimmed = content.trim();
            if !trimmed.is_empty() {
                debug!("Content tree from {}: {}", pointer.display(), trimmed);
                return PathBuf::from(trimmed);
            }
        }
        Err(err) => debug!("No library path file at {}: {}", pointer.display(), err),
    }

    app.default_music_directory(home)
}

/// Canonical set of supported audio files below one root.
#[derive(Debug, Clone)]
pub struct ContentTree {
    root: PathBuf,
    files: BTreeSet<PathBuf>,
}

impl ContentTree {
    pub fn load(root: &Path) -> Result<Self, ContentTreeError> {
        let root = root.canonicalize().map_err(|source| ContentTreeError::Io {
            path: root.to_path_buf(),
            source,
        })?;
        if !root.is_dir() {
            return Err(ContentTreeError::NotADirectory(root));
        }

        let files: BTreeSet<PathBuf> = collect_audio_files_from_folder(&root)
            .into_iter()
            .filter_map(|path| match path.canonicalize() {
                Ok(canonical) => Some(canonical),
                Err(err) => {
                    debug!("Skipping unresolvable file {}: {}", path.display(), err);
                    None
                }
            })
            .collect();
        info!(
            "Content tree {} holds {} audio files",
            root.display(),
            files.len()
        );
        Ok(Self { root, files })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether `path` (canonical) is one of the tree's audio files.
    pub fn contains(&self, path: &Path) -> bool {
        self.files.contains(path)
    }

    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media_file_discovery::testing::TempTree;

    #[test]
    fn test_resolve_root_prefers_configured_path() {
        let tree = TempTree::new("root_configured");
        let root = resolve_root(
            Some(PathBuf::from("/Volumes/Music")),
            PlayerApp::Music,
            &tree.root,
        );
        assert_eq!(root, PathBuf::from("/Volumes/Music"));
    }

    #[test]
    fn test_resolve_root_reads_library_path_file() {
        let tree = TempTree::new("root_pointer");
        let pointer = tree.file("Music/iTunes/library_path.txt");
        std::fs::write(&pointer, "/Volumes/Archive/Music\n").unwrap();

        let root = resolve_root(None, PlayerApp::ITunes, &tree.root);
        assert_eq!(root, PathBuf::from("/Volumes/Archive/Music"));
    }

    #[test]
    fn test_resolve_root_falls_back_to_player_default() {
        let tree = TempTree::new("root_default");
        let root = resolve_root(None, PlayerApp::Music, &tree.root);
        assert_eq!(root, tree.root.join("Music/Music/Media/Music"));
    }

    #[test]
    fn test_load_collects_canonical_audio_files() {
        let tree = TempTree::new("tree_load");
        let a = tree.file("music/Artist/01 a.mp3");
        tree.file("music/Artist/folder.jpg");
        let b = tree.file("music/b.m4a");

        let content = ContentTree::load(&tree.root.join("music/../music")).unwrap();
        assert_eq!(content.root(), tree.root.join("music"));
        assert_eq!(content.len(), 2);
        assert!(content.contains(&a));
        assert!(content.contains(&b));
        assert!(!content.contains(&tree.root.join("music/Artist/folder.jpg")));
        assert_eq!(content.files().collect::<Vec<_>>(), vec![a.as_path(), b.as_path()]);
    }

    #[test]
    fn test_load_rejects_missing_root() {
        let tree = TempTree::new("tree_missing");
        assert!(matches!(
            ContentTree::load(&tree.root.join("nope")),
            Err(ContentTreeError::Io { .. })
        ));
    }

    #[test]
    fn test_load_rejects_file_root() {
        let tree = TempTree::new("tree_file_root");
        let file = tree.file("a.mp3");
        assert!(matches!(
            ContentTree::load(&file),
            Err(ContentTreeError::NotADirectory(_))
        ));
    }
}
