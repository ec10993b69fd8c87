use std::{
    path::{Path, PathBuf},
    time::UNIX_EPOCH,
};

use log::debug;

/// File types the host players import into their library.
pub const SUPPORTED_AUDIO_EXTENSIONS: [&str; 7] = ["mp3", "m4a", "m4b", "aac", "aif", "aiff", "wav"];

pub fn is_supported_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_AUDIO_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

/// Recursively lists supported audio files below `folder_path`, sorted.
///
/// Unreadable directories and entries are skipped with a debug log line.
pub fn collect_audio_files_from_folder(folder_path: &Path) -> Vec<PathBuf> {
    let mut pending_directories = vec![folder_path.to_path_buf()];
    let mut tracks = Vec::new();

    while let Some(directory) = pending_directories.pop() {
        let entries = match std::fs::read_dir(&directory) {
            Ok(entries) => entries,
            Err(err) => {
                debug!("Failed to read directory {}: {}", directory.display(), err);
                continue;
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    debug!(
                        "Failed to read a directory entry in {}: {}",
                        directory.display(),
                        err
                    );
                    continue;
                }
            };

            let path = entry.path();
            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(err) => {
                    debug!("Failed to inspect {}: {}", path.display(), err);
                    continue;
                }
            };

            if file_type.is_dir() {
                pending_directories.push(path);
                continue;
            }

            if (file_type.is_file() || file_type.is_symlink()) && is_supported_audio_file(&path) {
                tracks.push(path);
            }
        }
    }

    tracks.sort_unstable();
    tracks
}

/// Modification time of `path` in unix milliseconds, or `None` when the file
/// cannot be stat'ed.
pub fn file_mtime_unix_ms(path: &Path) -> Option<i64> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    modified
        .duration_since(UNIX_EPOCH)
        .ok()
        .map(|duration| duration.as_millis() as i64)
}


#[cfg(test)]
mod tests {
    use super::testing::TempTree;
    use super::*;

    #[test]
    fn test_is_supported_audio_file_ignores_case() {
        assert!(is_supported_audio_file(Path::new("/a/B.MP3")));
        assert!(is_supported_audio_file(Path::new("/a/b.aiff")));
        assert!(!is_supported_audio_file(Path::new("/a/cover.jpg")));
        assert!(!is_supported_audio_file(Path::new("/a/noext")));
    }

    #[test]
    fn test_collect_audio_files_recurses_and_sorts() {
        let tree = TempTree::new("collect");
        let b = tree.file("Artist/Album/02 b.mp3");
        let a = tree.file("Artist/Album/01 a.m4a");
        tree.file("Artist/Album/cover.jpg");
        let c = tree.file("Other/c.wav");

        let files = collect_audio_files_from_folder(&tree.root);
        assert_eq!(files, vec![a, b, c]);
    }

    #[test]
    fn test_file_mtime_unix_ms() {
        let tree = TempTree::new("mtime");
        let path = tree.file("a.mp3");
        tree.set_mtime_secs(&path, 1_600_000_000);
        assert_eq!(file_mtime_unix_ms(&path), Some(1_600_000_000_000));
        assert_eq!(file_mtime_unix_ms(&tree.root.join("missing.mp3")), None);
    }
}
