//! Directory snapshot of the audio files to organize.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Extensions picked up by the scan. Matched case-sensitively.
pub const AUDIO_EXTENSIONS: [&str; 15] = [
    "mp3", "flac", "ogg", "oga", "opus", "m4a", "m4b", "mp4", "aac", "wav", "aiff", "aif", "wma",
    "ape", "wv",
];

/// One file to process, paired with the library root it is moved under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioTask {
    pub path: PathBuf,
    pub root: PathBuf,
}

pub fn is_supported_extension(ext: &str) -> bool {
    AUDIO_EXTENSIONS.contains(&ext)
}

/// Walk `root` once and collect every supported regular file, sorted by path.
///
/// Symlinks are not followed. Entries that cannot be read are logged and skipped.
pub fn collect_tasks(root: &Path) -> Vec<AudioTask> {
    let mut tasks = Vec::new();

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let supported = entry
            .path()
            .extension()
            .and_then(OsStr::to_str)
            .is_some_and(is_supported_extension);
        if !supported {
            continue;
        }
        tasks.push(AudioTask {
            path: entry.into_path(),
            root: root.to_path_buf(),
        });
    }

    tasks.sort_by(|a, b| a.path.cmp(&b.path));
    tracing::debug!(root = %root.display(), files = tasks.len(), "scan complete");
    tasks
}
