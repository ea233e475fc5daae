//! Per-file work: read tags, build the destination, move.
//!
//! Every failure is turned into an [`Outcome`] here; nothing escapes to the worker.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::sanitize::{normalize_track_number, sanitize_segment};
use crate::tags::{ExtractedTags, TagSource};

/// Why a file was left where it is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// One of artist, album, title or track number is absent or blank.
    MissingField,
    /// The named field held nothing but characters that sanitization removes.
    EmptyAfterSanitize(&'static str),
    /// The computed destination already exists, or another file in this run claimed it.
    DestinationExists(PathBuf),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingField => write!(f, "missing required field"),
            SkipReason::EmptyAfterSanitize(field) => {
                write!(f, "{field} empty after sanitization")
            }
            SkipReason::DestinationExists(_) => write!(f, "destination exists"),
        }
    }
}

/// Terminal result of processing one file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Moved { from: PathBuf, to: PathBuf },
    /// Dry run: the file would have been moved to `to`.
    Planned { from: PathBuf, to: PathBuf },
    Skipped { path: PathBuf, reason: SkipReason },
    Failed { path: PathBuf, reason: String },
}

impl Outcome {
    pub fn source(&self) -> &Path {
        match self {
            Outcome::Moved { from, .. } | Outcome::Planned { from, .. } => from,
            Outcome::Skipped { path, .. } | Outcome::Failed { path, .. } => path,
        }
    }

    /// Emit the single log line for this outcome.
    pub fn log(&self) {
        match self {
            Outcome::Moved { from, to } => {
                tracing::info!(from = %from.display(), to = %to.display(), "moved");
            }
            Outcome::Planned { from, to } => {
                tracing::info!(from = %from.display(), to = %to.display(), "would move");
            }
            Outcome::Skipped { path, reason } => {
                tracing::warn!(path = %path.display(), "skipped: {reason}");
            }
            Outcome::Failed { path, reason } => {
                tracing::error!(path = %path.display(), "{reason}");
            }
        }
    }
}

/// Destinations handed out during the current run.
///
/// Two sources can sanitize to the same name; the first to claim it wins so a rename never
/// replaces a file moved moments earlier by another worker.
#[derive(Clone, Debug, Default)]
pub struct DestinationClaims {
    claimed: Arc<Mutex<HashSet<PathBuf>>>,
}

impl DestinationClaims {
    /// Returns `false` when `dest` was already claimed.
    pub fn claim(&self, dest: &Path) -> bool {
        match self.claimed.lock() {
            Ok(mut set) => set.insert(dest.to_path_buf()),
            Err(poisoned) => poisoned.into_inner().insert(dest.to_path_buf()),
        }
    }
}

/// Applies the tag-driven layout to individual files.
#[derive(Clone)]
pub struct Organizer {
    tags: Arc<dyn TagSource>,
    dry_run: bool,
    claims: DestinationClaims,
}

impl Organizer {
    pub fn new(tags: Arc<dyn TagSource>, dry_run: bool) -> Self {
        Self {
            tags,
            dry_run,
            claims: DestinationClaims::default(),
        }
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Move `path` to `root/Artist/Album/Track -- Title.ext`.
    pub fn extract_and_move(&self, path: &Path, root: &Path) -> Outcome {
        let map = match self.tags.read_tags(path) {
            Ok(map) => map,
            Err(e) => return failed(path, format!("failed to open: {e:#}")),
        };

        let mut tags = ExtractedTags::from_map(&map);
        tags.track_number = normalize_track_number(&tags.track_number);
        if !tags.is_complete() {
            return skipped(path, SkipReason::MissingField);
        }

        let dest = match destination_for(&tags, path, root) {
            Ok(dest) => dest,
            Err(reason) => return skipped(path, reason),
        };

        match std::fs::symlink_metadata(&dest) {
            Ok(_) => return skipped(path, SkipReason::DestinationExists(dest)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return failed(path, format!("stat {}: {e}", dest.display())),
        }
        if !self.claims.claim(&dest) {
            return skipped(path, SkipReason::DestinationExists(dest));
        }

        if self.dry_run {
            return Outcome::Planned {
                from: path.to_path_buf(),
                to: dest,
            };
        }

        if let Some(dir) = dest.parent() {
            if let Err(e) = std::fs::create_dir_all(dir) {
                return failed(path, format!("create {}: {e}", dir.display()));
            }
        }

        match std::fs::rename(path, &dest) {
            Ok(()) => Outcome::Moved {
                from: path.to_path_buf(),
                to: dest,
            },
            Err(e) => failed(path, e.to_string()),
        }
    }
}

/// Destination path for already-complete, already-normalized tags.
pub fn destination_for(
    tags: &ExtractedTags,
    source: &Path,
    root: &Path,
) -> Result<PathBuf, SkipReason> {
    let artist = non_empty("artist", sanitize_segment(&tags.artist))?;
    let album = non_empty("album", sanitize_segment(&tags.album))?;
    let title = non_empty("title", sanitize_segment(&tags.title))?;

    let ext = source
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    let file_name = format!("{} -- {}{}", tags.track_number, title, ext);

    Ok(root.join(artist).join(album).join(file_name))
}

fn non_empty(field: &'static str, value: String) -> Result<String, SkipReason> {
    if value.is_empty() {
        Err(SkipReason::EmptyAfterSanitize(field))
    } else {
        Ok(value)
    }
}

fn skipped(path: &Path, reason: SkipReason) -> Outcome {
    Outcome::Skipped {
        path: path.to_path_buf(),
        reason,
    }
}

fn failed(path: &Path, reason: String) -> Outcome {
    Outcome::Failed {
        path: path.to_path_buf(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::{ALBUM, ARTIST, TITLE, TRACK_NUMBER, TagMap};

    struct FixedTags(Option<TagMap>);

    impl TagSource for FixedTags {
        fn read_tags(&self, _path: &Path) -> anyhow::Result<TagMap> {
            self.0
                .clone()
                .ok_or_else(|| anyhow::anyhow!("unsupported container"))
        }
    }

    fn organizer(map: Option<TagMap>, dry_run: bool) -> Organizer {
        Organizer::new(Arc::new(FixedTags(map)), dry_run)
    }

    fn floyd() -> TagMap {
        TagMap::new()
            .with(ARTIST, "Pink Floyd")
            .with(ALBUM, "The Wall")
            .with(TITLE, "Comfortably Numb")
            .with(TRACK_NUMBER, "6/13")
    }

    fn extracted(artist: &str, album: &str, title: &str, track: &str) -> ExtractedTags {
        ExtractedTags {
            artist: artist.into(),
            album: album.into(),
            title: title.into(),
            track_number: track.into(),
        }
    }

    #[test]
    fn destination_uses_sanitized_fields_and_original_extension() {
        let tags = extracted("AC/DC", "Back in Black", "Hells Bells?", "1 of 10");
        let dest = destination_for(&tags, Path::new("/in/x.Flac"), Path::new("/lib")).unwrap();
        assert_eq!(
            dest,
            PathBuf::from("/lib/ACDC/Back in Black/1 of 10 -- Hells Bells.Flac")
        );
    }

    #[test]
    fn destination_without_extension_has_no_suffix() {
        let tags = extracted("A", "B", "C", "1");
        let dest = destination_for(&tags, Path::new("/in/noext"), Path::new("/lib")).unwrap();
        assert_eq!(dest, PathBuf::from("/lib/A/B/1 -- C"));
    }

    #[test]
    fn destination_rejects_fields_emptied_by_sanitizing() {
        let tags = extracted("!!!", "B", "C", "1");
        assert_eq!(
            destination_for(&tags, Path::new("/in/a.mp3"), Path::new("/lib")),
            Err(SkipReason::EmptyAfterSanitize("artist"))
        );
    }

    #[test]
    fn moves_tagged_file_into_layout() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("song.mp3");
        std::fs::write(&source, b"audio").unwrap();

        let outcome = organizer(Some(floyd()), false).extract_and_move(&source, dir.path());
        let expected = dir
            .path()
            .join("Pink Floyd/The Wall/6 of 13 -- Comfortably Numb.mp3");

        assert_eq!(
            outcome,
            Outcome::Moved {
                from: source.clone(),
                to: expected.clone()
            }
        );
        assert!(!source.exists());
        assert_eq!(std::fs::read(&expected).unwrap(), b"audio");
    }

    #[test]
    fn decode_failure_leaves_file_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("broken.flac");
        std::fs::write(&source, b"junk").unwrap();

        let outcome = organizer(None, false).extract_and_move(&source, dir.path());
        match outcome {
            Outcome::Failed { path, reason } => {
                assert_eq!(path, source);
                assert!(reason.starts_with("failed to open"));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(source.exists());
    }

    #[test]
    fn missing_field_skips_without_touching_source() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("song.ogg");
        std::fs::write(&source, b"audio").unwrap();
        let map = TagMap::new()
            .with(ARTIST, "Pink Floyd")
            .with(ALBUM, "The Wall")
            .with(TITLE, "Comfortably Numb");

        let outcome = organizer(Some(map), false).extract_and_move(&source, dir.path());

        assert_eq!(
            outcome,
            Outcome::Skipped {
                path: source.clone(),
                reason: SkipReason::MissingField
            }
        );
        assert_eq!(std::fs::read(&source).unwrap(), b"audio");
        assert!(!dir.path().join("Pink Floyd").exists());
    }

    #[test]
    fn punctuation_only_artist_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("song.mp3");
        std::fs::write(&source, b"audio").unwrap();
        let map = TagMap::new()
            .with(ARTIST, "???")
            .with(ALBUM, "Album")
            .with(TITLE, "Title")
            .with(TRACK_NUMBER, "1");

        let outcome = organizer(Some(map), false).extract_and_move(&source, dir.path());
        assert_eq!(
            outcome,
            Outcome::Skipped {
                path: source.clone(),
                reason: SkipReason::EmptyAfterSanitize("artist")
            }
        );
        assert!(source.exists());
    }

    #[test]
    fn existing_destination_is_never_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("song.mp3");
        std::fs::write(&source, b"new").unwrap();
        let existing = dir
            .path()
            .join("Pink Floyd/The Wall/6 of 13 -- Comfortably Numb.mp3");
        std::fs::create_dir_all(existing.parent().unwrap()).unwrap();
        std::fs::write(&existing, b"old").unwrap();

        let outcome = organizer(Some(floyd()), false).extract_and_move(&source, dir.path());

        assert_eq!(
            outcome,
            Outcome::Skipped {
                path: source.clone(),
                reason: SkipReason::DestinationExists(existing.clone())
            }
        );
        assert_eq!(std::fs::read(&existing).unwrap(), b"old");
        assert_eq!(std::fs::read(&source).unwrap(), b"new");
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_at_destination_is_not_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("song.mp3");
        std::fs::write(&source, b"audio").unwrap();
        let link = dir
            .path()
            .join("Pink Floyd/The Wall/6 of 13 -- Comfortably Numb.mp3");
        std::fs::create_dir_all(link.parent().unwrap()).unwrap();
        std::os::unix::fs::symlink(dir.path().join("nowhere"), &link).unwrap();

        let outcome = organizer(Some(floyd()), false).extract_and_move(&source, dir.path());

        assert_eq!(
            outcome,
            Outcome::Skipped {
                path: source.clone(),
                reason: SkipReason::DestinationExists(link.clone())
            }
        );
        assert!(std::fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(std::fs::read(&source).unwrap(), b"audio");
    }

    #[test]
    fn second_claim_on_same_destination_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.mp3");
        let second = dir.path().join("b.mp3");
        std::fs::write(&first, b"first").unwrap();
        std::fs::write(&second, b"second").unwrap();
        let organizer = organizer(Some(floyd()), true);

        assert!(matches!(
            organizer.extract_and_move(&first, dir.path()),
            Outcome::Planned { .. }
        ));
        assert!(matches!(
            organizer.extract_and_move(&second, dir.path()),
            Outcome::Skipped {
                reason: SkipReason::DestinationExists(_),
                ..
            }
        ));
    }

    #[test]
    fn dry_run_plans_without_touching_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("song.mp3");
        std::fs::write(&source, b"audio").unwrap();

        let outcome = organizer(Some(floyd()), true).extract_and_move(&source, dir.path());

        assert_eq!(
            outcome,
            Outcome::Planned {
                from: source.clone(),
                to: dir
                    .path()
                    .join("Pink Floyd/The Wall/6 of 13 -- Comfortably Numb.mp3")
            }
        );
        assert!(source.exists());
        assert!(!dir.path().join("Pink Floyd").exists());
    }

    #[test]
    fn vanished_source_is_reported_as_failure() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("gone.mp3");

        let outcome = organizer(Some(floyd()), false).extract_and_move(&source, dir.path());
        assert!(matches!(outcome, Outcome::Failed { .. }));
    }

    #[test]
    fn skip_reasons_render_for_logs() {
        assert_eq!(SkipReason::MissingField.to_string(), "missing required field");
        assert_eq!(
            SkipReason::DestinationExists(PathBuf::from("/x")).to_string(),
            "destination exists"
        );
        assert_eq!(
            SkipReason::EmptyAfterSanitize("title").to_string(),
            "title empty after sanitization"
        );
    }
}
