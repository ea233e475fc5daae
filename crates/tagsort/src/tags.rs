//! Tag decoding.
//!
//! A [`TagSource`] turns a file into a [`TagMap`] of lower-case field names to their values.
//! [`ExtractedTags`] then picks the four fields used to build the destination path.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use lofty::{ItemKey, Tag, TaggedFileExt};

pub const ARTIST: &str = "artist";
pub const ALBUM: &str = "album";
pub const TITLE: &str = "title";
pub const TRACK_NUMBER: &str = "tracknumber";

/// Field name to values, in the order the container stores them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagMap {
    fields: BTreeMap<String, Vec<String>>,
}

impl TagMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value under `key`.
    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.fields
            .entry(key.to_ascii_lowercase())
            .or_default()
            .push(value.into());
    }

    /// Builder-style [`TagMap::insert`].
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn values(&self, key: &str) -> &[String] {
        self.fields
            .get(&key.to_ascii_lowercase())
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// First value of `key`, or an empty string.
    pub fn first(&self, key: &str) -> &str {
        self.values(key).first().map(String::as_str).unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Decodes the embedded tags of an audio file.
pub trait TagSource: Send + Sync {
    fn read_tags(&self, path: &Path) -> Result<TagMap>;
}

/// The four fields that drive the destination path, unsanitized.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtractedTags {
    pub artist: String,
    pub album: String,
    pub title: String,
    pub track_number: String,
}

impl ExtractedTags {
    pub fn from_map(map: &TagMap) -> Self {
        Self {
            artist: map.first(ARTIST).to_string(),
            album: map.first(ALBUM).to_string(),
            title: map.first(TITLE).to_string(),
            track_number: map.first(TRACK_NUMBER).to_string(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !(self.artist.is_empty()
            || self.album.is_empty()
            || self.title.is_empty()
            || self.track_number.is_empty())
    }
}

/// [`TagSource`] backed by `lofty`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoftyTagSource;

impl TagSource for LoftyTagSource {
    fn read_tags(&self, path: &Path) -> Result<TagMap> {
        let tagged_file = lofty::read_from_path(path).context("read tags")?;
        let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) else {
            return Ok(TagMap::new());
        };
        Ok(tag_to_map(tag))
    }
}

fn tag_to_map(tag: &Tag) -> TagMap {
    let mut map = TagMap::new();
    for (name, key) in [
        (ARTIST, ItemKey::TrackArtist),
        (ALBUM, ItemKey::AlbumTitle),
        (TITLE, ItemKey::TrackTitle),
    ] {
        for value in tag.get_strings(&key) {
            map.insert(name, value);
        }
    }

    let total = tag.get_strings(&ItemKey::TrackTotal).next();
    for number in tag.get_strings(&ItemKey::TrackNumber) {
        map.insert(TRACK_NUMBER, join_track_total(number, total));
    }
    map
}

/// ID3v2 `TRCK` arrives split into number and total; put the `N/M` form back together.
fn join_track_total(number: &str, total: Option<&str>) -> String {
    let number = number.trim();
    match total.map(str::trim) {
        Some(total) if !total.is_empty() && !number.is_empty() && !number.contains('/') => {
            format!("{number}/{total}")
        }
        _ => number.to_string(),
    }
}
