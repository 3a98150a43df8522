//! Embedded tag extraction
//!
//! Best-effort: any file lofty cannot read yields an empty
//! [`ExtractedMetadata`] rather than an error, since intake falls back to
//! placeholders anyway.
//!
//! Text fields are looked up through an alias list (lofty's unified key first,
//! then the raw frame/atom/comment names) across every tag block in the file,
//! primary tag first. The first non-blank value wins.

use lofty::file::TaggedFileExt;
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::{ItemKey, Tag};
use std::path::Path;

/// Metadata read from a stored audio file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub genre: Option<String>,
    pub duration_seconds: Option<f64>,
    pub bitrate_kbps: Option<u32>,
    pub sample_rate: Option<u32>,
}

const TITLE_ALIASES: &[&str] = &["TIT2", "TITLE", "©nam"];
const ARTIST_ALIASES: &[&str] = &["TPE1", "ARTIST", "©ART"];
const ALBUM_ALIASES: &[&str] = &["TALB", "ALBUM", "©alb"];
const GENRE_ALIASES: &[&str] = &["TCON", "GENRE", "©gen"];

/// Metadata extractor service
#[derive(Debug, Default, Clone, Copy)]
pub struct MetadataExtractor;

impl MetadataExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Read tags and stream properties from `file_path`
    pub fn extract(&self, file_path: &Path) -> ExtractedMetadata {
        let tagged_file = match Probe::open(file_path).and_then(|probe| probe.read()) {
            Ok(file) => file,
            Err(e) => {
                tracing::debug!(
                    file = %file_path.display(),
                    error = %e,
                    "No readable tags, continuing without metadata"
                );
                return ExtractedMetadata::default();
            }
        };

        let properties = tagged_file.properties();
        let duration = properties.duration();

        let primary = tagged_file.primary_tag();
        let primary_type = primary.map(|tag| tag.tag_type());
        let tags: Vec<&Tag> = primary
            .into_iter()
            .chain(
                tagged_file
                    .tags()
                    .iter()
                    .filter(|tag| Some(tag.tag_type()) != primary_type),
            )
            .collect();

        let metadata = ExtractedMetadata {
            title: lookup(&tags, &ItemKey::TrackTitle, TITLE_ALIASES),
            artist: lookup(&tags, &ItemKey::TrackArtist, ARTIST_ALIASES),
            album: lookup(&tags, &ItemKey::AlbumTitle, ALBUM_ALIASES),
            genre: lookup(&tags, &ItemKey::Genre, GENRE_ALIASES),
            duration_seconds: (!duration.is_zero()).then(|| duration.as_secs_f64()),
            bitrate_kbps: properties.audio_bitrate().filter(|&kbps| kbps > 0),
            sample_rate: properties.sample_rate().filter(|&hz| hz > 0),
        };

        tracing::debug!(
            file = %file_path.display(),
            title = ?metadata.title,
            artist = ?metadata.artist,
            duration_s = ?metadata.duration_seconds,
            "Extracted metadata"
        );

        metadata
    }
}

/// First non-blank value for a field across all tag blocks
fn lookup(tags: &[&Tag], unified: &ItemKey, raw_keys: &[&str]) -> Option<String> {
    for tag in tags {
        let value = std::iter::once(tag.get_string(unified))
            .chain(
                raw_keys
                    .iter()
                    .map(|key| tag.get_string(&ItemKey::Unknown((*key).to_string()))),
            )
            .flatten()
            .map(str::trim)
            .find(|value| !value.is_empty());

        if let Some(value) = value {
            return Some(value.to_string());
        }
    }
    None
}
