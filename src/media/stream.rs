//! Normalized playable output.

use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::caption::{Caption, CaptionType};
use crate::flags::FlagSet;

/// Quality label used when none can be parsed.
pub const UNKNOWN_QUALITY: &str = "unknown";

static QUALITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{3,4})p").expect("quality pattern should compile"));

/// Container of a progressive file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Mp4,
}

/// One progressive file for a quality label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamFile {
    #[serde(rename = "type")]
    pub file_type: FileType,
    pub url: String,
}

impl StreamFile {
    pub fn mp4(url: impl Into<String>) -> Self {
        Self {
            file_type: FileType::Mp4,
            url: url.into(),
        }
    }
}

/// HLS playlist or quality-keyed progressive files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamKind {
    Hls { playlist: String },
    File { qualities: BTreeMap<String, StreamFile> },
}

/// Sprite/preview track for seek thumbnails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbnailTrack {
    #[serde(rename = "type")]
    pub track_type: CaptionType,
    pub url: String,
}

/// A normalized stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stream {
    pub id: String,
    #[serde(flatten)]
    pub kind: StreamKind,
    pub flags: FlagSet,
    pub captions: Vec<Caption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_track: Option<ThumbnailTrack>,
    /// Headers a player must send with playlist and segment requests.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

impl Stream {
    pub fn hls(id: impl Into<String>, playlist: impl Into<String>) -> Self {
        Self::new(
            id,
            StreamKind::Hls {
                playlist: playlist.into(),
            },
        )
    }

    pub fn file(id: impl Into<String>, qualities: BTreeMap<String, StreamFile>) -> Self {
        Self::new(id, StreamKind::File { qualities })
    }

    fn new(id: impl Into<String>, kind: StreamKind) -> Self {
        Self {
            id: id.into(),
            kind,
            flags: FlagSet::new(),
            captions: Vec::new(),
            thumbnail_track: None,
            headers: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_flags(mut self, flags: impl Into<FlagSet>) -> Self {
        self.flags = flags.into();
        self
    }

    /// Attach captions, keeping the first caption for each id.
    #[must_use]
    pub fn with_captions(mut self, captions: Vec<Caption>) -> Self {
        self.captions = captions;
        self.dedupe_captions();
        self
    }

    #[must_use]
    pub fn with_thumbnail_track(mut self, url: impl Into<String>) -> Self {
        self.thumbnail_track = Some(ThumbnailTrack {
            track_type: CaptionType::Vtt,
            url: url.into(),
        });
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Drop later captions that reuse an earlier id. Order is kept.
    pub fn dedupe_captions(&mut self) {
        let mut seen = HashSet::new();
        self.captions.retain(|c| seen.insert(c.id.clone()));
    }

    /// `false` for an empty playlist URL or an empty quality map.
    #[must_use]
    pub fn is_playable(&self) -> bool {
        match &self.kind {
            StreamKind::Hls { playlist } => !playlist.trim().is_empty(),
            StreamKind::File { qualities } => {
                qualities.values().any(|f| !f.url.trim().is_empty())
            }
        }
    }

    /// `"hls"` or `"file"`.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            StreamKind::Hls { .. } => "hls",
            StreamKind::File { .. } => "file",
        }
    }
}

/// Quality label from a URL such as `.../movie-720p.mp4` → `"720"`.
///
/// Falls back to [`UNKNOWN_QUALITY`].
#[must_use]
pub fn quality_from_url(url: &str) -> String {
    QUALITY_RE
        .captures(url)
        .and_then(|c| c.get(1))
        .map_or_else(|| UNKNOWN_QUALITY.to_string(), |m| m.as_str().to_string())
}
