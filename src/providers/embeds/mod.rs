//! Bundled embed adapters.

pub mod filemoon;
pub mod unpack;
pub mod vidplay;

pub use filemoon::Filemoon;
pub use vidplay::Vidplay;

use serde::Deserialize;

use super::lenient_list;
use crate::media::{caption, Caption};

/// Query parameter some hosts use to point at a subtitle list.
const SUBTITLE_PARAM: &str = "sub.info";

/// One entry of a `sub.info` subtitle list.
#[derive(Debug, Deserialize)]
struct SubtitleEntry {
    #[serde(default)]
    file: String,
    #[serde(default)]
    label: String,
}

/// A `sub.info` list; malformed entries are dropped.
#[derive(Debug, Deserialize)]
#[serde(transparent)]
struct SubtitleList(#[serde(deserialize_with = "lenient_list")] Vec<SubtitleEntry>);

/// The `sub.info` URL carried in an embed URL's query string, if any.
fn subtitle_link(embed_url: &str) -> Option<String> {
    let parsed = url::Url::parse(embed_url).ok()?;
    parsed
        .query_pairs()
        .find(|(k, _)| k == SUBTITLE_PARAM)
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

fn normalize_subtitles(list: &SubtitleList) -> Vec<Caption> {
    caption::normalize_all(list.0.iter().map(|e| (e.label.as_str(), e.file.as_str())))
}
