//! Caption records and the raw-subtitle normalizer.
//!
//! Adapters see subtitles as `(label, file URL)` pairs in whatever shape the
//! upstream site uses. [`normalize`] turns one such pair into a [`Caption`]
//! or drops it: both the language and the file type have to be recognized,
//! a partially filled caption is never produced.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::language::label_to_code;

/// Subtitle file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionType {
    Vtt,
    Srt,
}

impl CaptionType {
    /// Map a file extension (without the dot) to a caption type.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "vtt" => Some(Self::Vtt),
            "srt" => Some(Self::Srt),
            _ => None,
        }
    }
}

/// A normalized subtitle track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Caption {
    pub id: String,
    pub url: String,
    #[serde(rename = "type")]
    pub caption_type: CaptionType,
    /// ISO 639-1 code.
    pub language: String,
    pub has_cors_restrictions: bool,
}

/// Caption type from the extension of the URL's path.
///
/// Query string and fragment are ignored, so `subs/en.vtt?token=1` is VTT.
#[must_use]
pub fn caption_type_from_url(url: &str) -> Option<CaptionType> {
    let path = match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };
    let file_name = path.rsplit('/').next()?;
    let (_, ext) = file_name.rsplit_once('.')?;
    CaptionType::from_extension(ext)
}

/// Normalize one raw subtitle entry, or `None` if it can't be classified.
#[must_use]
pub fn normalize(label: &str, file_url: &str) -> Option<Caption> {
    let language = label_to_code(label)?;
    let caption_type = caption_type_from_url(file_url)?;
    Some(Caption {
        id: file_url.to_string(),
        url: file_url.to_string(),
        caption_type,
        language: language.to_string(),
        has_cors_restrictions: false,
    })
}

/// Normalize a batch, dropping unrecognized entries and repeated ids.
pub fn normalize_all<'a, I>(entries: I) -> Vec<Caption>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter_map(|(label, url)| normalize(label, url))
        .filter(|caption| seen.insert(caption.id.clone()))
        .collect()
}
