//! Media targets and the normalized stream/caption data model.

pub mod caption;
pub mod language;
pub mod stream;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ResolveError;

pub use caption::{Caption, CaptionType};
pub use stream::{FileType, Stream, StreamFile, StreamKind, ThumbnailTrack};

/// Which kind of item a target is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Show,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Movie => "movie",
            Self::Show => "show",
        })
    }
}

/// A movie to resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub title: String,
    pub release_year: u32,
    pub tmdb_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb_id: Option<String>,
}

/// Season or episode reference: number plus the catalog id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberedRef {
    pub number: u32,
    #[serde(default)]
    pub tmdb_id: String,
}

/// A single episode of a show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowEpisode {
    pub title: String,
    pub release_year: u32,
    pub tmdb_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb_id: Option<String>,
    pub season: NumberedRef,
    pub episode: NumberedRef,
}

/// The item a resolution request is for. Immutable for the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MediaTarget {
    Movie(Movie),
    Show(ShowEpisode),
}

impl MediaTarget {
    pub fn movie(title: impl Into<String>, release_year: u32, tmdb_id: impl Into<String>) -> Self {
        Self::Movie(Movie {
            title: title.into(),
            release_year,
            tmdb_id: tmdb_id.into(),
            imdb_id: None,
        })
    }

    pub fn episode(
        title: impl Into<String>,
        release_year: u32,
        tmdb_id: impl Into<String>,
        season: u32,
        episode: u32,
    ) -> Self {
        Self::Show(ShowEpisode {
            title: title.into(),
            release_year,
            tmdb_id: tmdb_id.into(),
            imdb_id: None,
            season: NumberedRef {
                number: season,
                tmdb_id: String::new(),
            },
            episode: NumberedRef {
                number: episode,
                tmdb_id: String::new(),
            },
        })
    }

    #[must_use]
    pub fn with_imdb_id(mut self, imdb_id: impl Into<String>) -> Self {
        let id = Some(imdb_id.into());
        match &mut self {
            Self::Movie(m) => m.imdb_id = id,
            Self::Show(s) => s.imdb_id = id,
        }
        self
    }

    #[must_use]
    pub fn kind(&self) -> MediaKind {
        match self {
            Self::Movie(_) => MediaKind::Movie,
            Self::Show(_) => MediaKind::Show,
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        match self {
            Self::Movie(m) => &m.title,
            Self::Show(s) => &s.title,
        }
    }

    #[must_use]
    pub fn release_year(&self) -> u32 {
        match self {
            Self::Movie(m) => m.release_year,
            Self::Show(s) => s.release_year,
        }
    }

    #[must_use]
    pub fn tmdb_id(&self) -> &str {
        match self {
            Self::Movie(m) => &m.tmdb_id,
            Self::Show(s) => &s.tmdb_id,
        }
    }

    #[must_use]
    pub fn imdb_id(&self) -> Option<&str> {
        match self {
            Self::Movie(m) => m.imdb_id.as_deref(),
            Self::Show(s) => s.imdb_id.as_deref(),
        }
    }

    /// Reject targets no adapter could meaningfully look up.
    pub fn validate(&self) -> Result<(), ResolveError> {
        if self.title().trim().is_empty() {
            return Err(ResolveError::InvalidTarget("title is empty".into()));
        }
        if let Self::Show(show) = self {
            if show.season.number == 0 {
                return Err(ResolveError::InvalidTarget(
                    "season numbers start at 1".into(),
                ));
            }
            if show.episode.number == 0 {
                return Err(ResolveError::InvalidTarget(
                    "episode numbers start at 1".into(),
                ));
            }
        }
        Ok(())
    }
}

impl fmt::Display for MediaTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Movie(m) => write!(f, "movie '{}' ({})", m.title, m.release_year),
            Self::Show(s) => write!(
                f,
                "show '{}' S{:02}E{:02}",
                s.title, s.season.number, s.episode.number
            ),
        }
    }
}
