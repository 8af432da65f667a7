//! Adapter contract.
//!
//! A provider knows how to talk to one external site. There are two kinds:
//!
//! - [`Sourcerer`]: resolves a [`MediaTarget`](crate::media::MediaTarget)
//!   into streams and/or references to embeds.
//! - [`Embed`]: resolves an embed URL discovered by a source into streams.
//!
//! Both share the identity/rank/flags surface of [`Provider`]. The engine
//! treats every adapter as an opaque async function; how it gets its result
//! (HTML scraping, a JSON API, unpacking obfuscated scripts) is its own
//! business.

pub mod context;
pub mod progress;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ScrapeError;
use crate::flags::FlagSet;
use crate::media::{MediaKind, Stream};

pub use context::{EmbedContext, ScrapeContext, SourceContext};
pub use progress::{ProgressCallback, ProgressSink, TickerGuard, Window};

/// Which target kinds a source can resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaSupport {
    movie: bool,
    show: bool,
}

impl MediaSupport {
    pub const MOVIE: Self = Self {
        movie: true,
        show: false,
    };
    pub const SHOW: Self = Self {
        movie: false,
        show: true,
    };
    pub const ALL: Self = Self {
        movie: true,
        show: true,
    };

    #[must_use]
    pub const fn supports(self, kind: MediaKind) -> bool {
        match kind {
            MediaKind::Movie => self.movie,
            MediaKind::Show => self.show,
        }
    }
}

impl fmt::Display for MediaSupport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.movie, self.show) {
            (true, true) => f.write_str("movie,show"),
            (true, false) => f.write_str("movie"),
            (false, true) => f.write_str("show"),
            (false, false) => f.write_str("-"),
        }
    }
}

/// Identity and selection metadata shared by every adapter.
pub trait Provider: Send + Sync {
    /// Unique lowercase id within its registry half (e.g., `"wecima"`).
    fn id(&self) -> &str;

    /// Human-readable name.
    fn name(&self) -> &str;

    /// Priority; higher is tried first.
    fn rank(&self) -> i32;

    /// Disabled adapters are registered but never listed.
    fn disabled(&self) -> bool {
        false
    }

    /// Capabilities this adapter (and the streams it returns) provide.
    fn flags(&self) -> FlagSet {
        FlagSet::new()
    }
}

/// Pointer from a source to the embed adapter that can finish the job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedReference {
    pub embed_id: String,
    pub url: String,
}

impl EmbedReference {
    pub fn new(embed_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            embed_id: embed_id.into(),
            url: url.into(),
        }
    }
}

/// What a source returns: ready streams, deferred embeds, or both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcererOutput {
    #[serde(default)]
    pub stream: Vec<Stream>,
    #[serde(default)]
    pub embeds: Vec<EmbedReference>,
}

impl SourcererOutput {
    #[must_use]
    pub fn streams(stream: Vec<Stream>) -> Self {
        Self {
            stream,
            embeds: Vec::new(),
        }
    }

    #[must_use]
    pub fn embeds(embeds: Vec<EmbedReference>) -> Self {
        Self {
            stream: Vec::new(),
            embeds,
        }
    }
}

/// What an embed returns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedOutput {
    #[serde(default)]
    pub stream: Vec<Stream>,
}

/// Adapter resolving a media target.
#[async_trait]
pub trait Sourcerer: Provider {
    /// Target kinds this source handles. The engine never calls
    /// [`Sourcerer::scrape`] for a kind outside this set.
    fn supports(&self) -> MediaSupport;

    async fn scrape(&self, ctx: &SourceContext<'_>) -> Result<SourcererOutput, ScrapeError>;
}

/// Adapter resolving an embed URL.
#[async_trait]
pub trait Embed: Provider {
    async fn scrape(&self, ctx: &EmbedContext<'_>) -> Result<EmbedOutput, ScrapeError>;
}
