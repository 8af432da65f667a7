//! Error types for fetching, scraping, registration and resolution.

use std::time::Duration;

use thiserror::Error;

use crate::engine::{summarize_attempts, Attempt};

/// Errors raised by a [`Fetcher`](crate::fetch::Fetcher).
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("no proxy configured for proxied fetch")]
    NoProxy,

    #[error("request cancelled")]
    Cancelled,

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors an adapter may return from a scrape call.
///
/// Only [`ScrapeError::NotFound`] is the expected "nothing here" outcome;
/// every other variant is recorded as an unexpected adapter failure. Both
/// lead to the next-ranked candidate being tried.
#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Other(String),
}

impl ScrapeError {
    pub fn not_found(reason: impl Into<String>) -> Self {
        Self::NotFound(reason.into())
    }

    pub fn parse(reason: impl Into<String>) -> Self {
        Self::Parse(reason.into())
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Startup-time registry errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("source id '{0}' is already registered")]
    DuplicateSource(String),

    #[error("embed id '{0}' is already registered")]
    DuplicateEmbed(String),
}

/// Errors returned to callers of the resolution engine.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// Every eligible candidate was tried and none produced a stream.
    #[error("no stream found for {target}: {}", summarize_attempts(.attempts))]
    NotFound {
        target: String,
        attempts: Vec<Attempt>,
    },

    #[error("invalid target: {0}")]
    InvalidTarget(String),

    #[error("resolution cancelled")]
    Cancelled,
}

impl ResolveError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Per-adapter outcomes, empty unless this is [`ResolveError::NotFound`].
    #[must_use]
    pub fn attempts(&self) -> &[Attempt] {
        match self {
            Self::NotFound { attempts, .. } => attempts,
            _ => &[],
        }
    }
}
