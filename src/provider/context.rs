//! Contexts handed to adapters for one scrape call.

use std::ops::Deref;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use super::progress::{ProgressSink, TickerGuard};
use crate::error::FetchError;
use crate::fetch::{FetchOptions, FetchResponse, Fetcher};
use crate::media::MediaTarget;

/// What every adapter call gets: fetchers, progress and cancellation.
///
/// Borrowed for the duration of a single call and never stored.
pub struct ScrapeContext<'a> {
    fetcher: &'a dyn Fetcher,
    proxied: &'a dyn Fetcher,
    progress: ProgressSink,
    cancel: CancellationToken,
}

impl<'a> ScrapeContext<'a> {
    pub fn new(
        fetcher: &'a dyn Fetcher,
        proxied: &'a dyn Fetcher,
        progress: ProgressSink,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            fetcher,
            proxied,
            progress,
            cancel,
        }
    }

    async fn run(
        &self,
        fetcher: &dyn Fetcher,
        url: &str,
        opts: &FetchOptions,
    ) -> Result<FetchResponse, FetchError> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(FetchError::Cancelled),
            result = fetcher.fetch(url, opts) => result,
        }
    }

    /// Direct request returning the full response envelope.
    pub async fn fetch_full(
        &self,
        url: &str,
        opts: &FetchOptions,
    ) -> Result<FetchResponse, FetchError> {
        self.run(self.fetcher, url, opts).await
    }

    /// Direct request returning the body as text.
    pub async fn fetch_text(&self, url: &str, opts: &FetchOptions) -> Result<String, FetchError> {
        Ok(self.fetch_full(url, opts).await?.body)
    }

    /// Direct request decoding a JSON body.
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        url: &str,
        opts: &FetchOptions,
    ) -> Result<T, FetchError> {
        self.fetch_full(url, opts).await?.json()
    }

    /// Proxied request returning the full response envelope.
    pub async fn proxied_full(
        &self,
        url: &str,
        opts: &FetchOptions,
    ) -> Result<FetchResponse, FetchError> {
        self.run(self.proxied, url, opts).await
    }

    pub async fn proxied_text(&self, url: &str, opts: &FetchOptions) -> Result<String, FetchError> {
        Ok(self.proxied_full(url, opts).await?.body)
    }

    pub async fn proxied_json<T: DeserializeOwned>(
        &self,
        url: &str,
        opts: &FetchOptions,
    ) -> Result<T, FetchError> {
        self.proxied_full(url, opts).await?.json()
    }

    /// Report adapter-local progress (0-100).
    pub fn progress(&self, percent: u8) {
        self.progress.report(percent);
    }

    #[must_use]
    pub fn progress_sink(&self) -> &ProgressSink {
        &self.progress
    }

    /// Tick progress up by one percent every `every` until 90, for as long as
    /// the returned guard is alive.
    #[must_use = "the ticker stops as soon as the guard is dropped"]
    pub fn start_ticker(&self, every: Duration) -> TickerGuard {
        self.progress.start_ticker(1, every, 90)
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }
}

/// Context for a source adapter: the media target plus [`ScrapeContext`].
pub struct SourceContext<'a> {
    base: ScrapeContext<'a>,
    media: &'a MediaTarget,
}

impl<'a> SourceContext<'a> {
    pub fn new(base: ScrapeContext<'a>, media: &'a MediaTarget) -> Self {
        Self { base, media }
    }

    #[must_use]
    pub fn media(&self) -> &MediaTarget {
        self.media
    }
}

impl<'a> Deref for SourceContext<'a> {
    type Target = ScrapeContext<'a>;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

/// Context for an embed adapter: the embed URL plus [`ScrapeContext`].
pub struct EmbedContext<'a> {
    base: ScrapeContext<'a>,
    url: &'a str,
}

impl<'a> EmbedContext<'a> {
    pub fn new(base: ScrapeContext<'a>, url: &'a str) -> Self {
        Self { base, url }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        self.url
    }
}

impl<'a> Deref for EmbedContext<'a> {
    type Target = ScrapeContext<'a>;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}
