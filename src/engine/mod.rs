//! Resolution engine.
//!
//! Turns a [`MediaTarget`] into playable streams by walking the eligible
//! sources in rank order:
//!
//! 1. Each source is scraped. `NotFound` and unexpected errors are recorded
//!    and the next source is tried; one adapter's failure never aborts the
//!    resolution.
//! 2. Direct streams are kept. Embed references are ordered by embed rank
//!    and tried one after another until one yields a stream.
//! 3. The first source with at least one usable stream (direct or via an
//!    embed) ends the search. Lower-ranked sources are never contacted.
//!
//! Adapters run strictly one at a time.

mod attempt;
mod event;

use std::any::Any;
use std::collections::HashSet;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::{ResolveError, ScrapeError};
use crate::fetch::Fetcher;
use crate::flags::{is_eligible, Environment, FlagSet};
use crate::media::{MediaTarget, Stream};
use crate::provider::progress::OverallProgress;
use crate::provider::{
    Embed, EmbedContext, EmbedReference, ProgressCallback, ProgressSink, ScrapeContext,
    SourceContext, Sourcerer, Window,
};
use crate::registry::ProviderRegistry;

pub use attempt::{summarize_attempts, Attempt, AttemptOutcome, Role};
pub use event::{EventCallback, ResolveEvent};

/// Per-request options.
#[derive(Clone, Default)]
pub struct ResolveOptions {
    /// Flags every invoked adapter and every returned stream must carry.
    pub required_flags: FlagSet,
    pub on_progress: Option<ProgressCallback>,
    pub on_event: Option<EventCallback>,
    /// Cancelling the token abandons the resolution at the next await.
    pub cancel: Option<CancellationToken>,
}

impl ResolveOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Options requiring the flags of `environment`.
    #[must_use]
    pub fn for_environment(environment: Environment) -> Self {
        Self::new().require(environment.required_flags())
    }

    #[must_use]
    pub fn require(mut self, flags: FlagSet) -> Self {
        self.required_flags = flags;
        self
    }

    #[must_use]
    pub fn on_progress(mut self, callback: impl Fn(u8) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    #[must_use]
    pub fn on_event(mut self, callback: impl Fn(&ResolveEvent) + Send + Sync + 'static) -> Self {
        self.on_event = Some(Arc::new(callback));
        self
    }

    #[must_use]
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

impl std::fmt::Debug for ResolveOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolveOptions")
            .field("required_flags", &self.required_flags)
            .field("on_progress", &self.on_progress.is_some())
            .field("on_event", &self.on_event.is_some())
            .field("cancel", &self.cancel.is_some())
            .finish()
    }
}

/// A stream together with the adapters that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedStream {
    /// `None` when an embed was run directly.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    /// `None` for streams the source returned itself.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed_id: Option<String>,
    pub stream: Stream,
}

/// Successful resolution result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedMedia {
    /// Never empty. Ids are unique within the result.
    pub streams: Vec<ResolvedStream>,
    /// Every adapter tried or skipped on the way, in order.
    pub attempts: Vec<Attempt>,
}

impl ResolvedMedia {
    /// The preferred stream: direct streams first, then embed streams.
    #[must_use]
    pub fn first(&self) -> Option<&ResolvedStream> {
        self.streams.first()
    }
}

/// Why an adapter call did not return normally.
enum Interrupt {
    Cancelled,
    Scrape(ScrapeError),
}

/// Mutable state of one `resolve` call.
struct Run {
    required: FlagSet,
    overall: Arc<OverallProgress>,
    events: Option<EventCallback>,
    cancel: CancellationToken,
    attempts: Vec<Attempt>,
}

impl Run {
    fn new(options: &ResolveOptions) -> Self {
        Self {
            required: options.required_flags.clone(),
            overall: Arc::new(OverallProgress::new(options.on_progress.clone())),
            events: options.on_event.clone(),
            cancel: options.cancel.clone().unwrap_or_default(),
            attempts: Vec::new(),
        }
    }

    fn emit(&self, event: ResolveEvent) {
        if let Some(callback) = &self.events {
            callback(&event);
        }
    }

    fn record(&mut self, id: &str, role: Role, outcome: AttemptOutcome) {
        self.attempts.push(Attempt::new(id, role, outcome));
    }

    fn record_failure(&mut self, id: &str, role: Role, err: ScrapeError) {
        let outcome = match err {
            ScrapeError::NotFound(reason) => {
                debug!("{id}: not found ({reason})");
                AttemptOutcome::NotFound(reason)
            }
            other => {
                warn!("{id} failed unexpectedly: {other}");
                AttemptOutcome::Failed(other.to_string())
            }
        };
        let reason = match &outcome {
            AttemptOutcome::NotFound(r) | AttemptOutcome::Failed(r) => r.clone(),
            _ => String::new(),
        };
        self.emit(ResolveEvent::AdapterFailed {
            id: id.to_string(),
            reason,
            unexpected: outcome.is_unexpected(),
        });
        self.record(id, role, outcome);
    }

    /// Keep playable streams whose flags satisfy the requirement.
    fn accept(&self, streams: Vec<Stream>) -> Vec<Stream> {
        streams
            .into_iter()
            .filter(|s| s.is_playable() && is_eligible(&s.flags, &self.required))
            .collect()
    }

    fn not_found(self, target: String) -> ResolveError {
        ResolveError::NotFound {
            target,
            attempts: self.attempts,
        }
    }

    fn finish(self, mut streams: Vec<ResolvedStream>) -> ResolvedMedia {
        self.overall.report(100.0);
        assign_unique_ids(&mut streams);
        ResolvedMedia {
            streams,
            attempts: self.attempts,
        }
    }
}

/// Orchestrates sources and embeds for resolution requests.
pub struct ResolutionEngine {
    registry: Arc<ProviderRegistry>,
    fetcher: Arc<dyn Fetcher>,
    proxied: Arc<dyn Fetcher>,
    adapter_timeout: Option<Duration>,
}

impl ResolutionEngine {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        fetcher: Arc<dyn Fetcher>,
        proxied: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            registry,
            fetcher,
            proxied,
            adapter_timeout: None,
        }
    }

    /// Treat an adapter call running longer than `limit` as failed.
    #[must_use]
    pub fn with_adapter_timeout(mut self, limit: Duration) -> Self {
        self.adapter_timeout = Some(limit);
        self
    }

    #[must_use]
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Resolve `target` into streams from the best-ranked source that has
    /// any.
    #[instrument(skip(self, target, options), fields(target = %target))]
    pub async fn resolve(
        &self,
        target: &MediaTarget,
        options: &ResolveOptions,
    ) -> Result<ResolvedMedia, ResolveError> {
        target.validate()?;
        let mut run = Run::new(options);
        let sources = self
            .registry
            .list_sources_for(target.kind(), &run.required);

        if sources.is_empty() {
            debug!("No eligible sources for required flags {}", run.required);
            return Err(run.not_found(target.to_string()));
        }

        let total = sources.len();
        for (index, source) in sources.iter().enumerate() {
            if run.cancel.is_cancelled() {
                return Err(ResolveError::Cancelled);
            }
            let window = Window::full().slice(index, total);
            let streams = self
                .run_source(source.as_ref(), target, window, &mut run)
                .await?;
            run.overall.report(window.end());

            if !streams.is_empty() {
                info!(
                    "Resolved {} via {} ({} stream(s))",
                    target,
                    source.id(),
                    streams.len()
                );
                return Ok(run.finish(streams));
            }
        }

        Err(run.not_found(target.to_string()))
    }

    /// Run a single embed adapter directly against `url`.
    #[instrument(skip(self, options))]
    pub async fn resolve_embed(
        &self,
        embed_id: &str,
        url: &str,
        options: &ResolveOptions,
    ) -> Result<ResolvedMedia, ResolveError> {
        if url.trim().is_empty() {
            return Err(ResolveError::InvalidTarget("embed URL is empty".into()));
        }
        let mut run = Run::new(options);
        let target = format!("embed '{embed_id}' {url}");

        let Some(embed) = self.registry.get_embed(embed_id) else {
            run.record(embed_id, Role::Embed, AttemptOutcome::Skipped("unknown embed".into()));
            return Err(run.not_found(target));
        };
        if !self.registry.is_eligible(embed.as_ref(), &run.required) {
            run.record(embed_id, Role::Embed, AttemptOutcome::Skipped("ineligible".into()));
            return Err(run.not_found(target));
        }

        let streams = self
            .run_embed(embed.as_ref(), url, Window::full(), &mut run)
            .await?;
        if streams.is_empty() {
            return Err(run.not_found(target));
        }

        let streams = streams
            .into_iter()
            .map(|stream| ResolvedStream {
                source_id: None,
                embed_id: Some(embed.id().to_string()),
                stream,
            })
            .collect();
        Ok(run.finish(streams))
    }

    fn context(&self, id: &str, window: Window, run: &Run) -> ScrapeContext<'_> {
        ScrapeContext::new(
            self.fetcher.as_ref(),
            self.proxied.as_ref(),
            ProgressSink::new(id, window, Arc::clone(&run.overall), run.events.clone()),
            run.cancel.clone(),
        )
    }

    /// Await an adapter future, racing it against cancellation and the
    /// adapter timeout. A panic inside the adapter becomes an error.
    async fn guard<T, F>(&self, future: F, cancel: &CancellationToken) -> Result<T, Interrupt>
    where
        F: Future<Output = Result<T, ScrapeError>>,
    {
        let caught = async {
            AssertUnwindSafe(future)
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| {
                    Err(ScrapeError::Other(format!(
                        "adapter panicked: {}",
                        panic_message(payload.as_ref())
                    )))
                })
        };
        let limited = async {
            match self.adapter_timeout {
                Some(limit) => tokio::time::timeout(limit, caught)
                    .await
                    .unwrap_or(Err(ScrapeError::Timeout(limit))),
                None => caught.await,
            }
        };
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Interrupt::Cancelled),
            result = limited => result,
        };
        match result {
            Ok(value) => Ok(value),
            // A fetch aborted by the token surfaces as an adapter error.
            Err(_) if cancel.is_cancelled() => Err(Interrupt::Cancelled),
            Err(err) => Err(Interrupt::Scrape(err)),
        }
    }

    async fn run_source(
        &self,
        source: &dyn Sourcerer,
        target: &MediaTarget,
        window: Window,
        run: &mut Run,
    ) -> Result<Vec<ResolvedStream>, ResolveError> {
        let id = source.id();
        let (scrape_window, embed_window) = window.halves();
        debug!("Trying source {id} (rank {})", source.rank());
        run.emit(ResolveEvent::SourceStarted { id: id.to_string() });

        let ctx = SourceContext::new(self.context(id, scrape_window, run), target);
        let output = match self.guard(source.scrape(&ctx), &run.cancel).await {
            Ok(output) => output,
            Err(Interrupt::Cancelled) => return Err(ResolveError::Cancelled),
            Err(Interrupt::Scrape(err)) => {
                run.record_failure(id, Role::Source, err);
                return Ok(Vec::new());
            }
        };
        drop(ctx);
        run.overall.report(scrape_window.end());

        let mut streams: Vec<ResolvedStream> = run
            .accept(output.stream)
            .into_iter()
            .map(|stream| ResolvedStream {
                source_id: Some(id.to_string()),
                embed_id: None,
                stream,
            })
            .collect();

        if !output.embeds.is_empty() {
            run.emit(ResolveEvent::EmbedsDiscovered {
                source_id: id.to_string(),
                embeds: output.embeds.clone(),
            });
            let via_embeds = self
                .run_embeds(id, output.embeds, embed_window, run)
                .await?;
            streams.extend(via_embeds);
        }

        let outcome = if streams.is_empty() {
            AttemptOutcome::NoStreams
        } else {
            AttemptOutcome::Succeeded
        };
        run.record(id, Role::Source, outcome);
        Ok(streams)
    }

    /// Try embed references best rank first; the first one with streams
    /// wins.
    async fn run_embeds(
        &self,
        source_id: &str,
        mut references: Vec<EmbedReference>,
        window: Window,
        run: &mut Run,
    ) -> Result<Vec<ResolvedStream>, ResolveError> {
        references.sort_by_key(|r| {
            std::cmp::Reverse(self.registry.embed_rank(&r.embed_id).unwrap_or(i32::MIN))
        });

        let total = references.len();
        for (index, reference) in references.iter().enumerate() {
            let slice = window.slice(index, total);

            let Some(embed) = self.registry.get_embed(&reference.embed_id) else {
                debug!("{source_id} referenced unknown embed '{}'", reference.embed_id);
                run.record(
                    &reference.embed_id,
                    Role::Embed,
                    AttemptOutcome::Skipped("unknown embed".into()),
                );
                continue;
            };
            if !self.registry.is_eligible(embed.as_ref(), &run.required) {
                run.record(
                    embed.id(),
                    Role::Embed,
                    AttemptOutcome::Skipped("ineligible".into()),
                );
                continue;
            }

            let streams = self
                .run_embed(embed.as_ref(), &reference.url, slice, run)
                .await?;
            run.overall.report(slice.end());

            if !streams.is_empty() {
                return Ok(streams
                    .into_iter()
                    .map(|stream| ResolvedStream {
                        source_id: Some(source_id.to_string()),
                        embed_id: Some(embed.id().to_string()),
                        stream,
                    })
                    .collect());
            }
        }
        Ok(Vec::new())
    }

    async fn run_embed(
        &self,
        embed: &dyn Embed,
        url: &str,
        window: Window,
        run: &mut Run,
    ) -> Result<Vec<Stream>, ResolveError> {
        let id = embed.id();
        debug!("Trying embed {id} for {url}");
        run.emit(ResolveEvent::EmbedStarted {
            id: id.to_string(),
            url: url.to_string(),
        });

        let ctx = EmbedContext::new(self.context(id, window, run), url);
        let result = self.guard(embed.scrape(&ctx), &run.cancel).await;
        drop(ctx);

        match result {
            Ok(output) => {
                let streams = run.accept(output.stream);
                let outcome = if streams.is_empty() {
                    AttemptOutcome::NoStreams
                } else {
                    AttemptOutcome::Succeeded
                };
                run.record(id, Role::Embed, outcome);
                Ok(streams)
            }
            Err(Interrupt::Cancelled) => Err(ResolveError::Cancelled),
            Err(Interrupt::Scrape(err)) => {
                run.record_failure(id, Role::Embed, err);
                Ok(Vec::new())
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Make stream ids unique: repeats get `-2`, `-3`, ...
fn assign_unique_ids(streams: &mut [ResolvedStream]) {
    let mut seen = HashSet::new();
    for resolved in streams {
        let base = resolved.stream.id.clone();
        let mut candidate = base.clone();
        let mut n = 2;
        while !seen.insert(candidate.clone()) {
            candidate = format!("{base}-{n}");
            n += 1;
        }
        resolved.stream.id = candidate;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(id: &str) -> ResolvedStream {
        ResolvedStream {
            source_id: Some("s".into()),
            embed_id: None,
            stream: Stream::hls(id, "https://x/m.m3u8"),
        }
    }

    #[test]
    fn duplicate_stream_ids_get_suffixes() {
        let mut streams = vec![
            resolved("primary"),
            resolved("primary"),
            resolved("primary-2"),
            resolved("alt"),
        ];
        assign_unique_ids(&mut streams);
        let ids: Vec<_> = streams.iter().map(|s| s.stream.id.as_str()).collect();
        assert_eq!(ids, vec!["primary", "primary-2", "primary-2-2", "alt"]);
    }

    #[test]
    fn panic_payloads_are_described() {
        let literal: Box<dyn Any + Send> = Box::new("bad index");
        let formatted: Box<dyn Any + Send> = Box::new(format!("len is {}", 0));
        let opaque: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(literal.as_ref()), "bad index");
        assert_eq!(panic_message(formatted.as_ref()), "len is 0");
        assert_eq!(panic_message(opaque.as_ref()), "unknown panic");
    }

    #[test]
    fn options_debug_hides_callbacks() {
        let options = ResolveOptions::for_environment(Environment::Browser).on_progress(|_| {});
        let debug = format!("{options:?}");
        assert!(debug.contains("on_progress: true"));
        assert!(debug.contains("CorsAllowed"));
    }
}
