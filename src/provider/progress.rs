//! Progress reporting from adapters to the caller.
//!
//! Every adapter reports its own 0-100 progress through a [`ProgressSink`].
//! The sink rescales it into the adapter's [`Window`] of the overall
//! operation and forwards it to the caller's callback. The caller only ever
//! sees a non-decreasing value in `0..=100`; lower reports are ignored.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::engine::{EventCallback, ResolveEvent};

/// Callback receiving overall progress in percent.
pub type ProgressCallback = Arc<dyn Fn(u8) + Send + Sync>;

/// A sub-range of the overall `0.0..=100.0` progress scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    start: f64,
    end: f64,
}

impl Window {
    /// The whole range.
    #[must_use]
    pub const fn full() -> Self {
        Self {
            start: 0.0,
            end: 100.0,
        }
    }

    #[must_use]
    pub fn start(&self) -> f64 {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> f64 {
        self.end
    }

    /// Overall value for an adapter-local percentage.
    #[must_use]
    pub fn at(&self, percent: u8) -> f64 {
        self.start + (self.end - self.start) * f64::from(percent.min(100)) / 100.0
    }

    /// The `index`-th of `count` equal slices of this window.
    #[must_use]
    pub fn slice(&self, index: usize, count: usize) -> Self {
        if count == 0 {
            return *self;
        }
        #[allow(clippy::cast_precision_loss)]
        let (index, count) = (index.min(count - 1) as f64, count as f64);
        let width = (self.end - self.start) / count;
        Self {
            start: self.start + width * index,
            end: self.start + width * (index + 1.0),
        }
    }

    /// Split into a first and second half.
    #[must_use]
    pub fn halves(&self) -> (Self, Self) {
        (self.slice(0, 2), self.slice(1, 2))
    }
}

/// Caller-visible progress for one resolution.
///
/// Reports only raise `max`. One reporter at a time drains it into the
/// callback, so deliveries are strictly increasing, the callback never runs
/// concurrently with itself, and no lock is held while it runs. Reporters
/// that find delivery busy return at once and leave their value behind.
pub(crate) struct OverallProgress {
    max: AtomicU8,
    delivered: AtomicU8,
    delivering: AtomicBool,
    callback: Option<ProgressCallback>,
}

impl OverallProgress {
    pub(crate) fn new(callback: Option<ProgressCallback>) -> Self {
        Self {
            max: AtomicU8::new(0),
            delivered: AtomicU8::new(0),
            delivering: AtomicBool::new(false),
            callback,
        }
    }

    /// Report an overall value; ignored unless it raises the maximum.
    pub(crate) fn report(&self, value: f64) {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let value = value.clamp(0.0, 100.0).floor() as u8;
        if self.max.fetch_max(value, Ordering::SeqCst) < value {
            self.deliver();
        }
    }

    fn deliver(&self) {
        let Some(callback) = &self.callback else {
            return;
        };
        while self
            .delivering
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            loop {
                let target = self.max.load(Ordering::SeqCst);
                if target <= self.delivered.load(Ordering::SeqCst) {
                    break;
                }
                self.delivered.store(target, Ordering::SeqCst);
                callback(target);
            }
            self.delivering.store(false, Ordering::SeqCst);
            // A value raised after the last check but before the release.
            if self.max.load(Ordering::SeqCst) <= self.delivered.load(Ordering::SeqCst) {
                return;
            }
        }
    }

    pub(crate) fn current(&self) -> u8 {
        self.max.load(Ordering::SeqCst)
    }
}

struct SinkInner {
    provider_id: String,
    window: Window,
    local_max: AtomicU8,
    overall: Option<Arc<OverallProgress>>,
    events: Option<EventCallback>,
}

/// Progress handle given to one adapter invocation.
///
/// Cheap to clone; clones share the same maximum.
#[derive(Clone)]
pub struct ProgressSink {
    inner: Arc<SinkInner>,
}

impl ProgressSink {
    pub(crate) fn new(
        provider_id: &str,
        window: Window,
        overall: Arc<OverallProgress>,
        events: Option<EventCallback>,
    ) -> Self {
        Self {
            inner: Arc::new(SinkInner {
                provider_id: provider_id.to_string(),
                window,
                local_max: AtomicU8::new(0),
                overall: Some(overall),
                events,
            }),
        }
    }

    /// Sink that only tracks its own maximum. Useful when running an adapter
    /// outside the engine.
    #[must_use]
    pub fn detached(provider_id: &str) -> Self {
        Self {
            inner: Arc::new(SinkInner {
                provider_id: provider_id.to_string(),
                window: Window::full(),
                local_max: AtomicU8::new(0),
                overall: None,
                events: None,
            }),
        }
    }

    /// Report adapter-local progress. Values above 100 are clamped.
    pub fn report(&self, percent: u8) {
        let percent = percent.min(100);
        let previous = self.inner.local_max.fetch_max(percent, Ordering::SeqCst);
        if percent <= previous {
            return;
        }
        if let Some(events) = &self.inner.events {
            events(&ResolveEvent::AdapterProgress {
                id: self.inner.provider_id.clone(),
                percent,
            });
        }
        if let Some(overall) = &self.inner.overall {
            overall.report(self.inner.window.at(percent));
        }
    }

    /// Highest value reported so far.
    #[must_use]
    pub fn current(&self) -> u8 {
        self.inner.local_max.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn provider_id(&self) -> &str {
        &self.inner.provider_id
    }

    /// Start a background task adding `step` every `every` until `ceiling`.
    ///
    /// For adapters that wait on one slow request and have nothing real to
    /// report. The task lives exactly as long as the returned guard.
    #[must_use = "the ticker stops as soon as the guard is dropped"]
    pub fn start_ticker(&self, step: u8, every: Duration, ceiling: u8) -> TickerGuard {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return TickerGuard { handle: None };
        };
        let sink = self.clone();
        let ceiling = ceiling.min(100);
        let handle = runtime.spawn(async move {
            let mut interval = tokio::time::interval(every);
            // The first tick completes immediately.
            interval.tick().await;
            let mut value = sink.current();
            while value < ceiling {
                interval.tick().await;
                value = value.saturating_add(step.max(1)).min(ceiling);
                sink.report(value);
            }
        });
        TickerGuard {
            handle: Some(handle),
        }
    }
}

impl std::fmt::Debug for ProgressSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressSink")
            .field("provider_id", &self.inner.provider_id)
            .field("window", &self.inner.window)
            .field("current", &self.current())
            .finish_non_exhaustive()
    }
}

/// Owns a running progress ticker; aborts it on drop.
#[derive(Debug)]
pub struct TickerGuard {
    handle: Option<JoinHandle<()>>,
}

impl TickerGuard {
    /// `true` while the ticker task is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for TickerGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
