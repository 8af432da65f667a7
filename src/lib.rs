//! `streamhunt` - Provider orchestration for resolving video streams
//!
//! # Features
//!
//! - **Ranked fallback**: sources are tried best rank first until one yields
//!   a playable stream
//! - **Two-stage resolution**: sources may defer to embed hosts, which are
//!   resolved in a second pass
//! - **Capability flags**: per-environment filtering of adapters and streams
//! - **Progress and cancellation**: monotonic 0-100 progress callback,
//!   `CancellationToken` support
//!
//! # Example
//!
//! ```rust,no_run
//! use streamhunt::config::Config;
//! use streamhunt::{MediaTarget, ResolveOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let engine = Config::default().engine()?;
//!     let target = MediaTarget::movie("Heat", 1995, "949").with_imdb_id("tt0113277");
//!     let options = ResolveOptions::new().on_progress(|p| eprintln!("{p}%"));
//!     let resolved = engine.resolve(&target, &options).await?;
//!     println!("{:?}", resolved.first());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod flags;
pub mod media;
pub mod provider;
pub mod providers;
pub mod registry;

pub use engine::{
    Attempt, AttemptOutcome, ResolutionEngine, ResolveEvent, ResolveOptions, ResolvedMedia,
    ResolvedStream,
};
pub use error::{FetchError, RegistrationError, ResolveError, ScrapeError};
pub use fetch::{FetchOptions, FetchResponse, Fetcher, ReqwestFetcher};
pub use flags::{Environment, Flag, FlagSet};
pub use media::{Caption, MediaKind, MediaTarget, Stream};
pub use provider::{Embed, Provider, Sourcerer};
pub use registry::ProviderRegistry;

/// Version of streamhunt
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
