//! Provider registry.
//!
//! Holds the two halves of the provider set: sources and embeds. Built once
//! at startup, then shared read-only (`Arc<ProviderRegistry>`) with the
//! engine. Listings are ordered by descending rank; ties keep registration
//! order.
//!
//! # Example
//!
//! ```rust,no_run
//! use streamhunt::flags::{Flag, FlagSet};
//! use streamhunt::provider::Provider;
//! use streamhunt::providers::builtin_registry;
//!
//! let registry = builtin_registry();
//! for source in registry.list_sources(&FlagSet::from([Flag::CorsAllowed])) {
//!     println!("{} (rank {})", source.id(), source.rank());
//! }
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::RegistrationError;
use crate::flags::{is_eligible, FlagSet};
use crate::media::MediaKind;
use crate::provider::{Embed, Provider, Sourcerer};

/// Registry of source and embed adapters.
#[derive(Default)]
pub struct ProviderRegistry {
    sources: Vec<Arc<dyn Sourcerer>>,
    embeds: Vec<Arc<dyn Embed>>,
    disabled: HashSet<String>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source adapter. Fails if the id is already a source.
    pub fn register_source(
        &mut self,
        source: impl Sourcerer + 'static,
    ) -> Result<&mut Self, RegistrationError> {
        if self.sources.iter().any(|s| s.id() == source.id()) {
            return Err(RegistrationError::DuplicateSource(source.id().to_string()));
        }
        tracing::debug!("Registered source: {} (rank {})", source.id(), source.rank());
        self.sources.push(Arc::new(source));
        Ok(self)
    }

    /// Register an embed adapter. Fails if the id is already an embed.
    pub fn register_embed(
        &mut self,
        embed: impl Embed + 'static,
    ) -> Result<&mut Self, RegistrationError> {
        if self.embeds.iter().any(|e| e.id() == embed.id()) {
            return Err(RegistrationError::DuplicateEmbed(embed.id().to_string()));
        }
        tracing::debug!("Registered embed: {} (rank {})", embed.id(), embed.rank());
        self.embeds.push(Arc::new(embed));
        Ok(self)
    }

    /// Disable a provider by id (either half) without unregistering it.
    ///
    /// Startup-time override, e.g. from the config file.
    pub fn disable(&mut self, id: &str) -> &mut Self {
        self.disabled.insert(id.to_string());
        self
    }

    /// `true` if the provider is enabled and satisfies `required`.
    pub fn is_eligible<P: Provider + ?Sized>(&self, provider: &P, required: &FlagSet) -> bool {
        !provider.disabled()
            && !self.disabled.contains(provider.id())
            && is_eligible(&provider.flags(), required)
    }

    /// Enabled sources carrying `required`, best rank first.
    pub fn list_sources(&self, required: &FlagSet) -> Vec<Arc<dyn Sourcerer>> {
        ranked(&self.sources, |s| self.is_eligible(s.as_ref(), required))
    }

    /// Like [`list_sources`](Self::list_sources), restricted to sources
    /// supporting `kind`.
    pub fn list_sources_for(&self, kind: MediaKind, required: &FlagSet) -> Vec<Arc<dyn Sourcerer>> {
        ranked(&self.sources, |s| {
            s.supports().supports(kind) && self.is_eligible(s.as_ref(), required)
        })
    }

    /// Enabled embeds carrying `required`, best rank first.
    pub fn list_embeds(&self, required: &FlagSet) -> Vec<Arc<dyn Embed>> {
        ranked(&self.embeds, |e| self.is_eligible(e.as_ref(), required))
    }

    /// Embed by id, regardless of eligibility. `None` for unknown ids.
    pub fn get_embed(&self, id: &str) -> Option<Arc<dyn Embed>> {
        self.embeds.iter().find(|e| e.id() == id).cloned()
    }

    /// Source by id, regardless of eligibility.
    pub fn get_source(&self, id: &str) -> Option<Arc<dyn Sourcerer>> {
        self.sources.iter().find(|s| s.id() == id).cloned()
    }

    /// All sources in registration order, including disabled ones.
    pub fn sources(&self) -> &[Arc<dyn Sourcerer>] {
        &self.sources
    }

    /// All embeds in registration order, including disabled ones.
    pub fn embeds(&self) -> &[Arc<dyn Embed>] {
        &self.embeds
    }

    /// Rank of an embed, `None` if unknown.
    pub fn embed_rank(&self, id: &str) -> Option<i32> {
        self.embeds.iter().find(|e| e.id() == id).map(|e| e.rank())
    }

    /// `true` if the id was disabled through [`disable`](Self::disable).
    pub fn is_disabled_by_config(&self, id: &str) -> bool {
        self.disabled.contains(id)
    }
}

/// Filter then sort by descending rank. `sort_by_key` is stable, so equal
/// ranks keep registration order.
fn ranked<T: Provider + ?Sized>(
    entries: &[Arc<T>],
    keep: impl Fn(&Arc<T>) -> bool,
) -> Vec<Arc<T>> {
    let mut list: Vec<Arc<T>> = entries.iter().filter(|e| keep(e)).cloned().collect();
    list.sort_by_key(|e| std::cmp::Reverse(e.rank()));
    list
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScrapeError;
    use crate::flags::Flag;
    use crate::provider::{
        EmbedContext, EmbedOutput, MediaSupport, SourceContext, SourcererOutput,
    };
    use async_trait::async_trait;

    struct FakeSource {
        id: &'static str,
        rank: i32,
        disabled: bool,
        flags: FlagSet,
        supports: MediaSupport,
    }

    impl FakeSource {
        fn new(id: &'static str, rank: i32) -> Self {
            Self {
                id,
                rank,
                disabled: false,
                flags: FlagSet::new(),
                supports: MediaSupport::ALL,
            }
        }
    }

    impl Provider for FakeSource {
        fn id(&self) -> &str {
            self.id
        }
        fn name(&self) -> &str {
            self.id
        }
        fn rank(&self) -> i32 {
            self.rank
        }
        fn disabled(&self) -> bool {
            self.disabled
        }
        fn flags(&self) -> FlagSet {
            self.flags.clone()
        }
    }

    #[async_trait]
    impl Sourcerer for FakeSource {
        fn supports(&self) -> MediaSupport {
            self.supports
        }
        async fn scrape(&self, _ctx: &SourceContext<'_>) -> Result<SourcererOutput, ScrapeError> {
            Err(ScrapeError::not_found("fake"))
        }
    }

    struct FakeEmbed(&'static str, i32);

    impl Provider for FakeEmbed {
        fn id(&self) -> &str {
            self.0
        }
        fn name(&self) -> &str {
            self.0
        }
        fn rank(&self) -> i32 {
            self.1
        }
    }

    #[async_trait]
    impl Embed for FakeEmbed {
        async fn scrape(&self, _ctx: &EmbedContext<'_>) -> Result<EmbedOutput, ScrapeError> {
            Ok(EmbedOutput::default())
        }
    }

    fn ids<T: Provider + ?Sized>(list: &[Arc<T>]) -> Vec<String> {
        list.iter().map(|p| p.id().to_string()).collect()
    }

    #[test]
    fn listing_sorts_by_rank_with_stable_ties() {
        let mut registry = ProviderRegistry::new();
        registry
            .register_source(FakeSource::new("low", 10))
            .unwrap()
            .register_source(FakeSource::new("tie-a", 50))
            .unwrap()
            .register_source(FakeSource::new("high", 90))
            .unwrap()
            .register_source(FakeSource::new("tie-b", 50))
            .unwrap();

        assert_eq!(
            ids(&registry.list_sources(&FlagSet::new())),
            vec!["high", "tie-a", "tie-b", "low"]
        );
    }

    #[test]
    fn duplicate_ids_are_rejected_per_half() {
        let mut registry = ProviderRegistry::new();
        registry.register_source(FakeSource::new("dup", 1)).unwrap();
        let err = registry
            .register_source(FakeSource::new("dup", 2))
            .err()
            .unwrap();
        assert_eq!(err, RegistrationError::DuplicateSource("dup".into()));

        // Same id in the other half is fine.
        registry.register_embed(FakeEmbed("dup", 1)).unwrap();
        assert!(matches!(
            registry.register_embed(FakeEmbed("dup", 3)),
            Err(RegistrationError::DuplicateEmbed(_))
        ));
        assert_eq!(registry.sources().len(), 1);
        assert_eq!(registry.embeds().len(), 1);
    }

    #[test]
    fn disabled_and_flag_ineligible_are_filtered() {
        let mut registry = ProviderRegistry::new();
        let mut off = FakeSource::new("off", 100);
        off.disabled = true;
        let mut cors = FakeSource::new("cors", 20);
        cors.flags = FlagSet::from([Flag::CorsAllowed]);
        registry
            .register_source(off)
            .unwrap()
            .register_source(cors)
            .unwrap()
            .register_source(FakeSource::new("plain", 30))
            .unwrap()
            .register_source(FakeSource::new("config-off", 40))
            .unwrap();
        registry.disable("config-off");

        assert_eq!(ids(&registry.list_sources(&FlagSet::new())), vec!["plain", "cors"]);
        assert_eq!(
            ids(&registry.list_sources(&FlagSet::from([Flag::CorsAllowed]))),
            vec!["cors"]
        );
        assert!(registry.is_disabled_by_config("config-off"));
    }

    #[test]
    fn kind_filter_uses_media_support() {
        let mut registry = ProviderRegistry::new();
        let mut movies = FakeSource::new("movies", 10);
        movies.supports = MediaSupport::MOVIE;
        let mut shows = FakeSource::new("shows", 20);
        shows.supports = MediaSupport::SHOW;
        registry
            .register_source(movies)
            .unwrap()
            .register_source(shows)
            .unwrap();

        assert_eq!(
            ids(&registry.list_sources_for(MediaKind::Movie, &FlagSet::new())),
            vec!["movies"]
        );
        assert_eq!(
            ids(&registry.list_sources_for(MediaKind::Show, &FlagSet::new())),
            vec!["shows"]
        );
    }

    #[test]
    fn embed_lookup_misses_are_none() {
        let mut registry = ProviderRegistry::new();
        registry.register_embed(FakeEmbed("vidplay", 401)).unwrap();
        registry.register_embed(FakeEmbed("filemoon", 301)).unwrap();

        assert!(registry.get_embed("vidplay").is_some());
        assert!(registry.get_embed("nope").is_none());
        assert_eq!(registry.embed_rank("filemoon"), Some(301));
        assert_eq!(
            ids(&registry.list_embeds(&FlagSet::new())),
            vec!["vidplay", "filemoon"]
        );
    }
}
