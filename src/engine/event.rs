//! Observer events emitted during a resolution.

use std::sync::Arc;

use crate::provider::EmbedReference;

/// Something that happened while resolving, in order of occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveEvent {
    SourceStarted {
        id: String,
    },
    EmbedsDiscovered {
        source_id: String,
        embeds: Vec<EmbedReference>,
    },
    EmbedStarted {
        id: String,
        url: String,
    },
    /// Adapter-local progress; the per-adapter maximum only ever grows.
    AdapterProgress {
        id: String,
        percent: u8,
    },
    AdapterFailed {
        id: String,
        reason: String,
        unexpected: bool,
    },
}

/// Callback receiving [`ResolveEvent`]s.
pub type EventCallback = Arc<dyn Fn(&ResolveEvent) + Send + Sync>;
