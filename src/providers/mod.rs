//! Adapters shipped with the crate.
//!
//! Each adapter only uses the public contract in [`crate::provider`]; the
//! engine knows nothing about them beyond what the registry lists.
//!
//! | id           | kind   | rank | flags          |
//! |--------------|--------|------|----------------|
//! | `vidplay`    | embed  | 401  | `cors-allowed` |
//! | `filemoon`   | embed  | 301  | `cors-allowed` |
//! | `wecima`     | source | 210  |                |
//! | `insertunit` | source | 60   | `cors-allowed` |

pub mod embeds;
pub mod sources;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use crate::error::RegistrationError;
use crate::registry::ProviderRegistry;

pub use embeds::{Filemoon, Vidplay};
pub use sources::{Insertunit, Wecima};

/// Register every bundled adapter.
pub fn register_builtin(registry: &mut ProviderRegistry) -> Result<(), RegistrationError> {
    registry
        .register_source(Wecima::new())?
        .register_source(Insertunit::new())?
        .register_embed(Filemoon)?
        .register_embed(Vidplay)?;
    Ok(())
}

/// A registry holding the bundled adapters.
#[must_use]
pub fn builtin_registry() -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    register_builtin(&mut registry).expect("bundled adapter ids are unique");
    registry
}

/// Deserialize a JSON list, dropping entries that don't fit `T`.
///
/// Anything other than a list (including `null`) reads as empty.
pub(crate) fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let serde_json::Value::Array(items) = serde_json::Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}
