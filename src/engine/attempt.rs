//! Per-adapter outcome records kept for diagnostics.

use std::fmt;

use serde::Serialize;

/// Which registry half an attempt belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Source,
    Embed,
}

/// How one adapter invocation (or skipped candidate) ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "kebab-case")]
pub enum AttemptOutcome {
    /// Produced at least one usable stream.
    Succeeded,
    /// Returned normally but nothing usable came out of it.
    NoStreams,
    /// Adapter reported the expected "no result here".
    NotFound(String),
    /// Adapter failed unexpectedly (parse error, network error, timeout).
    Failed(String),
    /// Candidate was never invoked, e.g. an unknown embed id.
    Skipped(String),
}

impl AttemptOutcome {
    /// `true` for failures worth a bug report rather than a shrug.
    #[must_use]
    pub fn is_unexpected(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => f.write_str("ok"),
            Self::NoStreams => f.write_str("no streams"),
            Self::NotFound(reason) => write!(f, "not found ({reason})"),
            Self::Failed(reason) => write!(f, "failed ({reason})"),
            Self::Skipped(reason) => write!(f, "skipped ({reason})"),
        }
    }
}

/// One entry of the diagnostics trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub provider_id: String,
    pub role: Role,
    #[serde(flatten)]
    pub outcome: AttemptOutcome,
}

impl Attempt {
    pub fn new(provider_id: impl Into<String>, role: Role, outcome: AttemptOutcome) -> Self {
        Self {
            provider_id: provider_id.into(),
            role,
            outcome,
        }
    }
}

impl fmt::Display for Attempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.provider_id, self.outcome)
    }
}

/// One-line summary used in the aggregate not-found message.
#[must_use]
pub fn summarize_attempts(attempts: &[Attempt]) -> String {
    if attempts.is_empty() {
        return "no eligible sources".to_string();
    }
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
