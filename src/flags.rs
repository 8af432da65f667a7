//! Capability flags attached to providers and streams.
//!
//! A flag states something a provider (or the stream it produced) is able to
//! do, e.g. be played from a browser without CORS errors. Callers pass the
//! set of flags their environment *requires*; anything lacking one of them
//! is ineligible. Flags are an unordered set: no flag implies another.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A single capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Flag {
    /// Responses carry permissive CORS headers, usable from a browser.
    CorsAllowed,
    /// The stream URL is bound to the IP that resolved it.
    IpLocked,
}

impl Flag {
    /// Stable kebab-case name used in config files and the CLI.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CorsAllowed => "cors-allowed",
            Self::IpLocked => "ip-locked",
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Flag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "cors-allowed" => Ok(Self::CorsAllowed),
            "ip-locked" => Ok(Self::IpLocked),
            other => Err(format!("unknown flag '{other}'")),
        }
    }
}

/// Unordered set of [`Flag`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlagSet(BTreeSet<Flag>);

impl FlagSet {
    /// Empty set. As a requirement it admits every provider.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeSet::new())
    }

    pub fn insert(&mut self, flag: Flag) -> bool {
        self.0.insert(flag)
    }

    #[must_use]
    pub fn with(mut self, flag: Flag) -> Self {
        self.0.insert(flag);
        self
    }

    #[must_use]
    pub fn contains(&self, flag: Flag) -> bool {
        self.0.contains(&flag)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Flag> + '_ {
        self.0.iter().copied()
    }

    /// `true` if every flag in `required` is present in `self`.
    #[must_use]
    pub fn satisfies(&self, required: &FlagSet) -> bool {
        required.0.is_subset(&self.0)
    }
}

impl FromIterator<Flag> for FlagSet {
    fn from_iter<I: IntoIterator<Item = Flag>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[Flag; N]> for FlagSet {
    fn from(flags: [Flag; N]) -> Self {
        flags.into_iter().collect()
    }
}

impl fmt::Display for FlagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("-");
        }
        let names: Vec<&str> = self.iter().map(Flag::as_str).collect();
        f.write_str(&names.join(","))
    }
}

/// Eligibility predicate shared by sources, embeds and streams.
///
/// Eligible iff `required ⊆ provided`.
#[must_use]
pub fn is_eligible(provided: &FlagSet, required: &FlagSet) -> bool {
    provided.satisfies(required)
}

/// Where the resolved stream is going to be played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Native player: no restrictions.
    #[default]
    Native,
    /// Web page: the player is subject to CORS.
    Browser,
}

impl Environment {
    /// Flags a provider must carry to be usable in this environment.
    #[must_use]
    pub fn required_flags(self) -> FlagSet {
        match self {
            Self::Native => FlagSet::new(),
            Self::Browser => FlagSet::from([Flag::CorsAllowed]),
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "native" => Ok(Self::Native),
            "browser" => Ok(Self::Browser),
            other => Err(format!("unknown environment '{other}' (expected native or browser)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_requirement_admits_everything() {
        assert!(is_eligible(&FlagSet::new(), &FlagSet::new()));
        assert!(is_eligible(&FlagSet::from([Flag::CorsAllowed]), &FlagSet::new()));
    }

    #[test]
    fn requirement_must_be_subset() {
        let provided = FlagSet::from([Flag::CorsAllowed]);
        let required = FlagSet::from([Flag::CorsAllowed, Flag::IpLocked]);
        assert!(!is_eligible(&provided, &required));
        assert!(is_eligible(&required, &provided));
    }

    #[test]
    fn flags_do_not_imply_each_other() {
        let provided = FlagSet::from([Flag::IpLocked]);
        assert!(!is_eligible(&provided, &FlagSet::from([Flag::CorsAllowed])));
    }

    #[test]
    fn parse_flag_names() {
        assert_eq!("cors-allowed".parse::<Flag>().unwrap(), Flag::CorsAllowed);
        assert_eq!("IP_LOCKED".parse::<Flag>().unwrap(), Flag::IpLocked);
        assert!("fast".parse::<Flag>().is_err());
    }

    #[test]
    fn browser_requires_cors() {
        assert!(Environment::Native.required_flags().is_empty());
        assert!(Environment::Browser
            .required_flags()
            .contains(Flag::CorsAllowed));
    }

    #[test]
    fn display_lists_flags() {
        assert_eq!(FlagSet::new().to_string(), "-");
        assert_eq!(
            FlagSet::from([Flag::IpLocked, Flag::CorsAllowed]).to_string(),
            "cors-allowed,ip-locked"
        );
    }

    #[test]
    fn serde_uses_kebab_case() {
        let set = FlagSet::from([Flag::CorsAllowed]);
        assert_eq!(serde_json::to_string(&set).unwrap(), r#"["cors-allowed"]"#);
    }
}
