mod embed;
mod output;
mod providers;
mod resolve;

pub use embed::cmd_embed;
pub use providers::cmd_providers;
pub use resolve::cmd_resolve;

/// How results are printed to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            Self::Json
        } else {
            Self::Text
        }
    }
}
