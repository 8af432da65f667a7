//! Filemoon embed.
//!
//! The player page carries a p.a.c.k.e.r.-packed setup script; the HLS
//! playlist is the `file:"..."` entry of the unpacked script.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use super::unpack::unpack;
use super::{normalize_subtitles, subtitle_link, SubtitleList};
use crate::error::ScrapeError;
use crate::fetch::FetchOptions;
use crate::flags::{Flag, FlagSet};
use crate::media::Stream;
use crate::provider::{Embed, EmbedContext, EmbedOutput, Provider};

static EVAL_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"eval\((.*)\)").expect("eval pattern should compile"));

static FILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"file:"(.*?)""#).expect("file pattern should compile"));

pub struct Filemoon;

impl Provider for Filemoon {
    fn id(&self) -> &str {
        "filemoon"
    }

    fn name(&self) -> &str {
        "Filemoon"
    }

    fn rank(&self) -> i32 {
        301
    }

    fn flags(&self) -> FlagSet {
        FlagSet::from([Flag::CorsAllowed])
    }
}

#[async_trait]
impl Embed for Filemoon {
    async fn scrape(&self, ctx: &EmbedContext<'_>) -> Result<EmbedOutput, ScrapeError> {
        tracing::debug!("Fetching Filemoon player: {}", ctx.url());
        let page = ctx.fetch_text(ctx.url(), &FetchOptions::new()).await?;
        ctx.progress(40);

        let playlist = extract_playlist(&page)?;
        ctx.progress(70);

        let captions = match subtitle_link(ctx.url()) {
            Some(link) => {
                let list: SubtitleList =
                    ctx.fetch_json(&link, &FetchOptions::new()).await?;
                normalize_subtitles(&list)
            }
            None => Vec::new(),
        };
        ctx.progress(100);

        Ok(EmbedOutput {
            stream: vec![Stream::hls("primary", playlist)
                .with_flags([Flag::CorsAllowed])
                .with_captions(captions)],
        })
    }
}

/// Playlist URL from a Filemoon player page.
fn extract_playlist(page: &str) -> Result<String, ScrapeError> {
    let packed = EVAL_CODE
        .captures(page)
        .and_then(|c| c.get(1))
        .ok_or_else(|| ScrapeError::parse("failed to find eval code"))?;
    let unpacked =
        unpack(packed.as_str()).map_err(|e| ScrapeError::parse(format!("unpack failed: {e}")))?;
    FILE.captures(&unpacked)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|file| !file.is_empty())
        .ok_or_else(|| ScrapeError::parse("failed to find file"))
}
