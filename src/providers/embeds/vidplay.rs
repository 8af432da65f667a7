//! VidPlay embed.
//!
//! The player resolves its media through a `mediainfo` endpoint on the same
//! host, keyed by the embed id. Requests go through the proxied fetcher
//! with the embed page as referer. The playlist itself is served through a
//! referer-rewriting relay so players can load it cross-origin.

use async_trait::async_trait;
use serde::Deserialize;

use super::{normalize_subtitles, subtitle_link, SubtitleList};
use crate::error::ScrapeError;
use crate::fetch::FetchOptions;
use crate::flags::{Flag, FlagSet};
use crate::media::Stream;
use crate::provider::{Embed, EmbedContext, EmbedOutput, Provider};

const PLAYLIST_RELAY: &str = "https://m3u8.justchill.workers.dev/";
const RELAY_REFERER: &str = "https://vidsrc.to/";

#[derive(Debug, Deserialize)]
struct MediaInfoResponse {
    result: MediaInfoResult,
}

/// The endpoint answers with a bare status code when the file is gone.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MediaInfoResult {
    Missing(i64),
    Found(MediaInfo),
}

#[derive(Debug, Deserialize)]
struct MediaInfo {
    #[serde(default)]
    sources: Vec<MediaSource>,
    #[serde(default)]
    tracks: Vec<MediaTrack>,
}

#[derive(Debug, Deserialize)]
struct MediaSource {
    file: String,
}

#[derive(Debug, Deserialize)]
struct MediaTrack {
    file: String,
    #[serde(default)]
    kind: String,
}

pub struct Vidplay;

impl Provider for Vidplay {
    fn id(&self) -> &str {
        "vidplay"
    }

    fn name(&self) -> &str {
        "VidPlay"
    }

    fn rank(&self) -> i32 {
        401
    }

    fn flags(&self) -> FlagSet {
        FlagSet::from([Flag::CorsAllowed])
    }
}

#[async_trait]
impl Embed for Vidplay {
    async fn scrape(&self, ctx: &EmbedContext<'_>) -> Result<EmbedOutput, ScrapeError> {
        let info_url = media_info_url(ctx.url())?;
        tracing::debug!("Fetching VidPlay media info: {}", info_url);

        let response: MediaInfoResponse = ctx
            .proxied_json(&info_url, &FetchOptions::new().header("referer", ctx.url()))
            .await?;
        ctx.progress(50);

        let info = match response.result {
            MediaInfoResult::Missing(code) => {
                return Err(ScrapeError::not_found(format!("file not found (code {code})")))
            }
            MediaInfoResult::Found(info) => info,
        };
        let source = info
            .sources
            .first()
            .map(|s| s.file.as_str())
            .filter(|f| !f.is_empty())
            .ok_or_else(|| ScrapeError::not_found("no sources in media info"))?;
        let thumbnails = info.tracks.iter().find(|t| t.kind == "thumbnails");

        let captions = match subtitle_link(ctx.url()) {
            Some(link) => {
                let list: SubtitleList =
                    ctx.proxied_json(&link, &FetchOptions::new()).await?;
                normalize_subtitles(&list)
            }
            None => Vec::new(),
        };
        ctx.progress(100);

        let mut stream = Stream::hls("primary", relay_playlist(source))
            .with_flags([Flag::CorsAllowed])
            .with_captions(captions);
        if let Some(track) = thumbnails {
            stream = stream.with_thumbnail_track(&track.file);
        }
        Ok(EmbedOutput {
            stream: vec![stream],
        })
    }
}

/// `{origin}/mediainfo/{id}` keeping the embed URL's query string.
fn media_info_url(embed_url: &str) -> Result<String, ScrapeError> {
    let parsed = url::Url::parse(embed_url)
        .map_err(|e| ScrapeError::parse(format!("invalid embed URL {embed_url}: {e}")))?;
    let id = parsed
        .path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .ok_or_else(|| ScrapeError::parse(format!("no embed id in {embed_url}")))?;

    let mut info = parsed.clone();
    info.set_path(&format!("mediainfo/{id}"));
    Ok(info.to_string())
}

fn relay_playlist(source: &str) -> String {
    format!(
        "{PLAYLIST_RELAY}?url={}&referer={RELAY_REFERER}",
        urlencoding::encode(source)
    )
}
