//! Insertunit source.
//!
//! The player page for an IMDb id embeds its data as JavaScript object
//! literals: `hls: "..."` and `cc: [...]` for movies, a `seasons: [...]`
//! table for shows. Streams are HLS and CORS-friendly.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;

use crate::error::ScrapeError;
use crate::fetch::FetchOptions;
use crate::flags::{Flag, FlagSet};
use crate::media::{caption, Caption, MediaTarget, ShowEpisode, Stream};
use crate::provider::{MediaSupport, Provider, SourceContext, Sourcerer, SourcererOutput};
use crate::providers::lenient_list;

const INSERTUNIT_BASE: &str = "https://insertunit.wafflehacker.io";

static SEASONS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"seasons:\s*\[").expect("seasons pattern should compile"));

static MOVIE_HLS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"hls: "([^"]*)"#).expect("hls pattern should compile"));

static MOVIE_CC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"cc:\s*\[").expect("cc pattern should compile"));

#[derive(Debug, Deserialize)]
struct Season {
    season: u32,
    #[serde(default)]
    blocked: bool,
    #[serde(default)]
    episodes: Vec<Episode>,
}

#[derive(Debug, Deserialize)]
struct Episode {
    /// Episode numbers are strings in the player data.
    episode: String,
    #[serde(default)]
    hls: Option<String>,
    #[serde(default)]
    cc: Subtitles,
}

#[derive(Debug, Deserialize)]
struct Subtitle {
    #[serde(default, alias = "file")]
    url: String,
    #[serde(default, alias = "label")]
    name: String,
}

/// A `cc` list; malformed entries are dropped.
#[derive(Debug, Default, Deserialize)]
#[serde(transparent)]
struct Subtitles(#[serde(deserialize_with = "lenient_list")] Vec<Subtitle>);

pub struct Insertunit {
    base_url: String,
}

impl Insertunit {
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_url(INSERTUNIT_BASE)
    }

    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    async fn player_data(&self, ctx: &SourceContext<'_>) -> Result<String, ScrapeError> {
        let imdb_id = ctx
            .media()
            .imdb_id()
            .ok_or_else(|| ScrapeError::not_found("no IMDb id for target"))?;
        tracing::debug!("Fetching Insertunit player for {}", imdb_id);
        let opts = FetchOptions::new()
            .base_url(&self.base_url)
            .query("imdb", imdb_id);
        Ok(ctx.fetch_text("index.php", &opts).await?)
    }

    async fn scrape_movie(&self, ctx: &SourceContext<'_>) -> Result<SourcererOutput, ScrapeError> {
        let data = self.player_data(ctx).await?;
        ctx.progress(35);

        let playlist = MOVIE_HLS
            .captures(&data)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ScrapeError::not_found("no result found"))?;
        ctx.progress(75);

        let captions = match literal_after(&MOVIE_CC, &data).map(first_json_value::<Subtitles>) {
            Some(Ok(subtitles)) => normalize(&subtitles),
            Some(Err(e)) => {
                tracing::debug!("Insertunit caption list did not parse: {e}");
                Vec::new()
            }
            None => Vec::new(),
        };
        ctx.progress(90);

        Ok(hls_output(playlist, captions))
    }

    async fn scrape_episode(
        &self,
        ctx: &SourceContext<'_>,
        show: &ShowEpisode,
    ) -> Result<SourcererOutput, ScrapeError> {
        let data = self.player_data(ctx).await?;
        ctx.progress(30);

        let table = literal_after(&SEASONS, &data)
            .ok_or_else(|| ScrapeError::not_found("no result found"))?;
        ctx.progress(60);

        let seasons: Vec<Season> = first_json_value(table).map_err(|e| {
            tracing::debug!("Insertunit season table did not parse: {e}");
            ScrapeError::not_found("error parsing season data")
        })?;

        let episode = find_episode(&seasons, show.season.number, show.episode.number)?;
        let playlist = episode
            .hls
            .clone()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ScrapeError::not_found("episode not found or no HLS stream available"))?;
        let captions = normalize(&episode.cc);
        ctx.progress(95);

        Ok(hls_output(playlist, captions))
    }
}

impl Default for Insertunit {
    fn default() -> Self {
        Self::new()
    }
}

impl Provider for Insertunit {
    fn id(&self) -> &str {
        "insertunit"
    }

    fn name(&self) -> &str {
        "Insertunit"
    }

    fn rank(&self) -> i32 {
        60
    }

    fn flags(&self) -> FlagSet {
        FlagSet::from([Flag::CorsAllowed])
    }
}

#[async_trait]
impl Sourcerer for Insertunit {
    fn supports(&self) -> MediaSupport {
        MediaSupport::ALL
    }

    async fn scrape(&self, ctx: &SourceContext<'_>) -> Result<SourcererOutput, ScrapeError> {
        match ctx.media() {
            MediaTarget::Movie(_) => self.scrape_movie(ctx).await,
            MediaTarget::Show(show) => self.scrape_episode(ctx, show).await,
        }
    }
}

/// Text from the `[` that ends a `key: [` match to the end of `data`.
fn literal_after<'a>(pattern: &Regex, data: &'a str) -> Option<&'a str> {
    pattern.find(data).map(|m| &data[m.end() - 1..])
}

/// Parse the JSON value at the start of `text`, ignoring whatever follows.
fn first_json_value<T: serde::de::DeserializeOwned>(text: &str) -> Result<T, serde_json::Error> {
    serde_json::Deserializer::from_str(text)
        .into_iter::<T>()
        .next()
        .unwrap_or_else(|| Err(serde::de::Error::custom("no JSON value")))
}

/// Unblocked season `season`, episode `episode`.
fn find_episode(seasons: &[Season], season: u32, episode: u32) -> Result<&Episode, ScrapeError> {
    let current = seasons
        .iter()
        .find(|s| s.season == season && !s.blocked)
        .ok_or_else(|| ScrapeError::not_found("season not found or blocked"))?;
    let number = episode.to_string();
    current
        .episodes
        .iter()
        .find(|e| e.episode == number)
        .ok_or_else(|| ScrapeError::not_found("episode not found or no HLS stream available"))
}

fn normalize(subtitles: &Subtitles) -> Vec<Caption> {
    caption::normalize_all(subtitles.0.iter().map(|s| (s.name.as_str(), s.url.as_str())))
}

fn hls_output(playlist: String, captions: Vec<Caption>) -> SourcererOutput {
    SourcererOutput::streams(vec![Stream::hls("primary", playlist)
        .with_flags([Flag::CorsAllowed])
        .with_captions(captions)])
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHOW_PAGE: &str = r#"
        var player = new Playerjs({
          seasons: [{"season":1,"blocked":false,"episodes":[
            {"episode":"1","hls":"https://cdn.iu/s1e1.m3u8","cc":[]},
            {"episode":"2","hls":"https://cdn.iu/s1e2.m3u8","cc":[{"url":"https://cdn.iu/s1e2.en.vtt","name":"English"}]}
          ]},{"season":2,"blocked":true,"episodes":[{"episode":"1","hls":"https://cdn.iu/s2e1.m3u8"}]}],
          poster: "x.jpg"
        });
    "#;

    fn seasons() -> Vec<Season> {
        first_json_value(literal_after(&SEASONS, SHOW_PAGE).unwrap()).unwrap()
    }

    #[test]
    fn season_table_is_extracted() {
        let seasons = seasons();
        assert_eq!(seasons.len(), 2);
        assert!(seasons[1].blocked);
    }

    #[test]
    fn finds_episode_by_string_number() {
        let seasons = seasons();
        let episode = find_episode(&seasons, 1, 2).unwrap();
        assert_eq!(episode.hls.as_deref(), Some("https://cdn.iu/s1e2.m3u8"));
        assert_eq!(normalize(&episode.cc)[0].language, "en");
    }

    #[test]
    fn malformed_caption_entries_keep_the_episode() {
        let page = r#"seasons: [{"season":1,"episodes":[
            {"episode":"4","hls":"https://cdn.iu/s1e4.m3u8",
             "cc":[{"name":"English"},{"url":"https://cdn.iu/s1e4.es.vtt","name":"Spanish"},null]},
            {"episode":"5","hls":"https://cdn.iu/s1e5.m3u8","cc":null}]}]"#;
        let seasons: Vec<Season> = first_json_value(literal_after(&SEASONS, page).unwrap()).unwrap();

        let captions = normalize(&find_episode(&seasons, 1, 4).unwrap().cc);
        assert_eq!(captions.len(), 1);
        assert_eq!(captions[0].language, "es");
        assert!(find_episode(&seasons, 1, 5).unwrap().cc.0.is_empty());
    }

    #[test]
    fn blocked_or_missing_is_not_found() {
        let seasons = seasons();
        assert!(find_episode(&seasons, 2, 1).unwrap_err().is_not_found());
        assert!(find_episode(&seasons, 1, 9).unwrap_err().is_not_found());
        assert!(find_episode(&seasons, 7, 1).unwrap_err().is_not_found());
    }

    #[test]
    fn movie_fields_are_matched() {
        let page = "hls: \"https://cdn.iu/movie.m3u8\",\ncc: [{\"url\":\"https://cdn.iu/m.fr.srt\",\"name\":\"French\"}],\n";
        let hls = MOVIE_HLS.captures(page).unwrap().get(1).unwrap().as_str();
        assert_eq!(hls, "https://cdn.iu/movie.m3u8");

        let cc = literal_after(&MOVIE_CC, page).unwrap();
        let subtitles: Subtitles = first_json_value(cc).unwrap();
        let captions = normalize(&subtitles);
        assert_eq!(captions[0].language, "fr");
    }
}
