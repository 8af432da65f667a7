//! Wecima source.
//!
//! Scrapes the download list of the watch page and returns the links as a
//! single file stream keyed by quality. The site gives no progress signal,
//! so a ticker advances progress while the page loads.

use std::collections::BTreeMap;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};

use crate::error::ScrapeError;
use crate::fetch::FetchOptions;
use crate::media::stream::quality_from_url;
use crate::media::{MediaTarget, Stream, StreamFile};
use crate::provider::{MediaSupport, Provider, SourceContext, Sourcerer, SourcererOutput};

const WECIMA_BASE: &str = "https://wecima.show";

static DOWNLOAD_LINKS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("ul.List--Download--Wecima--Single li a")
        .expect("download list selector should parse")
});

pub struct Wecima {
    base_url: String,
}

impl Wecima {
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_url(WECIMA_BASE)
    }

    /// Point the source at another host (mirrors, tests).
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn watch_url(&self, media: &MediaTarget) -> String {
        match media {
            MediaTarget::Movie(movie) => format!(
                "{}/watch/مشاهدة-فيلم-{}-{}/",
                self.base_url, movie.title, movie.release_year
            ),
            MediaTarget::Show(show) => format!(
                "{}/watch/مشاهدة-مسلسل-{}-موسم-{}-حلقة-{}",
                self.base_url, show.title, show.season.number, show.episode.number
            ),
        }
    }
}

impl Default for Wecima {
    fn default() -> Self {
        Self::new()
    }
}

impl Provider for Wecima {
    fn id(&self) -> &str {
        "wecima"
    }

    fn name(&self) -> &str {
        "Wecima"
    }

    fn rank(&self) -> i32 {
        210
    }
}

#[async_trait]
impl Sourcerer for Wecima {
    fn supports(&self) -> MediaSupport {
        MediaSupport::ALL
    }

    async fn scrape(&self, ctx: &SourceContext<'_>) -> Result<SourcererOutput, ScrapeError> {
        let url = self.watch_url(ctx.media());
        tracing::debug!("Fetching Wecima page: {}", url);

        let page = {
            let _ticker = ctx.start_ticker(Duration::from_millis(100));
            ctx.fetch_text(&url, &FetchOptions::new()).await
        };
        ctx.progress(100);

        // Any failure here only means this site has nothing for us.
        let page = page.map_err(|e| ScrapeError::not_found(format!("error fetching page: {e}")))?;
        let links = download_links(&page);
        if links.is_empty() {
            return Err(ScrapeError::not_found("no download links found"));
        }

        Ok(SourcererOutput::streams(vec![Stream::file(
            "primary",
            qualities(&links),
        )]))
    }
}

fn download_links(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&DOWNLOAD_LINKS)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| !href.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// Later links win when two share a quality.
fn qualities(links: &[String]) -> BTreeMap<String, StreamFile> {
    links
        .iter()
        .map(|link| (quality_from_url(link), StreamFile::mp4(link.as_str())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <ul class="List--Download--Wecima--Single">
          <li><a href="https://dl.wecima.show/m-1080p.mp4">1080p</a></li>
          <li><a href="https://dl.wecima.show/m-720p.mp4">720p</a></li>
          <li><a href="https://dl.wecima.show/m.mp4">other</a></li>
          <li><a>no link</a></li>
        </ul>
        <ul class="Other"><li><a href="https://ads.example/x">ad</a></li></ul>
    "#;

    #[test]
    fn collects_download_links_only() {
        let links = download_links(PAGE);
        assert_eq!(links.len(), 3);
        assert!(links.iter().all(|l| l.starts_with("https://dl.wecima.show/")));
    }

    #[test]
    fn qualities_keyed_by_resolution() {
        let map = qualities(&download_links(PAGE));
        assert_eq!(
            map.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["1080", "720", "unknown"]
        );
        assert_eq!(map["720"].url, "https://dl.wecima.show/m-720p.mp4");
    }

    #[test]
    fn watch_urls() {
        let wecima = Wecima::with_base_url("https://mirror.test/");
        assert_eq!(
            wecima.watch_url(&MediaTarget::movie("Heat", 1995, "949")),
            "https://mirror.test/watch/مشاهدة-فيلم-Heat-1995/"
        );
        assert_eq!(
            wecima.watch_url(&MediaTarget::episode("Dark", 2017, "70523", 1, 3)),
            "https://mirror.test/watch/مشاهدة-مسلسل-Dark-موسم-1-حلقة-3"
        );
    }
}
