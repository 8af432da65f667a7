//! Fetch abstraction handed to adapters.
//!
//! Adapters never build HTTP clients themselves. They receive two
//! [`Fetcher`]s through their scrape context: a direct one and a proxied one
//! that routes traffic through a caller-supplied proxy. Both are opaque to
//! the engine beyond this trait.
//!
//! [`ReqwestFetcher`] is the default implementation:
//! - HTTP/2 with connection pooling and keep-alive
//! - TLS 1.3 via rustls
//! - Brotli, Zstd, Gzip compression (auto-negotiated)
//! - Redirects limited to 10 hops

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::error::FetchError;

/// Default user agent, a current desktop Chrome.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// HTTP method supported by the fetch contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
}

/// Per-request options.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub method: Method,
    pub headers: BTreeMap<String, String>,
    /// Prefix joined with the request URL (see [`build_url`]).
    pub base_url: Option<String>,
    /// Query parameters set on the final URL, overriding existing keys.
    pub query: Vec<(String, String)>,
    pub body: Option<String>,
}

impl FetchOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn base_url(mut self, base: impl Into<String>) -> Self {
        self.base_url = Some(base.into());
        self
    }

    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn post(mut self, body: impl Into<String>) -> Self {
        self.method = Method::Post;
        self.body = Some(body.into());
        self
    }
}

/// Full response envelope, for adapters that need status, headers or the
/// post-redirect URL.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    /// Header names are lowercase.
    pub headers: BTreeMap<String, String>,
    /// URL after redirects.
    pub final_url: String,
    pub body: String,
}

impl FetchResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, FetchError> {
        serde_json::from_str(&self.body).map_err(|source| FetchError::Decode {
            url: self.final_url.clone(),
            source,
        })
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Capability-injected HTTP client.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Perform a request. Non-2xx responses are [`FetchError::Status`].
    async fn fetch(&self, url: &str, opts: &FetchOptions) -> Result<FetchResponse, FetchError>;
}

/// Join `url` onto `opts.base_url` and apply `opts.query`.
///
/// The base gets a trailing `/` and the url loses a leading one, so
/// `("index.php", "https://a.io")` and `("/index.php", "https://a.io/")`
/// both give `https://a.io/index.php`. The result must be http(s).
pub fn build_url(url: &str, opts: &FetchOptions) -> Result<String, FetchError> {
    let mut left = opts.base_url.clone().unwrap_or_default();
    if !left.is_empty() && !left.ends_with('/') {
        left.push('/');
    }
    let right = if left.is_empty() {
        url
    } else {
        url.strip_prefix('/').unwrap_or(url)
    };
    let full = format!("{left}{right}");

    if !full.starts_with("http://") && !full.starts_with("https://") {
        return Err(FetchError::InvalidUrl(format!(
            "URL doesn't start with a http scheme: '{full}'"
        )));
    }

    let mut parsed =
        url::Url::parse(&full).map_err(|e| FetchError::InvalidUrl(format!("{full}: {e}")))?;

    if !opts.query.is_empty() {
        let kept: Vec<(String, String)> = parsed
            .query_pairs()
            .filter(|(k, _)| !opts.query.iter().any(|(q, _)| q == k))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let mut pairs = parsed.query_pairs_mut();
        pairs.clear();
        for (k, v) in kept.iter().chain(opts.query.iter()) {
            pairs.append_pair(k, v);
        }
    }

    Ok(parsed.to_string())
}

/// Client settings shared by the direct and proxied fetchers.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// reqwest-backed [`Fetcher`].
pub struct ReqwestFetcher {
    client: Client,
    proxied: bool,
}

impl ReqwestFetcher {
    /// Direct fetcher with default settings.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_settings(&HttpSettings::default())
    }

    /// Direct fetcher.
    pub fn with_settings(settings: &HttpSettings) -> Result<Self, FetchError> {
        let client = Self::builder(settings).build()?;
        Ok(Self {
            client,
            proxied: false,
        })
    }

    /// Fetcher that sends every request through `proxy_url`.
    pub fn proxied(proxy_url: &str, settings: &HttpSettings) -> Result<Self, FetchError> {
        let proxy = reqwest::Proxy::all(proxy_url)?;
        let client = Self::builder(settings).proxy(proxy).build()?;
        Ok(Self {
            client,
            proxied: true,
        })
    }

    fn builder(settings: &HttpSettings) -> reqwest::ClientBuilder {
        Client::builder()
            // Keep connections alive for reuse across adapters
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .tcp_nodelay(true)
            .use_rustls_tls()
            .brotli(true)
            .zstd(true)
            .gzip(true)
            .deflate(true)
            .user_agent(settings.user_agent.clone())
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .cookie_store(true)
    }

    /// Get the underlying reqwest client
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Fetcher for ReqwestFetcher {
    #[instrument(skip(self, opts), fields(proxied = self.proxied))]
    async fn fetch(&self, url: &str, opts: &FetchOptions) -> Result<FetchResponse, FetchError> {
        let full_url = build_url(url, opts)?;
        debug!(url = %full_url, "Fetching");

        let mut request = match opts.method {
            Method::Get => self.client.get(&full_url),
            Method::Post => self.client.post(&full_url),
        };
        for (name, value) in &opts.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &opts.body {
            request = request.body(body.clone());
        }

        let response = request.send().await?;
        let status = response.status();
        let final_url = response.url().to_string();
        debug!(status = %status, version = ?response.version(), "Response received");

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: final_url,
            });
        }

        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response.text().await?;

        Ok(FetchResponse {
            status: status.as_u16(),
            headers,
            final_url,
            body,
        })
    }
}

/// Stand-in proxied fetcher when no proxy is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableFetcher;

#[async_trait]
impl Fetcher for UnavailableFetcher {
    async fn fetch(&self, _url: &str, _opts: &FetchOptions) -> Result<FetchResponse, FetchError> {
        Err(FetchError::NoProxy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn joins_base_url_and_path() {
        let opts = FetchOptions::new().base_url("https://insertunit.example");
        assert_eq!(
            build_url("index.php", &opts).unwrap(),
            "https://insertunit.example/index.php"
        );
        let opts = FetchOptions::new().base_url("https://insertunit.example/");
        assert_eq!(
            build_url("/index.php?imdb=tt1", &opts).unwrap(),
            "https://insertunit.example/index.php?imdb=tt1"
        );
    }

    #[test]
    fn rejects_non_http_urls() {
        assert!(matches!(
            build_url("index.php", &FetchOptions::new()),
            Err(FetchError::InvalidUrl(_))
        ));
        assert!(build_url("ftp://host/file", &FetchOptions::new()).is_err());
    }

    #[test]
    fn query_overrides_existing_keys() {
        let opts = FetchOptions::new().query("page", "2").query("q", "a b");
        let url = build_url("https://host/search?page=1&sort=new", &opts).unwrap();
        assert_eq!(url, "https://host/search?sort=new&page=2&q=a+b");
    }

    #[test]
    fn response_header_lookup_is_case_insensitive() {
        let response = FetchResponse {
            status: 200,
            headers: BTreeMap::from([("location".to_string(), "/next".to_string())]),
            final_url: "https://host/".into(),
            body: String::new(),
        };
        assert_eq!(response.header("Location"), Some("/next"));
    }

    #[tokio::test]
    async fn fetch_sends_headers_and_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/player"))
            .and(query_param("id", "42"))
            .and(header("referer", "https://embed.example/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"ok":true}"#))
            .mount(&server)
            .await;

        let fetcher = ReqwestFetcher::new().unwrap();
        let opts = FetchOptions::new()
            .base_url(server.uri())
            .query("id", "42")
            .header("referer", "https://embed.example/");
        let response = fetcher.fetch("/player", &opts).await.unwrap();

        assert_eq!(response.status, 200);
        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["ok"], true);
    }

    #[tokio::test]
    async fn fetch_maps_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = ReqwestFetcher::new().unwrap();
        let err = fetcher
            .fetch(&format!("{}/missing", server.uri()), &FetchOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn unavailable_fetcher_reports_missing_proxy() {
        let err = UnavailableFetcher
            .fetch("https://host/", &FetchOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::NoProxy));
    }
}
