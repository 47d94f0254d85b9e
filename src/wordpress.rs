use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use reqwest::header::HOST;

use crate::formats::{LegacyRecord, MediaInfo, WpMedia, WpPost};
use crate::http;
use crate::retry::{RetryPolicy, with_retry};

#[async_trait]
pub trait LegacySource: Send + Sync {
    async fn check_connection(&self) -> anyhow::Result<()>;
    async fn record_count(&self) -> anyhow::Result<u64>;
    async fn list_records(&self, page_size: u32, offset: u32) -> anyhow::Result<Vec<LegacyRecord>>;
    async fn get_media(&self, media_id: u64) -> anyhow::Result<MediaInfo>;
    async fn fetch_binary(&self, url: &str) -> anyhow::Result<Vec<u8>>;
}

#[derive(Debug, Clone)]
pub struct WordPressOptions {
    /// REST base, e.g. `https://example.com/wp-json/wp/v2`.
    pub api_base: String,
    /// Virtual host to send when `api_base` addresses the server by IP.
    pub host_header: Option<String>,
    pub accept_invalid_certs: bool,
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone)]
pub struct WordPressClient {
    client: reqwest::Client,
    api_base: String,
    host_header: Option<String>,
    retry: RetryPolicy,
}

impl WordPressClient {
    pub fn new(options: WordPressOptions) -> anyhow::Result<Self> {
        let client = http::build_client(Duration::from_secs(60), options.accept_invalid_certs)
            .context("build WordPress http client")?;
        Ok(Self {
            client,
            api_base: options.api_base.trim_end_matches('/').to_owned(),
            host_header: options.host_header,
            retry: options.retry,
        })
    }

    fn posts_url(&self, per_page: u32, offset: u32) -> String {
        format!(
            "{}/posts?per_page={per_page}&offset={offset}",
            self.api_base
        )
    }

    /// Media URLs name the public host; when a `Host` override is configured
    /// they are sent to the API server instead, keeping path and query.
    fn route_via_api_host(&self, raw: &str) -> String {
        let Some(host) = self.host_header.as_deref() else {
            return raw.to_owned();
        };
        let (Ok(mut target), Ok(api)) = (url::Url::parse(raw), url::Url::parse(&self.api_base))
        else {
            return raw.to_owned();
        };
        if target.host_str() != Some(host) {
            return raw.to_owned();
        }
        if target.set_scheme(api.scheme()).is_err()
            || target.set_host(api.host_str()).is_err()
            || target.set_port(api.port()).is_err()
        {
            return raw.to_owned();
        }
        target.to_string()
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let request = self.client.get(url);
        match self.host_header.as_deref() {
            Some(host) => request.header(HOST, host),
            None => request,
        }
    }
}

#[async_trait]
impl LegacySource for WordPressClient {
    async fn check_connection(&self) -> anyhow::Result<()> {
        let url = self.posts_url(1, 0);
        let response = self
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;
        let status = response.status();
        let posts: Vec<serde_json::Value> = http::read_json(response, "WordPress posts probe")
            .await
            .context("WordPress connection test")?;
        tracing::info!(%status, posts = posts.len(), "WordPress connection ok");
        Ok(())
    }

    async fn record_count(&self) -> anyhow::Result<u64> {
        let url = self.posts_url(1, 0);
        let response = self
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;

        let total = response
            .headers()
            .get("x-wp-total")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());
        if let Some(total) = total {
            return Ok(total);
        }

        tracing::warn!("X-WP-Total header missing; counting returned posts");
        let posts: Vec<serde_json::Value> = http::read_json(response, "WordPress posts").await?;
        Ok(posts.len() as u64)
    }

    async fn list_records(&self, page_size: u32, offset: u32) -> anyhow::Result<Vec<LegacyRecord>> {
        let url = self.posts_url(page_size, offset);
        let posts: Vec<WpPost> = with_retry(&self.retry, "fetch WordPress posts", || async {
            let response = self
                .get(&url)
                .send()
                .await
                .with_context(|| format!("GET {url}"))?;
            http::read_json(response, "WordPress posts").await
        })
        .await?;
        Ok(posts.into_iter().map(LegacyRecord::from).collect())
    }

    async fn get_media(&self, media_id: u64) -> anyhow::Result<MediaInfo> {
        let url = format!("{}/media/{media_id}", self.api_base);
        let media: WpMedia = with_retry(&self.retry, "fetch WordPress media", || async {
            let response = self
                .get(&url)
                .send()
                .await
                .with_context(|| format!("GET {url}"))?;
            http::read_json(response, "WordPress media").await
        })
        .await?;
        Ok(MediaInfo::from(media))
    }

    async fn fetch_binary(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        let url = self.route_via_api_host(url);
        let url = url.as_str();
        with_retry(&self.retry, "fetch media binary", || async {
            let response = self
                .get(url)
                .send()
                .await
                .with_context(|| format!("GET {url}"))?;
            let status = response.status();
            if !status.is_success() {
                anyhow::bail!("media download failed ({status}): {url}");
            }
            let bytes = response
                .bytes()
                .await
                .with_context(|| format!("read media body: {url}"))?;
            Ok(bytes.to_vec())
        })
        .await
    }
}
