use crate::config::{MirrorConfig, DEFAULT_MAX_REDIRECTS, DEFAULT_TIMEOUT_MS, DEFAULT_USER_AGENT};
use crate::error::Result;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, ORIGIN, REFERER};
use reqwest::{redirect, Client, ClientBuilder, StatusCode};
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
pub const ACCEPT_CSS: &str = "text/css,*/*;q=0.1";
pub const ACCEPT_ANY: &str = "*/*";

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub user_agent: String,
    pub timeout: Duration,
    pub max_redirects: usize,
    /// Sent as both `Referer` and `Origin` to get past hotlink protection.
    pub referer: Option<Url>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            referer: None,
        }
    }
}

impl HttpConfig {
    pub fn from_mirror_config(config: &MirrorConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            timeout: config.timeout(),
            max_redirects: config.max_redirects,
            referer: None,
        }
    }

    pub fn with_referer(mut self, referer: Url) -> Self {
        self.referer = Some(referer);
        self
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub final_url: Url,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Thin wrapper over `reqwest::Client` with the mirror's header policy.
///
/// Non-2xx responses are returned as values; only transport failures are errors.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    config: HttpConfig,
}

impl HttpClient {
    pub fn new(config: HttpConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(referer) = &config.referer {
            if let Ok(value) = HeaderValue::from_str(referer.as_str()) {
                headers.insert(REFERER, value);
            }
            let origin = referer.origin().ascii_serialization();
            if let Ok(value) = HeaderValue::from_str(&origin) {
                headers.insert(ORIGIN, value);
            }
        }

        let client = ClientBuilder::new()
            .use_rustls_tls()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .redirect(redirect::Policy::limited(config.max_redirects))
            .default_headers(headers)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()?;

        Ok(Self { client, config })
    }

    pub fn with_referer(&self, referer: Url) -> Result<Self> {
        Self::new(self.config.clone().with_referer(referer))
    }

    pub async fn get(&self, url: &Url, accept: &str) -> std::result::Result<HttpResponse, reqwest::Error> {
        debug!(%url, "GET");
        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, accept)
            .send()
            .await?;

        let status = response.status();
        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response.bytes().await?.to_vec();

        Ok(HttpResponse {
            status,
            final_url,
            content_type,
            body,
        })
    }
}
