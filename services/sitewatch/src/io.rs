//! HTTP client abstraction for testability

use std::time::Duration;

use async_trait::async_trait;

/// HTTP response from a request
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// Response text; left empty by [`HttpClient::get`], which only counts bytes
    pub body: String,
    /// Body length in bytes
    pub size: u64,
}

/// Per-client transport settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub connect_timeout: Option<Duration>,
    pub user_agent: String,
    pub accept_invalid_certs: bool,
}

/// Abstraction over HTTP client for dependency injection
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait HttpClient: Send + Sync {
    /// Send a GET request to the given URL, following redirects
    ///
    /// The body is streamed and counted, not kept.
    async fn get(&self, url: &str) -> crate::Result<HttpResponse>;

    /// Send a POST request with a JSON body
    async fn post_json(&self, url: &str, body: &serde_json::Value) -> crate::Result<HttpResponse>;
}

/// Production HTTP client using reqwest
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new(settings: &HttpSettings) -> crate::Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(settings.timeout)
            .user_agent(settings.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(10))
            .danger_accept_invalid_certs(settings.accept_invalid_certs);
        if let Some(connect_timeout) = settings.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }

        let client = builder
            .build()
            .map_err(|e| crate::SitewatchError::Http(format!("Building HTTP client: {}", e)))?;

        tracing::debug!(
            "Created HTTP client (timeout={:?}, connect_timeout={:?}, user_agent='{}')",
            settings.timeout,
            settings.connect_timeout,
            settings.user_agent
        );
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str) -> crate::Result<HttpResponse> {
        tracing::debug!("GET {}", url);
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| crate::SitewatchError::Http(format!("GET {} failed: {}", url, e)))?;

        let status = response.status().as_u16();
        let mut size = 0u64;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| crate::SitewatchError::Http(format!("Reading response body: {}", e)))?
        {
            size += chunk.len() as u64;
        }

        tracing::debug!("GET {} -> {} ({} bytes)", url, status, size);
        Ok(HttpResponse {
            status,
            body: String::new(),
            size,
        })
    }

    async fn post_json(&self, url: &str, body: &serde_json::Value) -> crate::Result<HttpResponse> {
        tracing::debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| crate::SitewatchError::Http(format!("POST {} failed: {}", url, e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| crate::SitewatchError::Http(format!("Reading response body: {}", e)))?;

        let size = body.len() as u64;
        tracing::debug!("POST {} -> {} ({} bytes)", url, status, size);
        Ok(HttpResponse { status, body, size })
    }
}
