//! GitHub REST access.
//!
//! The transport is the [`HttpClient`] capability, a bare
//! `GET(url, headers, params) -> status, headers, body`. [`ReqwestClient`]
//! implements it over `reqwest`; [`crate::mock::MockGitHub`] implements it
//! in memory for tests.
//!
//! [`GitHubClient`] layers the API conventions on top: standard headers,
//! bearer auth, rate-limit back-off, and status classification.
//!
//! # Rate limits
//!
//! A 403 or 429 counts as a rate limit when `x-ratelimit-remaining` is `0`
//! or the body mentions "rate limit". The client sleeps until the window
//! resets (`retry-after`, else `x-ratelimit-reset` plus one second) and
//! retries exactly once. A second rate-limited response, or one without any
//! reset information, becomes [`HarvestError::RemoteApi`].

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::GithubConfig;
use crate::error::{truncate_body, HarvestError, HarvestResult};

/// A raw HTTP response. Header names are lowercase.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_lowercase(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The GET capability the pipeline consumes.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
        params: &[(String, String)],
    ) -> HarvestResult<HttpResponse>;
}

/// [`HttpClient`] over `reqwest`.
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    pub fn new(timeout: Duration) -> HarvestResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HarvestError::Transport {
                url: String::new(),
                message: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
        params: &[(String, String)],
    ) -> HarvestResult<HttpResponse> {
        let mut req = self.client.get(url).query(params);
        for (name, value) in headers {
            req = req.header(name.as_str(), value.as_str());
        }

        let resp = req.send().await.map_err(|e| HarvestError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(k, v)| {
                v.to_str()
                    .ok()
                    .map(|v| (k.as_str().to_lowercase(), v.to_string()))
            })
            .collect();
        let body = resp.text().await.map_err(|e| HarvestError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// GitHub API client: headers, auth, rate limits, status handling.
pub struct GitHubClient {
    http: Arc<dyn HttpClient>,
    config: GithubConfig,
}

impl GitHubClient {
    pub fn new(http: Arc<dyn HttpClient>, config: &GithubConfig) -> Self {
        Self {
            http,
            config: config.clone(),
        }
    }

    /// Client over a real `reqwest` transport.
    pub fn from_config(config: &GithubConfig) -> HarvestResult<Self> {
        let http = ReqwestClient::new(Duration::from_secs(config.timeout_secs))?;
        Ok(Self::new(Arc::new(http), config))
    }

    pub fn config(&self) -> &GithubConfig {
        &self.config
    }

    /// Absolute API URL for a path such as `/search/code`.
    pub fn api_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.api_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![
            (
                "Accept".to_string(),
                "application/vnd.github+json".to_string(),
            ),
            (
                "X-GitHub-Api-Version".to_string(),
                self.config.api_version.clone(),
            ),
            ("User-Agent".to_string(), self.config.user_agent.clone()),
        ];
        if let Some(token) = self.config.token() {
            headers.push(("Authorization".to_string(), format!("Bearer {}", token)));
        }
        headers
    }

    /// GET with rate-limit handling.
    ///
    /// Returns the response for any 2xx status and for 404, which callers
    /// interpret as "nothing here". Every other status is an error.
    pub async fn get(&self, url: &str, params: &[(String, String)]) -> HarvestResult<HttpResponse> {
        let headers = self.headers();
        let resp = self.http.get(url, &headers, params).await?;

        let resp = match rate_limit_wait(&resp, chrono::Utc::now().timestamp()) {
            Some(wait) => {
                warn!(
                    url,
                    wait_secs = wait.as_secs(),
                    "GitHub rate limit reached; waiting for reset"
                );
                tokio::time::sleep(wait).await;
                let retried = self.http.get(url, &headers, params).await?;
                if is_rate_limited(&retried) {
                    return Err(HarvestError::RemoteApi {
                        url: url.to_string(),
                        status: retried.status,
                        body: format!(
                            "rate limit still exhausted after retry: {}",
                            truncate_body(&retried.body)
                        ),
                    });
                }
                retried
            }
            None => resp,
        };

        classify(url, resp)
    }

    /// GET and parse JSON. `Ok(None)` on 404.
    pub async fn get_json(
        &self,
        url: &str,
        params: &[(String, String)],
    ) -> HarvestResult<Option<Value>> {
        let resp = self.get(url, params).await?;
        if resp.status == 404 {
            debug!(url, "not found");
            return Ok(None);
        }
        serde_json::from_str(&resp.body)
            .map(Some)
            .map_err(|e| HarvestError::Decode {
                url: url.to_string(),
                message: e.to_string(),
            })
    }
}

fn classify(url: &str, resp: HttpResponse) -> HarvestResult<HttpResponse> {
    if resp.is_success() || resp.status == 404 {
        return Ok(resp);
    }
    if is_rate_limited(&resp) {
        return Err(HarvestError::RemoteApi {
            url: url.to_string(),
            status: resp.status,
            body: format!(
                "rate limited without reset information: {}",
                truncate_body(&resp.body)
            ),
        });
    }
    if resp.status == 401 || resp.status == 403 {
        return Err(HarvestError::Unauthorized {
            url: url.to_string(),
            status: resp.status,
            headers: format!("{:?}", resp.headers),
            body: truncate_body(&resp.body),
        });
    }
    Err(HarvestError::RemoteApi {
        url: url.to_string(),
        status: resp.status,
        body: truncate_body(&resp.body),
    })
}

/// Whether a response reports quota exhaustion.
pub fn is_rate_limited(resp: &HttpResponse) -> bool {
    if resp.status != 403 && resp.status != 429 {
        return false;
    }
    resp.header("x-ratelimit-remaining") == Some("0")
        || resp.body.to_lowercase().contains("rate limit")
}

/// How long to wait before retrying a rate-limited response, if it is one
/// and it says when the window resets.
pub fn rate_limit_wait(resp: &HttpResponse, now_epoch_secs: i64) -> Option<Duration> {
    if !is_rate_limited(resp) {
        return None;
    }
    if let Some(secs) = resp
        .header("retry-after")
        .and_then(|v| v.trim().parse::<u64>().ok())
    {
        return Some(Duration::from_secs(secs));
    }
    let reset = resp
        .header("x-ratelimit-reset")
        .and_then(|v| v.trim().parse::<i64>().ok())?;
    let wait = (reset - now_epoch_secs).max(0) + 1;
    Some(Duration::from_secs(wait as u64))
}
