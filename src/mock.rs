//! In-memory GitHub for testing.
//!
//! [`MockGitHub`] implements [`HttpClient`] against virtual repositories,
//! answering the contents API (directory listings, base64 file bodies, 404s)
//! and the code search API (derived from the stored files). Failures and
//! rate limits can be injected, and every request is recorded for
//! verification.
//!
//! ```rust
//! use archscan::mock::MockGitHub;
//!
//! let mock = MockGitHub::new()
//!     .with_file("Contoso/infra", "quickstarts/app/azuredeploy.json", r#"{"resources": []}"#)
//!     .with_file("Contoso/infra", "quickstarts/app/metadata.json", r#"{"title": "App"}"#);
//! assert!(mock.requests().is_empty());
//! ```

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Value};

use crate::error::HarvestResult;
use crate::github::{HttpClient, HttpResponse};

/// Captured request for verification.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub params: Vec<(String, String)>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Whether this was a code search call.
    pub fn is_search(&self) -> bool {
        self.url.contains("/search/code")
    }
}

#[derive(Default)]
struct MockState {
    /// `owner/repo` → path → body.
    repos: BTreeMap<String, BTreeMap<String, String>>,
    /// URL-path suffix → forced response.
    overrides: Vec<(String, HttpResponse)>,
    search_failure: Option<HttpResponse>,
    queued: VecDeque<HttpResponse>,
    requests: Vec<RecordedRequest>,
}

/// Mock GitHub API.
#[derive(Default)]
pub struct MockGitHub {
    state: Mutex<MockState>,
}

impl MockGitHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file to a repository. Parent directories exist implicitly.
    pub fn with_file(self, repo: &str, path: &str, body: &str) -> Self {
        self.add_file(repo, path, body);
        self
    }

    pub fn with_json(self, repo: &str, path: &str, body: &Value) -> Self {
        self.with_file(repo, path, &body.to_string())
    }

    pub fn add_file(&self, repo: &str, path: &str, body: &str) {
        let mut state = self.lock();
        state
            .repos
            .entry(repo.to_string())
            .or_default()
            .insert(path.trim_matches('/').to_string(), body.to_string());
    }

    /// Answer any request whose URL ends with `url_suffix` with `response`.
    pub fn with_response(self, url_suffix: &str, response: HttpResponse) -> Self {
        self.lock().overrides.push((url_suffix.to_string(), response));
        self
    }

    /// Fail every code search request with `response`.
    pub fn with_search_failure(self, response: HttpResponse) -> Self {
        self.lock().search_failure = Some(response);
        self
    }

    /// Answer the next `count` requests with a rate-limited 403 whose window
    /// resets at `reset_epoch_secs`.
    pub fn rate_limit_next(&self, count: usize, reset_epoch_secs: i64) {
        for _ in 0..count {
            self.queue_response(
                HttpResponse::new(403, r#"{"message":"API rate limit exceeded"}"#)
                    .with_header("x-ratelimit-remaining", "0")
                    .with_header("x-ratelimit-reset", reset_epoch_secs.to_string()),
            );
        }
    }

    /// Answer the next request, whatever its URL, with `response`.
    pub fn queue_response(&self, response: HttpResponse) {
        self.lock().queued.push_back(response);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    pub fn search_requests(&self) -> usize {
        self.lock().requests.iter().filter(|r| r.is_search()).count()
    }

    pub fn contents_requests(&self) -> usize {
        self.lock().requests.iter().filter(|r| !r.is_search()).count()
    }

    pub fn clear_requests(&self) {
        self.lock().requests.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl HttpClient for MockGitHub {
    async fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
        params: &[(String, String)],
    ) -> HarvestResult<HttpResponse> {
        let mut state = self.lock();
        let request = RecordedRequest {
            url: url.to_string(),
            headers: headers.to_vec(),
            params: params.to_vec(),
        };
        state.requests.push(request.clone());

        if let Some(resp) = state.queued.pop_front() {
            return Ok(resp);
        }
        if let Some((_, resp)) = state.overrides.iter().find(|(s, _)| url.ends_with(s.as_str())) {
            return Ok(resp.clone());
        }

        let path = url_path(url);
        if path.starts_with("/search/code") {
            if let Some(resp) = &state.search_failure {
                return Ok(resp.clone());
            }
            return Ok(search(&state.repos, &request));
        }
        if let Some(rest) = path.strip_prefix("/repos/") {
            return Ok(contents(&state.repos, rest));
        }
        Ok(not_found())
    }
}

fn url_path(url: &str) -> &str {
    let without_scheme = url.split_once("://").map(|(_, r)| r).unwrap_or(url);
    match without_scheme.find('/') {
        Some(i) => &without_scheme[i..],
        None => "/",
    }
}

fn not_found() -> HttpResponse {
    HttpResponse::new(
        404,
        r#"{"message":"Not Found","documentation_url":"https://docs.github.com/rest"}"#,
    )
}

/// `/repos/{owner}/{repo}/contents[/{path}]`
fn contents(repos: &BTreeMap<String, BTreeMap<String, String>>, rest: &str) -> HttpResponse {
    let mut parts = rest.splitn(4, '/');
    let (Some(owner), Some(repo), Some("contents")) = (parts.next(), parts.next(), parts.next())
    else {
        return not_found();
    };
    let path = parts.next().unwrap_or("").trim_matches('/');
    let Some(files) = repos.get(&format!("{}/{}", owner, repo)) else {
        return not_found();
    };

    if let Some(body) = files.get(path) {
        let name = path.rsplit('/').next().unwrap_or(path);
        return HttpResponse::new(200, file_body(name, path, body).to_string());
    }

    let prefix = if path.is_empty() {
        String::new()
    } else {
        format!("{}/", path)
    };
    let mut entries: BTreeMap<String, &'static str> = BTreeMap::new();
    for file in files.keys() {
        let Some(rel) = file.strip_prefix(&prefix) else {
            continue;
        };
        match rel.split_once('/') {
            Some((dir, _)) => {
                entries.insert(dir.to_string(), "dir");
            }
            None => {
                entries.insert(rel.to_string(), "file");
            }
        }
    }
    if entries.is_empty() {
        return not_found();
    }

    let listing: Vec<Value> = entries
        .into_iter()
        .map(|(name, kind)| {
            json!({
                "name": name,
                "path": format!("{}{}", prefix, name),
                "type": kind,
            })
        })
        .collect();
    HttpResponse::new(200, Value::Array(listing).to_string())
}

/// Contents API file object, with base64 wrapped at 60 columns like GitHub.
fn file_body(name: &str, path: &str, body: &str) -> Value {
    let encoded = STANDARD.encode(body.as_bytes());
    let wrapped = encoded
        .as_bytes()
        .chunks(60)
        .map(|c| String::from_utf8_lossy(c).into_owned())
        .collect::<Vec<_>>()
        .join("\n");
    json!({
        "type": "file",
        "name": name,
        "path": path,
        "encoding": "base64",
        "content": wrapped,
    })
}

/// `/search/code?q=repo:o/r filename:f [path:p]&page=&per_page=`
fn search(
    repos: &BTreeMap<String, BTreeMap<String, String>>,
    request: &RecordedRequest,
) -> HttpResponse {
    let query = request.param("q").unwrap_or("");
    let mut repo = None;
    let mut filename = None;
    let mut path_filter = None;
    for term in query.split_whitespace() {
        if let Some(v) = term.strip_prefix("repo:") {
            repo = Some(v);
        } else if let Some(v) = term.strip_prefix("filename:") {
            filename = Some(v);
        } else if let Some(v) = term.strip_prefix("path:") {
            path_filter = Some(v.trim_matches('/'));
        }
    }
    let page: usize = request.param("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let per_page: usize = request
        .param("per_page")
        .and_then(|p| p.parse().ok())
        .unwrap_or(30);

    let matches: BTreeSet<&String> = repo
        .and_then(|r| repos.get(r))
        .map(|files| {
            files
                .keys()
                .filter(|p| filename.is_none_or(|f| p.rsplit('/').next() == Some(f)))
                .filter(|p| {
                    path_filter.is_none_or(|dir| p.starts_with(&format!("{}/", dir)))
                })
                .collect()
        })
        .unwrap_or_default();

    let items: Vec<Value> = matches
        .iter()
        .skip(page.saturating_sub(1) * per_page)
        .take(per_page)
        .map(|p| {
            json!({
                "name": p.rsplit('/').next().unwrap_or(p),
                "path": p,
                "repository": { "full_name": repo.unwrap_or("") },
            })
        })
        .collect();

    HttpResponse::new(
        200,
        json!({
            "total_count": matches.len(),
            "incomplete_results": false,
            "items": items,
        })
        .to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(mock: &MockGitHub, url: &str, params: &[(&str, &str)]) -> HttpResponse {
        let params: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(mock.get(url, &[], &params))
            .unwrap()
    }

    #[test]
    fn test_directory_listing_mixes_files_and_dirs() {
        let mock = MockGitHub::new()
            .with_file("o/r", "qs/a/azuredeploy.json", "{}")
            .with_file("o/r", "qs/readme.md", "hi");
        let resp = get(&mock, "https://api.github.test/repos/o/r/contents/qs", &[]);
        let listing: Value = serde_json::from_str(&resp.body).unwrap();
        assert_eq!(listing[0]["name"], "a");
        assert_eq!(listing[0]["type"], "dir");
        assert_eq!(listing[1]["path"], "qs/readme.md");
        assert_eq!(listing[1]["type"], "file");
    }

    #[test]
    fn test_missing_path_is_404() {
        let mock = MockGitHub::new().with_file("o/r", "a.json", "{}");
        assert_eq!(get(&mock, "https://x/repos/o/r/contents/nope", &[]).status, 404);
        assert_eq!(get(&mock, "https://x/repos/o/other/contents", &[]).status, 404);
    }

    #[test]
    fn test_search_filters_by_filename_and_path() {
        let mock = MockGitHub::new()
            .with_file("o/r", "qs/a/main.bicep", "x")
            .with_file("o/r", "other/b/main.bicep", "x")
            .with_file("o/r", "qs/c/azuredeploy.json", "{}");
        let resp = get(
            &mock,
            "https://x/search/code",
            &[("q", "repo:o/r filename:main.bicep path:qs"), ("page", "1"), ("per_page", "50")],
        );
        let body: Value = serde_json::from_str(&resp.body).unwrap();
        assert_eq!(body["total_count"], 1);
        assert_eq!(body["items"][0]["path"], "qs/a/main.bicep");
    }
}
