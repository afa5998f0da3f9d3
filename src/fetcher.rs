//! Repository content retrieval.
//!
//! [`ContentFetcher::fetch`] wraps `GET /repos/{owner}/{repo}/contents/{path}`
//! and tells apart the three shapes the contents API returns:
//!
//! | Response | Result |
//! |----------|--------|
//! | JSON array | [`RepoContent::Directory`] |
//! | file object with base64 `content` | [`RepoContent::Json`] or [`RepoContent::Raw`] |
//! | any other object (symlink, submodule, oversized file) | [`RepoContent::Entry`] |
//! | 404 | `Ok(None)` |
//!
//! File bodies are base64 with embedded newlines. Invalid UTF-8 is replaced
//! rather than rejected.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{HarvestError, HarvestResult};
use crate::github::GitHubClient;

/// Kind of a directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    File,
    Dir,
    /// `symlink`, `submodule`, or anything newer.
    #[serde(other)]
    Other,
}

/// One item of a directory listing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DirEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
}

/// What lives at a repository path.
#[derive(Debug, Clone, PartialEq)]
pub enum RepoContent {
    Directory(Vec<DirEntry>),
    /// A file whose decoded body parsed as JSON.
    Json(Value),
    /// A file whose decoded body is not JSON.
    Raw(String),
    /// A non-directory object without inline content.
    Entry(Value),
}

pub struct ContentFetcher {
    github: Arc<GitHubClient>,
}

impl ContentFetcher {
    pub fn new(github: Arc<GitHubClient>) -> Self {
        Self { github }
    }

    pub fn github(&self) -> &GitHubClient {
        &self.github
    }

    /// Fetch the content at `path` (`""` for the repository root).
    pub async fn fetch(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> HarvestResult<Option<RepoContent>> {
        let url = contents_url(&self.github, owner, repo, path);
        let Some(value) = self.github.get_json(&url, &[]).await? else {
            return Ok(None);
        };
        interpret(&url, value).map(Some)
    }
}

fn contents_url(github: &GitHubClient, owner: &str, repo: &str, path: &str) -> String {
    let path = path.trim_matches('/');
    if path.is_empty() {
        github.api_url(&format!("/repos/{}/{}/contents", owner, repo))
    } else {
        github.api_url(&format!("/repos/{}/{}/contents/{}", owner, repo, path))
    }
}

fn interpret(url: &str, value: Value) -> HarvestResult<RepoContent> {
    if value.is_array() {
        let entries: Vec<DirEntry> =
            serde_json::from_value(value).map_err(|e| HarvestError::Decode {
                url: url.to_string(),
                message: format!("unexpected directory listing: {}", e),
            })?;
        return Ok(RepoContent::Directory(entries));
    }

    let encoded = value
        .get("encoding")
        .and_then(Value::as_str)
        .filter(|enc| *enc == "base64")
        .and_then(|_| value.get("content"))
        .and_then(Value::as_str);
    let Some(encoded) = encoded else {
        return Ok(RepoContent::Entry(value));
    };

    let text = decode_base64(encoded).map_err(|message| HarvestError::Decode {
        url: url.to_string(),
        message,
    })?;
    Ok(match serde_json::from_str::<Value>(&text) {
        Ok(json) => RepoContent::Json(json),
        Err(_) => RepoContent::Raw(text),
    })
}

/// Decode a contents API body: whitespace stripped, lossy UTF-8.
pub fn decode_base64(encoded: &str) -> Result<String, String> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| format!("invalid base64 content: {}", e))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
