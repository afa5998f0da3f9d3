//! Picks the template inside a quickstart directory.
//!
//! ARM candidates are tried first, in configured order, and the first JSON
//! object with an ARM shape wins. Bicep candidates follow; the first one
//! that fetches as plain text wins. Every candidate yields an explicit
//! [`CandidateOutcome`], so the reason a file was passed over shows up in
//! the debug log instead of being swallowed.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use archscan_core::arm::looks_like_arm;
use archscan_core::models::{ResolvedTemplate, TemplateContent};

use crate::config::TemplatesConfig;
use crate::error::{HarvestError, HarvestResult};
use crate::fetcher::{ContentFetcher, RepoContent};

/// Why a candidate file was not accepted.
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    /// ARM candidate parsed as JSON but not as an object.
    NotAnObject,
    /// Object without `resources`, `parameters`, or `$schema`.
    NotArmShaped,
    /// ARM candidate is not valid JSON.
    NotJson,
    /// Bicep candidate parsed as JSON.
    UnexpectedJson,
    /// The path is a directory.
    Directory,
    /// Symlink, submodule, or a file served without inline content.
    NoInlineContent,
    /// Body could not be decoded.
    Undecodable(String),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::NotAnObject => write!(f, "not a JSON object"),
            RejectReason::NotArmShaped => write!(f, "lacks resources, parameters and $schema"),
            RejectReason::NotJson => write!(f, "not valid JSON"),
            RejectReason::UnexpectedJson => write!(f, "JSON where Bicep text was expected"),
            RejectReason::Directory => write!(f, "is a directory"),
            RejectReason::NoInlineContent => write!(f, "no inline content"),
            RejectReason::Undecodable(msg) => write!(f, "undecodable: {}", msg),
        }
    }
}

/// Result of trying one candidate filename.
#[derive(Debug, Clone, PartialEq)]
pub enum CandidateOutcome {
    Accepted(ResolvedTemplate),
    Missing,
    Rejected(RejectReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Arm,
    Bicep,
}

pub struct TemplateResolver {
    fetcher: Arc<ContentFetcher>,
    templates: TemplatesConfig,
}

impl TemplateResolver {
    pub fn new(fetcher: Arc<ContentFetcher>, templates: &TemplatesConfig) -> Self {
        Self {
            fetcher,
            templates: templates.clone(),
        }
    }

    /// First acceptable template in `dir`, or `None` when no candidate fits.
    pub async fn resolve(
        &self,
        owner: &str,
        repo: &str,
        dir: &str,
    ) -> HarvestResult<Option<ResolvedTemplate>> {
        let candidates = self
            .templates
            .arm_candidates
            .iter()
            .map(|c| (c, Format::Arm))
            .chain(self.templates.bicep_candidates.iter().map(|c| (c, Format::Bicep)));

        for (filename, format) in candidates {
            match self.try_candidate(owner, repo, dir, filename, format).await? {
                CandidateOutcome::Accepted(template) => return Ok(Some(template)),
                CandidateOutcome::Missing => {}
                CandidateOutcome::Rejected(reason) => {
                    debug!(
                        repo = %format_args!("{}/{}", owner, repo),
                        path = %join(dir, filename),
                        %reason,
                        "candidate rejected"
                    );
                }
            }
        }
        Ok(None)
    }

    async fn try_candidate(
        &self,
        owner: &str,
        repo: &str,
        dir: &str,
        filename: &str,
        format: Format,
    ) -> HarvestResult<CandidateOutcome> {
        let content = match self.fetcher.fetch(owner, repo, &join(dir, filename)).await {
            Ok(Some(content)) => content,
            Ok(None) => return Ok(CandidateOutcome::Missing),
            Err(HarvestError::Decode { message, .. }) => {
                return Ok(CandidateOutcome::Rejected(RejectReason::Undecodable(message)))
            }
            Err(e) => return Err(e),
        };
        Ok(judge(filename, format, content))
    }

    /// The sidecar metadata object next to a template, when it is one.
    pub async fn fetch_sidecar(
        &self,
        owner: &str,
        repo: &str,
        dir: &str,
    ) -> HarvestResult<Option<Map<String, Value>>> {
        let path = join(dir, &self.templates.metadata_file);
        match self.fetcher.fetch(owner, repo, &path).await {
            Ok(Some(RepoContent::Json(Value::Object(map)))) => Ok(Some(map)),
            Ok(_) => Ok(None),
            Err(HarvestError::Decode { message, .. }) => {
                debug!(%path, %message, "ignoring undecodable sidecar");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

fn judge(filename: &str, format: Format, content: RepoContent) -> CandidateOutcome {
    let accepted = |content: TemplateContent| {
        CandidateOutcome::Accepted(ResolvedTemplate {
            filename: filename.to_string(),
            content,
        })
    };
    match (format, content) {
        (_, RepoContent::Directory(_)) => CandidateOutcome::Rejected(RejectReason::Directory),
        (_, RepoContent::Entry(_)) => CandidateOutcome::Rejected(RejectReason::NoInlineContent),
        (Format::Arm, RepoContent::Json(Value::Object(map))) => {
            if looks_like_arm(&map) {
                accepted(TemplateContent::Arm(map))
            } else {
                CandidateOutcome::Rejected(RejectReason::NotArmShaped)
            }
        }
        (Format::Arm, RepoContent::Json(_)) => CandidateOutcome::Rejected(RejectReason::NotAnObject),
        (Format::Arm, RepoContent::Raw(_)) => CandidateOutcome::Rejected(RejectReason::NotJson),
        (Format::Bicep, RepoContent::Raw(text)) => accepted(TemplateContent::Bicep(text)),
        (Format::Bicep, RepoContent::Json(_)) => {
            CandidateOutcome::Rejected(RejectReason::UnexpectedJson)
        }
    }
}

fn join(dir: &str, filename: &str) -> String {
    if dir.is_empty() {
        filename.to_string()
    } else {
        format!("{}/{}", dir, filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GithubConfig;
    use crate::github::{GitHubClient, HttpResponse};
    use crate::mock::MockGitHub;
    use serde_json::json;

    fn resolver(mock: MockGitHub) -> TemplateResolver {
        let client = GitHubClient::new(Arc::new(mock), &GithubConfig::default());
        let fetcher = Arc::new(ContentFetcher::new(Arc::new(client)));
        TemplateResolver::new(fetcher, &TemplatesConfig::default())
    }

    #[tokio::test]
    async fn test_prefers_first_arm_candidate() {
        let r = resolver(
            MockGitHub::new()
                .with_file("o/r", "qs/azuredeploy.json", r#"{"$schema": "s", "resources": []}"#)
                .with_file("o/r", "qs/main.json", r#"{"resources": []}"#)
                .with_file("o/r", "qs/main.bicep", "resource x"),
        );
        let t = r.resolve("o", "r", "qs").await.unwrap().unwrap();
        assert_eq!(t.filename, "azuredeploy.json");
        assert!(!t.content.is_bicep());
    }

    #[tokio::test]
    async fn test_skips_json_without_arm_shape() {
        let r = resolver(
            MockGitHub::new()
                .with_file("o/r", "qs/azuredeploy.json", r#"{"foo": 1}"#)
                .with_file("o/r", "qs/template.json", r#"{"parameters": {}}"#),
        );
        let t = r.resolve("o", "r", "qs").await.unwrap().unwrap();
        assert_eq!(t.filename, "template.json");
    }

    #[tokio::test]
    async fn test_falls_back_to_bicep() {
        let r = resolver(
            MockGitHub::new()
                .with_file("o/r", "qs/azuredeploy.json", "[1, 2]")
                .with_file("o/r", "qs/azuredeploy.bicep", "param location string"),
        );
        let t = r.resolve("o", "r", "qs").await.unwrap().unwrap();
        assert_eq!(t.filename, "azuredeploy.bicep");
        assert_eq!(t.content, TemplateContent::Bicep("param location string".into()));
    }

    #[tokio::test]
    async fn test_nothing_acceptable_is_none() {
        let r = resolver(
            MockGitHub::new()
                .with_file("o/r", "qs/main.bicep", "{}")
                .with_file("o/r", "qs/readme.md", "x"),
        );
        assert_eq!(r.resolve("o", "r", "qs").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_root_directory_candidates() {
        let r = resolver(MockGitHub::new().with_file("o/r", "main.json", r#"{"resources": []}"#));
        let t = r.resolve("o", "r", "").await.unwrap().unwrap();
        assert_eq!(t.filename, "main.json");
    }

    #[tokio::test]
    async fn test_undecodable_candidate_is_rejected_not_fatal() {
        let r = resolver(
            MockGitHub::new()
                .with_response(
                    "/contents/qs/azuredeploy.json",
                    HttpResponse::new(200, r#"{"type":"file","encoding":"base64","content":"%%%"}"#),
                )
                .with_file("o/r", "qs/main.json", r#"{"resources": []}"#),
        );
        let t = r.resolve("o", "r", "qs").await.unwrap().unwrap();
        assert_eq!(t.filename, "main.json");
    }

    #[tokio::test]
    async fn test_remote_error_propagates() {
        let r = resolver(MockGitHub::new().with_response(
            "/contents/qs/azuredeploy.json",
            HttpResponse::new(503, "unavailable"),
        ));
        assert!(r.resolve("o", "r", "qs").await.is_err());
    }

    #[test]
    fn test_judge_outcomes() {
        assert_eq!(
            judge("main.json", Format::Arm, RepoContent::Json(json!("str"))),
            CandidateOutcome::Rejected(RejectReason::NotAnObject)
        );
        assert_eq!(
            judge("main.json", Format::Arm, RepoContent::Directory(vec![])),
            CandidateOutcome::Rejected(RejectReason::Directory)
        );
        assert_eq!(
            judge("main.bicep", Format::Bicep, RepoContent::Json(json!({}))),
            CandidateOutcome::Rejected(RejectReason::UnexpectedJson)
        );
        assert_eq!(
            judge("main.json", Format::Arm, RepoContent::Raw("x".into())),
            CandidateOutcome::Rejected(RejectReason::NotJson)
        );
    }

    #[tokio::test]
    async fn test_sidecar_only_when_object() {
        let r = resolver(
            MockGitHub::new()
                .with_json("o/r", "a/metadata.json", &json!({"title": "A"}))
                .with_file("o/r", "b/metadata.json", "[]")
                .with_file("o/r", "c/metadata.json", "title: C"),
        );
        let a = r.fetch_sidecar("o", "r", "a").await.unwrap().unwrap();
        assert_eq!(a["title"], "A");
        assert_eq!(r.fetch_sidecar("o", "r", "b").await.unwrap(), None);
        assert_eq!(r.fetch_sidecar("o", "r", "c").await.unwrap(), None);
        assert_eq!(r.fetch_sidecar("o", "r", "missing").await.unwrap(), None);
    }
}
