//! Core data models used throughout archscan.
//!
//! These types represent the sources, template hits, parsed resources, and
//! architecture documents that flow through the discovery pipeline.

use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A repository to scan, written as `owner/repo[:subdir]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    pub owner: String,
    pub repo: String,
    /// Root directory to restrict the search to. `None` means repo root.
    pub subdir: Option<String>,
}

impl SourceSpec {
    /// Parse `owner/repo[:subdir]`.
    ///
    /// The subdirectory is split off at the first `:`, the owner at the
    /// first `/`. Leading and trailing slashes on the subdirectory are
    /// dropped; an empty subdirectory means the repository root.
    pub fn parse(spec: &str) -> Result<Self> {
        let spec = spec.trim();
        let (repo_path, subdir) = match spec.split_once(':') {
            Some((repo_path, subdir)) => (repo_path, Some(subdir)),
            None => (spec, None),
        };

        let Some((owner, repo)) = repo_path.split_once('/') else {
            bail!("source '{}' must have the form owner/repo[:subdir]", spec);
        };
        let owner = owner.trim();
        let repo = repo.trim();
        if owner.is_empty() || repo.is_empty() {
            bail!("source '{}' has an empty owner or repo", spec);
        }
        if repo.contains('/') {
            bail!(
                "source '{}' has a nested repo name; use owner/repo:subdir",
                spec
            );
        }

        let subdir = subdir
            .map(|s| s.trim().trim_matches('/').to_string())
            .filter(|s| !s.is_empty());

        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            subdir,
        })
    }

    /// `owner/repo`, the form stored in [`ArchitectureDocument::repo`].
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    /// The subdirectory, or `""` for the repository root.
    pub fn root(&self) -> &str {
        self.subdir.as_deref().unwrap_or("")
    }
}

impl FromStr for SourceSpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.subdir {
            Some(subdir) => write!(f, "{}/{}:{}", self.owner, self.repo, subdir),
            None => write!(f, "{}/{}", self.owner, self.repo),
        }
    }
}

/// A file path believed to be a template, as produced by a locator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TemplateHit {
    pub path: String,
}

impl TemplateHit {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// The containing directory: every segment except the last.
    ///
    /// A hit at the repository root yields `""`.
    pub fn directory(&self) -> &str {
        match self.path.rsplit_once('/') {
            Some((dir, _)) => dir,
            None => "",
        }
    }

    /// The final path segment.
    pub fn file_name(&self) -> &str {
        match self.path.rsplit_once('/') {
            Some((_, name)) => name,
            None => &self.path,
        }
    }
}

/// One declared resource from an ARM template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceEntry {
    #[serde(rename = "type")]
    pub resource_type: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "apiVersion")]
    pub api_version: Option<String>,
    /// Declared dependency references, recorded verbatim.
    #[serde(rename = "dependsOn", skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<Value>,
    /// Nested resources, one level deep. Children never carry `dependsOn`
    /// or further children.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<ResourceEntry>>,
}

/// Template content accepted by the resolver.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateContent {
    /// A JSON object that passed the ARM shape check.
    Arm(Map<String, Value>),
    /// Raw Bicep source. Never compiled or parsed.
    Bicep(String),
}

impl TemplateContent {
    pub fn is_bicep(&self) -> bool {
        matches!(self, TemplateContent::Bicep(_))
    }
}

/// A template found in a quickstart directory.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTemplate {
    /// Candidate filename that matched, e.g. `azuredeploy.json`.
    pub filename: String,
    pub content: TemplateContent,
}

/// Human-browsable links for a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceUrls {
    pub dir_html: String,
    pub template_html: String,
}

/// The persisted unit: one template plus its derived metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchitectureDocument {
    pub name: String,
    pub description: Option<String>,
    /// `owner/repo`.
    pub repo: String,
    pub quickstart_dir: String,
    pub template_file: String,
    /// Sorted, distinct resource types.
    pub services: Vec<String>,
    /// Number of distinct types, i.e. `services.len()`.
    pub resource_count: usize,
    pub source_urls: SourceUrls,
    pub metadata: Map<String, Value>,
    pub arm_parameters_keys: Vec<String>,
    pub arm_outputs_keys: Vec<String>,
    /// Batch stamp shared by every document of one pipeline run.
    #[serde(default)]
    pub created_at: Option<String>,
}

impl ArchitectureDocument {
    pub fn natural_key(&self) -> NaturalKey {
        NaturalKey {
            repo: self.repo.clone(),
            quickstart_dir: self.quickstart_dir.clone(),
            template_file: self.template_file.clone(),
        }
    }
}

/// `(repo, quickstart_dir, template_file)`: unique across the store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NaturalKey {
    pub repo: String,
    pub quickstart_dir: String,
    pub template_file: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_source_with_subdir() {
        let spec = SourceSpec::parse("Azure/azure-quickstart-templates:quickstarts").unwrap();
        assert_eq!(spec.owner, "Azure");
        assert_eq!(spec.repo, "azure-quickstart-templates");
        assert_eq!(spec.subdir.as_deref(), Some("quickstarts"));
        assert_eq!(spec.full_name(), "Azure/azure-quickstart-templates");
    }

    #[test]
    fn test_parse_source_without_subdir() {
        let spec: SourceSpec = "Contoso/infra".parse().unwrap();
        assert_eq!(spec.subdir, None);
        assert_eq!(spec.root(), "");
        assert_eq!(spec.to_string(), "Contoso/infra");
    }

    #[test]
    fn test_parse_source_trims_subdir_slashes() {
        let spec = SourceSpec::parse("Contoso/infra:/quickstarts/arm/").unwrap();
        assert_eq!(spec.subdir.as_deref(), Some("quickstarts/arm"));

        let spec = SourceSpec::parse("Contoso/infra:/").unwrap();
        assert_eq!(spec.subdir, None);
    }

    #[test]
    fn test_parse_source_rejects_malformed() {
        assert!(SourceSpec::parse("no-slash").is_err());
        assert!(SourceSpec::parse("/repo").is_err());
        assert!(SourceSpec::parse("owner/").is_err());
        assert!(SourceSpec::parse("owner/repo/extra").is_err());
        assert!(SourceSpec::parse("").is_err());
    }

    #[test]
    fn test_hit_directory() {
        assert_eq!(TemplateHit::new("a/b/azuredeploy.json").directory(), "a/b");
        assert_eq!(TemplateHit::new("azuredeploy.json").directory(), "");
        assert_eq!(TemplateHit::new("a/b/main.bicep").file_name(), "main.bicep");
    }

    #[test]
    fn test_resource_entry_serializes_arm_field_names() {
        let entry = ResourceEntry {
            resource_type: Some("Microsoft.Web/sites".into()),
            name: Some("site".into()),
            api_version: Some("2022-03-01".into()),
            depends_on: None,
            children: None,
        };
        let v = serde_json::to_value(&entry).unwrap();
        assert_eq!(v["type"], "Microsoft.Web/sites");
        assert_eq!(v["apiVersion"], "2022-03-01");
        assert!(v.get("dependsOn").is_none());
        assert!(v.get("children").is_none());
    }
}
