//! Configuration parsing and validation.
//!
//! archscan is configured via a TOML file (default `config/archscan.toml`).
//! Every section has defaults, so an empty file is a valid configuration
//! that scans the public Azure quickstart repository without persistence.
//!
//! ```toml
//! [github]
//! token = "ghp_..."            # enables code search
//! force_walk = false
//!
//! [scrape]
//! sources = ["Azure/azure-quickstart-templates:quickstarts"]
//! default_limit = 25
//!
//! [db]
//! path = "./data/archscan.sqlite"
//!
//! [server]
//! bind = "127.0.0.1:8000"
//! ```
//!
//! # Environment Overrides
//!
//! Applied after the file is parsed:
//! - `GITHUB_TOKEN`: API token
//! - `GITHUB_SOURCES`: comma-separated `owner/repo[:subdir]` list
//! - `FORCE_CONTENTS_WALK`: `1`, `true`, or `yes` disables code search
//! - `ARCHSCAN_DB_PATH`: SQLite database path

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use archscan_core::document::LinkBase;
use archscan_core::models::SourceSpec;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default)]
    pub templates: TemplatesConfig,
    #[serde(default)]
    pub scrape: ScrapeConfig,
    /// Absent means no persistence.
    #[serde(default)]
    pub db: Option<DbConfig>,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GithubConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_html_url")]
    pub html_url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub force_walk: bool,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_search_per_page")]
    pub search_per_page: usize,
    #[serde(default = "default_search_max_pages")]
    pub search_max_pages: usize,
    #[serde(default = "default_branch")]
    pub default_branch: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            html_url: default_html_url(),
            token: None,
            force_walk: false,
            user_agent: default_user_agent(),
            api_version: default_api_version(),
            timeout_secs: default_timeout_secs(),
            search_per_page: default_search_per_page(),
            search_max_pages: default_search_max_pages(),
            default_branch: default_branch(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}
fn default_html_url() -> String {
    "https://github.com".to_string()
}
fn default_user_agent() -> String {
    format!("archscan/{}", env!("CARGO_PKG_VERSION"))
}
fn default_api_version() -> String {
    "2022-11-28".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_search_per_page() -> usize {
    50
}
fn default_search_max_pages() -> usize {
    10
}
fn default_branch() -> String {
    "master".to_string()
}

impl GithubConfig {
    /// A non-blank token, if any.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    /// Code search needs an authenticated caller and must not be disabled.
    pub fn search_enabled(&self) -> bool {
        self.token().is_some() && !self.force_walk
    }

    pub fn link_base(&self) -> LinkBase {
        LinkBase {
            html_url: self.html_url.clone(),
            branch: self.default_branch.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TemplatesConfig {
    /// ARM filenames in resolution priority order.
    #[serde(default = "default_arm_candidates")]
    pub arm_candidates: Vec<String>,
    /// Bicep filenames in resolution priority order.
    #[serde(default = "default_bicep_candidates")]
    pub bicep_candidates: Vec<String>,
    #[serde(default = "default_metadata_file")]
    pub metadata_file: String,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            arm_candidates: default_arm_candidates(),
            bicep_candidates: default_bicep_candidates(),
            metadata_file: default_metadata_file(),
        }
    }
}

fn default_arm_candidates() -> Vec<String> {
    vec![
        "azuredeploy.json".to_string(),
        "main.json".to_string(),
        "template.json".to_string(),
    ]
}
fn default_bicep_candidates() -> Vec<String> {
    vec![
        "main.bicep".to_string(),
        "azuredeploy.bicep".to_string(),
        "template.bicep".to_string(),
    ]
}
fn default_metadata_file() -> String {
    "metadata.json".to_string()
}

impl TemplatesConfig {
    /// Every known template filename, ARM first.
    pub fn all_candidates(&self) -> Vec<String> {
        self.arm_candidates
            .iter()
            .chain(self.bicep_candidates.iter())
            .cloned()
            .collect()
    }

    pub fn is_candidate(&self, file_name: &str) -> bool {
        self.arm_candidates
            .iter()
            .chain(self.bicep_candidates.iter())
            .any(|c| c == file_name)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScrapeConfig {
    #[serde(default = "default_sources")]
    pub sources: Vec<String>,
    #[serde(default = "default_limit")]
    pub default_limit: usize,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            default_limit: default_limit(),
        }
    }
}

fn default_sources() -> Vec<String> {
    vec!["Azure/azure-quickstart-templates:quickstarts".to_string()]
}
fn default_limit() -> usize {
    25
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

impl Config {
    /// Defaults plus environment overrides, for commands that run without a
    /// config file.
    pub fn minimal() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Apply `GITHUB_TOKEN`, `GITHUB_SOURCES`, `FORCE_CONTENTS_WALK`, and
    /// `ARCHSCAN_DB_PATH` from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup("GITHUB_TOKEN").filter(|t| !t.trim().is_empty()) {
            self.github.token = Some(token.trim().to_string());
        }
        if let Some(sources) = lookup("GITHUB_SOURCES") {
            let parsed: Vec<String> = sources
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            if !parsed.is_empty() {
                self.scrape.sources = parsed;
            }
        }
        if let Some(flag) = lookup("FORCE_CONTENTS_WALK") {
            if matches!(flag.trim().to_lowercase().as_str(), "1" | "true" | "yes") {
                self.github.force_walk = true;
            }
        }
        if let Some(path) = lookup("ARCHSCAN_DB_PATH").filter(|p| !p.trim().is_empty()) {
            self.db = Some(DbConfig {
                path: PathBuf::from(path.trim()),
            });
        }
    }

    /// Validate cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if self.templates.arm_candidates.is_empty() && self.templates.bicep_candidates.is_empty() {
            bail!("templates: at least one ARM or Bicep candidate filename is required");
        }
        if self.templates.metadata_file.trim().is_empty() {
            bail!("templates.metadata_file must not be empty");
        }
        if self.scrape.default_limit == 0 {
            bail!("scrape.default_limit must be >= 1");
        }
        if self.github.search_per_page == 0 || self.github.search_per_page > 100 {
            bail!("github.search_per_page must be in [1, 100]");
        }
        if self.github.search_max_pages == 0 {
            bail!("github.search_max_pages must be >= 1");
        }
        for source in &self.scrape.sources {
            SourceSpec::parse(source).with_context(|| "Invalid entry in scrape.sources")?;
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.apply_env_overrides();
    config.validate()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert_eq!(config.github.search_max_pages, 10);
        assert_eq!(config.templates.arm_candidates[0], "azuredeploy.json");
        assert_eq!(config.templates.bicep_candidates.len(), 3);
        assert_eq!(config.templates.metadata_file, "metadata.json");
        assert!(config.db.is_none());
        assert!(!config.github.search_enabled());
        config.validate().unwrap();
    }

    #[test]
    fn test_search_enabled_requires_token_and_no_force() {
        let mut gh = GithubConfig {
            token: Some("  ".into()),
            ..Default::default()
        };
        assert!(!gh.search_enabled());
        gh.token = Some("ghp_abc".into());
        assert!(gh.search_enabled());
        gh.force_walk = true;
        assert!(!gh.search_enabled());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("GITHUB_TOKEN", " ghp_env "),
            ("GITHUB_SOURCES", "A/one:qs, B/two ,,"),
            ("FORCE_CONTENTS_WALK", "Yes"),
            ("ARCHSCAN_DB_PATH", "/tmp/a.sqlite"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.github.token(), Some("ghp_env"));
        assert_eq!(config.scrape.sources, vec!["A/one:qs", "B/two"]);
        assert!(config.github.force_walk);
        assert_eq!(
            config.db.unwrap().path,
            PathBuf::from("/tmp/a.sqlite")
        );
    }

    #[test]
    fn test_empty_sources_env_keeps_file_sources() {
        let mut config = Config::default();
        config.apply_overrides(|k| (k == "GITHUB_SOURCES").then(|| " , ".to_string()));
        assert_eq!(config.scrape.sources, default_sources());
    }

    #[test]
    fn test_validate_rejects_bad_source() {
        let mut config = Config::default();
        config.scrape.sources = vec!["not-a-source".into()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_limit() {
        let mut config = Config::default();
        config.scrape.default_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_candidate_lookup() {
        let templates = TemplatesConfig::default();
        assert!(templates.is_candidate("main.bicep"));
        assert!(templates.is_candidate("template.json"));
        assert!(!templates.is_candidate("metadata.json"));
        assert_eq!(templates.all_candidates().len(), 6);
    }

    #[test]
    fn test_load_config_from_file() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            tmp.path(),
            r#"
[github]
default_branch = "main"

[scrape]
sources = ["Contoso/infra:quickstarts"]
default_limit = 5

[server]
bind = "0.0.0.0:9000"
"#,
        )
        .unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.github.default_branch, "main");
        assert_eq!(config.scrape.default_limit, 5);
        assert_eq!(config.server.bind, "0.0.0.0:9000");
    }
}
