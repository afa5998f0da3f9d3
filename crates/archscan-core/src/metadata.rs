//! Sidecar metadata merging.
//!
//! Quickstart directories often ship a `metadata.json` next to the template
//! with a display name and description. [`merge`] picks the human-facing
//! identity from it, falling back to the directory or repository name.

use serde_json::{Map, Value};

const NAME_KEYS: [&str; 3] = ["itemDisplayName", "title", "name"];
const DESCRIPTION_KEYS: [&str; 2] = ["description", "summary"];

/// Result of merging sidecar metadata with path-derived defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedMetadata {
    pub name: String,
    pub description: Option<String>,
    /// The sidecar object verbatim, or an empty object.
    pub raw: Map<String, Value>,
}

/// Merge optional sidecar metadata for a quickstart directory.
///
/// `repo` is the bare repository name (no owner); it names documents whose
/// template sits at the repository root and has no sidecar title.
pub fn merge(sidecar: Option<Map<String, Value>>, quickstart_dir: &str, repo: &str) -> MergedMetadata {
    let raw = sidecar.unwrap_or_default();

    let name = first_non_empty(&raw, &NAME_KEYS)
        .or_else(|| last_segment(quickstart_dir))
        .unwrap_or_else(|| repo.to_string());
    let description = first_non_empty(&raw, &DESCRIPTION_KEYS);

    MergedMetadata {
        name,
        description,
        raw,
    }
}

fn first_non_empty(meta: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| meta.get(*k).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn last_segment(dir: &str) -> Option<String> {
    dir.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
