//! ARM template structure extraction.
//!
//! Works on an already-parsed JSON object. Nothing here validates
//! expressions or resolves `dependsOn`; declared values are copied as-is.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::models::ResourceEntry;

/// Whether a JSON object looks like an ARM template rather than an unrelated
/// JSON file that happens to share a template filename.
///
/// Any one of `resources`, `parameters`, or `$schema` is enough.
pub fn looks_like_arm(doc: &Map<String, Value>) -> bool {
    doc.contains_key("resources") || doc.contains_key("parameters") || doc.contains_key("$schema")
}

/// Structural summary of an ARM template.
#[derive(Debug, Clone, PartialEq)]
pub struct ArmSummary {
    pub resources: Vec<ResourceEntry>,
    pub services: Vec<String>,
    pub parameter_keys: Vec<String>,
    pub output_keys: Vec<String>,
}

pub fn summarize(doc: &Map<String, Value>) -> ArmSummary {
    let resources = parse_resources(doc);
    let services = distinct_services(&resources);
    ArmSummary {
        resources,
        services,
        parameter_keys: parameter_keys(doc),
        output_keys: output_keys(doc),
    }
}

/// Extract the top-level `resources` array.
///
/// A missing or non-array `resources` yields an empty list. Elements that
/// are not objects are skipped. Each entry keeps `dependsOn` when declared;
/// a nested `resources` array becomes `children` with only the three base
/// fields and no further recursion.
pub fn parse_resources(doc: &Map<String, Value>) -> Vec<ResourceEntry> {
    let Some(Value::Array(items)) = doc.get("resources") else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(Value::as_object)
        .map(|resource| {
            let children = match resource.get("resources") {
                Some(Value::Array(nested)) => Some(
                    nested
                        .iter()
                        .filter_map(Value::as_object)
                        .map(base_entry)
                        .collect(),
                ),
                _ => None,
            };
            ResourceEntry {
                depends_on: resource.get("dependsOn").cloned(),
                children,
                ..base_entry(resource)
            }
        })
        .collect()
}

fn base_entry(resource: &Map<String, Value>) -> ResourceEntry {
    ResourceEntry {
        resource_type: string_field(resource, "type"),
        name: string_field(resource, "name"),
        api_version: string_field(resource, "apiVersion"),
        depends_on: None,
        children: None,
    }
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Sorted, de-duplicated resource types. Entries without a type (or with an
/// empty one) are ignored. Children are not counted.
pub fn distinct_services(resources: &[ResourceEntry]) -> Vec<String> {
    resources
        .iter()
        .filter_map(|r| r.resource_type.as_deref())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Declared parameter names in declaration order.
pub fn parameter_keys(doc: &Map<String, Value>) -> Vec<String> {
    object_keys(doc, "parameters")
}

/// Declared output names in declaration order.
pub fn output_keys(doc: &Map<String, Value>) -> Vec<String> {
    object_keys(doc, "outputs")
}

fn object_keys(doc: &Map<String, Value>, key: &str) -> Vec<String> {
    match doc.get(key) {
        Some(Value::Object(map)) => map.keys().cloned().collect(),
        _ => Vec::new(),
    }
}
