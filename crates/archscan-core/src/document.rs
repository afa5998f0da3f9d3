//! Architecture document assembly.

use serde_json::{Map, Value};

use crate::arm;
use crate::metadata;
use crate::models::{ArchitectureDocument, ResolvedTemplate, SourceSpec, SourceUrls, TemplateContent};

/// Where browsable links point: the web host and the branch name used in
/// `tree/` and `blob/` URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkBase {
    pub html_url: String,
    pub branch: String,
}

impl Default for LinkBase {
    fn default() -> Self {
        Self {
            html_url: "https://github.com".to_string(),
            branch: "master".to_string(),
        }
    }
}

/// Build the `dir_html` / `template_html` pair for a template.
pub fn source_urls(
    links: &LinkBase,
    source: &SourceSpec,
    quickstart_dir: &str,
    template_file: &str,
) -> SourceUrls {
    let repo_base = format!(
        "{}/{}/{}",
        links.html_url.trim_end_matches('/'),
        source.owner,
        source.repo
    );
    if quickstart_dir.is_empty() {
        SourceUrls {
            dir_html: format!("{}/tree/{}", repo_base, links.branch),
            template_html: format!("{}/blob/{}/{}", repo_base, links.branch, template_file),
        }
    } else {
        let dir_html = format!("{}/tree/{}/{}", repo_base, links.branch, quickstart_dir);
        SourceUrls {
            template_html: format!("{}/{}", dir_html, template_file),
            dir_html,
        }
    }
}

/// Assemble the final document for one resolved template.
///
/// ARM content contributes services and parameter/output keys. Bicep stays
/// opaque: its lists are empty and the raw text lands in `metadata._raw`.
/// `created_at` is left unset; the pipeline stamps the whole batch.
pub fn build_document(
    source: &SourceSpec,
    quickstart_dir: &str,
    template: &ResolvedTemplate,
    sidecar: Option<Map<String, Value>>,
    links: &LinkBase,
) -> ArchitectureDocument {
    let merged = metadata::merge(sidecar, quickstart_dir, &source.repo);
    let mut meta = merged.raw;

    let (services, params, outputs) = match &template.content {
        TemplateContent::Arm(doc) => {
            let summary = arm::summarize(doc);
            (summary.services, summary.parameter_keys, summary.output_keys)
        }
        TemplateContent::Bicep(text) => {
            meta.insert("_raw".to_string(), Value::String(text.clone()));
            (Vec::new(), Vec::new(), Vec::new())
        }
    };

    ArchitectureDocument {
        name: merged.name,
        description: merged.description,
        repo: source.full_name(),
        quickstart_dir: quickstart_dir.to_string(),
        template_file: template.filename.clone(),
        resource_count: services.len(),
        services,
        source_urls: source_urls(links, source, quickstart_dir, &template.filename),
        metadata: meta,
        arm_parameters_keys: params,
        arm_outputs_keys: outputs,
        created_at: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn contoso() -> SourceSpec {
        SourceSpec::parse("Contoso/infra:quickstarts").unwrap()
    }

    fn arm_template(v: Value) -> ResolvedTemplate {
        ResolvedTemplate {
            filename: "azuredeploy.json".into(),
            content: TemplateContent::Arm(v.as_object().cloned().unwrap()),
        }
    }

    #[test]
    fn test_arm_document() {
        let template = arm_template(json!({
            "parameters": {"location": {}, "sku": {}},
            "outputs": {"id": {}},
            "resources": [
                {"type": "Microsoft.Web/sites"},
                {"type": "Microsoft.Web/serverfarms"},
                {"type": "Microsoft.Web/sites"}
            ]
        }));
        let sidecar = json!({"itemDisplayName": "Sample App", "description": "A web app"});
        let doc = build_document(
            &contoso(),
            "quickstarts/101-app",
            &template,
            sidecar.as_object().cloned(),
            &LinkBase::default(),
        );

        assert_eq!(doc.name, "Sample App");
        assert_eq!(doc.description.as_deref(), Some("A web app"));
        assert_eq!(doc.repo, "Contoso/infra");
        assert_eq!(doc.quickstart_dir, "quickstarts/101-app");
        assert_eq!(doc.template_file, "azuredeploy.json");
        assert_eq!(doc.resource_count, 2);
        assert_eq!(doc.services, vec!["Microsoft.Web/serverfarms", "Microsoft.Web/sites"]);
        assert_eq!(doc.arm_parameters_keys, vec!["location", "sku"]);
        assert_eq!(doc.arm_outputs_keys, vec!["id"]);
        assert_eq!(Value::Object(doc.metadata), sidecar);
        assert_eq!(doc.created_at, None);
    }

    #[test]
    fn test_bicep_document_is_opaque() {
        let template = ResolvedTemplate {
            filename: "main.bicep".into(),
            content: TemplateContent::Bicep("param location string\n".into()),
        };
        let doc = build_document(&contoso(), "quickstarts/bicep-app", &template, None, &LinkBase::default());

        assert!(doc.services.is_empty());
        assert_eq!(doc.resource_count, 0);
        assert!(doc.arm_parameters_keys.is_empty());
        assert!(doc.arm_outputs_keys.is_empty());
        assert_eq!(doc.metadata["_raw"], json!("param location string\n"));
        assert_eq!(doc.name, "bicep-app");
    }

    #[test]
    fn test_urls_in_directory() {
        let urls = source_urls(&LinkBase::default(), &contoso(), "quickstarts/101-app", "azuredeploy.json");
        assert_eq!(urls.dir_html, "https://github.com/Contoso/infra/tree/master/quickstarts/101-app");
        assert_eq!(
            urls.template_html,
            "https://github.com/Contoso/infra/tree/master/quickstarts/101-app/azuredeploy.json"
        );
    }

    #[test]
    fn test_urls_at_root() {
        let links = LinkBase {
            html_url: "https://github.example.com/".into(),
            branch: "main".into(),
        };
        let urls = source_urls(&links, &contoso(), "", "main.json");
        assert_eq!(urls.dir_html, "https://github.example.com/Contoso/infra/tree/main");
        assert_eq!(urls.template_html, "https://github.example.com/Contoso/infra/blob/main/main.json");
    }
}
