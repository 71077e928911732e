//! Document loading.
//!
//! Documents are YAML (JSON is accepted as a subset). Parsing yields the
//! untyped tree, variables are interpolated into it, and only then is it
//! decoded.

use archit_core::config::ArchitectureConfig;
use std::path::Path;
use tracing::{debug, info};

use crate::decode::{Tree, decode_architecture};
use crate::{ConfigResult, VariableContext};

/// Parse document text into an interpolated tree.
pub fn parse_document(text: &str, vars: &VariableContext) -> ConfigResult<Tree> {
    let mut tree: Tree = serde_yaml::from_str(text)?;
    vars.interpolate_tree(&mut tree)?;
    Ok(tree)
}

/// Read and parse a document from disk.
pub fn load_document(path: &Path, vars: &VariableContext) -> ConfigResult<Tree> {
    debug!(path = %path.display(), "Reading architecture document");
    let text = std::fs::read_to_string(path)?;
    parse_document(&text, vars)
}

/// Read, parse and decode a document from disk.
pub fn load_architecture(path: &Path, vars: &VariableContext) -> ConfigResult<ArchitectureConfig> {
    let tree = load_document(path, vars)?;
    let config = decode_architecture(&tree)?;

    info!(
        path = %path.display(),
        services = config.services.services.len(),
        site = config.site.is_some(),
        "Loaded architecture document"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConfigError, VariableContextBuilder};

    const DOCUMENT: &str = r#"
site:
  pipeline:
    repo:
      kind: External
      name: web
      owner: ${env.GITHUB_OWNER}
      credentialRef: github-token
network:
  namespace: svc
  availabilityZoneCount: 2
services:
  - id: orders
    db:
      kind: ManagedServerless
      pipeline:
        repo: { kind: Hosted, name: orders-db }
    app:
      kind: ManagedContainer
      pipeline:
        repo: { kind: Hosted, name: "${app_repo}" }
        test: { enabled: true, specFile: buildspec-test.yml }
"#;

    #[test]
    fn test_parse_document_interpolates() {
        let vars = VariableContextBuilder::new()
            .with_env("GITHUB_OWNER", "acme")
            .with_custom("app_repo", "orders-app")
            .build();
        let tree = parse_document(DOCUMENT, &vars).unwrap();
        assert_eq!(tree["site"]["pipeline"]["repo"]["owner"], "acme");

        let config = decode_architecture(&tree).unwrap();
        assert_eq!(config.services.services[0].app.pipeline().repo.name(), "orders-app");
    }

    #[test]
    fn test_parse_document_unresolved() {
        let vars = VariableContextBuilder::new()
            .with_custom("app_repo", "orders-app")
            .build();
        let err = parse_document(DOCUMENT, &vars).unwrap_err();
        assert!(matches!(err, ConfigError::UnresolvedVariables(ref names) if names == &["env.GITHUB_OWNER"]));
    }

    #[test]
    fn test_parse_error() {
        let err = parse_document("services: [unclosed", &VariableContext::new()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = load_architecture(Path::new("/nonexistent/archit.yaml"), &VariableContext::new())
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
