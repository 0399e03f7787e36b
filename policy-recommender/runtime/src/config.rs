//! Loads the policy catalog from a YAML file.
//!
//! ```yaml
//! policies:
//!   cert-manager-version:
//!     kind: helm_release
//!     match:
//!       chart_name: cert-manager
//!       namespace: cert-manager
//!     queries:
//!       - modules: [cert_manager.rego]
//!         query: data.recommender.cert_manager.version
//! ```
//!
//! Module paths are relative to the directory containing the catalog file.

use crate::{
    core::{Catalog, Kind, MatchParameters, Query, QueryCollection},
    rego::{Module, RegoQuery},
};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Arc,
};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogConfig {
    pub policies: BTreeMap<String, PolicyConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    pub kind: Kind,

    #[serde(rename = "match", default)]
    pub match_params: MatchParameters,

    pub queries: Vec<QueryConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryConfig {
    pub modules: Vec<PathBuf>,
    pub query: String,
}

/// Reads and compiles the catalog at `path`.
pub fn load(path: &Path) -> Result<Catalog> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let config = serde_yaml::from_str::<CatalogConfig>(&contents)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    config.into_catalog(base)
}

// === impl CatalogConfig ===

impl CatalogConfig {
    /// Compiles every policy's queries, resolving module paths against `base`.
    pub fn into_catalog(self, base: &Path) -> Result<Catalog> {
        let mut policies = Vec::with_capacity(self.policies.len());
        for (name, policy) in self.policies {
            let collection = policy
                .into_collection(base)
                .with_context(|| format!("invalid policy {name}"))?;
            tracing::debug!(policy = %name, kind = %collection.kind, queries = collection.queries.len(), "Loaded");
            policies.push((name, collection));
        }
        Ok(Catalog::try_from_iter(policies)?)
    }
}

// === impl PolicyConfig ===

impl PolicyConfig {
    fn into_collection(self, base: &Path) -> Result<QueryCollection> {
        let queries = self
            .queries
            .into_iter()
            .map(|q| q.compile(base))
            .collect::<Result<Vec<_>>>()?;
        Ok(QueryCollection::new(self.kind, self.match_params, queries)?)
    }
}

// === impl QueryConfig ===

impl QueryConfig {
    fn compile(self, base: &Path) -> Result<Arc<dyn Query>> {
        let modules = self
            .modules
            .iter()
            .map(|path| {
                let path = base.join(path);
                let source = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                Ok(Module {
                    path: path.display().to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let query = RegoQuery::compile(modules, self.query)?;
        tracing::debug!(query = %query.query(), packages = ?query.packages(), "Compiled");
        Ok(Arc::new(query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const MODULE: &str = r#"
package recommender.pods

import rego.v1

result := {
	"ALLOW": count(input.spec.containers) > 0,
	"POLICY_ID": "containers",
}
"#;

    fn write_catalog(dir: &Path, catalog: &str) -> PathBuf {
        fs::create_dir_all(dir.join("policies")).unwrap();
        fs::write(dir.join("policies/pods.rego"), MODULE).unwrap();
        let path = dir.join("catalog.yaml");
        fs::write(&path, catalog).unwrap();
        path
    }

    #[test]
    fn loads_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_catalog(
            dir.path(),
            r#"
policies:
  web-pods:
    kind: pod
    match:
      namespace: web
      labels:
        app: web
    queries:
      - modules: [policies/pods.rego]
        query: data.recommender.pods.result
  cert-manager:
    kind: helm_release
    match:
      chart_name: cert-manager
      namespace: cert-manager
    queries: []
"#,
        );

        let catalog = load(&path).unwrap();
        assert_eq!(catalog.len(), 2);

        let pods = catalog.lookup("web-pods").unwrap();
        assert_eq!(pods.kind, Kind::Pod);
        assert_eq!(pods.match_params.labels.to_selector(), "app=web");
        assert_eq!(pods.queries.len(), 1);

        let releases = catalog.lookup("cert-manager").unwrap();
        assert_eq!(releases.kind, Kind::HelmRelease);
        assert_eq!(releases.match_params.chart_name, "cert-manager");
    }

    #[test]
    fn rejects_unsupported_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_catalog(
            dir.path(),
            r#"
policies:
  deployments:
    kind: deployment
    queries: []
"#,
        );
        let error = load(&path).unwrap_err();
        assert!(
            format!("{error:#}").contains("not a supported query kind: deployment"),
            "{error:#}"
        );
    }

    #[test]
    fn rejects_invalid_match_parameters() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_catalog(
            dir.path(),
            r#"
policies:
  releases:
    kind: helm_release
    match:
      namespace: default
    queries: []
"#,
        );
        let error = load(&path).unwrap_err();
        assert!(
            format!("{error:#}").contains("invalid match parameters"),
            "{error:#}"
        );
    }

    #[test]
    fn rejects_missing_modules() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_catalog(
            dir.path(),
            r#"
policies:
  web-pods:
    kind: pod
    queries:
      - modules: [policies/missing.rego]
        query: data.recommender.pods.result
"#,
        );
        let error = load(&path).unwrap_err();
        assert!(format!("{error:#}").contains("missing.rego"), "{error:#}");
    }

    #[test]
    fn loads_shipped_catalog() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../policies/catalog.yaml");
        let catalog = load(&path).unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(
            catalog.lookup("certificates").map(|c| c.kind),
            Some(Kind::CrdList)
        );

        let pods = catalog.lookup("web-pod-resources").unwrap();
        let raw = crate::core::query::evaluate(
            pods.queries[0].as_ref(),
            &serde_json::json!({
                "spec": {
                    "containers": [
                        {"name": "web"},
                        {"name": "proxy", "resources": {"limits": {"cpu": "1"}}},
                    ],
                },
            }),
        )
        .unwrap()
        .expect("exactly one result");
        assert!(!raw.allow);
        assert_eq!(raw.policy_id, "pod_resource_limits");
        assert_eq!(
            raw.failure_messages,
            vec!["Container web has no resource limits"]
        );

        let releases = catalog.lookup("cert-manager").unwrap();
        let raw = crate::core::query::evaluate(
            releases.queries[0].as_ref(),
            &serde_json::json!({"version": "v1.10.1", "values": {}}),
        )
        .unwrap()
        .expect("exactly one result");
        assert!(!raw.allow);
        assert_eq!(
            raw.failure_messages[0],
            "cert-manager v1.10.1 is older than v1.11.0"
        );

        let certificates = catalog.lookup("certificates").unwrap();
        let raw = crate::core::query::evaluate(
            certificates.queries[0].as_ref(),
            &serde_json::json!({"metadata": {"name": "web-tls"}, "spec": {}}),
        )
        .unwrap()
        .expect("exactly one result");
        assert!(!raw.allow);
        assert_eq!(
            raw.failure_messages,
            vec!["Certificate web-tls does not set renewBefore"]
        );
    }
}
