//! Resolves the live objects a policy's queries are evaluated against.

use crate::{Error, Kind, MatchParameters, ObjectRef, ReleaseSelector};
use anyhow::Result;
use policy_recommender_k8s_api::{
    helm::{Release, Status},
    DynamicObject, GroupVersionResource, Pod, ResourceExt,
};
use serde_json::Value;
use std::sync::Arc;

/// Release states considered when selecting releases by chart name.
pub const RELEASE_STATUSES: [Status; 6] = [
    Status::Deployed,
    Status::Pending,
    Status::PendingInstall,
    Status::PendingUpgrade,
    Status::PendingRollback,
    Status::Failed,
];

/// Lists objects from the cluster API.
///
/// An empty namespace lists across all namespaces.
#[async_trait::async_trait]
pub trait ClusterObjects: Send + Sync {
    async fn pods_by_label_selector(&self, selector: &str, namespace: &str) -> Result<Vec<Pod>>;

    async fn list_custom_resources(
        &self,
        gvr: &GroupVersionResource,
        namespace: &str,
    ) -> Result<Vec<DynamicObject>>;
}

/// Reads Helm releases.
#[async_trait::async_trait]
pub trait Releases: Send + Sync {
    /// Gets the latest revision of the named release.
    async fn get_release(&self, name: &str, namespace: &str) -> Result<Release>;

    /// Lists the latest revision of each release whose status is in `statuses`.
    async fn list_releases(&self, namespace: &str, statuses: &[Status]) -> Result<Vec<Release>>;
}

/// A resolved object and the input document its queries are evaluated against.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    pub object: ObjectRef,
    pub input: Value,
}

/// A strategy for resolving the objects of one [`Kind`].
#[async_trait::async_trait]
pub trait Resolve: Send + Sync {
    async fn resolve(&self, params: &MatchParameters) -> Result<Vec<Candidate>, Error>;
}

#[derive(Clone)]
pub struct ReleaseStrategy(Arc<dyn Releases>);

#[derive(Clone)]
pub struct PodStrategy(Arc<dyn ClusterObjects>);

#[derive(Clone)]
pub struct CustomResourceStrategy(Arc<dyn ClusterObjects>);

/// Dispatches resolution to the strategy for each kind.
#[derive(Clone)]
pub struct Resolvers {
    releases: ReleaseStrategy,
    pods: PodStrategy,
    custom_resources: CustomResourceStrategy,
}

// === impl Candidate ===

impl Candidate {
    /// Release queries see the chart version and the release's values.
    pub fn release(release: &Release) -> Self {
        Self {
            object: ObjectRef::HelmRelease {
                namespace: release.namespace.clone(),
                name: release.name.clone(),
            },
            input: serde_json::json!({
                "version": release.chart_version(),
                "values": release.config,
            }),
        }
    }

    pub fn pod(pod: &Pod) -> Result<Self, Error> {
        Ok(Self {
            object: ObjectRef::Pod {
                namespace: pod.namespace().unwrap_or_default(),
                name: pod.name_any(),
            },
            input: serde_json::to_value(pod).map_err(Error::Input)?,
        })
    }

    pub fn custom_resource(gvr: &GroupVersionResource, obj: &DynamicObject) -> Result<Self, Error> {
        Ok(Self {
            object: ObjectRef::CustomResource(gvr.clone()),
            input: serde_json::to_value(obj).map_err(Error::Input)?,
        })
    }
}

// === impl ReleaseStrategy ===

#[async_trait::async_trait]
impl Resolve for ReleaseStrategy {
    async fn resolve(&self, params: &MatchParameters) -> Result<Vec<Candidate>, Error> {
        let resolve_err = |source| Error::Resolve {
            kind: Kind::HelmRelease,
            source,
        };

        let releases = match params.release_selector()? {
            ReleaseSelector::Name(name) => {
                let release = self
                    .0
                    .get_release(name, &params.namespace)
                    .await
                    .map_err(resolve_err)?;
                vec![release]
            }
            ReleaseSelector::ChartName(chart_name) => self
                .0
                .list_releases(&params.namespace, &RELEASE_STATUSES)
                .await
                .map_err(resolve_err)?
                .into_iter()
                .filter(|r| RELEASE_STATUSES.contains(&r.status()) && r.chart_name() == chart_name)
                .collect(),
        };

        tracing::debug!(releases = releases.len(), namespace = %params.namespace, "Resolved");
        Ok(releases.iter().map(Candidate::release).collect())
    }
}

// === impl PodStrategy ===

#[async_trait::async_trait]
impl Resolve for PodStrategy {
    async fn resolve(&self, params: &MatchParameters) -> Result<Vec<Candidate>, Error> {
        let selector = params.labels.to_selector();
        let pods = self
            .0
            .pods_by_label_selector(&selector, &params.namespace)
            .await
            .map_err(|source| Error::Resolve {
                kind: Kind::Pod,
                source,
            })?;

        tracing::debug!(pods = pods.len(), %selector, namespace = %params.namespace, "Resolved");
        pods.iter().map(Candidate::pod).collect()
    }
}

// === impl CustomResourceStrategy ===

#[async_trait::async_trait]
impl Resolve for CustomResourceStrategy {
    async fn resolve(&self, params: &MatchParameters) -> Result<Vec<Candidate>, Error> {
        let gvr = params.group_version_resource()?;
        let objects = self
            .0
            .list_custom_resources(&gvr, &params.namespace)
            .await
            .map_err(|source| Error::Resolve {
                kind: Kind::CrdList,
                source,
            })?;

        tracing::debug!(objects = objects.len(), %gvr, namespace = %params.namespace, "Resolved");
        objects
            .iter()
            .map(|obj| Candidate::custom_resource(&gvr, obj))
            .collect()
    }
}

// === impl Resolvers ===

impl Resolvers {
    pub fn new(objects: Arc<dyn ClusterObjects>, releases: Arc<dyn Releases>) -> Self {
        Self {
            releases: ReleaseStrategy(releases),
            pods: PodStrategy(objects.clone()),
            custom_resources: CustomResourceStrategy(objects),
        }
    }

    pub fn strategy(&self, kind: Kind) -> &dyn Resolve {
        match kind {
            Kind::HelmRelease => &self.releases,
            Kind::Pod => &self.pods,
            Kind::CrdList => &self.custom_resources,
        }
    }

    pub async fn resolve(
        &self,
        kind: Kind,
        params: &MatchParameters,
    ) -> Result<Vec<Candidate>, Error> {
        self.strategy(kind).resolve(params).await
    }
}
