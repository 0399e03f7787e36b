use crate::namespaced_or_all;
use anyhow::Result;
use kube::{
    api::{Api, ListParams},
    Client,
};
use policy_recommender_core::{
    k8s::{DynamicObject, GroupVersionResource, Pod},
    ClusterObjects,
};

/// Lists pods and custom resources from the Kubernetes API.
#[derive(Clone)]
pub struct ClusterApi(Client);

// === impl ClusterApi ===

impl ClusterApi {
    pub fn new(client: Client) -> Self {
        Self(client)
    }
}

#[async_trait::async_trait]
impl ClusterObjects for ClusterApi {
    #[tracing::instrument(skip(self))]
    async fn pods_by_label_selector(&self, selector: &str, namespace: &str) -> Result<Vec<Pod>> {
        let params = ListParams::default().labels(selector);
        let pods = namespaced_or_all::<Pod>(&self.0, namespace)
            .list(&params)
            .await?;
        tracing::debug!(pods = pods.items.len(), "Listed");
        Ok(pods.items)
    }

    #[tracing::instrument(skip(self, gvr), fields(%gvr))]
    async fn list_custom_resources(
        &self,
        gvr: &GroupVersionResource,
        namespace: &str,
    ) -> Result<Vec<DynamicObject>> {
        let ar = gvr.api_resource();
        let api = if namespace.is_empty() {
            Api::<DynamicObject>::all_with(self.0.clone(), &ar)
        } else {
            Api::<DynamicObject>::namespaced_with(self.0.clone(), namespace, &ar)
        };
        let objects = api.list(&ListParams::default()).await?;
        tracing::debug!(objects = objects.items.len(), "Listed");
        Ok(objects.items)
    }
}
