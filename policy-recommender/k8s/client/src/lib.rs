#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

//! Kubernetes API implementations of the recommender's object accessors.

mod cluster;
mod releases;

pub use self::{cluster::ClusterApi, releases::HelmSecrets};
pub use kube::Client;

use k8s_openapi::NamespaceResourceScope;
use kube::{api::Api, Resource};
use serde::de::DeserializeOwned;
use std::fmt::Debug;

/// Scopes an API to `namespace`, or to all namespaces when it is empty.
fn namespaced_or_all<K>(client: &Client, namespace: &str) -> Api<K>
where
    K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
    K::DynamicType: Default,
{
    if namespace.is_empty() {
        Api::all(client.clone())
    } else {
        Api::namespaced(client.clone(), namespace)
    }
}
