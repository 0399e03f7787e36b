use crate::namespaced_or_all;
use anyhow::{anyhow, Result};
use kube::{api::ListParams, Client};
use policy_recommender_core::{
    k8s::{
        helm::{self, Release, Status},
        ResourceExt, Secret,
    },
    Releases,
};

/// Reads Helm releases from the Secrets written by Helm's `secret` storage
/// driver.
#[derive(Clone)]
pub struct HelmSecrets(Client);

// === impl HelmSecrets ===

impl HelmSecrets {
    pub fn new(client: Client) -> Self {
        Self(client)
    }

    async fn list(&self, selector: &str, namespace: &str) -> Result<Vec<Release>> {
        let params = ListParams::default().labels(selector);
        let secrets = namespaced_or_all::<Secret>(&self.0, namespace)
            .list(&params)
            .await?;
        Ok(decode_secrets(secrets.items))
    }
}

#[async_trait::async_trait]
impl Releases for HelmSecrets {
    #[tracing::instrument(skip(self))]
    async fn get_release(&self, name: &str, namespace: &str) -> Result<Release> {
        let selector = format!("{},name={name}", helm::OWNER_SELECTOR);
        self.list(&selector, namespace)
            .await?
            .into_iter()
            .max_by_key(|r| r.version)
            .ok_or_else(|| anyhow!("release {name}: not found"))
    }

    #[tracing::instrument(skip(self))]
    async fn list_releases(&self, namespace: &str, statuses: &[Status]) -> Result<Vec<Release>> {
        let releases = self.list(helm::OWNER_SELECTOR, namespace).await?;
        Ok(filter_releases(releases, statuses))
    }
}

/// Decodes storage Secrets, skipping any that are not valid releases.
fn decode_secrets(secrets: impl IntoIterator<Item = Secret>) -> Vec<Release> {
    secrets
        .into_iter()
        .filter_map(|secret| match Release::from_secret(&secret) {
            Ok(release) => Some(release),
            Err(error) => {
                tracing::warn!(secret = %secret.name_any(), %error, "Failed to decode release");
                None
            }
        })
        .collect()
}

/// Keeps the latest revision of each release, drops those whose status is not
/// in `statuses`, and orders the remainder by deployment time.
fn filter_releases(releases: Vec<Release>, statuses: &[Status]) -> Vec<Release> {
    let mut releases = helm::latest_revisions(releases)
        .into_iter()
        .filter(|r| statuses.contains(&r.status()))
        .collect::<Vec<_>>();
    helm::sort_by_date(&mut releases);
    releases
}
