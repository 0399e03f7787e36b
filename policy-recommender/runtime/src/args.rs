use crate::{
    config,
    core::{Error, Resolvers, Runner},
    k8s::{ClusterApi, HelmSecrets},
    output::{Output, Report},
};
use anyhow::{bail, Context, Result};
use clap::Parser;
use futures::future;
use std::{path::PathBuf, sync::Arc};
use tokio::time;
use tracing::info;

#[derive(Debug, Parser)]
#[clap(
    name = "policy-recommender",
    about = "Evaluates policies against live cluster objects"
)]
pub struct Args {
    #[clap(
        long,
        default_value = "policy_recommender=info,warn",
        env = "POLICY_RECOMMENDER_LOG"
    )]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain")]
    log_format: kubert::LogFormat,

    #[clap(flatten)]
    client: kubert::ClientArgs,

    /// Path to the policy catalog.
    #[clap(long, env = "POLICY_RECOMMENDER_POLICIES")]
    policies: PathBuf,

    /// Bounds the time spent producing all recommendations.
    #[clap(long, default_value = "30")]
    timeout_secs: u64,

    #[clap(long, default_value = "json")]
    output: Output,

    /// Policies to evaluate. Every registered policy is evaluated when none
    /// are named.
    names: Vec<String>,
}

impl Args {
    #[inline]
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            log_level,
            log_format,
            client,
            policies,
            timeout_secs,
            output,
            names,
        } = self;

        log_format
            .try_init(log_level)
            .context("failed to configure logging")?;

        let catalog = config::load(&policies)?;
        info!(policies = catalog.len(), path = %policies.display(), "Loaded catalog");

        let names = if names.is_empty() {
            let mut names = catalog.names().map(String::from).collect::<Vec<_>>();
            names.sort_unstable();
            names
        } else {
            names
        };

        let client = client.try_client().await?;
        let resolvers = Resolvers::new(
            Arc::new(ClusterApi::new(client.clone())),
            Arc::new(HelmSecrets::new(client)),
        );
        let runner = Runner::new(catalog, resolvers);

        // Dropping the lookups on timeout or interrupt cancels any outstanding
        // API calls.
        let report = tokio::select! {
            res = time::timeout(time::Duration::from_secs(timeout_secs), recommend(&runner, &names)) => {
                res.context("timed out waiting for recommendations")??
            }
            _ = tokio::signal::ctrl_c() => bail!("interrupted"),
        };

        output.write(std::io::stdout().lock(), &report)
    }
}

/// Looks up each named policy concurrently.
async fn recommend(runner: &Runner, names: &[String]) -> Result<Report, Error> {
    future::try_join_all(names.iter().map(|name| async move {
        let recommendations = runner.get_recommendations_by_name(name).await?;
        info!(policy = %name, recommendations = recommendations.len(), "Evaluated");
        Ok::<_, Error>((name.clone(), recommendations))
    }))
    .await
    .map(|results| results.into_iter().collect())
}
