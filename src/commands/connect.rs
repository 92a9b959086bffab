// ABOUTME: Shared helper for connecting to the cluster and resolving artifacts.
// ABOUTME: Every command that talks to the platform starts here.

use std::sync::Arc;

use kiln::artifact::{ArtifactResolver, LocalArtifactResolver};
use kiln::config::Config;
use kiln::error::Result;
use kiln::output::Output;
use kiln::platform::OpenShiftClient;

/// Build the platform client and artifact resolver described by `config`.
pub async fn connect(
    config: &Config,
    output: &Output,
) -> Result<(Arc<OpenShiftClient>, Arc<dyn ArtifactResolver>)> {
    let endpoint = config.api.url.as_deref().unwrap_or("kubeconfig context");
    output.progress(&format!(
        "  → Using {} (namespace {})",
        endpoint, config.api.namespace
    ));
    let platform = OpenShiftClient::connect(&config.api).await?;
    let resolver = LocalArtifactResolver::new(config.maven.clone());
    Ok((Arc::new(platform), Arc::new(resolver)))
}
