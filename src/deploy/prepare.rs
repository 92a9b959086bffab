// ABOUTME: Works out where a request's image comes from before any object is created.
// ABOUTME: Fingerprints the artifact, selects the build strategy and checks for reusable builds.

use crate::artifact::{self, ArtifactResolver};
use crate::build::{
    BuildDecision, BuildError, BuildPlan, BuildStrategy, ExistingBuild, check_existing,
};
use crate::config::Config;
use crate::platform::BuildOps;
use crate::request::{ArtifactRef, DeploymentRequest, keys};
use crate::types::{AppId, BuildName, ImageRef};

use super::error::DeployError;

#[derive(Debug, Clone)]
pub(crate) enum ImageSource {
    /// Image exists already and can run as is.
    Ready(ImageRef),
    /// A new build has to be created and started.
    Build(Box<BuildPlan>),
    /// An earlier build of the same artifact is still running.
    Pending(BuildName),
    /// Rebuild forbidden and no earlier image found.
    Unresolved,
}

pub(crate) struct Prepared {
    /// The request, marked when its image comes from a binary source build.
    pub request: DeploymentRequest,
    pub source: ImageSource,
}

pub(crate) async fn prepare<B: BuildOps + ?Sized>(
    builds: &B,
    resolver: &dyn ArtifactResolver,
    config: &Config,
    request: &DeploymentRequest,
    app_id: &AppId,
) -> Result<Prepared, DeployError> {
    if let ArtifactRef::Docker(image) = request.artifact() {
        return Ok(Prepared {
            request: request.clone(),
            source: ImageSource::Ready(config.images.resolve(image)),
        });
    }

    let content = artifact::load(resolver, request.artifact())
        .await
        .map_err(BuildError::from)?;

    let (strategy, reason) = BuildStrategy::select(request, resolver, config).await?;
    tracing::info!(%app_id, strategy = strategy.label(), reason, "build strategy selected");

    let request = if strategy.is_binary() {
        request.with_deployment_property(keys::S2I_BUILD_MARKER, "true")
    } else {
        request.clone()
    };

    let decision = check_existing(
        builds,
        &request,
        app_id,
        &content.fingerprint,
        config.build.force,
    )
    .await?;
    let source = match decision {
        BuildDecision::Build { reason } => {
            tracing::info!(%app_id, fingerprint = %content.fingerprint, reason, "building image");
            let plan = BuildPlan::new(&request, app_id, strategy, content, config)?;
            ImageSource::Build(Box::new(plan))
        }
        BuildDecision::Reuse(ExistingBuild::Complete { build, image }) => {
            tracing::info!(%app_id, %build, %image, "reusing earlier build");
            ImageSource::Ready(image)
        }
        BuildDecision::Reuse(ExistingBuild::InProgress(build)) => {
            tracing::info!(%app_id, %build, "matching build already running");
            ImageSource::Pending(build)
        }
        BuildDecision::Reuse(ExistingBuild::Unknown) => ImageSource::Unresolved,
    };
    Ok(Prepared { request, source })
}
