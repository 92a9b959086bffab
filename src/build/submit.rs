// ABOUTME: Creates build configs and starts build runs on the platform.
// ABOUTME: Source builds get a templated build request; binary builds upload the artifact bytes.

use crate::platform::BuildOps;
use crate::platform::model::BuildRecord;
use crate::request::{ArtifactRef, DeploymentRequest};

use super::definition::BuildPlan;
use super::error::BuildError;

/// Create or replace the build config described by `plan`.
///
/// Never deletes first, so records of earlier builds stay attached.
pub async fn ensure_build_config<B: BuildOps + ?Sized>(
    builds: &B,
    plan: &BuildPlan,
) -> Result<(), BuildError> {
    tracing::debug!(config = %plan.config.name, strategy = plan.strategy.label(), "applying build config");
    builds
        .apply_build_config(&plan.config)
        .await
        .map_err(|source| BuildError::Submit {
            config: plan.config.name.clone(),
            source,
        })
}

/// Start one build of `plan`. Binary builds upload the bytes read when the
/// plan was made.
pub async fn start_build<B: BuildOps + ?Sized>(
    builds: &B,
    request: &DeploymentRequest,
    plan: &BuildPlan,
) -> Result<BuildRecord, BuildError> {
    let config = plan.config.name.as_str();
    let submitted = if plan.strategy.is_binary() {
        let file_name = upload_name(request.artifact());
        builds
            .instantiate_binary(config, &file_name, plan.payload.clone())
            .await
    } else {
        builds.instantiate_build(config, &plan.request).await
    };
    let record = submitted.map_err(|source| BuildError::Submit {
        config: config.to_string(),
        source,
    })?;
    tracing::info!(
        build = %record.name,
        fingerprint = %plan.fingerprint,
        strategy = plan.strategy.label(),
        "build started"
    );
    Ok(record)
}

/// File name the uploaded artifact is stored under in the build context.
fn upload_name(artifact: &ArtifactRef) -> String {
    match artifact {
        ArtifactRef::Maven(coords) => coords.file_name(),
        ArtifactRef::File(path) => path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "app.jar".to_string()),
        ArtifactRef::Docker(image) => format!("{}.tar", image.short_name()),
    }
}
