// ABOUTME: Decides whether a request needs a fresh build or can reuse an earlier one.
// ABOUTME: Explicit force settings win; otherwise builds are matched by artifact fingerprint.

use crate::artifact::ArtifactFingerprint;
use crate::platform::BuildOps;
use crate::platform::model::{BuildPhase, BuildRecord};
use crate::request::DeploymentRequest;
use crate::types::{AppId, BuildName, ImageRef, Selector};

use super::error::BuildError;

/// An earlier build the request can use instead of building again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExistingBuild {
    /// Finished build whose image can be rolled out directly.
    Complete { build: BuildName, image: ImageRef },
    /// Matching build that has not finished yet.
    InProgress(BuildName),
    /// Rebuilding was forbidden but no earlier build was found.
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildDecision {
    Build { reason: &'static str },
    Reuse(ExistingBuild),
}

/// Check for a reusable build of `fingerprint` under `app_id`.
///
/// `kiln.build.force` decides unconditionally when set. Otherwise
/// `config_force` forces a rebuild. Otherwise builds labelled with the app id
/// are searched for one that has not failed and carries the same fingerprint.
pub async fn check_existing<B: BuildOps + ?Sized>(
    builds: &B,
    request: &DeploymentRequest,
    app_id: &AppId,
    fingerprint: &ArtifactFingerprint,
    config_force: bool,
) -> Result<BuildDecision, BuildError> {
    match request.force_build()? {
        Some(true) => {
            return Ok(BuildDecision::Build {
                reason: "rebuild forced by deployment property",
            });
        }
        Some(false) => {
            let records = list(builds, app_id).await?;
            let existing = reusable(&records, fingerprint)
                .or_else(|| newest_complete(&records, None))
                .unwrap_or(ExistingBuild::Unknown);
            return Ok(BuildDecision::Reuse(existing));
        }
        None => {}
    }

    if config_force {
        return Ok(BuildDecision::Build {
            reason: "rebuild forced by configuration",
        });
    }

    let records = list(builds, app_id).await?;
    Ok(match reusable(&records, fingerprint) {
        Some(existing) => BuildDecision::Reuse(existing),
        None => BuildDecision::Build {
            reason: "no earlier build of this artifact",
        },
    })
}

async fn list<B: BuildOps + ?Sized>(
    builds: &B,
    app_id: &AppId,
) -> Result<Vec<BuildRecord>, BuildError> {
    builds
        .list_builds(&Selector::app(app_id))
        .await
        .map_err(|source| BuildError::Lookup {
            app_id: app_id.to_string(),
            source,
        })
}

fn matches(record: &BuildRecord, fingerprint: &ArtifactFingerprint) -> bool {
    record.phase != BuildPhase::Failed && record.fingerprint.as_ref() == Some(fingerprint)
}

/// Prefer the newest finished build; fall back to one still running.
fn reusable(records: &[BuildRecord], fingerprint: &ArtifactFingerprint) -> Option<ExistingBuild> {
    newest_complete(records, Some(fingerprint)).or_else(|| {
        records
            .iter()
            .filter(|r| matches(r, fingerprint) && !r.phase.is_terminal())
            .max_by_key(|r| r.created)
            .map(|r| ExistingBuild::InProgress(r.name.clone()))
    })
}

fn newest_complete(
    records: &[BuildRecord],
    fingerprint: Option<&ArtifactFingerprint>,
) -> Option<ExistingBuild> {
    records
        .iter()
        .filter(|r| r.phase == BuildPhase::Complete)
        .filter(|r| fingerprint.is_none_or(|fp| matches(r, fp)))
        .filter_map(|r| {
            r.output_image
                .as_ref()
                .map(|image| (r.created, r.name.clone(), image.clone()))
        })
        .max_by_key(|(created, _, _)| *created)
        .map(|(_, build, image)| ExistingBuild::Complete { build, image })
}
