// ABOUTME: Turns a selected build strategy into build config and build request descriptions.
// ABOUTME: Also assembles the environment passed to builds: fingerprint, app and artifact details.

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::artifact::{ArtifactContent, ArtifactFingerprint};
use crate::config::{Config, resolve_env_map};
use crate::platform::model::{
    BuildConfigSpec, BuildRequestSpec, BuildSource, BuildStrategyKind, FINGERPRINT_ENV,
};
use crate::request::{ArtifactRef, DeploymentRequest};
use crate::types::{AppId, Labels};

use super::error::BuildError;
use super::strategy::BuildStrategy;

pub const APP_NAME_ENV: &str = "app_name";
pub const APP_GROUP_ID_ENV: &str = "app_group_id";
pub const APP_ARTIFACT_ID_ENV: &str = "app_artifact_id";
pub const APP_VERSION_ENV: &str = "app_version";
pub const APP_RESOURCE_HOST_ENV: &str = "app_resource_host";
pub const APP_RESOURCE_URL_ENV: &str = "app_resource_url";
pub const REPO_AUTH_USERNAME_ENV: &str = "repo_auth_username";
pub const REPO_AUTH_PASSWORD_ENV: &str = "repo_auth_password";

/// Everything needed to create and start one build.
#[derive(Debug, Clone)]
pub struct BuildPlan {
    pub app_id: AppId,
    pub strategy: BuildStrategy,
    pub fingerprint: ArtifactFingerprint,
    /// Artifact bytes the fingerprint covers; uploaded by binary builds.
    pub payload: Bytes,
    pub config: BuildConfigSpec,
    pub request: BuildRequestSpec,
}

impl BuildPlan {
    pub fn new(
        request: &DeploymentRequest,
        app_id: &AppId,
        strategy: BuildStrategy,
        content: ArtifactContent,
        config: &Config,
    ) -> Result<Self, BuildError> {
        let ArtifactContent { bytes, fingerprint } = content;
        let labels = Labels::for_app(app_id).merge(&request.labels()?);
        let env = build_env(request, &fingerprint, config)?;
        let tag = request.image_tag(&config.build.image_tag);
        let (source, kind) = source_and_strategy(&strategy);

        // Binary builds have no build request, so their config carries the
        // whole environment. Other builds get it per run.
        let (config_env, request_env) = if strategy.is_binary() {
            (env, BTreeMap::new())
        } else {
            (BTreeMap::new(), env)
        };

        Ok(Self {
            app_id: app_id.clone(),
            config: BuildConfigSpec {
                name: app_id.to_string(),
                labels,
                source,
                strategy: kind,
                env: config_env,
                output: format!("{app_id}:{tag}"),
            },
            request: BuildRequestSpec { env: request_env },
            strategy,
            fingerprint,
            payload: bytes,
        })
    }
}

fn source_and_strategy(strategy: &BuildStrategy) -> (BuildSource, BuildStrategyKind) {
    match strategy {
        BuildStrategy::GitRepoWithDockerfileProperty(git)
        | BuildStrategy::GitRepoDiscoveredInArtifact(git) => (
            BuildSource::Git {
                uri: git.uri.clone(),
                git_ref: git.git_ref.clone(),
                context_dir: None,
                secret: git.secret.clone(),
            },
            BuildStrategyKind::Docker {
                dockerfile_path: Some(git.dockerfile_path.clone()),
            },
        ),
        BuildStrategy::InlineOrFileDockerfile { dockerfile } => (
            BuildSource::Dockerfile(dockerfile.clone()),
            BuildStrategyKind::Docker {
                dockerfile_path: None,
            },
        ),
        BuildStrategy::BinaryInputSourceImage { builder } => (
            BuildSource::Binary,
            BuildStrategyKind::Source {
                builder: builder.clone(),
            },
        ),
    }
}

/// Environment for one build of `request`.
fn build_env(
    request: &DeploymentRequest,
    fingerprint: &ArtifactFingerprint,
    config: &Config,
) -> Result<BTreeMap<String, String>, BuildError> {
    let mut env = resolve_env_map(&config.build.environment)
        .map_err(|e| BuildError::Environment(e.to_string()))?;
    env.insert(FINGERPRINT_ENV.to_string(), fingerprint.to_string());
    env.insert(APP_NAME_ENV.to_string(), request.definition().name.clone());

    if let ArtifactRef::Maven(coords) = request.artifact() {
        env.insert(APP_GROUP_ID_ENV.to_string(), coords.group_id.clone());
        env.insert(APP_ARTIFACT_ID_ENV.to_string(), coords.artifact_id.clone());
        env.insert(APP_VERSION_ENV.to_string(), coords.version.clone());

        if let Some(maven) = &config.maven {
            let repository = maven.primary_repository();
            env.insert(APP_RESOURCE_HOST_ENV.to_string(), repository.host().to_string());
            env.insert(
                APP_RESOURCE_URL_ENV.to_string(),
                coords.remote_url(&repository.url),
            );
            let auth = repository
                .auth()
                .map_err(|e| BuildError::Environment(e.to_string()))?;
            if let Some(username) = auth.username {
                env.insert(REPO_AUTH_USERNAME_ENV.to_string(), username);
            }
            if let Some(password) = auth.password {
                env.insert(REPO_AUTH_PASSWORD_ENV.to_string(), password);
            }
        }
    }
    Ok(env)
}
