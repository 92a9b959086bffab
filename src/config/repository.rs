// ABOUTME: Maven repository settings used to resolve artifacts and pass download info to builds.
// ABOUTME: Remote repositories carry optional credentials resolved from the environment.

use super::EnvValue;
use crate::error::Result;
use nonempty::NonEmpty;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct MavenConfig {
    #[serde(default = "default_local_repository")]
    pub local_repository: PathBuf,

    #[serde(deserialize_with = "super::deserialize::deserialize_repositories")]
    pub remote_repositories: NonEmpty<RemoteRepository>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteRepository {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub username: Option<EnvValue>,
    #[serde(default)]
    pub password: Option<EnvValue>,
}

/// Credentials after env resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryAuth {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl RemoteRepository {
    pub fn auth(&self) -> Result<RepositoryAuth> {
        Ok(RepositoryAuth {
            username: self.username.as_ref().map(EnvValue::resolve).transpose()?,
            password: self.password.as_ref().map(EnvValue::resolve).transpose()?,
        })
    }

    /// Host portion of the repository URL, without scheme, port or path.
    pub fn host(&self) -> &str {
        let without_scheme = self
            .url
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.url);
        let authority = without_scheme.split('/').next().unwrap_or(without_scheme);
        let host = authority.rsplit('@').next().unwrap_or(authority);
        host.split(':').next().unwrap_or(host)
    }
}

impl MavenConfig {
    /// The repository builds download from: the one with the lowest id.
    pub fn primary_repository(&self) -> &RemoteRepository {
        self.remote_repositories
            .iter()
            .min_by(|a, b| a.id.cmp(&b.id))
            .unwrap_or(self.remote_repositories.first())
    }
}

fn default_local_repository() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_default()
        .join(".m2")
        .join("repository")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(id: &str, url: &str) -> RemoteRepository {
        RemoteRepository {
            id: id.to_string(),
            url: url.to_string(),
            username: None,
            password: None,
        }
    }

    #[test]
    fn primary_repository_is_lowest_id() {
        let config = MavenConfig {
            local_repository: PathBuf::from("/tmp/m2"),
            remote_repositories: NonEmpty::from_vec(vec![
                repo("spring", "https://repo.spring.io/libs-release"),
                repo("central", "https://repo.maven.apache.org/maven2"),
            ])
            .unwrap(),
        };
        assert_eq!(config.primary_repository().id, "central");
    }

    #[test]
    fn host_strips_scheme_port_and_path() {
        assert_eq!(repo("a", "https://repo.example.com:8443/m2").host(), "repo.example.com");
        assert_eq!(repo("a", "http://user@nexus/repo").host(), "nexus");
        assert_eq!(repo("a", "nexus.local").host(), "nexus.local");
    }

    #[test]
    fn auth_resolves_credentials() {
        temp_env::with_var("KILN_TEST_REPO_PASS", Some("hunter2"), || {
            let mut r = repo("a", "https://x");
            r.username = Some(EnvValue::Literal("deploy".to_string()));
            r.password = Some(EnvValue::FromEnv {
                var: "KILN_TEST_REPO_PASS".to_string(),
                default: None,
            });
            let auth = r.auth().unwrap();
            assert_eq!(auth.username.as_deref(), Some("deploy"));
            assert_eq!(auth.password.as_deref(), Some("hunter2"));
        });
    }
}
