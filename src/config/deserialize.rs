// ABOUTME: Custom serde deserializers for config types.
// ABOUTME: Handles image refs and the non-empty remote repository list.

use nonempty::NonEmpty;
use serde::Deserialize;

use super::RemoteRepository;
use crate::types::ImageRef;

pub fn deserialize_image_ref<'de, D>(deserializer: D) -> Result<ImageRef, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    ImageRef::parse(&s).map_err(serde::de::Error::custom)
}

pub fn deserialize_repositories<'de, D>(
    deserializer: D,
) -> Result<NonEmpty<RemoteRepository>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let values: Vec<RepositoryEntry> = Vec::deserialize(deserializer)?;
    let repositories = values
        .into_iter()
        .enumerate()
        .map(|(index, entry)| entry.into_repository(index))
        .collect::<Vec<_>>();

    NonEmpty::from_vec(repositories)
        .ok_or_else(|| serde::de::Error::custom("at least one remote repository is required"))
}

/// A repository is either a bare URL or a full entry with id and credentials.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RepositoryEntry {
    Simple(String),
    Detailed(RemoteRepository),
}

impl RepositoryEntry {
    fn into_repository(self, index: usize) -> RemoteRepository {
        match self {
            RepositoryEntry::Simple(url) => RemoteRepository {
                id: format!("repo{index}"),
                url,
                username: None,
                password: None,
            },
            RepositoryEntry::Detailed(r) => r,
        }
    }
}
