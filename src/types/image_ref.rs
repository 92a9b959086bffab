// ABOUTME: Container image reference parsing and registry rewriting.
// ABOUTME: Handles nginx, nginx:tag, registry/project/image:tag@digest and image stream tags.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseImageRefError {
    #[error("image reference cannot be empty")]
    Empty,

    #[error("invalid character in image reference: {0}")]
    InvalidChar(char),

    #[error("invalid image reference format: {0}")]
    InvalidFormat(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageRef {
    registry: Option<String>,
    name: String,
    tag: Option<String>,
    digest: Option<String>,
}

impl ImageRef {
    pub fn parse(input: &str) -> Result<Self, ParseImageRefError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ParseImageRefError::Empty);
        }

        if let Some(c) = input
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && !"/:.-_@".contains(*c))
        {
            return Err(ParseImageRefError::InvalidChar(c));
        }

        let (rest, digest) = match input.split_once('@') {
            Some((before, after)) if !after.is_empty() => (before, Some(after.to_string())),
            Some(_) => return Err(ParseImageRefError::InvalidFormat(input.to_string())),
            None => (input, None),
        };

        // A colon followed by a slash belongs to a registry port, not a tag.
        let (rest, tag) = match rest.rsplit_once(':') {
            Some((before, after)) if !after.contains('/') => {
                if after.is_empty() {
                    return Err(ParseImageRefError::InvalidFormat(input.to_string()));
                }
                (before, Some(after.to_string()))
            }
            _ => (rest, None),
        };

        let (registry, name) = Self::split_registry(rest);
        if name.is_empty() || name.starts_with('/') || name.ends_with('/') {
            return Err(ParseImageRefError::InvalidFormat(input.to_string()));
        }

        let tag = match (&tag, &digest) {
            (None, None) => Some("latest".to_string()),
            _ => tag,
        };

        Ok(Self {
            registry,
            name,
            tag,
            digest,
        })
    }

    pub(crate) fn from_parts(registry: Option<&str>, name: &str, tag: &str) -> Self {
        Self {
            registry: registry.map(str::to_string),
            name: name.to_string(),
            tag: Some(tag.to_string()),
            digest: None,
        }
    }

    fn split_registry(input: &str) -> (Option<String>, String) {
        match input.split_once('/') {
            Some((first, rest))
                if first.contains('.') || first.contains(':') || first == "localhost" =>
            {
                (Some(first.to_string()), rest.to_string())
            }
            _ => (None, input.to_string()),
        }
    }

    pub fn registry(&self) -> Option<&str> {
        self.registry.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last path component of the image name.
    pub fn short_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    /// Move this image under `registry/project`, keeping its short name, tag and digest.
    ///
    /// Used when images must be pulled from a mirror the cluster can reach.
    pub fn rehome(&self, registry: &str, project: Option<&str>) -> Self {
        let name = match project {
            Some(project) if !project.is_empty() => format!("{}/{}", project, self.short_name()),
            _ => self.name.clone(),
        };
        Self {
            registry: Some(registry.trim_end_matches('/').to_string()),
            name,
            tag: self.tag.clone(),
            digest: self.digest.clone(),
        }
    }

    /// `name:tag` form used for ImageStreamTag references.
    pub fn stream_tag(&self) -> String {
        format!("{}:{}", self.short_name(), self.tag().unwrap_or("latest"))
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref registry) = self.registry {
            write!(f, "{}/", registry)?;
        }
        write!(f, "{}", self.name)?;
        if let Some(ref tag) = self.tag {
            write!(f, ":{}", tag)?;
        }
        if let Some(ref digest) = self.digest {
            write!(f, "@{}", digest)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_name_defaults_to_latest() {
        let image = ImageRef::parse("nginx").unwrap();
        assert_eq!(image.registry(), None);
        assert_eq!(image.tag(), Some("latest"));
        assert_eq!(image.to_string(), "nginx:latest");
    }

    #[test]
    fn registry_with_port_is_not_a_tag() {
        let image = ImageRef::parse("registry.local:5000/team/app").unwrap();
        assert_eq!(image.registry(), Some("registry.local:5000"));
        assert_eq!(image.name(), "team/app");
        assert_eq!(image.tag(), Some("latest"));
    }

    #[test]
    fn digest_suppresses_default_tag() {
        let image = ImageRef::parse("app@sha256:abc").unwrap();
        assert_eq!(image.tag(), None);
        assert_eq!(image.digest(), Some("sha256:abc"));
    }

    #[test]
    fn rejects_empty_tag_and_bad_chars() {
        assert!(matches!(
            ImageRef::parse("app:"),
            Err(ParseImageRefError::InvalidFormat(_))
        ));
        assert_eq!(ImageRef::parse("app!"), Err(ParseImageRefError::InvalidChar('!')));
        assert_eq!(ImageRef::parse("  "), Err(ParseImageRefError::Empty));
    }

    #[test]
    fn rehome_moves_image_under_project() {
        let image = ImageRef::parse("docker.io/fabric8/s2i-java:latest-java11").unwrap();
        let moved = image.rehome("mirror.internal/", Some("builders"));
        assert_eq!(
            moved.to_string(),
            "mirror.internal/builders/s2i-java:latest-java11"
        );
    }

    #[test]
    fn rehome_without_project_keeps_path() {
        let image = ImageRef::parse("fabric8/s2i-java").unwrap();
        let moved = image.rehome("mirror.internal", None);
        assert_eq!(moved.to_string(), "mirror.internal/fabric8/s2i-java:latest");
    }

    #[test]
    fn stream_tag_uses_short_name() {
        let image = ImageRef::parse("172.30.1.1:5000/proj/app:v2").unwrap();
        assert_eq!(image.stream_tag(), "app:v2");
    }
}
