// ABOUTME: Identity labels attached to every object kiln creates.
// ABOUTME: Also parses user-supplied label lists and renders label selectors.

use super::app_id::AppId;
use std::collections::BTreeMap;
use thiserror::Error;

/// Label carrying the application id. Builds are watched and listed by it.
pub const APP_ID_LABEL: &str = "kiln-app-id";

/// Label carrying the workload name, distinguishing indexed instances.
pub const DEPLOYMENT_ID_LABEL: &str = "kiln-deployment-id";

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid label '{0}': expected key:value")]
pub struct LabelParseError(String);

/// Ordered label map, serialized as a JSON object in platform manifests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Labels(BTreeMap<String, String>);

impl Labels {
    /// Identity labels for an application.
    pub fn for_app(app_id: &AppId) -> Self {
        let mut labels = BTreeMap::new();
        labels.insert(APP_ID_LABEL.to_string(), app_id.to_string());
        Self(labels)
    }

    /// Identity labels for one workload of an application.
    pub fn for_workload(app_id: &AppId, workload: &str) -> Self {
        let mut labels = Self::for_app(app_id);
        labels
            .0
            .insert(DEPLOYMENT_ID_LABEL.to_string(), workload.to_string());
        labels
    }

    /// Parse `key:value` pairs separated by commas. Empty input yields no labels.
    pub fn parse_list(input: &str) -> Result<Self, LabelParseError> {
        let mut labels = BTreeMap::new();
        for pair in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match pair.split_once(':') {
                Some((key, value)) if !key.trim().is_empty() => {
                    labels.insert(key.trim().to_string(), value.trim().to_string());
                }
                _ => return Err(LabelParseError(pair.to_string())),
            }
        }
        Ok(Self(labels))
    }

    /// Add labels from `other`. Identity labels already present are never overwritten.
    pub fn merge(mut self, other: &Labels) -> Self {
        for (key, value) in &other.0 {
            self.0.entry(key.clone()).or_insert_with(|| value.clone());
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.0.clone()
    }
}

impl From<BTreeMap<String, String>> for Labels {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

/// Equality-based label selector, rendered as `k=v,k2=v2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector(Vec<(String, String)>);

impl Selector {
    pub fn app(app_id: &AppId) -> Self {
        Self(vec![(APP_ID_LABEL.to_string(), app_id.to_string())])
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.0
            .iter()
            .all(|(k, v)| labels.get(k).is_some_and(|actual| actual == v))
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (key, value) in &self.0 {
            if !first {
                f.write_str(",")?;
            }
            write!(f, "{}={}", key, value)?;
            first = false;
        }
        Ok(())
    }
}
