// ABOUTME: Validated application names and deployment identifiers.
// ABOUTME: Enforces the 24 character name limit and DNS label rules for derived ids.

use super::id::WorkloadName;
use std::fmt;
use thiserror::Error;

/// Longest application name the platform accepts for generated objects.
pub const MAX_APP_NAME_LEN: usize = 24;

/// Longest identifier usable as a DNS label.
const MAX_APP_ID_LEN: usize = 63;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AppIdError {
    #[error("application name cannot be empty")]
    Empty,

    #[error("application name cannot be more than {MAX_APP_NAME_LEN} characters: {0}")]
    NameTooLong(String),

    #[error("application id exceeds maximum length of 63 characters: {0}")]
    IdTooLong(String),

    #[error("application id cannot start or end with a hyphen: {0}")]
    BadHyphen(String),

    #[error("invalid character in application id: '{0}'")]
    InvalidChar(char),
}

/// Name of the application as given in its definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AppName(String);

impl AppName {
    pub fn new(value: &str) -> Result<Self, AppIdError> {
        if value.is_empty() {
            return Err(AppIdError::Empty);
        }
        if value.chars().count() > MAX_APP_NAME_LEN {
            return Err(AppIdError::NameTooLong(value.to_string()));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AppName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable identifier for a deployed application, used as object name and label value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AppId(String);

impl AppId {
    pub fn new(value: &str) -> Result<Self, AppIdError> {
        if value.is_empty() {
            return Err(AppIdError::Empty);
        }
        if value.len() > MAX_APP_ID_LEN {
            return Err(AppIdError::IdTooLong(value.to_string()));
        }
        if value.starts_with('-') || value.ends_with('-') {
            return Err(AppIdError::BadHyphen(value.to_string()));
        }
        for c in value.chars() {
            if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '-' {
                return Err(AppIdError::InvalidChar(c));
            }
        }
        Ok(Self(value.to_string()))
    }

    /// Derive the id for an application, optionally prefixed by its group.
    /// Input is lowercased before validation.
    pub fn derive(group: Option<&str>, name: &AppName) -> Result<Self, AppIdError> {
        let raw = match group {
            Some(group) if !group.is_empty() => format!("{}-{}", group, name),
            _ => name.to_string(),
        };
        Self::new(&raw.to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Workload name for the un-indexed topology.
    pub fn workload(&self) -> WorkloadName {
        WorkloadName::new(self.0.clone())
    }

    /// Workload name of the instance at `index` for the indexed topology.
    pub fn instance(&self, index: u32) -> WorkloadName {
        WorkloadName::new(format!("{}-{}", self.0, index))
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
