// ABOUTME: Phantom-typed names for platform objects.
// ABOUTME: Keeps build, workload and pod names from being passed in each other's place.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Marker types for phantom type parameters.
/// Using empty enums prevents instantiation and requires no trait bounds.
pub enum BuildMarker {}
pub enum WorkloadMarker {}
pub enum PodMarker {}

/// The name of a platform object of kind `T`.
///
/// A `BuildName` can never be handed to an operation that expects a
/// `WorkloadName`, even though both are plain strings on the wire.
#[must_use = "names reference platform objects and should not be ignored"]
pub struct Name<T> {
    value: String,
    _marker: PhantomData<T>,
}

impl<T> Name<T> {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            _marker: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn into_inner(self) -> String {
        self.value
    }
}

// Manual impls: T is only a marker and implements nothing.

impl<T> std::fmt::Debug for Name<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Name").field(&self.value).finish()
    }
}

impl<T> Clone for Name<T> {
    fn clone(&self) -> Self {
        Self::new(self.value.clone())
    }
}

impl<T> PartialEq for Name<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> Eq for Name<T> {}

impl<T> PartialEq<str> for Name<T> {
    fn eq(&self, other: &str) -> bool {
        self.value == other
    }
}

impl<T> PartialEq<&str> for Name<T> {
    fn eq(&self, other: &&str) -> bool {
        self.value == *other
    }
}

impl<T> Hash for Name<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T> std::fmt::Display for Name<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.value)
    }
}

impl<T> Serialize for Name<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for Name<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Self::new(value))
    }
}

pub type BuildName = Name<BuildMarker>;
pub type WorkloadName = Name<WorkloadMarker>;
pub type PodName = Name<PodMarker>;
