// ABOUTME: Cluster control plane abstraction and its OpenShift implementation.
// ABOUTME: Capability traits, object descriptions and errors shared by every layer above.

pub mod error;
pub mod model;
mod openshift;
pub mod traits;

pub use error::{PlatformError, TransportError, TransportErrorKind};
pub use openshift::OpenShiftClient;
pub use traits::{
    BuildEventStream, BuildOps, ExposureOps, FullPlatform, ImageStreamOps, PodOps, WorkloadOps,
};
