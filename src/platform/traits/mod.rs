// ABOUTME: Composable capability traits for the cluster control plane.
// ABOUTME: Defines BuildOps, ImageStreamOps, WorkloadOps, ExposureOps, PodOps and FullPlatform.

mod build;
mod exposure;
mod image_stream;
mod pod;
mod workload;

pub use build::{BuildEventStream, BuildOps};
pub use exposure::ExposureOps;
pub use image_stream::ImageStreamOps;
pub use pod::PodOps;
pub use workload::WorkloadOps;

/// Everything a deployer needs from the platform.
pub trait FullPlatform: BuildOps + ImageStreamOps + WorkloadOps + ExposureOps + PodOps {}

impl<T> FullPlatform for T where T: BuildOps + ImageStreamOps + WorkloadOps + ExposureOps + PodOps {}
