// ABOUTME: Test support utilities.
// ABOUTME: Provides the in-memory platform, artifact resolver and request builders.

use std::sync::Once;

// Each test binary only uses some of these modules, so allow dead_code.
#[allow(dead_code)]
pub mod fake_platform;
#[allow(dead_code)]
pub mod fake_resolver;

use kiln::config::Config;
use kiln::request::{AppDefinition, ArtifactRef, DeploymentRequest};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env().add_directive("kiln=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Configuration with no teardown pause, so undeploy tests run quickly.
#[allow(dead_code)]
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.teardown.undeploy_delay = std::time::Duration::ZERO;
    config
}

#[allow(dead_code)]
pub fn jar() -> ArtifactRef {
    ArtifactRef::parse("file:/opt/apps/ticker.jar").unwrap()
}

/// Request for app `ticker` deploying `artifact`.
#[allow(dead_code)]
pub fn request(artifact: ArtifactRef) -> DeploymentRequest {
    DeploymentRequest::new(AppDefinition::new("ticker"), artifact)
}
