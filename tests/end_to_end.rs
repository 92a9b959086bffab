// ABOUTME: End-to-end scenarios from artifact to running workload or task pod.
// ABOUTME: Drives builds through their phases on the in-memory platform and checks what runs.

mod support;

use kiln::artifact::fingerprint;
use kiln::deploy::{AppDeployer, DeployError, DeploymentState, TASK_ID_LABEL, TaskLauncher, TaskStatus};
use kiln::platform::model::{BuildPhase, PodPhase};
use kiln::request::keys;
use kiln::rollout::RolloutOutcome;
use kiln::types::AppId;
use std::sync::Arc;
use std::time::Duration;
use support::fake_platform::{FakePlatform, Instantiation};
use support::fake_resolver::FakeResolver;

const CONTENT: &[u8] = b"PK\x03\x04 ticker service";
const IMAGE: &str = "registry/ticker:abc123";

fn resolver() -> Arc<FakeResolver> {
    Arc::new(FakeResolver::default().with_content(&support::jar(), CONTENT))
}

#[tokio::test]
async fn jar_is_built_rolled_out_and_reused_on_redeploy() {
    support::init_tracing();
    let platform = FakePlatform::new();
    let deployer = AppDeployer::new(Arc::clone(&platform), resolver(), support::test_config());
    let app_id = AppId::new("ticker").unwrap();

    let deployed = deployer
        .deploy(&support::request(support::jar()))
        .await
        .unwrap();

    assert_eq!(
        platform.instantiations(),
        vec![Instantiation::Binary {
            config: "ticker".to_string(),
            file_name: "ticker.jar".to_string(),
            size: CONTENT.len(),
        }]
    );
    let builds = platform.builds();
    assert_eq!(builds.len(), 1);
    assert_eq!(
        builds[0].fingerprint.as_ref(),
        Some(&fingerprint(&support::jar(), Some(CONTENT)))
    );

    platform.advance("ticker-1", BuildPhase::Running, None);
    assert!(platform.rollouts().is_empty());
    platform.advance("ticker-1", BuildPhase::Complete, Some(IMAGE));

    let outcome = deployed.rollout.unwrap().await.unwrap();
    assert!(outcome.is_success());
    assert_eq!(platform.rollouts().len(), 1);
    assert_eq!(platform.workload("ticker").unwrap().container.image, IMAGE);
    assert!(platform.watches_released(Duration::from_secs(1)).await);
    assert!(!deployer.is_watching(&app_id));

    platform.mark_available("ticker");
    assert_eq!(
        deployer.status(&app_id).await.unwrap().state,
        DeploymentState::Deployed
    );

    deployer.undeploy(&app_id).await.unwrap();
    let redeployed = deployer
        .deploy(&support::request(support::jar()))
        .await
        .unwrap();

    assert!(redeployed.rollout.is_none());
    assert_eq!(platform.instantiations().len(), 1);
    assert_eq!(platform.rollouts().len(), 2);
    assert_eq!(platform.workload("ticker").unwrap().container.image, IMAGE);
    deployer.shutdown().await;
}

#[tokio::test]
async fn task_pod_starts_once_its_image_is_built() {
    let platform = FakePlatform::new();
    let launcher = TaskLauncher::new(Arc::clone(&platform), resolver(), support::test_config());
    let request = support::request(support::jar()).with_args(vec!["--once".to_string()]);

    let launched = launcher.launch(&request).await.unwrap();

    assert!(launched.task_id.as_str().starts_with("ticker-"));
    assert_eq!(launched.build.as_ref().map(|b| b.as_str()), Some("ticker-1"));
    assert!(platform.pod(launched.task_id.as_str()).is_none());
    assert_eq!(
        launcher.status(&launched.task_id).await.unwrap(),
        TaskStatus::Launching
    );

    platform.advance("ticker-1", BuildPhase::Complete, Some(IMAGE));
    let outcome = launched.launch.unwrap().await.unwrap();
    assert!(outcome.is_success());

    let pod = platform.pod(launched.task_id.as_str()).unwrap();
    assert_eq!(pod.container.image, IMAGE);
    assert_eq!(
        pod.container.command,
        Some(vec!["/usr/local/s2i/run".to_string()])
    );
    assert_eq!(pod.container.args, vec!["--once".to_string()]);
    assert_eq!(pod.labels.get(TASK_ID_LABEL), Some(launched.task_id.as_str()));

    platform.set_pod_phase(launched.task_id.as_str(), PodPhase::Succeeded);
    assert_eq!(
        launcher.status(&launched.task_id).await.unwrap(),
        TaskStatus::Succeeded
    );

    launcher.cleanup(&launched.task_id).await.unwrap();
    assert_eq!(
        launcher.status(&launched.task_id).await.unwrap(),
        TaskStatus::NotFound
    );
    launcher.shutdown();
}

#[tokio::test]
async fn task_from_an_image_starts_immediately() {
    let platform = FakePlatform::new();
    let launcher = TaskLauncher::new(Arc::clone(&platform), resolver(), support::test_config());
    let artifact = kiln::request::ArtifactRef::parse("docker:acme/report:1.4").unwrap();

    let launched = launcher.launch(&support::request(artifact)).await.unwrap();

    assert!(launched.build.is_none());
    assert!(launched.launch.is_none());
    let pod = platform.pod(launched.task_id.as_str()).unwrap();
    assert_eq!(pod.container.image, "acme/report:1.4");
    assert_eq!(pod.container.command, None);
    assert_eq!(
        launcher.status(&launched.task_id).await.unwrap(),
        TaskStatus::Launching
    );
    platform.set_pod_phase(launched.task_id.as_str(), PodPhase::Running);
    assert_eq!(
        launcher.status(&launched.task_id).await.unwrap(),
        TaskStatus::Running
    );
    launcher.shutdown();
}

#[tokio::test]
async fn task_without_any_image_is_refused() {
    let platform = FakePlatform::new();
    let launcher = TaskLauncher::new(Arc::clone(&platform), resolver(), support::test_config());
    let request = support::request(support::jar()).with_deployment_property(keys::BUILD_FORCE, "false");

    let err = launcher.launch(&request).await.unwrap_err();

    assert!(matches!(err, DeployError::NoImage(ref id) if id == "ticker"));
    assert!(platform.instantiations().is_empty());
    launcher.shutdown();
}

#[tokio::test]
async fn task_waiting_on_a_dropped_watch_never_starts() {
    let platform = FakePlatform::new();
    let launcher = TaskLauncher::new(Arc::clone(&platform), resolver(), support::test_config());

    let launched = launcher
        .launch(&support::request(support::jar()))
        .await
        .unwrap();
    platform.drop_watches("stream reset");

    let outcome = launched.launch.unwrap().await.unwrap();
    assert!(matches!(outcome, RolloutOutcome::WatchDropped(_)));

    platform.advance("ticker-1", BuildPhase::Complete, Some(IMAGE));
    assert!(platform.pod(launched.task_id.as_str()).is_none());
    assert_eq!(platform.watches_opened(), 1);
    launcher.shutdown();
}

#[tokio::test]
async fn cleanup_cancels_a_pending_launch() {
    let platform = FakePlatform::new();
    let launcher = TaskLauncher::new(Arc::clone(&platform), resolver(), support::test_config());

    let launched = launcher
        .launch(&support::request(support::jar()))
        .await
        .unwrap();
    assert!(launcher.is_watching(&launched.task_id));

    launcher.cleanup(&launched.task_id).await.unwrap();
    assert!(!launcher.is_watching(&launched.task_id));
    assert!(launched.launch.unwrap().await.unwrap_err().is_cancelled());

    platform.advance("ticker-1", BuildPhase::Complete, Some(IMAGE));
    assert!(platform.pod(launched.task_id.as_str()).is_none());
    launcher.shutdown();
}
