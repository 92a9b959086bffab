// ABOUTME: Deploy, undeploy and status command implementations.
// ABOUTME: Drives the application deployer and reports its diagnostics.

use super::connect::connect;
use super::wait::wait_for_build;
use crate::cli::AppArgs;
use kiln::config::Config;
use kiln::deploy::{AppDeployer, AppStatus, Deployed};
use kiln::diagnostics::{Diagnostics, Warning};
use kiln::error::Result;
use kiln::output::Output;
use kiln::platform::OpenShiftClient;
use kiln::types::AppId;

/// Deploy one application and, unless detached, wait for its rollout.
pub async fn deploy(config: Config, args: AppArgs, mut output: Output) -> Result<()> {
    output.start_timer();
    let (platform, resolver) = connect(&config, &output).await?;
    let deployer = AppDeployer::new(platform, resolver, config);

    output.progress(&format!("Deploying {} ({})", args.name, args.artifact));
    let result = deploy_inner(&deployer, &args, &output).await;
    deployer.shutdown().await;
    let (app_id, diag) = result?;

    for warning in diag.warnings() {
        output.warning(&warning.message);
    }
    output.success(&format!("Deployed {app_id}"));
    Ok(())
}

async fn deploy_inner(
    deployer: &AppDeployer<OpenShiftClient>,
    args: &AppArgs,
    output: &Output,
) -> Result<(AppId, Diagnostics)> {
    let Deployed {
        app_id,
        build,
        rollout,
        mut diagnostics,
    } = deployer.deploy(&args.request()).await?;

    match (build, rollout) {
        (Some(build), Some(task)) if !args.detach => {
            wait_for_build(&build, task, output, &mut diagnostics).await?;
        }
        (Some(build), Some(_)) => diagnostics.warn(Warning::watch_dropped(format!(
            "detached before build {build} finished; {app_id} stays idle until it is \
             deployed again, which reuses the finished build"
        ))),
        (Some(build), None) => {
            output.progress(&format!("  → Build {build} submitted"));
        }
        (None, _) => output.progress("  → Workloads use an existing image"),
    }
    Ok((app_id, diagnostics))
}

pub async fn undeploy(config: Config, app_id: AppId, mut output: Output) -> Result<()> {
    output.start_timer();
    let (platform, resolver) = connect(&config, &output).await?;
    let deployer = AppDeployer::new(platform, resolver, config);

    output.progress(&format!("Undeploying {app_id}"));
    let result = deployer.undeploy(&app_id).await;
    deployer.shutdown().await;
    let undeployed = result?;

    for warning in undeployed.diagnostics.warnings() {
        output.warning(&warning.message);
    }
    output.success(&format!(
        "Undeployed {app_id}: {} workload(s), {} service(s), {} route(s), {} pod(s)",
        undeployed.workloads, undeployed.services, undeployed.routes, undeployed.pods
    ));
    Ok(())
}

pub async fn status(config: Config, app_id: AppId, output: Output) -> Result<()> {
    let (platform, resolver) = connect(&config, &output).await?;
    let deployer = AppDeployer::new(platform, resolver, config);
    let result = deployer.status(&app_id).await;
    deployer.shutdown().await;
    let status = result?;

    output.report(&describe(&status), &status);
    Ok(())
}

fn describe(status: &AppStatus) -> String {
    let mut lines = vec![format!("{}: {:?}", status.app_id, status.state)];
    for instance in &status.instances {
        lines.push(format!(
            "  {} {}/{} available",
            instance.workload, instance.available, instance.replicas
        ));
    }
    if let Some(build) = &status.latest_build {
        lines.push(format!("  latest build: {build}"));
    }
    lines.join("\n")
}
