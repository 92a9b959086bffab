// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Args, Parser, Subcommand};
use kiln::request::{AppDefinition, ArtifactRef, DeploymentRequest, RequestError, parse_assignment};
use kiln::types::{AppId, AppIdError};

#[derive(Parser)]
#[command(name = "kiln")]
#[command(about = "Build application artifacts into images once and deploy them to OpenShift")]
#[command(version)]
pub struct Cli {
    /// Log platform calls and build progress
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print only final results
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Print results as JSON lines
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new kiln.yml configuration file
    Init {
        /// Namespace objects are created in
        #[arg(short, long)]
        namespace: Option<String>,

        /// Overwrite an existing kiln.yml
        #[arg(short, long)]
        force: bool,
    },

    /// Deploy an application as long-running workloads
    Deploy(AppArgs),

    /// Launch an application as a one-shot task
    Launch(AppArgs),

    /// Remove every workload, service and route of an application
    Undeploy {
        #[arg(value_parser = parse_app_id)]
        app_id: AppId,
    },

    /// Show the state of a deployed application
    Status {
        #[arg(value_parser = parse_app_id)]
        app_id: AppId,
    },

    /// Delete a launched task
    Cleanup {
        task_id: String,
    },
}

#[derive(Args)]
pub struct AppArgs {
    /// Application name
    pub name: String,

    /// Artifact: maven://group:artifact:version, a local file or docker:image
    #[arg(value_parser = parse_artifact)]
    pub artifact: ArtifactRef,

    /// Application property, repeatable (key=value)
    #[arg(short, long = "property", value_name = "KEY=VALUE", value_parser = parse_assignment)]
    pub properties: Vec<(String, String)>,

    /// Deployment property, repeatable (key=value)
    #[arg(short, long = "deploy-property", value_name = "KEY=VALUE", value_parser = parse_assignment)]
    pub deploy_properties: Vec<(String, String)>,

    /// Return once the build is submitted instead of waiting for it
    #[arg(long)]
    pub detach: bool,

    /// Arguments passed to the application
    #[arg(last = true)]
    pub args: Vec<String>,
}

impl AppArgs {
    pub fn request(&self) -> DeploymentRequest {
        let definition = self
            .properties
            .iter()
            .fold(AppDefinition::new(&self.name), |def, (k, v)| {
                def.with_property(k, v)
            });
        DeploymentRequest::new(definition, self.artifact.clone())
            .with_deployment_properties(self.deploy_properties.iter().cloned().collect())
            .with_args(self.args.clone())
    }
}

fn parse_artifact(input: &str) -> Result<ArtifactRef, RequestError> {
    ArtifactRef::parse(input)
}

fn parse_app_id(input: &str) -> Result<AppId, AppIdError> {
    AppId::new(input)
}
