// ABOUTME: Ordered two-phase object pipeline for one deployment request.
// ABOUTME: Every step is ensured before any step is activated, both in declaration order.

use async_trait::async_trait;

use crate::platform::model::BuildRecord;
use crate::request::DeploymentRequest;
use crate::types::AppId;

use super::error::DeployError;

/// One kind of platform object taking part in a deployment.
#[async_trait]
pub trait ObjectFactoryStep: Send + Sync {
    fn name(&self) -> &'static str;

    /// Create or replace the object. Safe to repeat.
    async fn ensure(&self, request: &DeploymentRequest, id: &AppId) -> Result<(), DeployError>;

    /// Trigger the step's side effect. Returns the build it started, if any.
    async fn activate(
        &self,
        request: &DeploymentRequest,
        id: &AppId,
    ) -> Result<Option<BuildRecord>, DeployError> {
        let _ = (request, id);
        Ok(None)
    }
}

#[derive(Default)]
pub struct Pipeline {
    steps: Vec<Box<dyn ObjectFactoryStep>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(mut self, step: impl ObjectFactoryStep + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Ensure every step, then activate every step.
    ///
    /// Stops at the first failure without undoing earlier steps. Returns the
    /// build started during activation, if any.
    pub async fn run(
        &self,
        request: &DeploymentRequest,
        id: &AppId,
    ) -> Result<Option<BuildRecord>, DeployError> {
        for step in &self.steps {
            tracing::debug!(step = step.name(), %id, "ensure");
            step.ensure(request, id).await?;
        }

        let mut started = None;
        for step in &self.steps {
            tracing::debug!(step = step.name(), %id, "activate");
            if let Some(build) = step.activate(request, id).await? {
                started = Some(build);
            }
        }
        Ok(started)
    }
}
