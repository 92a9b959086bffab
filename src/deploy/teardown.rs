// ABOUTME: Owned background worker that scales workloads to zero during teardown.
// ABOUTME: Callers wait with a deadline; a missed deadline abandons the wait, not the scale-down.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};

use crate::platform::{PlatformError, WorkloadOps};
use crate::types::WorkloadName;

const QUEUE_DEPTH: usize = 32;

struct ScaleDownJob {
    workload: WorkloadName,
    reply: oneshot::Sender<Result<(), PlatformError>>,
}

/// Result of waiting for one scale-down.
#[derive(Debug)]
pub enum ScaleDown {
    Done,
    Failed(PlatformError),
    /// Still running in the background when the wait ended.
    TimedOut,
    /// The worker has been shut down.
    Stopped,
}

pub struct ScaleDownWorker {
    jobs: mpsc::Sender<ScaleDownJob>,
    task: JoinHandle<()>,
}

impl ScaleDownWorker {
    pub fn spawn<W: WorkloadOps + ?Sized + 'static>(workloads: Arc<W>) -> Self {
        let (jobs, mut queue) = mpsc::channel::<ScaleDownJob>(QUEUE_DEPTH);
        let task = tokio::spawn(async move {
            let mut running = JoinSet::new();
            loop {
                tokio::select! {
                    job = queue.recv() => match job {
                        Some(job) => {
                            let workloads = Arc::clone(&workloads);
                            running.spawn(async move {
                                let result = workloads.scale_workload(&job.workload, 0).await;
                                // Receiver may have given up waiting.
                                let _ = job.reply.send(result);
                            });
                        }
                        None => break,
                    },
                    Some(_) = running.join_next(), if !running.is_empty() => {}
                }
            }
            while running.join_next().await.is_some() {}
            tracing::debug!("scale-down worker stopped");
        });
        Self { jobs, task }
    }

    /// Scale `workload` to zero replicas, waiting at most `timeout`.
    pub async fn scale_down(&self, workload: &WorkloadName, timeout: Duration) -> ScaleDown {
        let (reply, done) = oneshot::channel();
        let job = ScaleDownJob {
            workload: workload.clone(),
            reply,
        };
        if self.jobs.send(job).await.is_err() {
            return ScaleDown::Stopped;
        }
        match tokio::time::timeout(timeout, done).await {
            Ok(Ok(Ok(()))) => ScaleDown::Done,
            Ok(Ok(Err(e))) => ScaleDown::Failed(e),
            Ok(Err(_)) => ScaleDown::Stopped,
            Err(_) => ScaleDown::TimedOut,
        }
    }

    /// Stop taking jobs and wait for in-flight scale-downs to finish.
    pub async fn shutdown(self) {
        drop(self.jobs);
        if let Err(e) = self.task.await {
            tracing::warn!("scale-down worker ended abnormally: {}", e);
        }
    }
}
