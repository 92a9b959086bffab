// ABOUTME: In-memory cluster implementing every platform capability trait.
// ABOUTME: Records calls, stores objects, and pushes build events to open watches.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use futures::StreamExt;
use futures::channel::mpsc;
use kiln::artifact::ArtifactFingerprint;
use kiln::platform::model::{
    BuildConfigSpec, BuildPhase, BuildRecord, BuildRequestSpec, FINGERPRINT_ENV, ImageStreamSpec,
    PodPhase, PodSpec, PodSummary, RolloutRequest, RouteSpec, ServiceSpec, WorkloadSpec,
    WorkloadSummary,
};
use kiln::platform::{
    BuildEventStream, BuildOps, ExposureOps, ImageStreamOps, PlatformError, PodOps, WorkloadOps,
};
use kiln::types::{APP_ID_LABEL, BuildName, ImageRef, PodName, Selector, WorkloadName};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// How a build run was started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instantiation {
    Request { config: String, env: BTreeMap<String, String> },
    Binary { config: String, file_name: String, size: usize },
}

struct Watcher {
    selector: Selector,
    events: mpsc::UnboundedSender<Result<BuildRecord, PlatformError>>,
}

/// Counts how many watch streams have been dropped.
struct DropCounter(Arc<AtomicUsize>);

impl Drop for DropCounter {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct State {
    build_configs: BTreeMap<String, BuildConfigSpec>,
    builds: Vec<BuildRecord>,
    instantiations: Vec<Instantiation>,
    watchers: Vec<Watcher>,
    image_streams: Vec<ImageStreamSpec>,
    workloads: BTreeMap<String, WorkloadSpec>,
    available: BTreeMap<String, u32>,
    rollouts: Vec<RolloutRequest>,
    scaled: Vec<(String, u32)>,
    services: BTreeMap<String, ServiceSpec>,
    routes: BTreeMap<String, RouteSpec>,
    pods: BTreeMap<String, (PodSpec, PodPhase)>,
    failing_rollouts: HashSet<String>,
    scale_delay: Option<Duration>,
    build_counter: u32,
}

#[derive(Default)]
pub struct FakePlatform {
    state: Mutex<State>,
    watches_opened: AtomicUsize,
    watches_dropped: Arc<AtomicUsize>,
}

impl FakePlatform {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Seed a build created before the test started, `age_minutes` ago.
    pub fn seed_build(
        &self,
        app_id: &str,
        name: &str,
        fingerprint: &str,
        phase: BuildPhase,
        image: Option<&str>,
        age_minutes: i64,
    ) {
        let created = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).single().map(|base| {
            base + ChronoDuration::minutes(1000 - age_minutes)
        });
        self.state.lock().builds.push(BuildRecord {
            name: BuildName::new(name),
            app_id: Some(app_id.to_string()),
            fingerprint: Some(ArtifactFingerprint::from_hex(fingerprint)),
            phase,
            output_image: image.map(|i| ImageRef::parse(i).unwrap()),
            created,
        });
    }

    /// Move `build` to `phase` and notify every matching watch.
    pub fn advance(&self, build: &str, phase: BuildPhase, image: Option<&str>) {
        let mut state = self.state.lock();
        let Some(record) = state.builds.iter_mut().find(|b| b.name == build) else {
            panic!("no build named {build}");
        };
        record.phase = phase;
        record.output_image = image.map(|i| ImageRef::parse(i).unwrap());
        let record = record.clone();
        Self::notify(&mut state, &record);
    }

    /// Break every open watch connection.
    pub fn drop_watches(&self, reason: &str) {
        let mut state = self.state.lock();
        for watcher in state.watchers.drain(..) {
            let _ = watcher
                .events
                .unbounded_send(Err(PlatformError::Decode(reason.to_string())));
        }
    }

    pub fn fail_rollout_of(&self, workload: &str) {
        self.state.lock().failing_rollouts.insert(workload.to_string());
    }

    pub fn slow_scale_down(&self, delay: Duration) {
        self.state.lock().scale_delay = Some(delay);
    }

    pub fn mark_available(&self, workload: &str) {
        let mut state = self.state.lock();
        let replicas = state.workloads.get(workload).map(|w| w.replicas).unwrap_or(0);
        state.available.insert(workload.to_string(), replicas);
    }

    /// Schedule a running replica pod of `workload`, as its deployment would.
    pub fn start_replica(&self, workload: &str, pod: &str) {
        let mut state = self.state.lock();
        let Some(spec) = state.workloads.get(workload).cloned() else {
            panic!("no workload named {workload}");
        };
        let replica = PodSpec {
            name: PodName::new(pod),
            labels: spec.labels,
            container: spec.container,
        };
        state.pods.insert(pod.to_string(), (replica, PodPhase::Running));
    }

    pub fn pod_names(&self) -> Vec<String> {
        self.state.lock().pods.keys().cloned().collect()
    }

    pub fn set_pod_phase(&self, pod: &str, phase: PodPhase) {
        if let Some(entry) = self.state.lock().pods.get_mut(pod) {
            entry.1 = phase;
        }
    }

    pub fn build_configs(&self) -> Vec<BuildConfigSpec> {
        self.state.lock().build_configs.values().cloned().collect()
    }

    pub fn builds(&self) -> Vec<BuildRecord> {
        self.state.lock().builds.clone()
    }

    pub fn instantiations(&self) -> Vec<Instantiation> {
        self.state.lock().instantiations.clone()
    }

    pub fn image_streams(&self) -> Vec<String> {
        self.state.lock().image_streams.iter().map(|s| s.name.clone()).collect()
    }

    pub fn workload(&self, name: &str) -> Option<WorkloadSpec> {
        self.state.lock().workloads.get(name).cloned()
    }

    pub fn workload_names(&self) -> Vec<String> {
        self.state.lock().workloads.keys().cloned().collect()
    }

    pub fn rollouts(&self) -> Vec<RolloutRequest> {
        self.state.lock().rollouts.clone()
    }

    pub fn scaled(&self) -> Vec<(String, u32)> {
        self.state.lock().scaled.clone()
    }

    pub fn service(&self, name: &str) -> Option<ServiceSpec> {
        self.state.lock().services.get(name).cloned()
    }

    pub fn route(&self, name: &str) -> Option<RouteSpec> {
        self.state.lock().routes.get(name).cloned()
    }

    pub fn pod(&self, name: &str) -> Option<PodSpec> {
        self.state.lock().pods.get(name).map(|(spec, _)| spec.clone())
    }

    pub fn watches_opened(&self) -> usize {
        self.watches_opened.load(Ordering::SeqCst)
    }

    pub fn watches_dropped(&self) -> usize {
        self.watches_dropped.load(Ordering::SeqCst)
    }

    /// Wait until every opened watch has been released, or give up after `limit`.
    pub async fn watches_released(&self, limit: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + limit;
        while self.watches_dropped() < self.watches_opened() {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        true
    }

    fn notify(state: &mut State, record: &BuildRecord) {
        let labels = build_labels(record);
        state.watchers.retain(|watcher| {
            if !watcher.selector.matches(&labels) {
                return true;
            }
            watcher.events.unbounded_send(Ok(record.clone())).is_ok()
        });
    }

    fn start(
        &self,
        config: &str,
        fingerprint: Option<&String>,
        instantiation: Instantiation,
    ) -> Result<BuildRecord, PlatformError> {
        let mut state = self.state.lock();
        let Some(spec) = state.build_configs.get(config) else {
            return Err(PlatformError::NotFound {
                kind: "BuildConfig",
                name: config.to_string(),
            });
        };
        let app_id = spec.labels.get(APP_ID_LABEL).map(str::to_string);
        state.build_counter += 1;
        let record = BuildRecord {
            name: BuildName::new(format!("{config}-{}", state.build_counter)),
            app_id,
            fingerprint: fingerprint.map(|f| ArtifactFingerprint::from_hex(f.clone())),
            phase: BuildPhase::New,
            output_image: None,
            created: Some(Utc::now()),
        };
        state.builds.push(record.clone());
        state.instantiations.push(instantiation);
        Self::notify(&mut state, &record);
        Ok(record)
    }
}

fn build_labels(record: &BuildRecord) -> BTreeMap<String, String> {
    record
        .app_id
        .iter()
        .map(|id| (APP_ID_LABEL.to_string(), id.clone()))
        .collect()
}

fn matching_builds(state: &State, selector: &Selector) -> Vec<BuildRecord> {
    state
        .builds
        .iter()
        .filter(|b| selector.matches(&build_labels(b)))
        .cloned()
        .collect()
}

fn summary(spec: &WorkloadSpec, available: u32) -> WorkloadSummary {
    WorkloadSummary {
        name: spec.name.clone(),
        replicas: spec.replicas,
        available_replicas: available,
        latest_version: 1,
    }
}

#[async_trait]
impl BuildOps for FakePlatform {
    async fn apply_build_config(&self, spec: &BuildConfigSpec) -> Result<(), PlatformError> {
        self.state
            .lock()
            .build_configs
            .insert(spec.name.clone(), spec.clone());
        Ok(())
    }

    async fn instantiate_build(
        &self,
        config: &str,
        request: &BuildRequestSpec,
    ) -> Result<BuildRecord, PlatformError> {
        self.start(
            config,
            request.env.get(FINGERPRINT_ENV),
            Instantiation::Request {
                config: config.to_string(),
                env: request.env.clone(),
            },
        )
    }

    async fn instantiate_binary(
        &self,
        config: &str,
        file_name: &str,
        payload: Bytes,
    ) -> Result<BuildRecord, PlatformError> {
        let fingerprint = self
            .state
            .lock()
            .build_configs
            .get(config)
            .and_then(|c| c.env.get(FINGERPRINT_ENV).cloned());
        self.start(
            config,
            fingerprint.as_ref(),
            Instantiation::Binary {
                config: config.to_string(),
                file_name: file_name.to_string(),
                size: payload.len(),
            },
        )
    }

    async fn list_builds(&self, selector: &Selector) -> Result<Vec<BuildRecord>, PlatformError> {
        Ok(matching_builds(&self.state.lock(), selector))
    }

    async fn watch_builds(&self, selector: &Selector) -> Result<BuildEventStream, PlatformError> {
        let (events, stream) = mpsc::unbounded();
        {
            let mut state = self.state.lock();
            // A new watch first replays what already exists, like a list-then-watch.
            for record in matching_builds(&state, selector) {
                let _ = events.unbounded_send(Ok(record));
            }
            state.watchers.push(Watcher {
                selector: selector.clone(),
                events,
            });
        }
        self.watches_opened.fetch_add(1, Ordering::SeqCst);

        let guard = DropCounter(Arc::clone(&self.watches_dropped));
        Ok(Box::pin(stream.map(move |item| {
            let _alive = &guard;
            item
        })))
    }
}

#[async_trait]
impl ImageStreamOps for FakePlatform {
    async fn ensure_image_stream(&self, spec: &ImageStreamSpec) -> Result<(), PlatformError> {
        let mut state = self.state.lock();
        if !state.image_streams.iter().any(|s| s.name == spec.name) {
            state.image_streams.push(spec.clone());
        }
        Ok(())
    }
}

#[async_trait]
impl WorkloadOps for FakePlatform {
    async fn apply_workload(&self, spec: &WorkloadSpec) -> Result<(), PlatformError> {
        self.state
            .lock()
            .workloads
            .insert(spec.name.to_string(), spec.clone());
        Ok(())
    }

    async fn rollout(&self, request: &RolloutRequest) -> Result<(), PlatformError> {
        let mut state = self.state.lock();
        let name = request.name.to_string();
        if state.failing_rollouts.contains(&name) {
            return Err(PlatformError::Api {
                status: 500,
                message: format!("rollout of {name} rejected"),
            });
        }
        let Some(workload) = state.workloads.get_mut(&name) else {
            return Err(PlatformError::NotFound {
                kind: "DeploymentConfig",
                name,
            });
        };
        workload.container.image = request.image.to_string();
        state.rollouts.push(request.clone());
        Ok(())
    }

    async fn scale_workload(
        &self,
        name: &WorkloadName,
        replicas: u32,
    ) -> Result<(), PlatformError> {
        let delay = self.state.lock().scale_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock();
        if let Some(workload) = state.workloads.get_mut(name.as_str()) {
            workload.replicas = replicas;
        }
        state.scaled.push((name.to_string(), replicas));
        Ok(())
    }

    async fn list_workloads(
        &self,
        selector: &Selector,
    ) -> Result<Vec<WorkloadSummary>, PlatformError> {
        let state = self.state.lock();
        Ok(state
            .workloads
            .values()
            .filter(|w| selector.matches(&w.labels.to_map()))
            .map(|w| summary(w, state.available.get(w.name.as_str()).copied().unwrap_or(0)))
            .collect())
    }

    async fn delete_workload(&self, name: &WorkloadName) -> Result<(), PlatformError> {
        self.state.lock().workloads.remove(name.as_str());
        Ok(())
    }
}

#[async_trait]
impl ExposureOps for FakePlatform {
    async fn apply_service(&self, spec: &ServiceSpec) -> Result<(), PlatformError> {
        self.state
            .lock()
            .services
            .insert(spec.name.clone(), spec.clone());
        Ok(())
    }

    async fn apply_route(&self, spec: &RouteSpec) -> Result<(), PlatformError> {
        self.state
            .lock()
            .routes
            .insert(spec.name.clone(), spec.clone());
        Ok(())
    }

    async fn delete_services(&self, selector: &Selector) -> Result<usize, PlatformError> {
        let mut state = self.state.lock();
        let before = state.services.len();
        state
            .services
            .retain(|_, s| !selector.matches(&s.labels.to_map()));
        Ok(before - state.services.len())
    }

    async fn delete_routes(&self, selector: &Selector) -> Result<usize, PlatformError> {
        let mut state = self.state.lock();
        let before = state.routes.len();
        state
            .routes
            .retain(|_, r| !selector.matches(&r.labels.to_map()));
        Ok(before - state.routes.len())
    }
}

#[async_trait]
impl PodOps for FakePlatform {
    async fn create_pod(&self, spec: &PodSpec) -> Result<(), PlatformError> {
        self.state
            .lock()
            .pods
            .insert(spec.name.to_string(), (spec.clone(), PodPhase::Pending));
        Ok(())
    }

    async fn get_pod(&self, name: &PodName) -> Result<Option<PodSummary>, PlatformError> {
        Ok(self
            .state
            .lock()
            .pods
            .get(name.as_str())
            .map(|(spec, phase)| PodSummary {
                name: spec.name.clone(),
                phase: *phase,
                labels: spec.labels.to_map(),
            }))
    }

    async fn list_pods(&self, selector: &Selector) -> Result<Vec<PodSummary>, PlatformError> {
        Ok(self
            .state
            .lock()
            .pods
            .values()
            .filter(|(spec, _)| selector.matches(&spec.labels.to_map()))
            .map(|(spec, phase)| PodSummary {
                name: spec.name.clone(),
                phase: *phase,
                labels: spec.labels.to_map(),
            })
            .collect())
    }

    async fn delete_pod(&self, name: &PodName) -> Result<(), PlatformError> {
        self.state.lock().pods.remove(name.as_str());
        Ok(())
    }
}
