// ABOUTME: Property keys recognised on application and deployment property maps.
// ABOUTME: Application properties describe the app; deployment properties describe how it runs.

// Application properties.
pub const GIT_URI: &str = "kiln.build.git.uri";
pub const GIT_REF: &str = "kiln.build.git.ref";
pub const GIT_DOCKERFILE: &str = "kiln.build.git.dockerfile";
pub const GIT_SECRET: &str = "kiln.build.git.secret";

// Deployment properties.
pub const BUILD_FORCE: &str = "kiln.build.force";
pub const BUILD_DOCKERFILE: &str = "kiln.build.dockerfile";
pub const BUILD_S2I_IMAGE: &str = "kiln.build.s2i-image";
pub const IMAGE_TAG: &str = "kiln.deployment.image-tag";
pub const LABELS: &str = "kiln.deployment.labels";
pub const PORT: &str = "kiln.deployment.port";
pub const CREATE_ROUTE: &str = "kiln.create-route";
pub const CREATE_NODE_PORT: &str = "kiln.create-node-port";
pub const GROUP: &str = "kiln.group";
pub const INDEXED: &str = "kiln.indexed";
pub const COUNT: &str = "kiln.count";
pub const APP_ID: &str = "kiln.app-id";

/// YAML list of volumes, e.g. `[{name: data, persistentVolumeClaim: {claimName: ticker}}]`.
pub const VOLUMES: &str = "kiln.deployment.volumes";
/// YAML list of mounts, e.g. `[{name: data, mountPath: /var/data}]`.
pub const VOLUME_MOUNTS: &str = "kiln.deployment.volume-mounts";
pub const LIMITS_CPU: &str = "kiln.deployment.limits.cpu";
pub const LIMITS_MEMORY: &str = "kiln.deployment.limits.memory";
pub const REQUESTS_CPU: &str = "kiln.deployment.requests.cpu";
pub const REQUESTS_MEMORY: &str = "kiln.deployment.requests.memory";

/// Set on requests whose image comes from a binary source build.
pub const S2I_BUILD_MARKER: &str = "kiln.internal.s2i-build";

/// Pod name assigned to a launched task.
pub const TASK_ID: &str = "kiln.internal.task-id";

pub const DEFAULT_GIT_REF: &str = "master";
pub const DEFAULT_DOCKERFILE: &str = "Dockerfile";
pub const DEFAULT_PORT: u16 = 8080;
