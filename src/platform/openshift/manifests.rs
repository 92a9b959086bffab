// ABOUTME: Renders platform model descriptions into API manifests.
// ABOUTME: BuildConfig, BuildRequest, ImageStream, DeploymentConfig, Service, Route and Pod.

use serde_json::{Value, json};
use std::collections::BTreeMap;

use crate::platform::model::{
    BuildConfigSpec, BuildRequestSpec, BuildSource, BuildStrategyKind, ContainerSpec,
    ImageStreamSpec, PodSpec, RouteSpec, ServiceSpec, WorkloadSpec,
};
use crate::types::{DEPLOYMENT_ID_LABEL, Labels};

fn env_list(env: &BTreeMap<String, String>) -> Value {
    Value::Array(
        env.iter()
            .map(|(name, value)| json!({"name": name, "value": value}))
            .collect(),
    )
}

fn metadata(name: &str, labels: &Labels) -> Value {
    json!({"name": name, "labels": labels.to_map()})
}

pub(crate) fn build_config(spec: &BuildConfigSpec) -> Value {
    let source = match &spec.source {
        BuildSource::Git {
            uri,
            git_ref,
            context_dir,
            secret,
        } => {
            let mut source = json!({"type": "Git", "git": {"uri": uri, "ref": git_ref}});
            if let Some(dir) = context_dir {
                source["contextDir"] = json!(dir);
            }
            if let Some(secret) = secret {
                source["sourceSecret"] = json!({"name": secret});
            }
            source
        }
        BuildSource::Dockerfile(text) => json!({"type": "Dockerfile", "dockerfile": text}),
        BuildSource::Binary => json!({"type": "Binary", "binary": {}}),
    };
    let strategy = match &spec.strategy {
        BuildStrategyKind::Docker { dockerfile_path } => {
            let mut docker = json!({"env": env_list(&spec.env)});
            if let Some(path) = dockerfile_path {
                docker["dockerfilePath"] = json!(path);
            }
            json!({"type": "Docker", "dockerStrategy": docker})
        }
        BuildStrategyKind::Source { builder } => json!({
            "type": "Source",
            "sourceStrategy": {
                "from": {"kind": "DockerImage", "name": builder.to_string()},
                "env": env_list(&spec.env)
            }
        }),
    };
    json!({
        "apiVersion": "build.openshift.io/v1",
        "kind": "BuildConfig",
        "metadata": metadata(&spec.name, &spec.labels),
        "spec": {
            "source": source,
            "strategy": strategy,
            "output": {"to": {"kind": "ImageStreamTag", "name": spec.output}}
        }
    })
}

pub(crate) fn build_request(config: &str, request: &BuildRequestSpec) -> Value {
    json!({
        "apiVersion": "build.openshift.io/v1",
        "kind": "BuildRequest",
        "metadata": {"name": config},
        "env": env_list(&request.env)
    })
}

pub(crate) fn image_stream(spec: &ImageStreamSpec) -> Value {
    json!({
        "apiVersion": "image.openshift.io/v1",
        "kind": "ImageStream",
        "metadata": metadata(&spec.name, &spec.labels)
    })
}

fn container(name: &str, spec: &ContainerSpec) -> Value {
    let mut container = json!({
        "name": name,
        "image": spec.image,
        "args": spec.args,
        "env": env_list(&spec.env)
    });
    if let Some(command) = &spec.command {
        container["command"] = json!(command);
    }
    if let Some(port) = spec.port {
        container["ports"] = json!([{"containerPort": port, "protocol": "TCP"}]);
    }
    if !spec.volume_mounts.is_empty() {
        container["volumeMounts"] = json!(spec.volume_mounts);
    }
    if !spec.resources.is_empty() {
        container["resources"] = json!(spec.resources);
    }
    container
}

/// Pod spec running one container, with the volumes it mounts.
fn pod_spec(name: &str, spec: &ContainerSpec, restart_policy: &str) -> Value {
    let mut pod = json!({
        "restartPolicy": restart_policy,
        "containers": [container(name, spec)]
    });
    if !spec.volumes.is_empty() {
        pod["volumes"] = json!(spec.volumes);
    }
    pod
}

pub(crate) fn deployment_config(spec: &WorkloadSpec) -> Value {
    let name = spec.name.as_str();
    let triggers = if spec.config_change_trigger {
        json!([{"type": "ConfigChange"}])
    } else {
        json!([])
    };
    json!({
        "apiVersion": "apps.openshift.io/v1",
        "kind": "DeploymentConfig",
        "metadata": metadata(name, &spec.labels),
        "spec": {
            "replicas": spec.replicas,
            "selector": BTreeMap::from([(DEPLOYMENT_ID_LABEL, name)]),
            "strategy": {"type": "Rolling"},
            "triggers": triggers,
            "template": {
                "metadata": {"labels": spec.labels.to_map()},
                "spec": pod_spec(name, &spec.container, "Always")
            }
        }
    })
}

pub(crate) fn deployment_request(name: &str) -> Value {
    json!({
        "apiVersion": "apps.openshift.io/v1",
        "kind": "DeploymentRequest",
        "name": name,
        "latest": true,
        "force": true
    })
}

pub(crate) fn service(spec: &ServiceSpec) -> Value {
    let service_type = if spec.node_port { "NodePort" } else { "ClusterIP" };
    json!({
        "apiVersion": "v1",
        "kind": "Service",
        "metadata": metadata(&spec.name, &spec.labels),
        "spec": {
            "type": service_type,
            "selector": spec.selector,
            "ports": [{"name": "http", "port": spec.port, "targetPort": spec.port, "protocol": "TCP"}]
        }
    })
}

pub(crate) fn route(spec: &RouteSpec) -> Value {
    json!({
        "apiVersion": "route.openshift.io/v1",
        "kind": "Route",
        "metadata": metadata(&spec.name, &spec.labels),
        "spec": {
            "to": {"kind": "Service", "name": spec.service},
            "port": {"targetPort": spec.port}
        }
    })
}

pub(crate) fn pod(spec: &PodSpec) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": metadata(spec.name.as_str(), &spec.labels),
        "spec": pod_spec(spec.name.as_str(), &spec.container, "Never")
    })
}

/// Point the first container at `image` and set or replace one env var.
pub(crate) fn retarget_workload(dc: &mut Value, image: &str, env: Option<(&str, String)>) -> bool {
    let Some(container) = dc
        .pointer_mut("/spec/template/spec/containers/0")
        .and_then(Value::as_object_mut)
    else {
        return false;
    };
    container.insert("image".to_string(), json!(image));
    if let Some((name, value)) = env {
        let vars = container
            .entry("env")
            .or_insert_with(|| json!([]));
        if let Some(vars) = vars.as_array_mut() {
            vars.retain(|v| v.get("name").and_then(Value::as_str) != Some(name));
            vars.push(json!({"name": name, "value": value}));
        }
    }
    true
}
