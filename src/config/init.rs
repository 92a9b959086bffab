// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Writes a commented kiln.yml template.

use std::path::Path;

use crate::error::{Error, Result};

use super::{
    CONFIG_FILENAME, DEFAULT_ARTIFACT_DOCKERFILE, DEFAULT_IMAGE_TAG, DEFAULT_S2I_IMAGE,
};

pub fn init_config(dir: &Path, namespace: Option<&str>, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let namespace = namespace.unwrap_or("default");
    if namespace.is_empty() || namespace.contains(char::is_whitespace) {
        return Err(Error::InvalidConfig(format!("invalid namespace: {namespace:?}")));
    }

    std::fs::write(&config_path, generate_template_yaml(namespace))?;

    Ok(())
}

fn generate_template_yaml(namespace: &str) -> String {
    format!(
        r#"api:
  # Without a url the current kubeconfig context (or the in-cluster account) is used.
  # url: http://127.0.0.1:8001
  namespace: {namespace}
  timeout: 30s
build:
  force: false
  image_tag: {DEFAULT_IMAGE_TAG}
  s2i_image: {DEFAULT_S2I_IMAGE}
  artifact_dockerfile: {DEFAULT_ARTIFACT_DOCKERFILE}
# images:
#   registry_override: registry.example.com
#   project: builders
# maven:
#   remote_repositories:
#     - id: central
#       url: https://repo.maven.apache.org/maven2
#       username: {{env: MAVEN_USER}}
#       password: {{env: MAVEN_PASSWORD}}
teardown:
  scale_down_timeout: 30s
  undeploy_delay: 1s
"#
    )
}
