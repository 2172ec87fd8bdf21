// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use super::{CapabilitySpec, NameValuePair};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(group = "halkyon.io", version = "v1beta1", kind = "Component")]
#[kube(namespaced)]
#[kube(status = "ComponentStatus")]
#[kube(shortname = "hc")]
#[kube(printcolumn = r#"{"name":"Runtime","type":"string","jsonPath":".spec.runtime"}"#)]
#[kube(printcolumn = r#"{"name":"Mode","type":"string","jsonPath":".spec.deploymentMode"}"#)]
#[kube(printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment_mode: Option<DeploymentMode>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub runtime: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(default)]
    pub expose_service: bool,
    #[serde(default)]
    pub port: i32,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub envs: Vec<NameValuePair>,
    #[serde(default)]
    pub capabilities: CapabilitiesConfig,
    #[serde(default)]
    pub build_config: BuildConfig,
}

impl ComponentSpec {
    pub fn mode(&self) -> DeploymentMode {
        self.deployment_mode.unwrap_or_default()
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentMode {
    /// Runs a generic runtime image the developer pushes binaries into
    #[default]
    Dev,
    /// Runs the image built from the component sources
    Build,
}

/// Where the sources of a build mode component live
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfig {
    /// Git repository to clone
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    /// Branch, tag or commit to build, `master` when empty
    #[serde(default, rename = "ref", skip_serializing_if = "String::is_empty")]
    pub reference: String,
    /// Directory of the repository the build runs in
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub context_path: String,
    /// Maven module holding the application, for multi-module projects
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub module_dir_name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Storage {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub capacity: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub mode: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CapabilitiesConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<RequiredCapabilityConfig>,
}

/// A capability the component needs, matched against existing capabilities
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequiredCapabilityConfig {
    pub name: String,
    pub spec: CapabilitySpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bound_to: Option<String>,
    #[serde(default)]
    pub auto_bindable: bool,
}

impl RequiredCapabilityConfig {
    pub fn bound_to(&self) -> Option<&str> {
        self.bound_to.as_deref().filter(|name| !name.is_empty())
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub enum ComponentPhase {
    Pending,
    Building,
    Ready,
    Failed,
    Unknown,
}

impl ComponentPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentPhase::Pending => "Pending",
            ComponentPhase::Building => "Building",
            ComponentPhase::Ready => "Ready",
            ComponentPhase::Failed => "Failed",
            ComponentPhase::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ComponentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComponentStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<ComponentPhase>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pod_name: String,
}

impl Component {
    pub fn phase(&self) -> Option<ComponentPhase> {
        self.status.as_ref().and_then(|s| s.phase)
    }

    pub fn is_ready(&self) -> bool {
        self.phase() == Some(ComponentPhase::Ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deployment_mode_defaults_to_dev() {
        let spec: ComponentSpec = serde_json::from_value(serde_json::json!({
            "runtime": "spring-boot",
            "port": 8080
        }))
        .unwrap();
        assert_eq!(spec.deployment_mode, None);
        assert_eq!(spec.mode(), DeploymentMode::Dev);
    }

    #[test]
    fn test_deployment_mode_serializes_lowercase() {
        let json = serde_json::to_value(DeploymentMode::Build).unwrap();
        assert_eq!(json, "build");
    }

    #[test]
    fn test_build_config_reads_git_ref() {
        let spec: ComponentSpec = serde_json::from_value(serde_json::json!({
            "deploymentMode": "build",
            "port": 8080,
            "buildConfig": {
                "url": "https://github.com/halkyonio/operator.git",
                "ref": "v1.0",
                "contextPath": "demo"
            }
        }))
        .unwrap();
        assert_eq!(spec.build_config.reference, "v1.0");
        assert_eq!(spec.build_config.context_path, "demo");
        assert!(spec.build_config.module_dir_name.is_empty());
    }

    #[test]
    fn test_required_capability_parses_bound_to() {
        let config: RequiredCapabilityConfig = serde_json::from_value(serde_json::json!({
            "name": "db",
            "spec": {"category": "database", "type": "postgres"},
            "boundTo": "postgres-db",
            "autoBindable": true
        }))
        .unwrap();
        assert_eq!(config.bound_to(), Some("postgres-db"));
        assert!(config.auto_bindable);
        assert!(config.spec.version.is_empty());
    }

    #[test]
    fn test_empty_bound_to_is_unbound() {
        let config = RequiredCapabilityConfig {
            name: "db".to_string(),
            bound_to: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(config.bound_to(), None);
    }
}
