// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Tekton objects building the image of a build mode component out of its
//! git sources: a shared s2i/buildah `Task` and one `TaskRun` per component.

use super::workload::SERVICE_ACCOUNT;
use super::ComponentResource;
use crate::constants::{labels, OPERATOR_NAME};
use crate::error::Result;
use crate::framework::{Context, DependentConfig, DependentResource, Readiness, Resource};
use crate::types::DeploymentMode;
use async_trait::async_trait;
use kube::api::{ApiResource, DynamicObject, ObjectMeta};
use kube::core::GroupVersionKind;
use kube::ResourceExt;
use serde_json::{json, Value};
use std::collections::BTreeMap;

const TASK: &str = "s2i-buildah-push";
const DEFAULT_REVISION: &str = "master";
const S2I_IMAGE: &str = "quay.io/openshift-pipeline/s2i";
const BUILDAH_IMAGE: &str = "quay.io/buildah/stable:v1.9.0";
const GENERATED_SOURCES: &str = "generatedsources";
const LIB_CONTAINERS: &str = "libcontainers";

pub fn task_resource() -> ApiResource {
    ApiResource::from_gvk_with_plural(&GroupVersionKind::gvk("tekton.dev", "v1alpha1", "Task"), "tasks")
}

pub fn task_run_resource() -> ApiResource {
    ApiResource::from_gvk_with_plural(
        &GroupVersionKind::gvk("tekton.dev", "v1alpha1", "TaskRun"),
        "taskruns",
    )
}

fn is_build(owner: &ComponentResource) -> bool {
    owner.object().spec.mode() == DeploymentMode::Build
}

/// Image the build pushes to and the build deployment runs, in the
/// internal registry of the cluster flavor
pub fn built_image(owner: &ComponentResource, ctx: &Context) -> String {
    let registry = match ctx.cluster.openshift_version() {
        Some(4) => "image-registry.openshift-image-registry.svc:5000",
        Some(_) => "docker-registry.default.svc:5000",
        None => "kube-registry.kube-system.svc:5000",
    };
    format!("{}/{}/{}", registry, owner.namespace(), owner.name())
}

/// Labels of the build objects, kept off `app` so build pods never match
/// the component selectors
fn build_labels(owner: &ComponentResource) -> BTreeMap<String, String> {
    BTreeMap::from([
        (labels::BUILD.to_string(), owner.name()),
        (labels::MANAGED_BY.to_string(), OPERATOR_NAME.to_string()),
    ])
}

fn or_default<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.is_empty() {
        default
    } else {
        value
    }
}

fn param(name: &str, default: &str, description: &str) -> Value {
    json!({ "name": name, "type": "string", "default": default, "description": description })
}

/// The s2i/buildah task shared by every build of the namespace
pub struct BuildTask;

#[async_trait]
impl DependentResource<ComponentResource> for BuildTask {
    fn api_resource(&self) -> ApiResource {
        task_resource()
    }

    fn config(&self) -> DependentConfig {
        DependentConfig {
            watched: false,
            owned: false,
            ..Default::default()
        }
    }

    fn name(&self, _owner: &ComponentResource) -> String {
        TASK.to_string()
    }

    fn can_be_created_or_updated(&self, owner: &ComponentResource, _ctx: &Context) -> bool {
        is_build(owner)
    }

    fn build(&self, owner: &ComponentResource, _ctx: &Context) -> Result<DynamicObject> {
        let generated = json!({ "name": GENERATED_SOURCES, "mountPath": "/sources" });
        let containers = json!({ "name": LIB_CONTAINERS, "mountPath": "/var/lib/containers" });
        let mut task = DynamicObject::new(TASK, &task_resource()).data(json!({
            "spec": {
                "inputs": {
                    "resources": [{ "name": "git", "type": "git" }],
                    "params": [
                        param("baseImage", "quay.io/halkyonio/spring-boot-maven-s2i", "S2i base image"),
                        param("contextPath", ".", "The location of the path to run s2i from"),
                        param("moduleDirName", ".", "The directory of the maven module to compile"),
                        param("verifyTLS", "false", "Verify registry certificates"),
                        param("workspacePath", "/workspace/git", "Git path where project is cloned")
                    ]
                },
                "outputs": {
                    "resources": [{ "name": "image", "type": "image" }]
                },
                "steps": [
                    {
                        "name": "generate",
                        "image": S2I_IMAGE,
                        "command": ["s2i", "build"],
                        "args": [
                            "$(inputs.params.workspacePath)/$(inputs.params.contextPath)",
                            "$(inputs.params.baseImage)",
                            "--as-dockerfile", "/sources/Dockerfile.gen",
                            "--image-scripts-url", "image:///usr/local/s2i",
                            "--env", "MAVEN_ARGS_APPEND=-pl $(inputs.params.moduleDirName)",
                            "--env", "MAVEN_S2I_ARTIFACT_DIRS=$(inputs.params.moduleDirName)/target",
                            "--env", "S2I_SOURCE_DEPLOYMENTS_FILTER=*.jar"
                        ],
                        "volumeMounts": [generated.clone()]
                    },
                    {
                        "name": "build",
                        "image": BUILDAH_IMAGE,
                        "workingDir": "/sources",
                        "command": ["buildah"],
                        "args": [
                            "bud", "--tls-verify=$(inputs.params.verifyTLS)", "--layers",
                            "-f", "/sources/Dockerfile.gen",
                            "-t", "$(outputs.resources.image.url)", "."
                        ],
                        "volumeMounts": [containers.clone(), generated],
                        "securityContext": { "privileged": true }
                    },
                    {
                        "name": "push",
                        "image": BUILDAH_IMAGE,
                        "command": ["buildah"],
                        "args": [
                            "push", "--tls-verify=$(inputs.params.verifyTLS)",
                            "$(outputs.resources.image.url)",
                            "docker://$(outputs.resources.image.url)"
                        ],
                        "env": [{ "name": "REGISTRY_AUTH_FILE", "value": "/home/builder/.docker/config.json" }],
                        "volumeMounts": [containers],
                        "securityContext": { "privileged": true }
                    }
                ],
                "volumes": [
                    { "name": GENERATED_SOURCES, "emptyDir": {} },
                    { "name": LIB_CONTAINERS, "emptyDir": {} }
                ]
            }
        }));
        task.metadata = ObjectMeta {
            name: Some(TASK.to_string()),
            namespace: Some(owner.namespace()),
            labels: Some(BTreeMap::from([(
                labels::MANAGED_BY.to_string(),
                OPERATOR_NAME.to_string(),
            )])),
            ..Default::default()
        };
        Ok(task)
    }
}

/// The run building the component image, whose success gates the component
pub struct BuildTaskRun;

#[async_trait]
impl DependentResource<ComponentResource> for BuildTaskRun {
    fn api_resource(&self) -> ApiResource {
        task_run_resource()
    }

    fn can_be_created_or_updated(&self, owner: &ComponentResource, _ctx: &Context) -> bool {
        is_build(owner)
    }

    fn checked_for_readiness(&self, owner: &ComponentResource) -> bool {
        is_build(owner)
    }

    fn build(&self, owner: &ComponentResource, ctx: &Context) -> Result<DynamicObject> {
        let spec = &owner.object().spec;
        let build = &spec.build_config;
        let name = self.name(owner);
        let base_image = format!("{}/{}-maven-s2i", ctx.config.runtime_registry, spec.runtime);
        let mut run = DynamicObject::new(&name, &task_run_resource()).data(json!({
            "spec": {
                "serviceAccountName": SERVICE_ACCOUNT,
                "taskRef": { "name": TASK },
                "inputs": {
                    "params": [
                        { "name": "baseImage", "value": base_image },
                        { "name": "moduleDirName", "value": or_default(&build.module_dir_name, ".") },
                        { "name": "contextPath", "value": or_default(&build.context_path, ".") }
                    ],
                    "resources": [{
                        "name": "git",
                        "resourceSpec": {
                            "type": "git",
                            "params": [
                                { "name": "revision", "value": or_default(&build.reference, DEFAULT_REVISION) },
                                { "name": "url", "value": build.url }
                            ]
                        }
                    }]
                },
                "outputs": {
                    "resources": [{
                        "name": "image",
                        "resourceSpec": {
                            "type": "image",
                            "params": [{ "name": "url", "value": built_image(owner, ctx) }]
                        }
                    }]
                }
            }
        }));
        run.metadata = ObjectMeta {
            name: Some(name),
            namespace: Some(owner.namespace()),
            labels: Some(build_labels(owner)),
            ..Default::default()
        };
        Ok(run)
    }

    fn is_ready(&self, _owner: &ComponentResource, live: &DynamicObject) -> Readiness {
        let succeeded = live.data["status"]["conditions"]
            .as_array()
            .into_iter()
            .flatten()
            .find(|c| c["type"] == "Succeeded");
        match succeeded {
            Some(condition) if condition["status"] == "True" => Readiness::ready(),
            Some(condition) => Readiness::not_ready(format!(
                "{} didn't succeed: {}",
                live.name_any(),
                condition["message"].as_str().unwrap_or_default()
            )),
            None => Readiness::not_ready(format!("{} is not ready", live.name_any())),
        }
    }

    fn owner_status_field(&self) -> Option<&'static str> {
        Some("podName")
    }
}
