// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! The objects running a component: its service account, storage,
//! deployment and the pod the deployment spawns.

use super::build::built_image;
use super::ComponentResource;
use crate::constants::labels;
use crate::error::Result;
use crate::framework::{Context, DependentConfig, DependentResource, Readiness, Resource};
use crate::kubernetes::object::{api_resource, to_dynamic};
use crate::reconcilers::{dependent_meta, labels_for};
use crate::types::DeploymentMode;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec, DeploymentStrategy};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EmptyDirVolumeSource, EnvFromSource, EnvVar, PersistentVolumeClaim,
    PersistentVolumeClaimSpec, PersistentVolumeClaimVolumeSource, Pod, PodSpec, PodTemplateSpec,
    SecretEnvSource, ServiceAccount, Volume, VolumeMount, VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::api::{ApiResource, DynamicObject, ListParams, ObjectMeta};
use kube::ResourceExt;
use std::collections::BTreeMap;

pub(super) const SERVICE_ACCOUNT: &str = "build-bot";
const SHARED_DATA_VOLUME: &str = "shared-data";
const SUPERVISOR_DIR: &str = "/var/lib/supervisord";
const SUPERVISOR_IMAGE: &str = "supervisord";
const DEFAULT_CAPACITY: &str = "1Gi";
const DEFAULT_ACCESS_MODE: &str = "ReadWriteOnce";

/// Service account the component pods and builds run as
pub struct BuildServiceAccount;

#[async_trait]
impl DependentResource<ComponentResource> for BuildServiceAccount {
    fn api_resource(&self) -> ApiResource {
        api_resource::<ServiceAccount>()
    }

    fn name(&self, _owner: &ComponentResource) -> String {
        SERVICE_ACCOUNT.to_string()
    }

    fn build(&self, owner: &ComponentResource, _ctx: &Context) -> Result<DynamicObject> {
        to_dynamic(&ServiceAccount {
            metadata: dependent_meta(owner, SERVICE_ACCOUNT),
            ..Default::default()
        })
    }
}

/// Storage for the artifacts pushed to the component
pub struct Storage;

fn access_mode(mode: &str) -> &'static str {
    match mode {
        "ReadWriteMany" => "ReadWriteMany",
        "ReadOnlyMany" => "ReadOnlyMany",
        _ => DEFAULT_ACCESS_MODE,
    }
}

#[async_trait]
impl DependentResource<ComponentResource> for Storage {
    fn api_resource(&self) -> ApiResource {
        api_resource::<PersistentVolumeClaim>()
    }

    fn name(&self, owner: &ComponentResource) -> String {
        owner.pvc_name()
    }

    fn build(&self, owner: &ComponentResource, _ctx: &Context) -> Result<DynamicObject> {
        let storage = &owner.object().spec.storage;
        let capacity = if storage.capacity.is_empty() {
            DEFAULT_CAPACITY
        } else {
            storage.capacity.as_str()
        };
        to_dynamic(&PersistentVolumeClaim {
            metadata: dependent_meta(owner, &owner.pvc_name()),
            spec: Some(PersistentVolumeClaimSpec {
                access_modes: Some(vec![access_mode(&storage.mode).to_string()]),
                resources: Some(VolumeResourceRequirements {
                    requests: Some(BTreeMap::from([(
                        "storage".to_string(),
                        Quantity(capacity.to_string()),
                    )])),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        })
    }
}

/// The component deployment, running either the dev runtime or the built image
pub struct ComponentDeployment;

impl ComponentDeployment {
    fn runtime_image(owner: &ComponentResource, ctx: &Context) -> String {
        let spec = &owner.object().spec;
        match spec.mode() {
            DeploymentMode::Dev => {
                let tag = if spec.version.is_empty() { "latest" } else { spec.version.as_str() };
                format!("{}/{}:{}", ctx.config.runtime_registry, spec.runtime, tag)
            }
            DeploymentMode::Build => built_image(owner, ctx),
        }
    }

    fn runtime_container(owner: &ComponentResource, ctx: &Context) -> Container {
        let spec = &owner.object().spec;
        let env = spec
            .envs
            .iter()
            .map(|e| EnvVar {
                name: e.name.clone(),
                value: Some(e.value.clone()),
                ..Default::default()
            })
            .collect();
        let mut container = Container {
            name: owner.name(),
            image: Some(Self::runtime_image(owner, ctx)),
            image_pull_policy: Some("Always".to_string()),
            env: Some(env),
            ports: Some(vec![ContainerPort {
                container_port: spec.port,
                name: Some("http".to_string()),
                protocol: Some("TCP".to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        };
        if spec.mode() == DeploymentMode::Dev {
            container.command = Some(vec![format!("{}/bin/supervisord", SUPERVISOR_DIR)]);
            container.args = Some(vec![
                "-c".to_string(),
                format!("{}/conf/supervisor.conf", SUPERVISOR_DIR),
            ]);
            container.volume_mounts = Some(vec![
                VolumeMount {
                    name: SHARED_DATA_VOLUME.to_string(),
                    mount_path: SUPERVISOR_DIR.to_string(),
                    ..Default::default()
                },
                VolumeMount {
                    name: owner.pvc_name(),
                    mount_path: "/tmp/artifacts".to_string(),
                    ..Default::default()
                },
            ]);
        }
        container
    }

    fn supervisor_container(ctx: &Context) -> Container {
        Container {
            name: "copy-supervisord".to_string(),
            image: Some(format!("{}/{}:latest", ctx.config.runtime_registry, SUPERVISOR_IMAGE)),
            image_pull_policy: Some("Always".to_string()),
            volume_mounts: Some(vec![VolumeMount {
                name: SHARED_DATA_VOLUME.to_string(),
                mount_path: SUPERVISOR_DIR.to_string(),
                ..Default::default()
            }]),
            termination_message_path: Some("/dev/termination-log".to_string()),
            termination_message_policy: Some("File".to_string()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl DependentResource<ComponentResource> for ComponentDeployment {
    fn api_resource(&self) -> ApiResource {
        api_resource::<Deployment>()
    }

    fn name(&self, owner: &ComponentResource) -> String {
        owner.deployment_name()
    }

    fn build(&self, owner: &ComponentResource, ctx: &Context) -> Result<DynamicObject> {
        let name = owner.deployment_name();
        let dev = owner.object().spec.mode() == DeploymentMode::Dev;
        let mut pod_spec = PodSpec {
            containers: vec![Self::runtime_container(owner, ctx)],
            service_account_name: Some(SERVICE_ACCOUNT.to_string()),
            ..Default::default()
        };
        if dev {
            pod_spec.init_containers = Some(vec![Self::supervisor_container(ctx)]);
            pod_spec.volumes = Some(vec![
                Volume {
                    name: SHARED_DATA_VOLUME.to_string(),
                    empty_dir: Some(EmptyDirVolumeSource::default()),
                    ..Default::default()
                },
                Volume {
                    name: owner.pvc_name(),
                    persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                        claim_name: owner.pvc_name(),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            ]);
        }

        to_dynamic(&Deployment {
            metadata: dependent_meta(owner, &name),
            spec: Some(DeploymentSpec {
                replicas: Some(1),
                strategy: Some(DeploymentStrategy {
                    type_: Some("RollingUpdate".to_string()),
                    ..Default::default()
                }),
                selector: LabelSelector {
                    match_labels: Some(BTreeMap::from([(labels::APP.to_string(), name.clone())])),
                    ..Default::default()
                },
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(labels_for(&name)),
                        ..Default::default()
                    }),
                    spec: Some(pod_spec),
                },
                ..Default::default()
            }),
            ..Default::default()
        })
    }
}

/// Add a secret as `envFrom` source to every container missing it
pub fn inject_secret(deployment: &mut Deployment, secret: &str) -> bool {
    let Some(pod_spec) = deployment
        .spec
        .as_mut()
        .and_then(|spec| spec.template.spec.as_mut())
    else {
        return false;
    };
    let mut changed = false;
    for container in pod_spec.containers.iter_mut() {
        let sources = container.env_from.get_or_insert_with(Vec::new);
        let present = sources
            .iter()
            .any(|s| s.secret_ref.as_ref().map(|r| r.name.as_str()) == Some(secret));
        if !present {
            sources.push(EnvFromSource {
                secret_ref: Some(SecretEnvSource {
                    name: secret.to_string(),
                    ..Default::default()
                }),
                ..Default::default()
            });
            changed = true;
        }
    }
    changed
}

/// The pod of a dev mode component, whose readiness is the component's
pub struct ComponentPod;

#[async_trait]
impl DependentResource<ComponentResource> for ComponentPod {
    fn api_resource(&self) -> ApiResource {
        api_resource::<Pod>()
    }

    fn type_name(&self) -> String {
        "Pod".to_string()
    }

    fn config(&self) -> DependentConfig {
        DependentConfig::readiness_only()
    }

    fn checked_for_readiness(&self, owner: &ComponentResource) -> bool {
        owner.object().spec.mode() == DeploymentMode::Dev
    }

    /// Pods are named by their ReplicaSet, find one labelled for the component
    /// that isn't being terminated by a rollout
    async fn fetch(&self, owner: &ComponentResource, ctx: &Context) -> Result<Option<DynamicObject>> {
        let params = ListParams::default().labels(&format!("{}={}", labels::APP, owner.name()));
        let pods = ctx
            .store
            .list(&self.api_resource(), Some(owner.namespace().as_str()), &params)
            .await?;
        Ok(pods
            .into_iter()
            .find(|pod| pod.metadata.deletion_timestamp.is_none()))
    }

    fn is_ready(&self, _owner: &ComponentResource, live: &DynamicObject) -> Readiness {
        let status = &live.data["status"];
        let ready = status["conditions"]
            .as_array()
            .into_iter()
            .flatten()
            .any(|c| c["type"] == "Ready" && c["status"] == "True");
        if ready {
            return Readiness::ready();
        }
        let detail = status["message"]
            .as_str()
            .filter(|m| !m.is_empty())
            .map(|m| format!(": {}", m))
            .unwrap_or_default();
        Readiness::not_ready(format!("{} is not ready{}", live.name_any(), detail))
    }

    fn owner_status_field(&self) -> Option<&'static str> {
        Some("podName")
    }
}
