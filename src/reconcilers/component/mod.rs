// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Components run an application runtime, in dev mode to push binaries
//! into or in build mode from an image built out of the sources, and bind
//! it to the capabilities it requires.

mod build;
mod network;
mod required;
mod workload;

pub use network::route_resource;
pub use workload::inject_secret;

use super::capability::{secret_name, CapabilityResource};
use super::rbac::{PrivilegedRole, PrivilegedRoleBinding};
use crate::binding::{apply_binding_patches, resolve, BindingPatch, Resolution};
use crate::constants::finalizers;
use crate::error::{HalkyonError, Result};
use crate::framework::resource::persist;
use crate::framework::{BaseResource, Context, DependentStatus, Resource};
use crate::kubernetes::object::{api_resource, modify_as};
use crate::kubernetes::ClusterInfo;
use crate::types::{
    Component, ComponentPhase, ComponentStatus, DeploymentMode, RequiredCapabilityConfig,
};
use async_trait::async_trait;
use build::{BuildTask, BuildTaskRun};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::rbac::v1::PolicyRule;
use kube::api::ApiResource;
use kube::core::GroupVersionKind;
use kube::ResourceExt;
use network::{ComponentIngress, ComponentRoute, ComponentService};
use required::RequiredCapability;
use tracing::{debug, info, warn};
use workload::{BuildServiceAccount, ComponentDeployment, ComponentPod, Storage};

const ROLE: &str = "image-scc-privileged-role";
const ROLE_BINDING: &str = "use-image-scc-privileged";

/// OpenShift `ImageStream` the builds of a component push to
pub fn image_stream_resource() -> ApiResource {
    ApiResource::from_gvk_with_plural(
        &GroupVersionKind::gvk("image.openshift.io", "v1", "ImageStream"),
        "imagestreams",
    )
}

pub struct ComponentResource {
    component: Component,
    requeue: bool,
}

impl ComponentResource {
    pub fn deployment_name(&self) -> String {
        match self.component.spec.mode() {
            DeploymentMode::Dev => self.name(),
            DeploymentMode::Build => format!("{}-build", self.name()),
        }
    }

    pub fn pvc_name(&self) -> String {
        let storage = &self.component.spec.storage.name;
        if storage.is_empty() {
            format!("m2-data-{}", self.name())
        } else {
            storage.clone()
        }
    }

    fn pending_phase(&self) -> ComponentPhase {
        match self.component.spec.mode() {
            DeploymentMode::Dev => ComponentPhase::Pending,
            DeploymentMode::Build => ComponentPhase::Building,
        }
    }

    fn set_status(&mut self, phase: ComponentPhase, message: &str, pod_name: Option<String>) -> bool {
        if self.should_delete() {
            return false;
        }
        let status = self
            .component
            .status
            .get_or_insert_with(ComponentStatus::default);
        let pod_name = pod_name.unwrap_or_else(|| status.pod_name.clone());
        if status.phase == Some(phase) && status.message == message && status.pod_name == pod_name {
            return false;
        }
        status.phase = Some(phase);
        status.message = message.to_string();
        status.pod_name = pod_name;
        true
    }

    fn base(requirements: &[RequiredCapabilityConfig]) -> BaseResource<Self> {
        let image_rule = PolicyRule {
            api_groups: Some(vec!["image.openshift.io".to_string()]),
            resources: Some(vec!["imagestreams".to_string(), "imagestreams/layers".to_string()]),
            verbs: vec!["*".to_string()],
            ..Default::default()
        };
        let mut base = BaseResource::new()
            .with(BuildServiceAccount)
            .with(PrivilegedRole::new(ROLE).with_rule(image_rule))
            .with(PrivilegedRoleBinding::new(ROLE_BINDING, ROLE, build_service_accounts))
            .with(Storage)
            .with(ComponentDeployment)
            .with(ComponentService)
            .with(ComponentRoute)
            .with(ComponentIngress)
            .with(BuildTask)
            .with(BuildTaskRun)
            .with(ComponentPod);
        for requirement in requirements {
            base.add_dependent_resource(RequiredCapability::new(requirement.clone()));
        }
        base
    }

    /// Resolve every requirement, recording auto-bound capabilities on the
    /// spec and merged parameters on the capabilities.
    ///
    /// Returns the configuration secrets of the bound capabilities ready for use.
    async fn bind_capabilities(&mut self, ctx: &Context) -> Result<Vec<String>> {
        let namespace = self.namespace();
        let mut patches = Vec::new();
        let mut ready = Vec::new();

        for requirement in &self.component.spec.capabilities.requires {
            match resolve(ctx.store.as_ref(), requirement, &namespace).await? {
                Resolution::Bound(mut binding) => {
                    binding.persist_parameters(ctx.store.as_ref()).await?;
                    if let Some(bound_to) = binding.bound_to.take() {
                        info!(
                            "Auto-bound requirement '{}' of '{}' to capability '{}'",
                            requirement.name,
                            self.name(),
                            bound_to
                        );
                        patches.push(BindingPatch {
                            requirement: requirement.name.clone(),
                            bound_to,
                        });
                    }
                    if binding.capability.is_ready() {
                        ready.push(secret_name(&CapabilityResource::from_object(binding.capability)));
                    }
                }
                Resolution::Unbound(message) => {
                    debug!("Requirement '{}' of '{}': {}", requirement.name, self.name(), message);
                }
                Resolution::Violation(violation) => {
                    warn!("Requirement '{}' of '{}': {}", requirement.name, self.name(), violation);
                }
            }
        }

        if apply_binding_patches(&mut self.component.spec, &patches) {
            persist(self, ctx).await?;
            self.requeue = true;
        }
        Ok(ready)
    }

    /// Expose the configuration secrets of ready capabilities to the deployment
    async fn inject_capability_secrets(
        &self,
        dependents: &BaseResource<Self>,
        secrets: &[String],
        ctx: &Context,
    ) -> Result<()> {
        let deployments = dependents.dependent_for("Deployment");
        let Some(mut live) = deployments.fetch(self, ctx).await? else {
            return Ok(());
        };
        let changed = modify_as::<Deployment, _>(&mut live, |deployment| {
            secrets
                .iter()
                .fold(false, |changed, secret| inject_secret(deployment, secret) || changed)
        })?;
        if changed {
            ctx.store.update(&api_resource::<Deployment>(), &live).await?;
            info!(
                "Injected capability secrets {:?} into deployment '{}'",
                secrets,
                live.name_any()
            );
        }
        Ok(())
    }
}

fn build_service_accounts(_owner: &ComponentResource) -> Vec<String> {
    vec![workload::SERVICE_ACCOUNT.to_string()]
}

#[async_trait]
impl Resource for ComponentResource {
    type Object = Component;

    fn from_object(component: Component) -> Self {
        Self {
            component,
            requeue: false,
        }
    }

    fn object(&self) -> &Component {
        &self.component
    }

    fn object_mut(&mut self) -> &mut Component {
        &mut self.component
    }

    fn status_as_string(&self) -> String {
        self.component
            .phase()
            .map(|p| p.as_str().to_string())
            .unwrap_or_default()
    }

    fn needs_requeue(&self) -> bool {
        self.requeue
    }

    fn set_needs_requeue(&mut self, requeue: bool) {
        self.requeue = requeue;
    }

    fn set_initial_status(&mut self, message: &str) -> bool {
        self.set_status(self.pending_phase(), message, None)
    }

    fn set_error_status(&mut self, err: &HalkyonError) -> bool {
        let changed = self.set_status(ComponentPhase::Failed, &err.to_string(), None);
        if changed {
            self.requeue = false;
        }
        changed
    }

    fn set_success_status(&mut self, statuses: &[DependentStatus], message: &str) -> bool {
        let pod_name = statuses
            .iter()
            .find(|s| s.owner_status_field == Some("podName"))
            .map(|s| s.dependent_name.clone());
        let changed = self.set_status(ComponentPhase::Ready, message, pod_name);
        if changed {
            self.requeue = false;
        }
        changed
    }

    fn check_validity(&self) -> Result<()> {
        if self.component.spec.port <= 0 {
            return Err(HalkyonError::Validation(format!(
                "component '{}' must declare the port its runtime listens on",
                self.name()
            )));
        }
        let spec = &self.component.spec;
        if spec.mode() == DeploymentMode::Build && spec.build_config.url.is_empty() {
            return Err(HalkyonError::Validation(format!(
                "component '{}' is built from sources but doesn't declare their git url",
                self.name()
            )));
        }
        Ok(())
    }

    fn init(&mut self) -> bool {
        if self.component.spec.deployment_mode.is_some() {
            return false;
        }
        self.component.spec.deployment_mode = Some(DeploymentMode::Dev);
        true
    }

    fn finalizer(&self, ctx: &Context) -> Option<&'static str> {
        ctx.cluster.is_openshift().then_some(finalizers::COMPONENT)
    }

    fn dependents(&self, _ctx: &Context) -> BaseResource<Self> {
        Self::base(&self.component.spec.capabilities.requires)
    }

    fn watched_secondary_resource_types(cluster: &ClusterInfo) -> Vec<ApiResource> {
        Self::base(&[]).watched_secondary_resource_types(cluster)
    }

    async fn create_or_update(&mut self, dependents: &BaseResource<Self>, ctx: &Context) -> Result<()> {
        dependents.create_or_update_dependents(self, ctx).await?;
        let secrets = self.bind_capabilities(ctx).await?;
        if !secrets.is_empty() {
            self.inject_capability_secrets(dependents, &secrets, ctx).await?;
        }
        Ok(())
    }

    /// Builds push to an ImageStream the component doesn't own
    async fn delete(&mut self, ctx: &Context) -> Result<()> {
        if ctx.cluster.is_openshift() {
            ctx.store
                .delete(&image_stream_resource(), &self.namespace(), &self.name())
                .await?;
            info!("Deleted image stream of component '{}'", self.name());
        }
        Ok(())
    }
}
