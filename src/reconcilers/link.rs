// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Links hand configuration to a component: a secret exposed as `envFrom`
//! or plain environment variables, injected into its deployment.

use super::component::inject_secret;
use crate::error::{HalkyonError, Result};
use crate::framework::{BaseResource, Context, DependentConfig, DependentResource, DependentStatus, Readiness, Resource};
use crate::kubernetes::object::{api_resource, from_dynamic, modify_as};
use crate::kubernetes::ClusterInfo;
use crate::types::{Component, Link, LinkPhase, LinkStatus, LinkType, NameValuePair};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::EnvVar;
use kube::api::{ApiResource, DynamicObject};
use kube::ResourceExt;
use tracing::{debug, info};

/// The component a link targets, which must be ready before it's linked
struct LinkedComponent;

#[async_trait]
impl DependentResource<LinkResource> for LinkedComponent {
    fn api_resource(&self) -> ApiResource {
        api_resource::<Component>()
    }

    fn config(&self) -> DependentConfig {
        DependentConfig::readiness_only()
    }

    fn name(&self, owner: &LinkResource) -> String {
        owner.link.spec.component_name.clone()
    }

    fn is_ready(&self, _owner: &LinkResource, live: &DynamicObject) -> Readiness {
        match from_dynamic::<Component>(live) {
            Ok(component) if component.is_ready() => Readiness::ready(),
            Ok(component) => Readiness::not_ready(format!(
                "component '{}' is not ready yet",
                component.name_any()
            )),
            Err(e) => Readiness::not_ready(e.to_string()),
        }
    }
}

/// Add the environment variables missing from every container
fn inject_envs(deployment: &mut Deployment, envs: &[NameValuePair]) -> bool {
    let Some(pod_spec) = deployment
        .spec
        .as_mut()
        .and_then(|spec| spec.template.spec.as_mut())
    else {
        return false;
    };
    let mut changed = false;
    for container in pod_spec.containers.iter_mut() {
        let current = container.env.get_or_insert_with(Vec::new);
        for env in envs {
            if !current.iter().any(|e| e.name == env.name) {
                current.push(EnvVar {
                    name: env.name.clone(),
                    value: Some(env.value.clone()),
                    ..Default::default()
                });
                changed = true;
            }
        }
    }
    changed
}

pub struct LinkResource {
    link: Link,
    requeue: bool,
}

impl LinkResource {
    fn set_status(&mut self, phase: LinkPhase, message: &str) -> bool {
        if self.should_delete() {
            return false;
        }
        let status = self.link.status.get_or_insert_with(LinkStatus::default);
        if status.phase == Some(phase) && status.message == message {
            return false;
        }
        status.phase = Some(phase);
        status.message = message.to_string();
        true
    }

    fn base() -> BaseResource<Self> {
        BaseResource::new().with(LinkedComponent)
    }

    /// The deployment of the target component, whichever mode it runs in
    async fn target_deployment(&self, ctx: &Context) -> Result<Option<DynamicObject>> {
        let component = &self.link.spec.component_name;
        let resource = api_resource::<Deployment>();
        for name in [component.clone(), format!("{}-build", component)] {
            if let Some(deployment) = ctx.store.get(&resource, &self.namespace(), &name).await? {
                return Ok(Some(deployment));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl Resource for LinkResource {
    type Object = Link;

    fn from_object(link: Link) -> Self {
        Self {
            link,
            requeue: false,
        }
    }

    fn object(&self) -> &Link {
        &self.link
    }

    fn object_mut(&mut self) -> &mut Link {
        &mut self.link
    }

    fn status_as_string(&self) -> String {
        self.link
            .status
            .as_ref()
            .and_then(|s| s.phase)
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
        self.set_status(LinkPhase::Pending, message)
    }

    fn set_error_status(&mut self, err: &HalkyonError) -> bool {
        let changed = self.set_status(LinkPhase::Failed, &err.to_string());
        if changed {
            self.requeue = false;
        }
        changed
    }

    fn set_success_status(&mut self, _statuses: &[DependentStatus], message: &str) -> bool {
        let changed = self.set_status(LinkPhase::Ready, message);
        if changed {
            self.requeue = false;
        }
        changed
    }

    fn check_validity(&self) -> Result<()> {
        let spec = &self.link.spec;
        if spec.component_name.is_empty() {
            return Err(HalkyonError::Validation(format!(
                "link '{}' doesn't name the component to link to",
                self.name()
            )));
        }
        match spec.link_type {
            LinkType::Secret if spec.reference.as_deref().unwrap_or_default().is_empty() => {
                Err(HalkyonError::Validation(format!(
                    "secret link '{}' must reference a secret",
                    self.name()
                )))
            }
            LinkType::Env if spec.envs.is_empty() => Err(HalkyonError::Validation(format!(
                "env link '{}' must declare environment variables",
                self.name()
            ))),
            _ => Ok(()),
        }
    }

    fn dependents(&self, _ctx: &Context) -> BaseResource<Self> {
        Self::base()
    }

    fn watched_secondary_resource_types(cluster: &ClusterInfo) -> Vec<ApiResource> {
        Self::base().watched_secondary_resource_types(cluster)
    }

    async fn create_or_update(&mut self, dependents: &BaseResource<Self>, ctx: &Context) -> Result<()> {
        dependents.create_or_update_dependents(self, ctx).await?;

        let Some(mut live) = self.target_deployment(ctx).await? else {
            debug!(
                "No deployment found yet for component '{}'",
                self.link.spec.component_name
            );
            return Ok(());
        };
        let spec = &self.link.spec;
        let changed = modify_as::<Deployment, _>(&mut live, |deployment| match spec.link_type {
            LinkType::Secret => inject_secret(deployment, spec.reference.as_deref().unwrap_or_default()),
            LinkType::Env => inject_envs(deployment, &spec.envs),
        })?;
        if changed {
            ctx.store.update(&api_resource::<Deployment>(), &live).await?;
            info!(
                "Linked '{}' into deployment '{}'",
                self.name(),
                live.name_any()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::{GenericReconciler, ObjectKey};
    use crate::test_utils::{context, kind_of, FakeStore};
    use crate::types::{ComponentPhase, ComponentSpec, ComponentStatus, LinkSpec};
    use k8s_openapi::api::apps::v1::DeploymentSpec;
    use k8s_openapi::api::core::v1::{Container, PodSpec, PodTemplateSpec};
    use kube::api::ObjectMeta;
    use std::sync::Arc;

    fn make_component(phase: ComponentPhase) -> Component {
        let mut component = Component::new("shop", ComponentSpec::default());
        component.metadata.namespace = Some("demo".to_string());
        component.status = Some(ComponentStatus {
            phase: Some(phase),
            ..Default::default()
        });
        component
    }

    fn make_deployment(name: &str) -> Deployment {
        Deployment {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("demo".to_string()),
                ..Default::default()
            },
            spec: Some(DeploymentSpec {
                template: PodTemplateSpec {
                    spec: Some(PodSpec {
                        containers: vec![Container {
                            name: "shop".to_string(),
                            ..Default::default()
                        }],
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn make_link(link_type: LinkType) -> Link {
        let mut link = Link::new(
            "shop-db",
            LinkSpec {
                component_name: "shop".to_string(),
                link_type,
                reference: Some("orders-db-config".to_string()),
                envs: vec![NameValuePair::new("DB_POOL", "10")],
            },
        );
        link.metadata.namespace = Some("demo".to_string());
        link.metadata.generation = Some(1);
        link
    }

    fn container(store: &FakeStore, name: &str) -> Container {
        let deployment: Deployment = store.get_as("demo", name).unwrap();
        deployment.spec.unwrap().template.spec.unwrap().containers.remove(0)
    }

    #[tokio::test]
    async fn test_secret_link_injects_env_from() {
        let store = Arc::new(
            FakeStore::new()
                .with(make_component(ComponentPhase::Ready))
                .with(make_deployment("shop"))
                .with(make_link(LinkType::Secret)),
        );
        let reconciler = GenericReconciler::<LinkResource>::new(Arc::new(context(store.clone())));
        let key = ObjectKey::new("demo", "shop-db");

        let outcome = reconciler.reconcile(&key).await.unwrap();

        assert!(!outcome.requeue);
        let env_from = container(&store, "shop").env_from.unwrap();
        assert_eq!(env_from[0].secret_ref.as_ref().unwrap().name, "orders-db-config");
        let link: Link = store.get_as("demo", "shop-db").unwrap();
        assert_eq!(link.status.unwrap().phase, Some(LinkPhase::Ready));

        store.clear_writes();
        reconciler.reconcile(&key).await.unwrap();
        assert!(store.writes().is_empty(), "{:?}", store.writes());
    }

    #[tokio::test]
    async fn test_env_link_targets_build_deployment() {
        let store = Arc::new(
            FakeStore::new()
                .with(make_component(ComponentPhase::Ready))
                .with(make_deployment("shop-build"))
                .with(make_link(LinkType::Env)),
        );
        let reconciler = GenericReconciler::<LinkResource>::new(Arc::new(context(store.clone())));

        reconciler.reconcile(&ObjectKey::new("demo", "shop-db")).await.unwrap();

        let env = container(&store, "shop-build").env.unwrap();
        assert_eq!(env[0].name, "DB_POOL");
        assert_eq!(env[0].value.as_deref(), Some("10"));
    }

    #[tokio::test]
    async fn test_waits_for_component() {
        let store = Arc::new(
            FakeStore::new()
                .with(make_component(ComponentPhase::Pending))
                .with(make_link(LinkType::Secret)),
        );
        let reconciler = GenericReconciler::<LinkResource>::new(Arc::new(context(store.clone())));

        let outcome = reconciler.reconcile(&ObjectKey::new("demo", "shop-db")).await.unwrap();

        assert!(outcome.requeue);
        let link: Link = store.get_as("demo", "shop-db").unwrap();
        let status = link.status.unwrap();
        assert_eq!(status.phase, Some(LinkPhase::Pending));
        assert_eq!(
            status.message,
            "Waiting for the following resources: Component => component 'shop' is not ready yet"
        );
        assert!(!store.writes().iter().any(|w| w.kind == kind_of::<Deployment>()));
    }

    #[test]
    fn test_secret_link_requires_reference() {
        let mut link = make_link(LinkType::Secret);
        link.spec.reference = None;

        let err = LinkResource::from_object(link).check_validity().unwrap_err();

        assert_eq!(err.to_string(), "secret link 'shop-db' must reference a secret");
    }

    #[test]
    fn test_does_not_watch_components() {
        assert!(LinkResource::watched_secondary_resource_types(&ClusterInfo::kubernetes()).is_empty());
    }
}
