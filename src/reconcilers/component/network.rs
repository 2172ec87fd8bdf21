// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! How a component is reached: its service and, when exposed, the Route or
//! Ingress fronting it depending on the cluster flavor.

use super::ComponentResource;
use crate::constants::labels;
use crate::error::Result;
use crate::framework::{Context, DependentResource, Resource};
use crate::kubernetes::object::{api_resource, modify_as, to_dynamic};
use crate::kubernetes::ClusterInfo;
use crate::reconcilers::dependent_meta;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::api::{ApiResource, DynamicObject};
use kube::core::GroupVersionKind;
use serde_json::json;
use std::collections::BTreeMap;

pub struct ComponentService;

#[async_trait]
impl DependentResource<ComponentResource> for ComponentService {
    fn api_resource(&self) -> ApiResource {
        api_resource::<Service>()
    }

    fn build(&self, owner: &ComponentResource, _ctx: &Context) -> Result<DynamicObject> {
        let port = owner.object().spec.port;
        to_dynamic(&Service {
            metadata: dependent_meta(owner, &owner.name()),
            spec: Some(ServiceSpec {
                selector: Some(BTreeMap::from([(
                    labels::APP.to_string(),
                    owner.deployment_name(),
                )])),
                type_: Some("ClusterIP".to_string()),
                ports: Some(vec![ServicePort {
                    port,
                    target_port: Some(IntOrString::Int(port)),
                    protocol: Some("TCP".to_string()),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        })
    }

    /// Point the selector at the deployment of the current mode
    fn update(&self, owner: &ComponentResource, live: &mut DynamicObject) -> Result<bool> {
        let deployment = owner.deployment_name();
        modify_as::<Service, _>(live, |service| {
            let selector = service
                .spec
                .get_or_insert_with(Default::default)
                .selector
                .get_or_insert_with(Default::default);
            if selector.get(labels::APP) == Some(&deployment) {
                return false;
            }
            selector.insert(labels::APP.to_string(), deployment);
            true
        })
    }
}

/// OpenShift `Route`, which has no typed binding
pub fn route_resource() -> ApiResource {
    ApiResource::from_gvk_with_plural(
        &GroupVersionKind::gvk("route.openshift.io", "v1", "Route"),
        "routes",
    )
}

pub struct ComponentRoute;

#[async_trait]
impl DependentResource<ComponentResource> for ComponentRoute {
    fn api_resource(&self) -> ApiResource {
        route_resource()
    }

    fn should_watch(&self, cluster: &ClusterInfo) -> bool {
        cluster.is_openshift()
    }

    fn can_be_created_or_updated(&self, owner: &ComponentResource, ctx: &Context) -> bool {
        owner.object().spec.expose_service && ctx.cluster.is_openshift()
    }

    fn build(&self, owner: &ComponentResource, _ctx: &Context) -> Result<DynamicObject> {
        let name = owner.name();
        let mut route = DynamicObject::new(&name, &route_resource()).data(json!({
            "spec": {
                "to": { "kind": "Service", "name": name }
            }
        }));
        route.metadata = dependent_meta(owner, &name);
        Ok(route)
    }
}

pub struct ComponentIngress;

#[async_trait]
impl DependentResource<ComponentResource> for ComponentIngress {
    fn api_resource(&self) -> ApiResource {
        api_resource::<Ingress>()
    }

    fn should_watch(&self, cluster: &ClusterInfo) -> bool {
        !cluster.is_openshift()
    }

    fn can_be_created_or_updated(&self, owner: &ComponentResource, ctx: &Context) -> bool {
        owner.object().spec.expose_service && !ctx.cluster.is_openshift()
    }

    fn build(&self, owner: &ComponentResource, _ctx: &Context) -> Result<DynamicObject> {
        let name = owner.name();
        let backend = IngressBackend {
            service: Some(IngressServiceBackend {
                name: name.clone(),
                port: Some(ServiceBackendPort {
                    number: Some(owner.object().spec.port),
                    ..Default::default()
                }),
            }),
            ..Default::default()
        };
        to_dynamic(&Ingress {
            metadata: dependent_meta(owner, &name),
            spec: Some(IngressSpec {
                rules: Some(vec![IngressRule {
                    host: Some(name.clone()),
                    http: Some(HTTPIngressRuleValue {
                        paths: vec![HTTPIngressPath {
                            path: Some("/".to_string()),
                            path_type: "Prefix".to_string(),
                            backend,
                        }],
                    }),
                }]),
                ..Default::default()
            }),
            ..Default::default()
        })
    }
}
