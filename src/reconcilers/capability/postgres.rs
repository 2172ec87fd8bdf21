// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

use super::secret::secret_name;
use super::{params, CapabilityResource};
use crate::error::Result;
use crate::framework::{Context, DependentConfig, DependentResource, Readiness, Resource};
use crate::reconcilers::dependent_meta;
use async_trait::async_trait;
use kube::api::{ApiResource, DynamicObject};
use kube::core::GroupVersionKind;
use serde_json::json;

/// A KubeDB managed PostgreSQL instance
pub struct Postgres;

/// The KubeDB `Postgres` kind, which has no typed binding
pub fn postgres_resource() -> ApiResource {
    ApiResource::from_gvk_with_plural(
        &GroupVersionKind::gvk("kubedb.com", "v1alpha1", "Postgres"),
        "postgreses",
    )
}

/// KubeDB catalog version for a requested database version
fn catalog_version(version: &str) -> &'static str {
    match version {
        "9" => "9.6-v4",
        "11" => "11.2",
        "10.6-v2" => "10.6",
        _ => "10.6-v2",
    }
}

#[async_trait]
impl DependentResource<CapabilityResource> for Postgres {
    fn api_resource(&self) -> ApiResource {
        postgres_resource()
    }

    fn config(&self) -> DependentConfig {
        DependentConfig {
            checked_for_readiness: true,
            ..Default::default()
        }
    }

    fn build(&self, owner: &CapabilityResource, _ctx: &Context) -> Result<DynamicObject> {
        let name = self.name(owner);
        let mut postgres = DynamicObject::new(&name, &postgres_resource()).data(json!({
            "spec": {
                "version": catalog_version(&owner.object().spec.version),
                "replicas": 1,
                "updateStrategy": { "type": "RollingUpdate" },
                "databaseSecret": { "secretName": secret_name(owner) },
                "storageType": "Ephemeral",
                "terminationPolicy": "Delete",
                "podTemplate": {
                    "spec": {
                        "env": [
                            { "name": params::POSTGRES_DB, "value": owner.database_name() }
                        ]
                    }
                }
            }
        }));
        postgres.metadata = dependent_meta(owner, &name);
        Ok(postgres)
    }

    fn is_ready(&self, _owner: &CapabilityResource, live: &DynamicObject) -> Readiness {
        let status = &live.data["status"];
        if status["phase"].as_str() == Some("Running") {
            return Readiness::ready();
        }
        Readiness::not_ready(format!(
            "{} PostgreSQL is not ready: {}",
            live.metadata.name.as_deref().unwrap_or_default(),
            status["reason"].as_str().unwrap_or_default()
        ))
    }

    fn owner_status_field(&self) -> Option<&'static str> {
        Some("podName")
    }
}
