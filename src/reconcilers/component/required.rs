// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

use super::ComponentResource;
use crate::binding::resolve;
use crate::error::Result;
use crate::framework::{Context, DependentConfig, DependentResource, Readiness, Resource};
use crate::kubernetes::object::{api_resource, from_dynamic, to_dynamic};
use crate::types::{Capability, RequiredCapabilityConfig};
use async_trait::async_trait;
use kube::api::{ApiResource, DynamicObject};
use kube::ResourceExt;

/// A capability the component requires, resolved but never created by it
pub struct RequiredCapability {
    requirement: RequiredCapabilityConfig,
}

impl RequiredCapability {
    pub fn new(requirement: RequiredCapabilityConfig) -> Self {
        Self { requirement }
    }
}

#[async_trait]
impl DependentResource<ComponentResource> for RequiredCapability {
    fn api_resource(&self) -> ApiResource {
        api_resource::<Capability>()
    }

    fn type_name(&self) -> String {
        format!("Required Capability '{}'", self.requirement.name)
    }

    fn config(&self) -> DependentConfig {
        DependentConfig::readiness_only()
    }

    fn name(&self, _owner: &ComponentResource) -> String {
        self.requirement
            .bound_to()
            .unwrap_or(self.requirement.name.as_str())
            .to_string()
    }

    /// The capability the requirement resolves to; an unresolvable
    /// requirement is reported as an error so it shows in the owner status
    async fn fetch(&self, owner: &ComponentResource, ctx: &Context) -> Result<Option<DynamicObject>> {
        let capability = resolve(ctx.store.as_ref(), &self.requirement, &owner.namespace())
            .await?
            .into_capability()?;
        Ok(Some(to_dynamic(&capability)?))
    }

    fn is_ready(&self, _owner: &ComponentResource, live: &DynamicObject) -> Readiness {
        match from_dynamic::<Capability>(live) {
            Ok(capability) if capability.is_ready() => Readiness::ready(),
            Ok(capability) => {
                let detail = match capability.status_message() {
                    "" => String::new(),
                    message => format!(": {}", message),
                };
                Readiness::not_ready(format!(
                    "capability '{}' is not running yet{}",
                    live.name_any(),
                    detail
                ))
            }
            Err(e) => Readiness::not_ready(e.to_string()),
        }
    }
}
