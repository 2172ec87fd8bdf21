// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Capabilities provision a backing service, today a KubeDB PostgreSQL
//! database, together with the secret describing how to reach it.

mod postgres;
mod secret;

pub use postgres::postgres_resource;
pub use secret::secret_name;

use super::rbac::{PrivilegedRole, PrivilegedRoleBinding};
use crate::error::{HalkyonError, Result};
use crate::framework::{BaseResource, Context, DependentStatus, Resource};
use crate::kubernetes::ClusterInfo;
use crate::types::{Capability, CapabilityPhase, CapabilityStatus};
use kube::api::ApiResource;
use postgres::Postgres;
use secret::ConfigSecret;

/// Capability parameters understood by the database dependents
pub mod params {
    pub const DB_CONFIG_NAME: &str = "DB_CONFIG_NAME";
    pub const DB_HOST: &str = "DB_HOST";
    pub const DB_PORT: &str = "DB_PORT";
    pub const DB_NAME: &str = "DB_NAME";
    pub const DB_USER: &str = "DB_USER";
    pub const DB_PASSWORD: &str = "DB_PASSWORD";

    pub const POSTGRES_USER: &str = "POSTGRES_USER";
    pub const POSTGRES_PASSWORD: &str = "POSTGRES_PASSWORD";
    pub const POSTGRES_DB: &str = "POSTGRES_DB";

    pub const DEFAULT_PORT: &str = "5432";
    pub const DEFAULT_DATABASE: &str = "sample-db";
}

/// Category and type pairs a capability can be provisioned for
const SUPPORTED: &[(&str, &str)] = &[("database", "postgres")];

pub struct CapabilityResource {
    capability: Capability,
    requeue: bool,
}

impl CapabilityResource {
    /// Value of the named spec parameter, empty values counting as absent
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.capability
            .spec
            .parameters
            .iter()
            .rev()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
            .filter(|v| !v.is_empty())
    }

    pub fn database_name(&self) -> &str {
        self.parameter(params::DB_NAME)
            .unwrap_or(params::DEFAULT_DATABASE)
    }

    fn status_mut(&mut self) -> &mut CapabilityStatus {
        self.capability.status.get_or_insert_with(Default::default)
    }

    fn set_status(&mut self, phase: CapabilityPhase, message: &str, pod_name: Option<String>) -> bool {
        if self.should_delete() {
            return false;
        }
        let status = self.status_mut();
        let pod_name = pod_name.unwrap_or_else(|| status.pod_name.clone());
        if status.phase == Some(phase) && status.message == message && status.pod_name == pod_name {
            return false;
        }
        status.phase = Some(phase);
        status.message = message.to_string();
        status.pod_name = pod_name;
        true
    }

    fn base() -> BaseResource<Self> {
        BaseResource::new()
            .with(ConfigSecret)
            .with(PrivilegedRole::new("scc-privileged-role"))
            .with(PrivilegedRoleBinding::new(
                "use-scc-privileged",
                "scc-privileged-role",
                postgres_service_accounts,
            ))
            .with(Postgres)
    }
}

/// KubeDB runs the database pods under a service account named after the instance
fn postgres_service_accounts(owner: &CapabilityResource) -> Vec<String> {
    vec![owner.name()]
}

impl Resource for CapabilityResource {
    type Object = Capability;

    fn from_object(capability: Capability) -> Self {
        Self {
            capability,
            requeue: false,
        }
    }

    fn object(&self) -> &Capability {
        &self.capability
    }

    fn object_mut(&mut self) -> &mut Capability {
        &mut self.capability
    }

    fn status_as_string(&self) -> String {
        self.capability
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
        self.set_status(CapabilityPhase::Pending, message, None)
    }

    fn set_error_status(&mut self, err: &HalkyonError) -> bool {
        let changed = self.set_status(CapabilityPhase::Failed, &err.to_string(), None);
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
        let changed = self.set_status(CapabilityPhase::Running, message, pod_name);
        if changed {
            self.requeue = false;
        }
        changed
    }

    fn check_validity(&self) -> Result<()> {
        let spec = &self.capability.spec;
        let supported = SUPPORTED.iter().any(|(category, type_)| {
            spec.category.eq_ignore_ascii_case(category) && spec.type_.eq_ignore_ascii_case(type_)
        });
        if supported {
            Ok(())
        } else {
            Err(HalkyonError::Validation(format!(
                "unsupported capability '{}/{}'",
                spec.category, spec.type_
            )))
        }
    }

    fn dependents(&self, _ctx: &Context) -> BaseResource<Self> {
        Self::base()
    }

    fn watched_secondary_resource_types(cluster: &ClusterInfo) -> Vec<ApiResource> {
        Self::base().watched_secondary_resource_types(cluster)
    }
}
