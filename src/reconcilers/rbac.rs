// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Role and RoleBinding granting use of the privileged security context
//! constraint, needed on OpenShift only.

use super::dependent_meta;
use crate::error::Result;
use crate::framework::{Context, DependentConfig, DependentResource, Resource};
use crate::kubernetes::object::{api_resource, modify_as, to_dynamic};
use async_trait::async_trait;
use k8s_openapi::api::rbac::v1::{PolicyRule, Role, RoleBinding, RoleRef, Subject};
use kube::api::{ApiResource, DynamicObject};

fn unwatched() -> DependentConfig {
    DependentConfig {
        watched: false,
        ..Default::default()
    }
}

fn privileged_scc_rule() -> PolicyRule {
    PolicyRule {
        api_groups: Some(vec!["security.openshift.io".to_string()]),
        resources: Some(vec!["securitycontextconstraints".to_string()]),
        resource_names: Some(vec!["privileged".to_string()]),
        verbs: vec!["use".to_string()],
        ..Default::default()
    }
}

/// A Role allowing use of the privileged SCC, plus any extra rules
pub struct PrivilegedRole {
    name: &'static str,
    extra_rules: Vec<PolicyRule>,
}

impl PrivilegedRole {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            extra_rules: Vec::new(),
        }
    }

    pub fn with_rule(mut self, rule: PolicyRule) -> Self {
        self.extra_rules.push(rule);
        self
    }
}

#[async_trait]
impl<P: Resource> DependentResource<P> for PrivilegedRole {
    fn api_resource(&self) -> ApiResource {
        api_resource::<Role>()
    }

    fn config(&self) -> DependentConfig {
        unwatched()
    }

    fn name(&self, _owner: &P) -> String {
        self.name.to_string()
    }

    fn can_be_created_or_updated(&self, _owner: &P, ctx: &Context) -> bool {
        ctx.cluster.is_openshift()
    }

    fn build(&self, owner: &P, _ctx: &Context) -> Result<DynamicObject> {
        let mut rules = vec![privileged_scc_rule()];
        rules.extend(self.extra_rules.iter().cloned());
        to_dynamic(&Role {
            metadata: dependent_meta(owner, self.name),
            rules: Some(rules),
        })
    }
}

/// Binds a [`PrivilegedRole`] to the service accounts of the owner
pub struct PrivilegedRoleBinding<P> {
    name: &'static str,
    role_name: &'static str,
    service_accounts: fn(&P) -> Vec<String>,
}

impl<P> PrivilegedRoleBinding<P> {
    pub fn new(
        name: &'static str,
        role_name: &'static str,
        service_accounts: fn(&P) -> Vec<String>,
    ) -> Self {
        Self {
            name,
            role_name,
            service_accounts,
        }
    }

    fn subject(namespace: &str, service_account: &str) -> Subject {
        Subject {
            kind: "ServiceAccount".to_string(),
            name: service_account.to_string(),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl<P: Resource> DependentResource<P> for PrivilegedRoleBinding<P> {
    fn api_resource(&self) -> ApiResource {
        api_resource::<RoleBinding>()
    }

    fn config(&self) -> DependentConfig {
        unwatched()
    }

    fn name(&self, _owner: &P) -> String {
        self.name.to_string()
    }

    fn can_be_created_or_updated(&self, _owner: &P, ctx: &Context) -> bool {
        ctx.cluster.is_openshift()
    }

    fn build(&self, owner: &P, _ctx: &Context) -> Result<DynamicObject> {
        let namespace = owner.namespace();
        let subjects = (self.service_accounts)(owner)
            .iter()
            .map(|sa| Self::subject(&namespace, sa))
            .collect();
        to_dynamic(&RoleBinding {
            metadata: dependent_meta(owner, self.name),
            role_ref: RoleRef {
                api_group: "rbac.authorization.k8s.io".to_string(),
                kind: "Role".to_string(),
                name: self.role_name.to_string(),
            },
            subjects: Some(subjects),
        })
    }

    /// Add the owner's service accounts missing from the subjects
    fn update(&self, owner: &P, live: &mut DynamicObject) -> Result<bool> {
        let namespace = owner.namespace();
        let wanted = (self.service_accounts)(owner);
        modify_as::<RoleBinding, _>(live, |binding| {
            let subjects = binding.subjects.get_or_insert_with(Vec::new);
            let mut changed = false;
            for sa in &wanted {
                let present = subjects
                    .iter()
                    .any(|s| s.name == *sa && s.namespace.as_deref() == Some(namespace.as_str()));
                if !present {
                    subjects.push(Self::subject(&namespace, sa));
                    changed = true;
                }
            }
            changed
        })
    }
}
