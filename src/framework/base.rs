// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

use super::dependent::create_or_update;
use super::{Context, DependentResource, DependentStatus, Resource};
use crate::constants::READY;
use crate::error::Result;
use crate::kubernetes::ClusterInfo;
use kube::api::ApiResource;
use tracing::info;

/// The dependents of one primary resource, in registration order.
///
/// Registration order is creation order: a dependent may rely on the ones
/// registered before it, e.g. a Route on its Service.
pub struct BaseResource<P: Resource> {
    dependents: Vec<Box<dyn DependentResource<P>>>,
}

impl<P: Resource> Default for BaseResource<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Resource> BaseResource<P> {
    pub fn new() -> Self {
        Self {
            dependents: Vec::new(),
        }
    }

    pub fn add_dependent_resource(&mut self, dependent: impl DependentResource<P> + 'static) -> &mut Self {
        self.dependents.push(Box::new(dependent));
        self
    }

    pub fn with(mut self, dependent: impl DependentResource<P> + 'static) -> Self {
        self.add_dependent_resource(dependent);
        self
    }

    /// Run the create-or-update protocol over every dependent, stopping at the first error
    pub async fn create_or_update_dependents(&self, owner: &P, ctx: &Context) -> Result<()> {
        for dependent in &self.dependents {
            create_or_update(dependent.as_ref(), owner, ctx).await?;
        }
        Ok(())
    }

    /// Fold the readiness of the checked dependents into the owner status.
    ///
    /// Returns the dependent statuses and whether a dependent isn't ready, in
    /// which case the owner is flagged for requeue. A dependent that can't be
    /// fetched counts as not ready.
    pub async fn compute_status(&self, owner: &mut P, ctx: &Context) -> (Vec<DependentStatus>, bool) {
        let statuses = self.dependent_statuses(owner, ctx).await;

        let waiting: Vec<String> = statuses
            .iter()
            .filter(|s| !s.ready)
            .map(|s| format!("{} => {}", s.dependent_name, s.message))
            .collect();

        if waiting.is_empty() {
            owner.set_success_status(&statuses, READY);
            return (statuses, false);
        }

        let message = format!("Waiting for the following resources: {}", waiting.join(" / "));
        info!("{}", message);
        owner.set_initial_status(&message);
        owner.set_needs_requeue(true);
        (statuses, true)
    }

    async fn dependent_statuses(&self, owner: &P, ctx: &Context) -> Vec<DependentStatus> {
        let mut statuses = Vec::new();
        for dependent in self.dependents.iter().filter(|d| d.checked_for_readiness(owner)) {
            let status = match dependent.fetch(owner, ctx).await {
                Ok(Some(live)) => {
                    let readiness = dependent.is_ready(owner, &live);
                    if readiness.ready {
                        DependentStatus::ready(
                            dependent.name_from(owner, &live),
                            dependent.owner_status_field(),
                        )
                    } else {
                        DependentStatus::failed(dependent.type_name(), readiness.message)
                    }
                }
                Ok(None) => DependentStatus::failed(
                    dependent.type_name(),
                    format!("'{}' not found", dependent.name(owner)),
                ),
                Err(e) => DependentStatus::failed(dependent.type_name(), e.to_string()),
            };
            statuses.push(status);
        }
        statuses
    }

    /// Kinds to watch on behalf of the owner, without duplicates
    pub fn watched_secondary_resource_types(&self, cluster: &ClusterInfo) -> Vec<ApiResource> {
        let mut watched: Vec<ApiResource> = Vec::new();
        for dependent in self.dependents.iter().filter(|d| d.should_watch(cluster)) {
            let resource = dependent.api_resource();
            if !watched.contains(&resource) {
                watched.push(resource);
            }
        }
        watched
    }

    /// The first dependent of the given kind.
    ///
    /// Panics when no such dependent is registered: asking for one that
    /// doesn't exist is a wiring bug.
    pub fn dependent_for(&self, kind: &str) -> &dyn DependentResource<P> {
        self.dependents
            .iter()
            .find(|d| d.api_resource().kind == kind)
            .map(|d| d.as_ref())
            .unwrap_or_else(|| panic!("couldn't find any dependent resource of kind '{}'", kind))
    }
}
