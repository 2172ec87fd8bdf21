// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

use super::{BaseResource, Context, DependentStatus};
use crate::error::{HalkyonError, Result};
use crate::kubernetes::object::{api_resource, to_dynamic};
use crate::kubernetes::ClusterInfo;
use async_trait::async_trait;
use kube::api::ApiResource;
use kube::core::NamespaceResourceScope;
use kube::{Resource as _, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// A primary custom resource driven by the [`GenericReconciler`].
///
/// Implementors wrap the API object together with the per-pass requeue flag.
/// Status setters report whether they changed anything and must leave the
/// status untouched once [`Resource::should_delete`] is true: deletion is
/// terminal for reconciliation.
///
/// [`GenericReconciler`]: super::GenericReconciler
#[async_trait]
pub trait Resource: Send + Sync + Sized + 'static {
    type Object: kube::Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static;

    fn from_object(object: Self::Object) -> Self;

    fn object(&self) -> &Self::Object;

    fn object_mut(&mut self) -> &mut Self::Object;

    fn name(&self) -> String {
        self.object().name_any()
    }

    fn namespace(&self) -> String {
        self.object().namespace().unwrap_or_default()
    }

    /// The status phase, empty when no status was recorded yet
    fn status_as_string(&self) -> String;

    fn needs_requeue(&self) -> bool;

    fn set_needs_requeue(&mut self, requeue: bool);

    fn should_delete(&self) -> bool {
        self.object().meta().deletion_timestamp.is_some()
    }

    fn set_initial_status(&mut self, message: &str) -> bool;

    fn set_error_status(&mut self, err: &HalkyonError) -> bool;

    fn set_success_status(&mut self, statuses: &[DependentStatus], message: &str) -> bool;

    /// Reserved extension point, resources are valid unless they say otherwise
    fn is_valid(&self) -> bool {
        true
    }

    /// Check the spec declares everything the dependents need
    fn check_validity(&self) -> Result<()> {
        Ok(())
    }

    /// Fill in spec defaults, returning whether the spec needs persisting
    fn init(&mut self) -> bool {
        false
    }

    /// Finalizer gating [`Resource::delete`], if the resource needs explicit cleanup
    fn finalizer(&self, _ctx: &Context) -> Option<&'static str> {
        None
    }

    /// The dependents of this resource, in creation order
    fn dependents(&self, ctx: &Context) -> BaseResource<Self>;

    /// Kinds of the dependents to watch on behalf of resources of this kind
    fn watched_secondary_resource_types(cluster: &ClusterInfo) -> Vec<ApiResource>;

    async fn create_or_update(&mut self, dependents: &BaseResource<Self>, ctx: &Context) -> Result<()> {
        dependents.create_or_update_dependents(self, ctx).await
    }

    /// Clean up what garbage collection won't
    async fn delete(&mut self, _ctx: &Context) -> Result<()> {
        Ok(())
    }
}

/// Write the resource object (spec and metadata) back and pick up its new
/// resource version, so later writes in the same pass don't conflict.
pub async fn persist<R: Resource>(resource: &mut R, ctx: &Context) -> Result<()> {
    let updated = ctx
        .store
        .update(&api_resource::<R::Object>(), &to_dynamic(resource.object())?)
        .await?;
    resource.object_mut().meta_mut().resource_version = updated.metadata.resource_version;
    Ok(())
}
