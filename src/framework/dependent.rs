// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

use super::{Context, Resource};
use crate::error::Result;
use crate::kubernetes::object::set_controller_reference;
use crate::kubernetes::ClusterInfo;
use async_trait::async_trait;
use kube::api::{ApiResource, DynamicObject};
use kube::ResourceExt;
use tracing::{debug, error, info, instrument};

/// Policy flags of a dependent kind
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DependentConfig {
    /// Changes to objects of this kind trigger a reconcile of their owner
    pub watched: bool,
    /// Created objects get a controller reference to their owner
    pub owned: bool,
    /// The operator creates and updates objects of this kind
    pub created_or_updated: bool,
    /// Readiness of the object counts toward the owner status
    pub checked_for_readiness: bool,
}

impl Default for DependentConfig {
    fn default() -> Self {
        Self {
            watched: true,
            owned: true,
            created_or_updated: true,
            checked_for_readiness: false,
        }
    }
}

impl DependentConfig {
    /// Objects managed elsewhere that only gate the owner's readiness
    pub fn readiness_only() -> Self {
        Self {
            watched: false,
            owned: false,
            created_or_updated: false,
            checked_for_readiness: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Readiness {
    pub ready: bool,
    pub message: String,
}

impl Readiness {
    pub fn ready() -> Self {
        Self {
            ready: true,
            message: String::new(),
        }
    }

    pub fn not_ready(message: impl Into<String>) -> Self {
        Self {
            ready: false,
            message: message.into(),
        }
    }
}

/// Readiness of one dependent, as folded into the owner status
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DependentStatus {
    pub dependent_name: String,
    pub ready: bool,
    pub message: String,
    /// Owner status field the dependent name is reported in
    pub owner_status_field: Option<&'static str>,
}

impl DependentStatus {
    pub fn ready(dependent_name: impl Into<String>, owner_status_field: Option<&'static str>) -> Self {
        Self {
            dependent_name: dependent_name.into(),
            ready: true,
            message: String::new(),
            owner_status_field,
        }
    }

    pub fn failed(dependent_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            dependent_name: dependent_name.into(),
            ready: false,
            message: message.into(),
            owner_status_field: None,
        }
    }
}

/// A cluster object maintained on behalf of a primary resource `P`.
///
/// Implementations only describe the object; the owner is handed to every
/// call and [`create_or_update`] runs the protocol shared by all kinds.
#[async_trait]
pub trait DependentResource<P: Resource>: Send + Sync {
    fn api_resource(&self) -> ApiResource;

    /// Name used for this dependent in readiness messages
    fn type_name(&self) -> String {
        self.api_resource().kind
    }

    fn config(&self) -> DependentConfig {
        DependentConfig::default()
    }

    fn name(&self, owner: &P) -> String {
        owner.name()
    }

    fn can_be_created_or_updated(&self, _owner: &P, _ctx: &Context) -> bool {
        self.config().created_or_updated
    }

    fn should_watch(&self, _cluster: &ClusterInfo) -> bool {
        self.config().watched
    }

    fn checked_for_readiness(&self, _owner: &P) -> bool {
        self.config().checked_for_readiness
    }

    /// The desired object; must be the same for the same owner spec
    fn build(&self, owner: &P, _ctx: &Context) -> Result<DynamicObject> {
        panic!(
            "{} dependent of '{}' is not meant to be built",
            self.type_name(),
            owner.name()
        )
    }

    /// Bring `live` in line with the owner, returning whether it changed
    fn update(&self, _owner: &P, _live: &mut DynamicObject) -> Result<bool> {
        Ok(false)
    }

    async fn fetch(&self, owner: &P, ctx: &Context) -> Result<Option<DynamicObject>> {
        ctx.store
            .get(&self.api_resource(), &owner.namespace(), &self.name(owner))
            .await
    }

    fn is_ready(&self, _owner: &P, _live: &DynamicObject) -> Readiness {
        Readiness::ready()
    }

    /// Name reported for a ready dependent
    fn name_from(&self, _owner: &P, live: &DynamicObject) -> String {
        live.name_any()
    }

    fn owner_status_field(&self) -> Option<&'static str> {
        None
    }
}

/// Create the dependent when it's absent, update it when it drifted.
///
/// A create racing with another one is not an error: the object exists either way.
#[instrument(skip_all, fields(kind = %dependent.type_name(), owner = %owner.name()))]
pub async fn create_or_update<P, D>(
    dependent: &D,
    owner: &P,
    ctx: &Context,
) -> Result<()>
where
    P: Resource,
    D: DependentResource<P> + ?Sized,
{
    if !dependent.can_be_created_or_updated(owner, ctx) {
        debug!("Skipping {} '{}'", dependent.type_name(), dependent.name(owner));
        return Ok(());
    }

    let resource = dependent.api_resource();
    match dependent.fetch(owner, ctx).await {
        Ok(None) => {
            let mut desired = dependent.build(owner, ctx)?;
            if dependent.config().owned {
                set_controller_reference(&mut desired, owner.object())?;
            }
            match ctx.store.create(&resource, &desired).await {
                Ok(created) => {
                    info!("Created {} '{}'", resource.kind, created.name_any());
                    Ok(())
                }
                Err(e) if e.is_already_exists() => {
                    debug!("{} '{}' already exists", resource.kind, desired.name_any());
                    Ok(())
                }
                Err(e) => {
                    error!("Failed to create {} '{}': {}", resource.kind, desired.name_any(), e);
                    Err(e)
                }
            }
        }
        Ok(Some(mut live)) => {
            if dependent.update(owner, &mut live)? {
                ctx.store.update(&resource, &live).await.inspect_err(|e| {
                    error!("Failed to update {} '{}': {}", resource.kind, live.name_any(), e)
                })?;
                info!("Updated {} '{}'", resource.kind, live.name_any());
            }
            Ok(())
        }
        Err(e) => {
            error!("Failed to get {} '{}': {}", resource.kind, dependent.name(owner), e);
            Err(e)
        }
    }
}
